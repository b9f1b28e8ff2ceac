//! Character device over the process's stdin and stdout.

use cli_core::{ByteReceiver, CharacterDevice};
use core::cell::Cell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::{debug, error};
use std::io::{self, Read, Write};
use std::thread;

/// Writes to stdout; a reader thread delivers stdin bytes to the registered receiver.
///
/// The receiver is called from the reader thread, not from the executor.
pub struct StdioDevice {
    receiver: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn ByteReceiver>>>,
}

impl StdioDevice {
    pub const fn new() -> Self {
        Self {
            receiver: Mutex::new(Cell::new(None)),
        }
    }

    /// Start the stdin reader thread.
    pub fn spawn_reader(&'static self) -> io::Result<()> {
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || self.read_loop())
            .map(|_| ())
    }

    fn read_loop(&self) {
        for byte in io::stdin().lock().bytes() {
            match byte {
                Ok(byte) => {
                    if let Some(receiver) = self.receiver.lock(Cell::get) {
                        receiver.on_new_byte(byte);
                    }
                }
                Err(e) => {
                    error!("stdin read failed: {}", e);
                    return;
                }
            }
        }
        debug!("stdin closed");
    }
}

impl CharacterDevice for StdioDevice {
    fn write_async(&self, byte: u8) -> bool {
        let mut out = io::stdout().lock();
        out.write_all(&[byte]).and_then(|()| out.flush()).is_ok()
    }

    fn register_new_byte_callback(&self, receiver: &'static dyn ByteReceiver) {
        self.receiver.lock(|cell| cell.set(Some(receiver)));
    }
}
