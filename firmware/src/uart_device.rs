use cli_core::{ByteReceiver, CharacterDevice};
use core::cell::Cell;
use defmt::{debug, error, warn};
use embassy_rp::uart::{Async, Error as UartError, UartRx, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;

/// Bytes queued for transmission before `write_async` starts refusing.
pub const TX_QUEUE_DEPTH: usize = 128;

/// UART-backed character device.
///
/// `write_async` only queues the byte; [`UartDevice::tx_loop`] drains the
/// queue to the UART. [`UartDevice::rx_loop`] reads the UART and hands every
/// byte to the registered receiver.
///
/// # Pins
///
/// Uses UART1 by default:
/// - GPIO 8: TX
/// - GPIO 9: RX
pub struct UartDevice {
    tx_queue: Channel<CriticalSectionRawMutex, u8, TX_QUEUE_DEPTH>,
    receiver: Mutex<CriticalSectionRawMutex, Cell<Option<&'static dyn ByteReceiver>>>,
}

impl UartDevice {
    /// Create a device with an empty TX queue and no receiver.
    pub const fn new() -> Self {
        Self {
            tx_queue: Channel::new(),
            receiver: Mutex::new(Cell::new(None)),
        }
    }

    /// Forward queued bytes to the UART forever.
    pub async fn tx_loop(&self, mut tx: UartTx<'static, Async>) -> ! {
        loop {
            let byte = self.tx_queue.receive().await;
            if let Err(e) = tx.write(&[byte]).await {
                error!("UART write error: {:?}", e);
            }
        }
    }

    /// Read the UART forever, delivering each byte to the receiver.
    pub async fn rx_loop(&self, mut rx: UartRx<'static, Async>) -> ! {
        let mut byte = [0u8; 1];
        loop {
            match rx.read(&mut byte).await {
                Ok(()) => match self.receiver.lock(Cell::get) {
                    Some(receiver) => receiver.on_new_byte(byte[0]),
                    None => debug!("no receiver, dropping byte"),
                },
                Err(UartError::Overrun) => warn!("UART overrun"),
                Err(e) => error!("UART read error: {:?}", e),
            }
        }
    }
}

impl Default for UartDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterDevice for UartDevice {
    fn write_async(&self, byte: u8) -> bool {
        self.tx_queue.try_send(byte).is_ok()
    }

    fn register_new_byte_callback(&self, receiver: &'static dyn ByteReceiver) {
        self.receiver.lock(|cell| cell.set(Some(receiver)));
    }
}
