//! Host-side doubles for the device and notification capabilities.

extern crate std;

use crate::device::{ByteReceiver, CharacterDevice};
use crate::notify::{CliNotification, NotificationSink};
use core::sync::atomic::{AtomicBool, Ordering};
use std::boxed::Box;
use std::sync::Mutex;
use std::vec::Vec;

/// In-memory character device recording everything written to it.
pub(crate) struct MockDevice {
    written: Mutex<Vec<u8>>,
    receiver: Mutex<Option<&'static dyn ByteReceiver>>,
    accept: AtomicBool,
}

impl MockDevice {
    pub fn leak() -> &'static Self {
        Box::leak(Box::new(Self {
            written: Mutex::new(Vec::new()),
            receiver: Mutex::new(None),
            accept: AtomicBool::new(true),
        }))
    }

    /// Deliver `bytes` to the registered receiver, as a driver's RX path would.
    pub fn inject(&self, bytes: &[u8]) {
        let receiver = *self.receiver.lock().unwrap();
        if let Some(receiver) = receiver {
            for &b in bytes {
                receiver.on_new_byte(b);
            }
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn take_written(&self) -> Vec<u8> {
        core::mem::take(&mut *self.written.lock().unwrap())
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn has_receiver(&self) -> bool {
        self.receiver.lock().unwrap().is_some()
    }
}

impl CharacterDevice for MockDevice {
    fn write_async(&self, byte: u8) -> bool {
        let accept = self.accept.load(Ordering::SeqCst);
        if accept {
            self.written.lock().unwrap().push(byte);
        }
        accept
    }

    fn register_new_byte_callback(&self, receiver: &'static dyn ByteReceiver) {
        *self.receiver.lock().unwrap() = Some(receiver);
    }
}

/// Notification sink remembering every notification in order.
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<CliNotification>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<CliNotification> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for Recorder {
    fn notify(&self, notification: CliNotification) {
        self.events.lock().unwrap().push(notification);
    }
}
