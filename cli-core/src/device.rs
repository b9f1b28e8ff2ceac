//! Character device capability consumed by the bridge.

/// Receiver of bytes delivered by a [`CharacterDevice`].
///
/// `on_new_byte` may be called from any execution context, interrupt
/// handlers and foreign threads included. Implementations must not block.
pub trait ByteReceiver: Sync {
    /// Handle one received byte.
    fn on_new_byte(&self, byte: u8);
}

/// A byte-oriented transport the CLI runs over.
///
/// # Contract
///
/// - `write_async` queues one byte for transmission and returns immediately.
///   `false` means the byte was not accepted; retrying is the device's concern.
/// - `register_new_byte_callback` replaces any previously registered
///   receiver. Every byte received afterwards is handed to it, from whatever
///   context the device receives in.
pub trait CharacterDevice: Sync {
    /// Queue a byte for transmission.
    fn write_async(&self, byte: u8) -> bool;

    /// Route every received byte to `receiver`.
    fn register_new_byte_callback(&self, receiver: &'static dyn ByteReceiver);
}
