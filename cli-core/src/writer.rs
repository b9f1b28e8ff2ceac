use crate::device::CharacterDevice;
use cli_engine::CharWriter;

/// Engine output hook forwarding every byte to the active device.
///
/// Each engine owns its writer, so output always reaches the device of the
/// bridge that owns the engine.
pub struct DeviceWriter {
    device: &'static dyn CharacterDevice,
    rejected: usize,
}

impl DeviceWriter {
    pub(crate) fn new(device: &'static dyn CharacterDevice) -> Self {
        Self {
            device,
            rejected: 0,
        }
    }

    /// Bytes the device refused since activation.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl CharWriter for DeviceWriter {
    fn write_char(&mut self, c: u8) {
        if !self.device.write_async(c) {
            self.rejected = self.rejected.wrapping_add(1);
            trace!("device rejected byte {}", c);
        }
    }
}
