//! Work items and the bounded inbox the bridge consumes them from.

use crate::device::{ByteReceiver, CharacterDevice};
use cli_engine::CommandBinding;
use core::fmt;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};

/// One ordered unit of input to a bridge.
#[derive(Clone, Copy)]
pub enum WorkItem {
    /// Activate the CLI on a device.
    Begin(&'static dyn CharacterDevice),
    /// Deactivate the CLI.
    End,
    /// Register a binding with the running engine.
    AddBinding(CommandBinding),
    /// A byte received from the device.
    NewByte(u8),
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Begin(_) => f.write_str("Begin"),
            Self::End => f.write_str("End"),
            Self::AddBinding(binding) => f.debug_tuple("AddBinding").field(&binding.name).finish(),
            Self::NewByte(byte) => f.debug_tuple("NewByte").field(byte).finish(),
        }
    }
}

/// Bounded FIFO of [`WorkItem`]s addressed to one bridge.
///
/// Producers in any context post into it; only the owning bridge receives.
/// Place it in a `static` so the device callback can hold on to it.
pub struct Inbox<M: RawMutex, const N: usize> {
    channel: Channel<M, WorkItem, N>,
}

impl<M: RawMutex, const N: usize> Inbox<M, N> {
    /// Create an empty inbox.
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Post an item without waiting. A full inbox hands the item back.
    pub fn try_post(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.channel.try_send(item).map_err(|TrySendError::Full(item)| item)
    }

    /// Take the oldest item, if any.
    pub fn try_receive(&self) -> Option<WorkItem> {
        self.channel.try_receive().ok()
    }

    /// Wait for the oldest item.
    pub async fn receive(&self) -> WorkItem {
        self.channel.receive().await
    }

    /// Items waiting.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    /// True when nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex, const N: usize> Default for Inbox<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex + Sync, const N: usize> ByteReceiver for Inbox<M, N> {
    fn on_new_byte(&self, byte: u8) {
        // Never block or stop here; this may be an interrupt handler
        if self.try_post(WorkItem::NewByte(byte)).is_err() {
            warn!("inbox full, dropping byte {}", byte);
        }
    }
}
