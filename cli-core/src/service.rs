//! Public async entry points of a bridge.

use crate::device::CharacterDevice;
use crate::error::{fatal, ContractViolation};
use crate::event::{Inbox, WorkItem};
use cli_engine::CommandBinding;
use embassy_sync::blocking_mutex::raw::RawMutex;

/// Handle application code uses to drive a bridge.
///
/// Each call posts one work item and returns without waiting for the bridge
/// to process it. Items are processed in the order they were posted.
pub struct CliService<M: RawMutex + 'static, const N: usize> {
    inbox: &'static Inbox<M, N>,
}

impl<M: RawMutex + 'static, const N: usize> Clone for CliService<M, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex + 'static, const N: usize> Copy for CliService<M, N> {}

impl<M: RawMutex + 'static, const N: usize> CliService<M, N> {
    /// Handle posting into `inbox`.
    pub const fn new(inbox: &'static Inbox<M, N>) -> Self {
        Self { inbox }
    }

    /// Request activation on `device`. Ignored if the CLI is already active.
    #[track_caller]
    pub fn begin_cli_async(&self, device: &'static dyn CharacterDevice) {
        self.post(WorkItem::Begin(device));
    }

    /// Request deactivation. Ignored if the CLI is already inactive.
    #[track_caller]
    pub fn end_cli_async(&self) {
        self.post(WorkItem::End);
    }

    /// Request registration of `binding`. The CLI must be active when the
    /// request is processed.
    #[track_caller]
    pub fn add_cli_binding_async(&self, binding: CommandBinding) {
        self.post(WorkItem::AddBinding(binding));
    }

    #[track_caller]
    fn post(&self, item: WorkItem) {
        if self.inbox.try_post(item).is_err() {
            fatal(ContractViolation::InboxFull);
        }
    }
}
