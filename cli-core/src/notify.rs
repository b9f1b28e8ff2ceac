//! Status notifications published on every lifecycle transition.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::pubsub::PubSubChannel;

/// Identity of a bridge, carried in its notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceId(pub u8);

/// Lifecycle status of a CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CliStatus {
    /// The CLI entered the inactive state.
    Inactive,
    /// The CLI entered the active state.
    Active,
}

/// Notification emitted by a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CliNotification {
    /// Originating bridge.
    pub service: ServiceId,
    /// New status.
    pub status: CliStatus,
}

/// Anything that can deliver [`CliNotification`]s to interested observers.
pub trait NotificationSink {
    /// Deliver `notification`. Must not block.
    fn notify(&self, notification: CliNotification);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn notify(&self, notification: CliNotification) {
        (**self).notify(notification)
    }
}

/// Publishes to every subscriber; a lagging subscriber loses its oldest message.
impl<M: RawMutex, const CAP: usize, const SUBS: usize, const PUBS: usize> NotificationSink
    for PubSubChannel<M, CliNotification, CAP, SUBS, PUBS>
{
    fn notify(&self, notification: CliNotification) {
        self.immediate_publisher().publish_immediate(notification);
    }
}

/// Sink for bridges nobody observes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNotifications;

impl NotificationSink for NoNotifications {
    fn notify(&self, _notification: CliNotification) {}
}
