//! Run-to-completion bridge between a character device and a command engine.
//!
//! A [`CliBridge`] owns a [`cli_engine::Engine`] while it is active and is the
//! only code that ever touches it. Bytes arrive through the device's receive
//! callback, possibly from an interrupt or another thread; the callback only
//! posts [`WorkItem::NewByte`] into the bridge's [`Inbox`]. Application code
//! posts begin/end/add-binding requests through a [`CliService`]. The bridge
//! drains the inbox from its own task, one item at a time, in order.
//!
//! # Example
//!
//! ```rust,ignore
//! static INBOX: Inbox<CriticalSectionRawMutex, 32> = Inbox::new();
//! static STATUS: PubSubChannel<CriticalSectionRawMutex, CliNotification, 4, 2, 1> =
//!     PubSubChannel::new();
//!
//! let mut bridge = CliBridge::new(
//!     ServiceConfig::new(ServiceId(0)).with_invitation("fw> "),
//!     &INBOX,
//!     &STATUS,
//! );
//! let cli = bridge.service();
//! cli.begin_cli_async(uart);
//! cli.add_cli_binding_async(CommandBinding::new("led", led_handler));
//! bridge.run().await;
//! ```
//!
//! # Features
//!
//! - **`alloc`** (default): bridges without a static buffer let the engine allocate
//! - **`std`**: standard library support for host testing
//! - **`defmt`** / **`log`**: structured logging backend

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub mod bridge;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod notify;
pub mod service;
pub mod writer;

#[cfg(test)]
mod testing;

pub use bridge::{BridgeState, CliBridge};
pub use config::ServiceConfig;
pub use device::{ByteReceiver, CharacterDevice};
pub use error::{fatal, ContractViolation};
pub use event::{Inbox, WorkItem};
pub use notify::{CliNotification, CliStatus, NoNotifications, NotificationSink, ServiceId};
pub use service::CliService;
pub use writer::DeviceWriter;

pub use cli_engine::{
    BindingContext, CliOutput, CliUint, CommandArgs, CommandBinding, EngineConfig, Tokens,
};
