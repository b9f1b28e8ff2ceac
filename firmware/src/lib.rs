//! Command line over UART for RP2040.
//!
//! This crate provides the embedded glue for the CLI bridge: a UART
//! character device and the on-board LED commands.

#![no_std]

// Re-export core types for convenience
pub use cli_core::{
    BindingContext, CliBridge, CliNotification, CliOutput, CliService, CliStatus, CliUint,
    CommandArgs, CommandBinding, Inbox, ServiceConfig, ServiceId,
};

pub mod led;
pub mod uart_device;

pub use led::{led_bindings, LedCommand, LedSignal};
pub use uart_device::UartDevice;
