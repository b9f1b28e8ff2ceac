//! Line-editing command engine with a fixed binding table.
//!
//! The engine reads bytes one at a time, echoes and edits the current line,
//! keeps a small history, offers prefix completion over the registered
//! command names, and dispatches complete lines to [`CommandBinding`]
//! handlers. It has no notion of threads or devices: bytes come in through
//! [`Engine::receive_char`] and go out through a [`CharWriter`].
//!
//! # Storage
//!
//! Every buffer the engine needs (receive FIFO, command line, history,
//! invitation, binding flags) lives in one region of [`CliUint`] words. The
//! caller either lends a statically provisioned slice or, with the `alloc`
//! feature, lets the engine allocate one. [`EngineConfig::required_size`]
//! reports how many words a configuration needs.
//!
//! ```rust
//! use cli_engine::{CliUint, CommandBinding, Engine, EngineConfig, Storage};
//!
//! let config = EngineConfig {
//!     invitation: "demo> ",
//!     ..EngineConfig::default()
//! };
//! let mut words = [0 as CliUint; 128];
//! assert!(config.required_size() <= words.len());
//!
//! let mut echoed = 0usize;
//! let mut engine = Engine::new(&config, Storage::from(&mut words[..]), |_c: u8| echoed += 1).unwrap();
//! engine
//!     .add_binding(CommandBinding::new("ping", |cli, _args, _ctx| cli.print("pong")))
//!     .unwrap();
//! for &b in b"ping\n" {
//!     engine.receive_char(b);
//! }
//! engine.process();
//! ```
//!
//! # Features
//!
//! - **`alloc`**: engine-owned backing storage ([`Storage::allocate`])
//! - **`std`**: standard library support for host testing
//! - **`defmt`** / **`log`**: route internal tracing to either backend

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
mod fmt;

mod binding;
mod config;
mod engine;
mod history;
mod output;
mod storage;
mod tokenizer;

pub use binding::{BindingContext, BindingError, BindingFn, CommandArgs, CommandBinding, Tokens};
pub use config::{
    CliUint, ConfigError, EngineConfig, DEFAULT_INVITATION, INTERNAL_BINDING_COUNT, MAX_BINDING_TABLE,
};
pub use engine::{Engine, EngineError};
pub use output::{CharWriter, CliOutput, LINE_BREAK};
pub use storage::Storage;
