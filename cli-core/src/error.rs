//! Contract violations and the fatal stop they lead to.

use cli_engine::ConfigError;
use core::fmt;

/// A caller bug the bridge refuses to run past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContractViolation {
    /// A binding was added while the CLI was not active.
    NotActive,
    /// A binding was added with an empty name.
    EmptyBindingName,
    /// A binding was added to a full table.
    BindingTableFull,
    /// The static buffer cannot hold the configured engine.
    BufferTooSmall {
        /// Words the configuration needs.
        required: usize,
        /// Words supplied.
        supplied: usize,
    },
    /// The engine rejected the configuration.
    InvalidConfig(ConfigError),
    /// Neither a static buffer nor dynamic allocation is available.
    NoBackingStorage,
    /// A control request found the inbox full.
    InboxFull,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotActive => f.write_str("binding added while CLI inactive"),
            Self::EmptyBindingName => f.write_str("binding name is empty"),
            Self::BindingTableFull => f.write_str("binding table is full"),
            Self::BufferTooSmall { required, supplied } => write!(
                f,
                "static buffer too small: {} words required, {} supplied",
                required, supplied
            ),
            Self::InvalidConfig(err) => write!(f, "invalid engine config: {}", err),
            Self::NoBackingStorage => f.write_str("no static buffer and no allocator"),
            Self::InboxFull => f.write_str("inbox full"),
        }
    }
}

/// Log `violation` and stop.
///
/// On firmware the panic handler decides what stopping means (halt under
/// `panic-probe`, reset under `panic-reset`).
#[cold]
#[track_caller]
pub fn fatal(violation: ContractViolation) -> ! {
    error!("contract violation: {}", violation);
    panic!("contract violation: {}", violation)
}
