//! Engine configuration and backing-storage sizing.

use core::fmt;
use core::mem::size_of;
use core::ops::Range;

/// Native word of the engine's backing storage.
///
/// Caller-supplied buffers are slices of this type so they are always
/// pointer-aligned, whatever the target's pointer width.
pub type CliUint = usize;

/// Prompt written when no custom invitation is configured.
pub const DEFAULT_INVITATION: &str = "> ";

/// Upper bound on bindings the engine can hold, including the built-in `help`.
pub const MAX_BINDING_TABLE: usize = 32;

/// Bindings the engine registers on its own (`help`).
pub const INTERNAL_BINDING_COUNT: usize = 1;

/// Construction-time settings of an [`Engine`](crate::Engine).
///
/// Every field contributes to [`required_size`](Self::required_size), so size
/// a static buffer only after the configuration is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig<'p> {
    /// Prompt printed before each line.
    pub invitation: &'p str,
    /// Bytes buffered between `receive_char` and `process`.
    pub rx_buffer_size: u16,
    /// Longest editable command line, in bytes.
    pub cmd_buffer_size: u16,
    /// Bytes reserved for previously entered commands.
    pub history_buffer_size: u16,
    /// Maximum number of user bindings (the internal `help` is extra).
    pub max_binding_count: u16,
    /// Render live completion hints and honour tab completion.
    pub enable_auto_complete: bool,
}

impl<'p> EngineConfig<'p> {
    /// Default configuration: `"> "` prompt, 64-byte RX and command buffers,
    /// 128 bytes of history, 8 user bindings, completion enabled.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            invitation: DEFAULT_INVITATION,
            rx_buffer_size: 64,
            cmd_buffer_size: 64,
            history_buffer_size: 128,
            max_binding_count: 8,
            enable_auto_complete: true,
        }
    }

    /// Total binding slots, user and internal.
    #[inline]
    #[must_use]
    pub const fn binding_slots(&self) -> usize {
        self.max_binding_count as usize + INTERNAL_BINDING_COUNT
    }

    /// Check that an engine can be built from this configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cmd_buffer_size < 2 {
            return Err(ConfigError::CommandBufferTooSmall);
        }
        if self.rx_buffer_size == 0 {
            return Err(ConfigError::RxBufferTooSmall);
        }
        if self.binding_slots() > MAX_BINDING_TABLE {
            return Err(ConfigError::TooManyBindings {
                requested: self.max_binding_count,
                limit: (MAX_BINDING_TABLE - INTERNAL_BINDING_COUNT) as u16,
            });
        }
        Ok(())
    }

    /// Backing storage needed by this configuration, in [`CliUint`] words.
    #[must_use]
    pub fn required_size(&self) -> usize {
        self.layout().total_words
    }

    pub(crate) fn layout(&self) -> Layout {
        let mut cursor = 0;
        let mut region = |bytes: usize| {
            let start = cursor * size_of::<CliUint>();
            cursor += words_for(bytes);
            start..start + bytes
        };

        let rx = region(self.rx_buffer_size as usize);
        let cmd = region(self.cmd_buffer_size as usize);
        let history = region(self.history_buffer_size as usize);
        let invitation = region(self.invitation.len());
        let binding_flags = region(self.binding_slots());

        Layout {
            rx,
            cmd,
            history,
            invitation,
            binding_flags,
            total_words: cursor,
        }
    }
}

impl Default for EngineConfig<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte ranges of each region inside the backing storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub rx: Range<usize>,
    pub cmd: Range<usize>,
    pub history: Range<usize>,
    pub invitation: Range<usize>,
    pub binding_flags: Range<usize>,
    pub total_words: usize,
}

#[inline]
const fn words_for(bytes: usize) -> usize {
    bytes.div_ceil(size_of::<CliUint>())
}

/// Configuration the engine cannot be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The command buffer cannot hold a character plus its terminator.
    CommandBufferTooSmall,
    /// The receive FIFO has no room at all.
    RxBufferTooSmall,
    /// More bindings requested than the table can hold.
    TooManyBindings {
        /// Requested user binding count.
        requested: u16,
        /// Largest accepted user binding count.
        limit: u16,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommandBufferTooSmall => f.write_str("command buffer too small"),
            Self::RxBufferTooSmall => f.write_str("rx buffer too small"),
            Self::TooManyBindings { requested, limit } => {
                write!(f, "{} bindings requested, limit is {}", requested, limit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = size_of::<CliUint>();

    #[test]
    fn test_default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.invitation, "> ");
        assert_eq!(config.rx_buffer_size, 64);
        assert_eq!(config.cmd_buffer_size, 64);
        assert_eq!(config.history_buffer_size, 128);
        assert_eq!(config.max_binding_count, 8);
        assert!(config.enable_auto_complete);
        assert_eq!(config.binding_slots(), 9);
    }

    #[test]
    fn test_required_size_default() {
        let config = EngineConfig::default();
        let expected = 64 / W + 64 / W + 128 / W + 2usize.div_ceil(W) + 9usize.div_ceil(W);
        assert_eq!(config.required_size(), expected);
    }

    #[test]
    fn test_required_size_grows_with_invitation() {
        let base = EngineConfig::default();
        let custom = EngineConfig {
            invitation: "a-much-longer-invitation> ",
            ..base
        };
        assert!(custom.required_size() > base.required_size());
    }

    #[test]
    fn test_required_size_grows_with_binding_count() {
        let base = EngineConfig::default();
        let custom = EngineConfig {
            max_binding_count: 24,
            ..base
        };
        assert!(custom.required_size() > base.required_size());
    }

    #[test]
    fn test_layout_regions_are_word_aligned_and_disjoint() {
        let layout = EngineConfig {
            invitation: "abc> ",
            rx_buffer_size: 5,
            ..EngineConfig::default()
        }
        .layout();

        let regions = [
            &layout.rx,
            &layout.cmd,
            &layout.history,
            &layout.invitation,
            &layout.binding_flags,
        ];
        for pair in regions.windows(2) {
            assert_eq!(pair[0].start % W, 0);
            assert!(pair[0].end <= pair[1].start);
        }
        assert!(layout.binding_flags.end <= layout.total_words * W);
    }

    #[test]
    fn test_validate_rejects_large_binding_count() {
        let config = EngineConfig {
            max_binding_count: 40,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyBindings {
                requested: 40,
                limit: 31
            })
        );
    }

    #[test]
    fn test_validate_rejects_tiny_command_buffer() {
        let config = EngineConfig {
            cmd_buffer_size: 1,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::CommandBufferTooSmall));
    }
}
