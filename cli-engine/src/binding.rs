//! Command bindings and the arguments handed to their handlers.

use crate::output::CliOutput;
use crate::tokenizer;
use core::any::Any;
use core::fmt;

/// Opaque application context attached to a binding.
pub type BindingContext = Option<&'static (dyn Any + Send + Sync)>;

/// Handler invoked when a bound command is entered.
pub type BindingFn = fn(cli: &mut CliOutput<'_>, args: CommandArgs<'_>, context: BindingContext);

/// A named command registered into the engine's binding table.
#[derive(Clone, Copy)]
pub struct CommandBinding {
    /// Command name, matched against the first word of the line. Must not be empty.
    pub name: &'static str,
    /// Text shown by `help <name>`. May span lines separated by `"\r\n"`.
    pub help: Option<&'static str>,
    /// Split the arguments into tokens before calling the handler.
    pub tokenize_args: bool,
    /// Application context provided back to the handler.
    pub context: BindingContext,
    /// Handler called for this command.
    pub binding: BindingFn,
}

impl CommandBinding {
    /// Binding with no help text, raw arguments and no context.
    #[must_use]
    pub const fn new(name: &'static str, binding: BindingFn) -> Self {
        Self {
            name,
            help: None,
            tokenize_args: false,
            context: None,
            binding,
        }
    }

    /// Attach help text.
    #[must_use]
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Request tokenized arguments.
    #[must_use]
    pub const fn tokenized(mut self) -> Self {
        self.tokenize_args = true;
        self
    }

    /// Attach an application context.
    #[must_use]
    pub const fn with_context(mut self, context: &'static (dyn Any + Send + Sync)) -> Self {
        self.context = Some(context);
        self
    }
}

impl fmt::Debug for CommandBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBinding")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("tokenize_args", &self.tokenize_args)
            .field("context", &self.context.is_some())
            .finish_non_exhaustive()
    }
}

/// Arguments following the command name.
#[derive(Debug, Clone, Copy)]
pub enum CommandArgs<'l> {
    /// Remainder of the line after the command name, untouched.
    Raw(&'l str),
    /// Tokenized arguments (binding registered with `tokenize_args`).
    Tokens(Tokens<'l>),
}

impl<'l> CommandArgs<'l> {
    /// Raw argument text, if the binding did not request tokens.
    #[must_use]
    pub fn raw(&self) -> Option<&'l str> {
        match self {
            CommandArgs::Raw(s) => Some(s),
            CommandArgs::Tokens(_) => None,
        }
    }

    /// Tokens, if the binding requested them.
    #[must_use]
    pub fn tokens(&self) -> Option<Tokens<'l>> {
        match self {
            CommandArgs::Raw(_) => None,
            CommandArgs::Tokens(t) => Some(*t),
        }
    }
}

/// Tokenized arguments, packed and NUL-separated.
#[derive(Clone, Copy)]
pub struct Tokens<'l> {
    packed: &'l [u8],
}

impl<'l> Tokens<'l> {
    pub(crate) fn new(packed: &'l [u8]) -> Self {
        Self { packed }
    }

    /// Iterate the tokens in order.
    pub fn iter(&self) -> impl Iterator<Item = &'l str> {
        tokenizer::split(self.packed)
    }

    /// Number of tokens.
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Token at `index` (0-based).
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'l str> {
        self.iter().nth(index)
    }
}

impl fmt::Debug for Tokens<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Binding registration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindingError {
    /// Binding name is empty.
    EmptyName,
    /// Every binding slot is taken.
    TableFull,
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => f.write_str("binding name is empty"),
            Self::TableFull => f.write_str("binding table is full"),
        }
    }
}
