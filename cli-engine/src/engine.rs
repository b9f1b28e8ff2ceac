//! The command engine: receive FIFO, line editor, binding dispatch.

use crate::binding::{BindingError, CommandArgs, CommandBinding, Tokens};
use crate::config::{ConfigError, EngineConfig, Layout, INTERNAL_BINDING_COUNT, MAX_BINDING_TABLE};
use crate::history::History;
use crate::output::{CharWriter, CliOutput, LINE_BREAK};
use crate::storage::Storage;
use crate::tokenizer;
use core::fmt;
use heapless::Vec;

const ESC: u8 = 0x1B;
const BACKSPACE: u8 = 0x08;
const DEL: u8 = 0x7F;

const CURSOR_SAVE: &str = "\x1B[s";
const CURSOR_RESTORE: &str = "\x1B[u";
const ERASE_LINE: &str = "\x1B[K";

const HELP_NAME: &str = "help";
const HELP_TEXT: &str = "Print list of commands";
const HELP_UNAVAILABLE: &str = "Help is not available";

// Per-slot flags kept in the binding flag region
const FLAG_TOKENIZE: u8 = 1 << 0;
const FLAG_CANDIDATE: u8 = 1 << 1;

/// Engine construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError {
    /// The configuration itself is unusable.
    Config(ConfigError),
    /// Supplied storage is smaller than the configuration requires.
    BufferTooSmall {
        /// Words required by the configuration.
        required: usize,
        /// Words supplied.
        supplied: usize,
    },
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid config: {}", err),
            Self::BufferTooSmall { required, supplied } => write!(
                f,
                "buffer too small: {} words required, {} supplied",
                required, supplied
            ),
        }
    }
}

/// Result of matching the current line against binding names.
struct Completion {
    candidates: usize,
    first: &'static str,
    completed_len: usize,
}

/// Line-oriented command engine.
///
/// Bytes enter through [`receive_char`](Self::receive_char), which only
/// queues them; [`process`](Self::process) edits the line, renders echo and
/// completion hints, and dispatches complete commands. All output goes to the
/// engine's [`CharWriter`].
pub struct Engine<'s, W: CharWriter> {
    storage: Storage<'s>,
    layout: Layout,
    writer: W,
    bindings: Vec<CommandBinding, { MAX_BINDING_TABLE - INTERNAL_BINDING_COUNT }>,
    max_bindings: usize,
    history: History,
    history_current: usize,
    rx_head: usize,
    rx_len: usize,
    cmd_len: usize,
    /// Characters shown after the invitation, completion hint included.
    input_line_len: usize,
    last_char: u8,
    auto_complete: bool,
    init_complete: bool,
    escape_mode: bool,
    overflow: bool,
}

impl<'s, W: CharWriter> Engine<'s, W> {
    /// Build an engine over `storage`, emitting through `writer`.
    pub fn new(config: &EngineConfig<'_>, mut storage: Storage<'s>, writer: W) -> Result<Self, EngineError> {
        config.validate()?;

        let required = config.required_size();
        if storage.len() < required {
            return Err(EngineError::BufferTooSmall {
                required,
                supplied: storage.len(),
            });
        }

        let layout = config.layout();
        let bytes = storage.bytes_mut();
        bytes[layout.invitation.clone()].copy_from_slice(config.invitation.as_bytes());
        let flags = &mut bytes[layout.binding_flags.clone()];
        flags.fill(0);
        flags[0] = FLAG_TOKENIZE;

        Ok(Self {
            storage,
            layout,
            writer,
            bindings: Vec::new(),
            max_bindings: config.max_binding_count as usize,
            history: History::new(),
            history_current: 0,
            rx_head: 0,
            rx_len: 0,
            cmd_len: 0,
            input_line_len: 0,
            last_char: 0,
            auto_complete: config.enable_auto_complete,
            init_complete: false,
            escape_mode: false,
            overflow: false,
        })
    }

    /// Queue one received byte. Nothing is echoed until [`process`](Self::process).
    pub fn receive_char(&mut self, c: u8) {
        let capacity = self.layout.rx.len();
        if self.rx_len == capacity {
            self.overflow = true;
            return;
        }
        let index = self.layout.rx.start + (self.rx_head + self.rx_len) % capacity;
        self.storage.bytes_mut()[index] = c;
        self.rx_len += 1;
    }

    /// Handle every queued byte, printing the invitation first on the initial call.
    pub fn process(&mut self) {
        if !self.init_complete {
            self.init_complete = true;
            self.write_invitation();
        }

        while let Some(c) = self.rx_pop() {
            if self.escape_mode {
                self.on_escaped_input(c);
            } else if self.last_char == ESC && c == b'[' {
                self.escape_mode = true;
            } else if is_control(c) {
                self.on_control_input(c);
            } else if is_displayable(c) {
                self.on_char_input(c);
            }
            self.print_live_autocompletion();
            self.last_char = c;
        }

        // A partially received line is unusable after an overflow
        if self.overflow {
            debug!("rx overflow, discarding line");
            self.cmd_len = 0;
            self.overflow = false;
        }
    }

    /// Register a user binding.
    ///
    /// A failed registration leaves the table untouched.
    pub fn add_binding(&mut self, binding: CommandBinding) -> Result<(), BindingError> {
        if binding.name.is_empty() {
            return Err(BindingError::EmptyName);
        }
        if self.bindings.len() >= self.max_bindings {
            return Err(BindingError::TableFull);
        }
        self.bindings
            .push(binding)
            .map_err(|_| BindingError::TableFull)?;

        let slot = self.layout.binding_flags.start + self.bindings.len();
        self.storage.bytes_mut()[slot] = if binding.tokenize_args { FLAG_TOKENIZE } else { 0 };
        trace!("binding added: {}", binding.name);
        Ok(())
    }

    /// Print `text` on its own line outside of a command handler, then redraw
    /// the invitation and the line being edited.
    pub fn print(&mut self, text: &str) {
        self.writer.write_char(b'\r');
        let shown = self.layout.invitation.len() + self.input_line_len.max(self.cmd_len);
        for _ in 0..shown {
            self.writer.write_char(b' ');
        }
        self.writer.write_char(b'\r');
        self.writer.write_str(text);
        self.writer.write_str(LINE_BREAK);

        self.write_invitation();
        self.write_command();
        self.input_line_len = self.cmd_len;
        self.print_live_autocompletion();
    }

    /// Number of user bindings registered.
    #[inline]
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Maximum number of user bindings.
    #[inline]
    #[must_use]
    pub fn binding_capacity(&self) -> usize {
        self.max_bindings
    }

    /// The configured invitation.
    #[must_use]
    pub fn invitation(&self) -> &str {
        core::str::from_utf8(&self.storage.bytes()[self.layout.invitation.clone()]).unwrap_or("")
    }

    /// The output writer.
    #[inline]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Tear the engine down, returning its storage and writer.
    pub fn release(self) -> (Storage<'s>, W) {
        (self.storage, self.writer)
    }

    fn rx_pop(&mut self) -> Option<u8> {
        if self.rx_len == 0 {
            return None;
        }
        let c = self.storage.bytes()[self.layout.rx.start + self.rx_head];
        self.rx_head = (self.rx_head + 1) % self.layout.rx.len();
        self.rx_len -= 1;
        Some(c)
    }

    fn on_escaped_input(&mut self, c: u8) {
        if (0x40..=0x7E).contains(&c) {
            self.escape_mode = false;
            match c {
                b'A' => self.navigate_history(true),
                b'B' => self.navigate_history(false),
                _ => {}
            }
        }
    }

    fn on_control_input(&mut self, c: u8) {
        // "\r\n" and "\n\r" end a single line
        if (self.last_char == b'\r' && c == b'\n') || (self.last_char == b'\n' && c == b'\r') {
            return;
        }

        match c {
            b'\r' | b'\n' => {
                self.on_autocomplete_request();
                self.writer.write_str(LINE_BREAK);
                if self.cmd_len > 0 {
                    self.parse_command();
                }
                self.cmd_len = 0;
                self.input_line_len = 0;
                self.history_current = 0;
                self.write_invitation();
            }
            BACKSPACE | DEL if self.cmd_len > 0 => {
                self.writer.write_bytes(b"\x08 \x08");
                self.cmd_len -= 1;
            }
            b'\t' => self.on_autocomplete_request(),
            _ => {}
        }
    }

    fn on_char_input(&mut self, c: u8) {
        // One byte stays free so the tokenizer never runs off the end
        if self.cmd_len + 1 >= self.layout.cmd.len() {
            return;
        }
        let index = self.layout.cmd.start + self.cmd_len;
        self.storage.bytes_mut()[index] = c;
        self.cmd_len += 1;
        self.writer.write_char(c);
    }

    fn navigate_history(&mut self, older: bool) {
        let history = &self.storage.bytes()[self.layout.history.clone()];
        let count = self.history.len(history);

        let target = if older {
            if self.history_current >= count {
                return;
            }
            self.history_current + 1
        } else {
            if self.history_current == 0 {
                return;
            }
            self.history_current - 1
        };
        self.history_current = target;

        let bytes = self.storage.bytes_mut();
        let (head, tail) = bytes.split_at_mut(self.layout.history.start);
        let entry = self
            .history
            .get(&tail[..self.layout.history.len()], target)
            .unwrap_or(&[]);
        let len = entry.len().min(self.layout.cmd.len() - 1);
        head[self.layout.cmd.start..self.layout.cmd.start + len].copy_from_slice(&entry[..len]);
        self.cmd_len = len;

        self.writer.write_char(b'\r');
        self.writer.write_str(ERASE_LINE);
        self.write_invitation();
        self.write_command();
        self.input_line_len = self.cmd_len;
    }

    fn parse_command(&mut self) {
        let cmd_start = self.layout.cmd.start;
        let cmd_len = self.cmd_len;

        let bytes = self.storage.bytes_mut();
        let (head, tail) = bytes.split_at_mut(self.layout.history.start);
        let line = &mut head[cmd_start..cmd_start + cmd_len];

        if line.iter().all(|&b| b == b' ') {
            return;
        }
        self.history
            .push(&mut tail[..self.layout.history.len()], line);

        let name_start = line.iter().position(|&b| b != b' ').unwrap_or(0);
        let name_end = line[name_start..]
            .iter()
            .position(|&b| b == b' ')
            .map_or(cmd_len, |p| name_start + p);
        let args_start = line[name_end..]
            .iter()
            .position(|&b| b != b' ')
            .map_or(cmd_len, |p| name_end + p);

        let (name_part, args_part) = line.split_at_mut(args_start);
        let name = core::str::from_utf8(&name_part[name_start..name_end]).unwrap_or("");

        let slot = if name == HELP_NAME {
            Some(0)
        } else {
            self.bindings
                .iter()
                .position(|b| b.name == name)
                .map(|i| i + INTERNAL_BINDING_COUNT)
        };

        let Some(slot) = slot else {
            on_unknown_command(&mut self.writer, name);
            return;
        };

        let flags = tail[self.layout.binding_flags.start - self.layout.history.start + slot];
        let args = if flags & FLAG_TOKENIZE != 0 {
            let len = args_part.len();
            let packed = tokenizer::tokenize(args_part, len);
            CommandArgs::Tokens(Tokens::new(&args_part[..packed]))
        } else {
            CommandArgs::Raw(core::str::from_utf8(args_part).unwrap_or(""))
        };

        if slot == 0 {
            on_help(&mut self.writer, &self.bindings, args);
        } else {
            let binding = self.bindings[slot - INTERNAL_BINDING_COUNT];
            trace!("dispatching {}", binding.name);
            let mut out = CliOutput::new(&mut self.writer);
            (binding.binding)(&mut out, args, binding.context);
        }
    }

    fn autocomplete(&mut self) -> Completion {
        let mut completion = Completion {
            candidates: 0,
            first: "",
            completed_len: 0,
        };

        let bytes = self.storage.bytes_mut();
        let (head, tail) = bytes.split_at_mut(self.layout.binding_flags.start);
        let prefix = &head[self.layout.cmd.start..self.layout.cmd.start + self.cmd_len];
        if prefix.is_empty() {
            return completion;
        }
        let flags = &mut tail[..self.layout.binding_flags.len()];

        let names = core::iter::once(HELP_NAME).chain(self.bindings.iter().map(|b| b.name));
        for (slot, name) in names.enumerate() {
            flags[slot] &= !FLAG_CANDIDATE;
            if !name.as_bytes().starts_with(prefix) {
                continue;
            }
            flags[slot] |= FLAG_CANDIDATE;

            if completion.candidates == 0 || name.len() < completion.completed_len {
                completion.completed_len = name.len();
            }
            completion.candidates += 1;
            if completion.candidates == 1 {
                completion.first = name;
                continue;
            }

            // Shrink to the prefix shared with the first candidate
            let first = completion.first.as_bytes();
            let shared = (prefix.len()..completion.completed_len)
                .find(|&i| first[i] != name.as_bytes()[i])
                .unwrap_or(completion.completed_len);
            completion.completed_len = shared;
        }

        completion
    }

    fn on_autocomplete_request(&mut self) {
        if !self.auto_complete {
            return;
        }
        let completion = self.autocomplete();
        if completion.candidates == 0 {
            return;
        }

        if completion.candidates == 1 || completion.completed_len > self.cmd_len {
            let mut new_len = completion.completed_len;
            if completion.candidates == 1 {
                new_len += 1;
            }
            if new_len + 1 >= self.layout.cmd.len() {
                return;
            }

            let old_len = self.cmd_len;
            let start = self.layout.cmd.start;
            let bytes = self.storage.bytes_mut();
            let first = completion.first.as_bytes();
            bytes[start + old_len..start + completion.completed_len]
                .copy_from_slice(&first[old_len..completion.completed_len]);
            if completion.candidates == 1 {
                bytes[start + completion.completed_len] = b' ';
            }
            self.cmd_len = new_len;

            self.writer.write_bytes(&bytes[start + old_len..start + new_len]);
            self.input_line_len = self.cmd_len;
            return;
        }

        // Several candidates and nothing more to complete: list them
        self.writer.write_str(LINE_BREAK);
        let flags = &self.storage.bytes()[self.layout.binding_flags.clone()];
        let names = core::iter::once(HELP_NAME).chain(self.bindings.iter().map(|b| b.name));
        for (slot, name) in names.enumerate() {
            if flags[slot] & FLAG_CANDIDATE != 0 {
                self.writer.write_str(name);
                self.writer.write_str(LINE_BREAK);
            }
        }
        self.write_invitation();
        self.write_command();
        self.input_line_len = self.cmd_len;
    }

    fn print_live_autocompletion(&mut self) {
        if !self.auto_complete {
            return;
        }
        let completion = self.autocomplete();
        let completed_len = if completion.candidates == 0 {
            self.cmd_len
        } else {
            completion.completed_len
        };

        self.writer.write_str(CURSOR_SAVE);
        if completed_len > self.cmd_len {
            self.writer
                .write_bytes(&completion.first.as_bytes()[self.cmd_len..completed_len]);
        }
        for _ in completed_len..self.input_line_len {
            self.writer.write_char(b' ');
        }
        self.input_line_len = completed_len;
        self.writer.write_str(CURSOR_RESTORE);
    }

    fn write_invitation(&mut self) {
        let bytes = self.storage.bytes();
        self.writer.write_bytes(&bytes[self.layout.invitation.clone()]);
    }

    fn write_command(&mut self) {
        let bytes = self.storage.bytes();
        let start = self.layout.cmd.start;
        self.writer.write_bytes(&bytes[start..start + self.cmd_len]);
    }
}

impl<W: CharWriter> fmt::Debug for Engine<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("bindings", &self.bindings.len())
            .field("max_bindings", &self.max_bindings)
            .field("cmd_len", &self.cmd_len)
            .field("rx_len", &self.rx_len)
            .finish_non_exhaustive()
    }
}

#[inline]
fn is_control(c: u8) -> bool {
    c < 0x20 || c == DEL
}

#[inline]
fn is_displayable(c: u8) -> bool {
    (0x20..=0x7E).contains(&c)
}

fn on_unknown_command(writer: &mut dyn CharWriter, name: &str) {
    writer.write_str("Unknown command: \"");
    writer.write_str(name);
    writer.write_str("\". Write \"help\" for a list of available commands");
    writer.write_str(LINE_BREAK);
}

fn on_help(writer: &mut dyn CharWriter, bindings: &[CommandBinding], args: CommandArgs<'_>) {
    let tokens = args.tokens();
    let count = tokens.map_or(0, |t| t.count());

    let mut entries = core::iter::once((HELP_NAME, Some(HELP_TEXT)))
        .chain(bindings.iter().map(|b| (b.name, b.help)));

    match (count, tokens.and_then(|t| t.get(0))) {
        (0, _) => {
            for (name, help) in entries {
                writer.write_str(" * ");
                writer.write_str(name);
                writer.write_str(LINE_BREAK);
                if let Some(help) = help {
                    writer.write_char(b'\t');
                    writer.write_str(help);
                    writer.write_str(LINE_BREAK);
                }
            }
        }
        (1, Some(wanted)) => match entries.find(|(name, _)| *name == wanted) {
            Some((_, help)) => {
                writer.write_str(help.unwrap_or(HELP_UNAVAILABLE));
                writer.write_str(LINE_BREAK);
            }
            None => on_unknown_command(writer, wanted),
        },
        _ => {
            writer.write_str("Command \"help\" receives one or zero arguments");
            writer.write_str(LINE_BREAK);
        }
    }
}
