//! LED commands. Handlers only signal; the LED task drives the pin.

use cli_core::{BindingContext, CliOutput, CommandArgs, CommandBinding};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Requested LED change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum LedCommand {
    On,
    Off,
    Toggle,
}

/// Latest LED request wins.
pub type LedSignal = Signal<CriticalSectionRawMutex, LedCommand>;

/// `led` binding, signalling `signal`.
pub fn led_bindings(signal: &'static LedSignal) -> [CommandBinding; 1] {
    [CommandBinding::new("led", led)
        .with_help("Drive the on-board LED\r\n\tled on|off|toggle")
        .tokenized()
        .with_context(signal)]
}

fn led(cli: &mut CliOutput<'_>, args: CommandArgs<'_>, context: BindingContext) {
    let Some(signal) = context.and_then(|c| c.downcast_ref::<LedSignal>()) else {
        return;
    };
    let command = match args.tokens().and_then(|t| t.get(0)) {
        Some("on") => LedCommand::On,
        Some("off") => LedCommand::Off,
        Some("toggle") | None => LedCommand::Toggle,
        Some(_) => {
            cli.print("usage: led on|off|toggle");
            return;
        }
    };
    signal.signal(command);
}
