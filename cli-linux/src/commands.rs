//! Demo command handlers.

use crate::Service;
use cli_core::{BindingContext, CliOutput, CommandArgs, CommandBinding};
use core::fmt::Write;
use core::sync::atomic::{AtomicU32, Ordering};

static GREETINGS: AtomicU32 = AtomicU32::new(0);

/// Bindings registered once the CLI is active.
pub fn bindings(service: &'static Service) -> [CommandBinding; 4] {
    [
        CommandBinding::new("echo", echo).with_help("Print the rest of the line"),
        CommandBinding::new("add", add)
            .with_help("Sum integer arguments\r\n\tadd <a> <b> ...")
            .tokenized(),
        CommandBinding::new("hello", hello)
            .with_help("Greet and count greetings")
            .with_context(&GREETINGS),
        CommandBinding::new("exit", exit)
            .with_help("Stop the CLI and quit")
            .with_context(service),
    ]
}

fn echo(cli: &mut CliOutput<'_>, args: CommandArgs<'_>, _context: BindingContext) {
    cli.print(args.raw().unwrap_or_default());
}

fn add(cli: &mut CliOutput<'_>, args: CommandArgs<'_>, _context: BindingContext) {
    let Some(tokens) = args.tokens() else {
        return;
    };
    let mut sum: i64 = 0;
    for token in tokens.iter() {
        match token.parse::<i64>() {
            Ok(value) => sum = sum.saturating_add(value),
            Err(_) => {
                let _ = write!(cli, "not a number: {}", token);
                cli.print("");
                return;
            }
        }
    }
    let _ = write!(cli, "{}", sum);
    cli.print("");
}

fn hello(cli: &mut CliOutput<'_>, _args: CommandArgs<'_>, context: BindingContext) {
    let Some(counter) = context.and_then(|c| c.downcast_ref::<AtomicU32>()) else {
        return;
    };
    let count = counter.fetch_add(1, Ordering::Relaxed) + 1;
    let _ = write!(cli, "hello #{}", count);
    cli.print("");
}

fn exit(cli: &mut CliOutput<'_>, _args: CommandArgs<'_>, context: BindingContext) {
    if let Some(service) = context.and_then(|c| c.downcast_ref::<Service>()) {
        cli.print("bye");
        service.end_cli_async();
    }
}
