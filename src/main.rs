mod builtins;
mod config;
mod error;
mod expand;
mod input;
mod parse;
mod process_exec;
mod prompt;
mod redirect;
mod registry;
mod shell;
mod signals;
mod status;

use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::{
    input::{Interactive, LineSource, Piped},
    shell::{Flow, Shell},
    signals::SignalPolicy,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("smallsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Blank lines and `#` comments are skipped without running anything.
fn is_ignored(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#')
}

fn run() -> Result<u8> {
    // [1] Load configuration
    let cfg = config::init();
    debug!("configuration: {cfg:?}");

    // [2] Interpreter signal dispositions
    let policy = SignalPolicy::install().context("installing signal handlers")?;

    // [3] Line acquisition
    let mut source: Box<dyn LineSource> = if io::stdin().is_terminal() {
        Box::new(Interactive::new(&cfg))
    } else {
        Box::new(Piped::new(io::stdin().lock(), &cfg.prompt))
    };

    let mut shell = Shell::new(&cfg, policy, io::stdout());

    // [4] Main loop
    loop {
        let Some(line) = source.read_line()? else {
            debug!("end of input");
            shell.shutdown();
            return Ok(0);
        };

        if line.len() > cfg.max_line_length {
            eprintln!("input too long ({} > {} bytes)", line.len(), cfg.max_line_length);
        } else if !is_ignored(&line) {
            match shell.execute(&line) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Exit(code)) => {
                    shell.shutdown();
                    return Ok(u8::try_from(code).unwrap_or_else(|_| {
                        warn!("exit code {code} out of range");
                        1
                    }));
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => eprintln!("{e}"),
            }
        }

        shell.sweep();
    }
}
