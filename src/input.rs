use std::{
    fs::create_dir_all,
    io::{self, BufRead, Write},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use nix::sys::signal::{raise, Signal as OsSignal};
use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, DefaultHinter, EditCommand, Emacs, FileBackedHistory, KeyCode,
    KeyModifiers, Keybindings, Reedline, ReedlineEvent, Signal,
};

use crate::{config, config::Config, prompt::ShellPrompt};

const HISTORY_SIZE: usize = 6000;

// Host command emitted for Ctrl-Z. The NUL byte keeps it from colliding with
// anything a user can type.
const SUSPEND_REQUEST: &str = "\0suspend";

/// Emacs bindings plus Ctrl-C to clear the line and Ctrl-Z to suspend.
fn keybindings() -> Keybindings {
    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::CONTROL,
        KeyCode::Char('c'),
        ReedlineEvent::Edit(vec![EditCommand::Clear]),
    );
    // Raw mode swallows the terminal's SIGTSTP, so ask for it explicitly.
    keybindings.add_binding(
        KeyModifiers::CONTROL,
        KeyCode::Char('z'),
        ReedlineEvent::ExecuteHostCommand(SUSPEND_REQUEST.to_string()),
    );
    keybindings
}

/// Where command lines come from. `None` marks end of input.
pub trait LineSource {
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// Line editor for interactive terminals.
pub struct Interactive {
    editor: Reedline,
    prompt: ShellPrompt,
}

impl Interactive {
    pub fn new(cfg: &Config) -> Self {
        let mut editor = Reedline::create()
            .with_hinter(Box::new(
                DefaultHinter::default()
                    .with_style(Style::new().italic().fg(Color::DarkGray))
                    .with_min_chars(1),
            ))
            .with_edit_mode(Box::new(Emacs::new(keybindings())));

        if cfg.history {
            if let Some(path) = config::history_file_path() {
                if let Some(parent) = path.parent() {
                    let _ = create_dir_all(parent);
                }
                match FileBackedHistory::with_file(HISTORY_SIZE, path) {
                    Ok(history) => editor = editor.with_history(Box::new(history)),
                    Err(e) => warn!("history disabled: {e}"),
                }
            }
        }

        Self {
            editor,
            prompt: ShellPrompt::new(cfg),
        }
    }
}

impl LineSource for Interactive {
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            match self.editor.read_line(&self.prompt).context("reading input")? {
                Signal::Success(buf) if buf == SUSPEND_REQUEST => {
                    debug!("suspend requested at the prompt");
                    // The interpreter's SIGTSTP handler toggles foreground-only mode.
                    raise(OsSignal::SIGTSTP).context("raising SIGTSTP")?;
                }
                Signal::Success(buf) => return Ok(Some(buf)),
                Signal::CtrlD => return Ok(None),
                _ => continue,
            }
        }
    }
}

/// Plain buffered reader for pipes and files; echoes the prompt to stdout.
pub struct Piped<R> {
    reader: R,
    prompt: String,
}

impl<R: BufRead> Piped<R> {
    pub fn new(reader: R, prompt: &str) -> Self {
        Self {
            reader,
            prompt: prompt.to_string(),
        }
    }
}

impl<R: BufRead> LineSource for Piped<R> {
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", self.prompt)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("reading input")?;
        Ok((read > 0).then_some(line))
    }
}
