use log::debug;

use crate::{error::ParseError, expand::Expander};

/// Trailing token requesting background execution.
pub const BACKGROUND_MARKER: char = '&';

/// One parsed invocation: `program [arg]* [< input] [> output] [&]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub program: String,
    /// Arguments after the program name, redirections removed.
    pub args: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub background: bool,
}

impl Command {
    /// Full argument vector as handed to `exec`: program name first.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RedirectType {
    Stdin,  // <
    Stdout, // >
}

static REDIRECTS: &[(&str, RedirectType)] = &[
    ("<", RedirectType::Stdin),
    (">", RedirectType::Stdout),
];

fn redirect_of(token: &str) -> Option<(&'static str, RedirectType)> {
    REDIRECTS
        .iter()
        .find(|(op, _)| *op == token)
        .map(|(op, kind)| (*op, *kind))
}

/// Parses one non-empty, non-comment line.
///
/// The program token is taken verbatim; every later token goes through the
/// expander before it is classified, so `$$` can never turn into an operator.
pub fn parse_line(line: &str, expander: &Expander) -> Result<Command, ParseError> {
    let mut line = line.strip_suffix('\n').unwrap_or(line);
    line = line.strip_suffix('\r').unwrap_or(line);

    let mut body = line.trim_end();
    let background = body.ends_with(BACKGROUND_MARKER);
    if background {
        body = &body[..body.len() - BACKGROUND_MARKER.len_utf8()];
    }

    let mut tokens = body.split_whitespace();
    let program = tokens.next().ok_or(ParseError::EmptyCommand)?.to_string();

    let mut command = Command {
        program,
        args: Vec::new(),
        input: None,
        output: None,
        background,
    };

    while let Some(raw) = tokens.next() {
        let token = expander.expand(raw);
        match redirect_of(&token) {
            Some((operator, kind)) => {
                let target = tokens
                    .next()
                    .map(|raw| expander.expand(raw))
                    .ok_or(ParseError::MissingRedirectTarget { operator })?;
                match kind {
                    RedirectType::Stdin => command.input = Some(target),
                    RedirectType::Stdout => command.output = Some(target),
                }
            }
            None => command.args.push(token),
        }
    }

    debug!("parsed {command:?}");
    Ok(command)
}
