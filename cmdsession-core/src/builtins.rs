//! Built-in commands handled by the session without spawning a shell.
//!
//! - `cd [path]`: change the session directory
//! - `history`: list submitted commands, 1-indexed
//! - `clear`: drop all history
//!
//! Anything else goes to the shell untouched.

/// Characters that make a `cd` line shell syntax rather than the built-in form.
const SHELL_SYNTAX: &[char] = &[';', '&', '|', '<', '>', '`', '$', '\n'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Cd(String),
    History,
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType {
    Builtin(Builtin),
    Shell(String),
}

pub struct CommandParser;

impl CommandParser {
    pub fn parse(input: &str) -> CommandType {
        let trimmed = input.trim();

        match trimmed {
            "history" => return CommandType::Builtin(Builtin::History),
            "clear" => return CommandType::Builtin(Builtin::Clear),
            "cd" => return CommandType::Builtin(Builtin::Cd(String::new())),
            _ => {}
        }

        if let Some(rest) = trimmed.strip_prefix("cd") {
            // `cdrom` is not `cd rom`
            if rest.starts_with(char::is_whitespace) {
                let arg = rest.trim();
                if !arg.contains(SHELL_SYNTAX) {
                    return CommandType::Builtin(Builtin::Cd(unquote(arg).to_string()));
                }
            }
        }

        CommandType::Shell(input.to_string())
    }
}

/// Strip one pair of matching surrounding quotes.
fn unquote(arg: &str) -> &str {
    for quote in ['"', '\''] {
        if arg.len() >= 2 && arg.starts_with(quote) && arg.ends_with(quote) {
            return &arg[1..arg.len() - 1];
        }
    }
    arg
}

/// One entry per line, 1-indexed.
pub fn render_history(entries: &[String]) -> String {
    let mut out = String::new();
    for (i, cmd) in entries.iter().enumerate() {
        out.push_str(&format!("{:>5}  {}\n", i + 1, cmd));
    }
    out
}

/// Message for a `cd` target that is missing or not a directory.
pub fn no_such_directory(arg: &str) -> String {
    let shown = if arg.is_empty() { "~" } else { arg };
    format!("{}: no such directory", shown)
}
