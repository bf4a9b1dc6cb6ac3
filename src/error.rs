// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The crate-wide error taxonomy.

use std::fmt;

/// Every failure mode the interpreter can produce, from grammar
/// compilation through dispatch, completion, and the pipe-suffix
/// subprocess plumbing.
#[derive(Debug)]
pub enum Error {
    /// A syntax string could not be parsed into tokens.
    GrammarSyntax(String),
    /// A `{` appeared while already inside a `(...)` group, or vice
    /// versa.
    GrammarNesting(String),
    /// The description list had fewer non-blank lines than tokens.
    GrammarDescMismatch,
    /// Tokenized line did not match any root command.
    NoMatch,
    /// Tokenizer produced no words at all (blank or pipe-only line).
    Invalid,
    /// Walk reached a valid node, but it has no bound handler.
    Incomplete,
    /// Two non-literal tokens matched the same word with equal
    /// precedence. Never actually produced by the matcher (resolved
    /// by insertion order instead), but the variant is kept so
    /// callers can match on it exhaustively.
    Ambiguous,
    /// More positional arguments were supplied than `Config::maxargc`.
    ExceedArgcMax,
    /// The options binder's converter rejected a matched value.
    BadArgument(String),
    /// A registered handler returned a non-zero status.
    HandlerFailed(i32),
    /// Host I/O failed (reading the session fd, writing the stream).
    Io(std::io::Error),
    /// A pipe-suffix regex failed to compile or a match failed.
    Regex(regex::Error),
    /// `fork(2)` failed.
    Fork(nix::errno::Errno),
    /// `pipe(2)` failed.
    Pipe(nix::errno::Errno),
    /// `waitpid(2)` failed, or the child exited abnormally.
    Wait(nix::errno::Errno),
    /// Some other system call in the pipe-suffix path failed.
    System(String),
}

impl Error {
    /// Renders the user-facing, lowercase-first message body used in
    /// the `%%`-prefixed error lines. Does not include the `%%`
    /// prefix or trailing `.` — callers format those per call site
    /// since the same error can appear standalone (logs) or in a
    /// user message.
    pub fn as_str(&self) -> std::borrow::Cow<'static, str> {
        use std::borrow::Cow;
        match self {
            Self::GrammarSyntax(s) => {
                Cow::Owned(format!("bad syntax near '{s}'"))
            }
            Self::GrammarNesting(s) => {
                Cow::Owned(format!("invalid nesting near '{s}'"))
            }
            Self::GrammarDescMismatch => {
                Cow::Borrowed("description line count does not match token count")
            }
            Self::NoMatch => Cow::Borrowed("unknown command"),
            Self::Invalid => Cow::Borrowed("invalid command"),
            Self::Incomplete => Cow::Borrowed("command incomplete"),
            Self::Ambiguous => Cow::Borrowed("ambiguous command"),
            Self::ExceedArgcMax => Cow::Borrowed("too many arguments"),
            Self::BadArgument(s) => Cow::Owned(format!("bad argument '{s}'")),
            Self::HandlerFailed(n) => {
                Cow::Owned(format!("command return error {n}"))
            }
            Self::Io(e) => Cow::Owned(e.to_string()),
            Self::Regex(e) => Cow::Owned(e.to_string()),
            Self::Fork(e) => Cow::Owned(format!("fork failed: {e}")),
            Self::Pipe(e) => Cow::Owned(format!("pipe failed: {e}")),
            Self::Wait(e) => Cow::Owned(format!("wait failed: {e}")),
            Self::System(s) => Cow::Owned(s.clone()),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Regex(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Self::Regex(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_as_str() {
        let e = Error::HandlerFailed(3);
        assert_eq!(e.to_string(), "command return error 3");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
