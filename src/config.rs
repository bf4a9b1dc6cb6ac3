// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunable knobs.
//!
//! The reference implementation hard-codes these as C `#define`s.
//! Here they become [`Config`] fields, defaulted to the reference's
//! own values.

/// Default value of [`Config::maxargc`] (MAXARGC in the reference).
pub const DEFAULT_MAXARGC: usize = 64;
/// Default value of [`Config::max_history`] (MAXHIST in the reference).
pub const DEFAULT_MAX_HISTORY: usize = 32;
/// Default value of [`Config::chunk_size`].
pub const DEFAULT_CHUNK_SIZE: usize = 4096;
/// Default value of [`Config::line_capacity`].
pub const DEFAULT_LINE_CAPACITY: usize = 8192;
/// Prompt session name used when [`Config::session_name`] is empty
/// or unset.
pub const DEFAULT_SESSION_NAME: &str = "Chaconne";

// Pin the reference implementation's own MAXARGC/MAXHIST/chunk/line-buf
// values at compile time so a future edit here can't silently drift
// from them without the build failing.
static_assertions::const_assert_eq!(DEFAULT_MAXARGC, 64);
static_assertions::const_assert_eq!(DEFAULT_MAX_HISTORY, 32);
static_assertions::const_assert_eq!(DEFAULT_CHUNK_SIZE, 4096);
static_assertions::const_assert_eq!(DEFAULT_LINE_CAPACITY, 8192);

/// Construction-time knobs for a [`crate::session::Session`].
///
/// Every field defaults to the reference implementation's hard-coded
/// constant; override only the ones a particular host needs to
/// change.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of positional arguments a single dispatch may
    /// accumulate.
    pub maxargc: usize,
    /// Capacity of the history ring.
    pub max_history: usize,
    /// Size in bytes of one output-stream chunk.
    pub chunk_size: usize,
    /// Capacity in bytes of the line edit buffer.
    pub line_capacity: usize,
    /// Prompt prefix; renders as `<session_name> > `. Empty string
    /// falls back to [`DEFAULT_SESSION_NAME`] at prompt-render time.
    pub session_name: String,
    /// Negotiate WILL-ECHO / WILL-SUPPRESS-GO-AHEAD / DONT-LINEMODE
    /// telnet options at session start. Meaningless on a bare
    /// UART or stdin/stdout pair.
    pub telnet_negotiate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            maxargc: DEFAULT_MAXARGC,
            max_history: DEFAULT_MAX_HISTORY,
            chunk_size: DEFAULT_CHUNK_SIZE,
            line_capacity: DEFAULT_LINE_CAPACITY,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            telnet_negotiate: false,
        }
    }
}

impl Config {
    /// The prompt text written at session start and after every
    /// dispatched line: `<session-name> > `.
    pub fn prompt(&self) -> String {
        let name = if self.session_name.is_empty() {
            DEFAULT_SESSION_NAME
        } else {
            self.session_name.as_str()
        };
        format!("{name} > ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_uses_chaconne() {
        let cfg = Config::default();
        assert_eq!(cfg.prompt(), "Chaconne > ");
    }

    #[test]
    fn empty_session_name_falls_back() {
        let mut cfg = Config::default();
        cfg.session_name.clear();
        assert_eq!(cfg.prompt(), "Chaconne > ");
    }

    #[test]
    fn custom_session_name() {
        let cfg = Config { session_name: "switch0".into(), ..Config::default() };
        assert_eq!(cfg.prompt(), "switch0 > ");
    }
}
