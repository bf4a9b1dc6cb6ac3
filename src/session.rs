// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The host-facing session: wires the line editor, history,
//! command tree, and output stream together into the "feed bytes in,
//! drain bytes out" interface a host event loop drives.

use crate::complete::{self, Completion};
use crate::config::Config;
use crate::control::Control;
use crate::editor::{Action, LineEditor};
use crate::error::Result;
use crate::history::History;
use crate::matcher;
use crate::pipe;
use crate::stream::Stream;
use crate::tree::CommandTree;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

const BS: u8 = 0x08;

/// The three IAC option-negotiation sequences sent once at session
/// start when `Config::telnet_negotiate` is set: WILL-ECHO,
/// WILL-SUPPRESS-GO-AHEAD, DONT-LINEMODE.
const TELNET_NEGOTIATION: [u8; 9] = [255, 251, 1, 255, 251, 3, 255, 254, 34];

/// One interactive session over one byte stream. The tree is shared, read-only,
/// across every session built from it; history, the edit buffer, and
/// the output stream are this session's alone.
pub struct Session {
    config: Config,
    tree: Arc<CommandTree>,
    history: RefCell<History>,
    editor: LineEditor,
    out: Stream,
    aliases: HashMap<String, String>,
    quit: bool,
}

impl Session {
    pub fn new(config: Config, tree: Arc<CommandTree>) -> Self {
        log::debug!("session open, prompt '{}'", config.prompt());
        let history = RefCell::new(History::new(config.max_history));
        let editor = LineEditor::new(config.line_capacity);
        let mut out = Stream::new(config.chunk_size);
        if config.telnet_negotiate {
            out.put(&TELNET_NEGOTIATION);
        }
        out.put(config.prompt().as_bytes());
        Session { config, tree, history, editor, out, aliases: HashMap::new(), quit: false }
    }

    /// Like [`Session::new`], but also sets `telnet_negotiate` so the
    /// negotiation sequence is emitted at construction — meaningless
    /// over a bare UART or stdin/stdout pair, hence feature-gated.
    #[cfg(feature = "telnet")]
    pub fn new_telnet(mut config: Config, tree: Arc<CommandTree>) -> Self {
        config.telnet_negotiate = true;
        Self::new(config, tree)
    }

    /// Registers a short alias consulted before the first tokenized
    /// word is matched against the tree, e.g.
    /// `session.alias("ll", "show cmdtree")`.
    pub fn alias(&mut self, short: impl Into<String>, expansion: impl Into<String>) {
        self.aliases.insert(short.into(), expansion.into());
    }

    fn expand_aliases(&self, line: &str) -> String {
        let mut words = line.splitn(2, char::is_whitespace);
        let Some(first) = words.next() else { return line.to_string() };
        match self.aliases.get(first) {
            Some(expansion) => match words.next() {
                Some(rest) if !rest.is_empty() => format!("{expansion} {rest}"),
                _ => expansion.clone(),
            },
            None => line.to_string(),
        }
    }

    /// Feeds one raw input byte, driving the line editor and, on a line
    /// terminator, dispatching the completed line.
    pub fn feed_byte(&mut self, byte: u8) -> Result<()> {
        let action = {
            let history = &self.history;
            self.editor.feed(
                byte,
                || history.borrow_mut().previous().map(str::to_string),
                || history.borrow_mut().next().map(str::to_string),
            )
        };
        self.apply_action(action)
    }

    fn apply_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::None => {}
            Action::Redraw(bytes) => self.out.put(&bytes),
            Action::Replace { backspaces, text, pad } => {
                self.emit_replace(backspaces, &text, pad)
            }
            Action::Complete { line } => self.apply_complete(&line)?,
            Action::Describe { line } => self.apply_describe(&line)?,
            Action::Execute { line } => self.execute_line(&line)?,
        }
        Ok(())
    }

    fn emit_replace(&mut self, backspaces: usize, text: &str, pad: usize) {
        for _ in 0..backspaces {
            self.out.putc(BS);
        }
        self.out.put(text.as_bytes());
        for _ in 0..pad {
            self.out.putc(b' ');
        }
        for _ in 0..pad {
            self.out.putc(BS);
        }
    }

    fn apply_complete(&mut self, line: &str) -> Result<()> {
        match complete::complete(&self.tree, line)? {
            Completion::NoMatch => {}
            Completion::FullMatch(key) => {
                let action = self.editor.replace_last_word(&key, true);
                self.apply_action(action)?;
            }
            Completion::Match(lcp) => {
                let action = self.editor.replace_last_word(&lcp, false);
                self.apply_action(action)?;
            }
            Completion::ListMatch(keys) => {
                self.out.put(b"\r\n");
                self.out.write_fmt_line(format_args!("{}\r\n", keys.join("  ")));
                self.reprint_prompt_and_line();
            }
        }
        Ok(())
    }

    fn apply_describe(&mut self, line: &str) -> Result<()> {
        let described = complete::describe(&self.tree, line)?;
        self.out.put(b"\r\n");
        self.out.put(complete::render_describe(&described).as_bytes());
        self.reprint_prompt_and_line();
        Ok(())
    }

    fn reprint_prompt_and_line(&mut self) {
        self.out.put(self.config.prompt().as_bytes());
        self.out.put(self.editor.line().as_bytes());
    }

    /// Dispatches one complete typed line.
    fn execute_line(&mut self, line: &str) -> Result<()> {
        self.out.put(b"\r\n");
        self.history.borrow_mut().add(line);

        if !line.trim().is_empty() {
            let (head, suffix) = matcher::split_pipe(line);
            let expanded = self.expand_aliases(head.trim());
            let mut cmd_out = Stream::new(self.config.chunk_size);

            let quit = {
                let history = self.history.borrow();
                let mut control = Control::new(&self.tree, &history);
                let result = matcher::dispatch(
                    &self.tree,
                    &expanded,
                    self.config.maxargc,
                    &mut cmd_out,
                    &mut control,
                );
                if let Err(e) = result {
                    cmd_out.put(matcher::error_message(&e, &expanded).as_bytes());
                }
                control.quit_requested()
            };

            match suffix {
                Some(s) => pipe::apply(&mut cmd_out, &s, &mut self.out)?,
                None => {
                    cmd_out.flush(&mut self.out)?;
                }
            }
            if quit {
                self.quit = true;
            }
        }

        if !self.quit {
            self.out.put(self.config.prompt().as_bytes());
        }
        Ok(())
    }

    /// The output stream the host drains whenever the session's
    /// descriptor is writable.
    pub fn pending(&mut self) -> &mut Stream {
        &mut self.out
    }

    /// `true` once `quit`/`exit` has ended this session.
    pub fn has_quit(&self) -> bool {
        self.quit
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        log::debug!("session close");
    }
}
