// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-dispatch handler context.
//!
//! The command tree is built once and may be shared read-only across
//! many sessions; the history ring and "please end this session"
//! signal are per-session. Built-in handlers (`list`, `show cmdtree`,
//! `show history`, `quit`, `exit`) need read access to both without
//! the tree closing over per-session state at registration time, so
//! [`Control`] borrows them fresh for the duration of one dispatch
//! call instead.

use crate::history::History;
use crate::tree::CommandTree;

/// Borrowed session context handed to every [`crate::tree::Handler`]
/// alongside the match frame and output stream.
pub struct Control<'a> {
    tree: &'a CommandTree,
    history: &'a History,
    quit: bool,
}

impl<'a> Control<'a> {
    pub fn new(tree: &'a CommandTree, history: &'a History) -> Self {
        Control { tree, history, quit: false }
    }

    pub fn tree(&self) -> &CommandTree {
        self.tree
    }

    pub fn history(&self) -> &History {
        self.history
    }

    /// Called by `quit`/`exit` to ask the session to end once this
    /// dispatch returns.
    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_starts_false() {
        let tree = CommandTree::new();
        let history = History::new(32);
        let control = Control::new(&tree, &history);
        assert!(!control.quit_requested());
    }

    #[test]
    fn request_quit_latches() {
        let tree = CommandTree::new();
        let history = History::new(32);
        let mut control = Control::new(&tree, &history);
        control.request_quit();
        assert!(control.quit_requested());
    }
}
