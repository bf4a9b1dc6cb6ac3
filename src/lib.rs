// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An embeddable interactive command-line interpreter for
//! network-device-style CLIs: a REPL that presents a prompt, edits a
//! single input line with emacs-style keybindings, maintains a
//! command history, and dispatches typed lines against a tree of
//! registered commands.
//!
//! Consumers build a [`grammar::CommandRegistry`], register their
//! commands (plus whatever [`builtins::register`] adds), compile it
//! into a [`tree::CommandTree`], and drive one [`session::Session`]
//! per connection by feeding it bytes and draining its pending
//! output.

mod builtins;
pub mod complete;
pub mod config;
pub mod control;
pub mod editor;
pub mod error;
pub mod frame;
pub mod grammar;
pub mod history;
pub mod matcher;
pub mod options;
pub mod pipe;
pub mod session;
pub mod stream;
pub mod token;
pub mod tree;

pub use builtins::register as register_builtins;
pub use config::Config;
pub use error::{Error, Result};
pub use session::Session;
pub use tree::CommandTree;
