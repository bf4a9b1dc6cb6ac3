// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The always-present CLI surface: `list`, `quit`, `exit`,
//! `show {history|cmdtree}`, `system .ARGS`. Registered into every
//! [`crate::session::Session`] alongside whatever a consumer adds of
//! its own.

use crate::error::Result;
use crate::grammar::CommandRegistry;
use crate::pipe;
use std::sync::Arc;

/// EOT, written before `quit` ends the session.
const EOT: u8 = 0x04;

pub fn register(reg: &mut CommandRegistry) {
    reg.register(
        "list",
        "print all registered command syntax strings",
        Arc::new(|_frame, _bound, out, control| {
            for syntax in control.tree().syntaxes() {
                out.write_fmt_line(format_args!("{syntax}\r\n"));
            }
            Ok(0)
        }),
    );

    reg.register(
        "quit",
        "emit EOT and terminate the session",
        Arc::new(|_frame, _bound, out, control| {
            out.putc(EOT);
            control.request_quit();
            Ok(0)
        }),
    );

    reg.register(
        "exit",
        "terminate the session",
        Arc::new(|_frame, _bound, _out, control| {
            control.request_quit();
            Ok(0)
        }),
    );

    reg.register(
        "show {history|cmdtree}",
        "show\nprint command history\nprint the compiled command tree",
        Arc::new(|frame, _bound, out, control| {
            if frame.has_keyword("history") {
                for line in control.history().iter() {
                    out.write_fmt_line(format_args!("{line}\r\n"));
                }
            } else if frame.has_keyword("cmdtree") {
                out.put(control.tree().dump().as_bytes());
            }
            Ok(0)
        }),
    );

    reg.register(
        "system .ARGS",
        "system\narguments",
        Arc::new(|frame, _bound, out, _control| {
            let cmd = frame.argv().join(" ");
            system(&cmd, out)?;
            Ok(0)
        }),
    );
}

fn system(cmd: &str, out: &mut crate::stream::Stream) -> Result<()> {
    pipe::system(cmd, out)
}
