// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal host loop over stdin/stdout: puts the terminal in raw mode,
//! feeds `clish` one byte at a time, and drains its pending output
//! after every byte. Demonstrates the host interface; not part of
//! the library itself.

use clish::config::Config;
use clish::grammar::CommandRegistry;
use clish::options::{integer, Binder};
use clish::{register_builtins, Session};
use nix::sys::termios::{self, SetArg};
use std::io::{Read, Write};
use std::os::fd::AsFd;
use std::sync::Arc;

#[derive(Default)]
struct EchoOpts {
    count: i64,
}

fn build_tree() -> Arc<clish::CommandTree> {
    let mut reg = CommandRegistry::new();
    register_builtins(&mut reg);
    let binder = Binder::<EchoOpts>::new()
        .keyword("count", |o, s| integer(&mut o.count, s))
        .erase();
    reg.register_with_binder(
        "echo {count COUNT} .WORDS",
        "echo\nrepeat the echoed line this many times\nhow many times\nwords to print",
        Arc::new(|frame, bound, out, _control| {
            let repeat = bound
                .and_then(|b| b.downcast_ref::<EchoOpts>())
                .map(|o| o.count.max(1))
                .unwrap_or(1);
            let line = frame.argv().join(" ");
            for _ in 0..repeat {
                out.write_fmt_line(format_args!("{line}\r\n"));
            }
            Ok(0)
        }),
        binder,
    );
    let (tree, failures) = reg.compile();
    for (syntax, err) in &failures {
        log::warn!("command '{syntax}' failed to compile: {err}");
    }
    Arc::new(tree)
}

fn main() -> std::io::Result<()> {
    env_logger::init();

    let stdin = std::io::stdin();
    let original = termios::tcgetattr(stdin.as_fd()).ok();
    if let Some(orig) = &original {
        let mut raw = orig.clone();
        termios::cfmakeraw(&mut raw);
        let _ = termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &raw);
    }

    let mut session = Session::new(Config::default(), build_tree());
    session.alias("ll", "show cmdtree");

    let mut stdout = std::io::stdout();
    flush_pending(&mut session, &mut stdout)?;

    let mut byte = [0u8; 1];
    let mut stdin_lock = stdin.lock();
    loop {
        if stdin_lock.read(&mut byte)? == 0 {
            break;
        }
        if session.feed_byte(byte[0]).is_err() {
            break;
        }
        flush_pending(&mut session, &mut stdout)?;
        if session.has_quit() {
            break;
        }
    }

    if let Some(orig) = &original {
        let _ = termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, orig);
    }
    Ok(())
}

fn flush_pending(session: &mut Session, out: &mut impl Write) -> std::io::Result<()> {
    session.pending().flush(out).map(|_| ()).map_err(std::io::Error::other)
}
