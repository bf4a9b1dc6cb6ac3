// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pipe-suffix post-processing: `| include <regex>` drains the
//! stream through [`crate::stream::Stream::flush_with_regex`]; a bare
//! `| <shell command>` forks a child running `/bin/sh -c <cmd>`,
//! feeds it the buffered output on its stdin, and copies its merged
//! stdout/stderr back to the terminal descriptor.

use crate::error::{Error, Result};
use crate::matcher::PipeSuffix;
use crate::stream::Stream;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, fork, pipe, read, write, ForkResult};
use std::ffi::CString;
use std::io::Write as _;
use std::os::fd::{AsRawFd, OwnedFd};

/// Applies a pipe suffix to the accumulated `stream`, writing the
/// result to `term`.
pub fn apply(stream: &mut Stream, suffix: &PipeSuffix, term: &mut impl std::io::Write) -> Result<()> {
    match suffix {
        PipeSuffix::Include(pattern) => stream.flush_with_regex(term, pattern),
        PipeSuffix::Shell(cmd) => run_shell(stream, cmd, term),
    }
}

/// Runs `cmd` under `/bin/sh -c` with no stdin and its merged
/// stdout/stderr captured into `out`.
/// Shares `run_shell`'s fork/exec plumbing; the child's stdin is
/// closed immediately since an empty [`Stream`] has nothing to feed.
pub fn system(cmd: &str, out: &mut Stream) -> Result<()> {
    let mut empty = Stream::default();
    run_shell(&mut empty, cmd, out)
}

/// Forks `/bin/sh -c <cmd>` with its stdin fed from `stream` and its
/// stdout/stderr merged onto one pipe read by the parent and copied
/// to `term`. The child is reaped with `waitpid` before
/// returning.
fn run_shell(stream: &mut Stream, cmd: &str, term: &mut impl std::io::Write) -> Result<()> {
    let (in_read, in_write) = pipe().map_err(Error::Pipe)?;
    let (out_read, out_write) = pipe().map_err(Error::Pipe)?;

    // SAFETY: single-threaded process at the point pipe suffixes are
    // dispatched; the child immediately execs or exits, touching
    // no Rust-managed allocator state beyond the fds it inherits.
    match unsafe { fork() }.map_err(Error::Fork)? {
        ForkResult::Child => {
            // Never returns; any failure here exits the child directly
            // so the parent's `waitpid` still observes a clean exit.
            child_exec(in_read, in_write, out_read, out_write, cmd)
        }
        ForkResult::Parent { child } => {
            drop(in_read);
            drop(out_write);
            let write_err = feed_stdin(in_write, stream);
            let copy_err = copy_stdout(out_read, term);
            let status = waitpid(child, None).map_err(Error::Wait)?;
            write_err?;
            copy_err?;
            if let WaitStatus::Signaled(_, signal, _) = status {
                return Err(Error::System(format!("child killed by signal {signal}")));
            }
            Ok(())
        }
    }
}

/// Runs in the forked child only: wires up stdio and execs `/bin/sh
/// -c <cmd>`. Diverges via `execv` on success or `std::process::exit`
/// on failure, so the return type is `!` in spirit (kept as
/// `Result<()>` so `run_shell` stays a single match arm type).
fn child_exec(
    in_read: OwnedFd,
    in_write: OwnedFd,
    out_read: OwnedFd,
    out_write: OwnedFd,
    cmd: &str,
) -> Result<()> {
    drop(in_write);
    drop(out_read);
    let _ = dup2(in_read.as_raw_fd(), 0);
    let _ = dup2(out_write.as_raw_fd(), 1);
    let _ = dup2(out_write.as_raw_fd(), 2);
    drop(in_read);
    drop(out_write);

    let Ok(shell) = CString::new("/bin/sh") else { std::process::exit(127) };
    let Ok(flag) = CString::new("-c") else { std::process::exit(127) };
    let Ok(arg) = CString::new(cmd) else { std::process::exit(127) };
    let argv = [shell.clone(), flag, arg];
    let _ = nix::unistd::execv(&shell, &argv);
    // execv only returns on error.
    std::process::exit(127)
}

/// Writes the entire buffered stream to the child's stdin pipe, then
/// closes it so the child sees EOF, retrying on `EINTR`.
fn feed_stdin(fd: OwnedFd, stream: &mut Stream) -> Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.get(&mut buf);
        if n == 0 {
            break;
        }
        let mut off = 0;
        while off < n {
            match write(&fd, &buf[off..n]) {
                Ok(w) => off += w,
                Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return Err(Error::System(format!("write to child stdin: {e}"))),
            }
        }
    }
    drop(fd);
    Ok(())
}

/// Copies the child's merged stdout/stderr pipe to `term` until EOF
///, retrying reads on `EINTR` and surfacing any other error as
/// `Error::System`.
fn copy_stdout(fd: OwnedFd, term: &mut impl std::io::Write) -> Result<()> {
    let mut buf = [0u8; 4096];
    loop {
        match read(&fd, &mut buf) {
            Ok(0) => break,
            Ok(n) => term.write_all(&buf[..n])?,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(Error::System(format!("read from child stdout: {e}"))),
        }
    }
    drop(fd);
    Ok(())
}
