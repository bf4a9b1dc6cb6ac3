// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output stream: a chain of fixed-size
//! chunks with a vectored flush, plus a regex-filtered flush used by
//! `| include <pattern>`.

use crate::error::Result;
use regex::Regex;
use std::collections::VecDeque;
use std::io::{IoSlice, Write};

const DEFAULT_CHUNK_SIZE: usize = 4096;

struct Chunk {
    buf: Vec<u8>,
    /// Offset of the next unflushed byte.
    tail: usize,
}

impl Chunk {
    fn new(cap: usize) -> Self {
        Chunk { buf: Vec::with_capacity(cap), tail: 0 }
    }

    fn unflushed(&self) -> &[u8] {
        &self.buf[self.tail..]
    }
}

/// A growable, chunked byte buffer that accumulates a command's
/// output until the dispatcher decides how to route it: straight to
/// the session's file descriptor, through a regex filter, or into a
/// child process's stdin.
pub struct Stream {
    chunks: VecDeque<Chunk>,
    chunk_size: usize,
}

impl Stream {
    pub fn new(chunk_size: usize) -> Self {
        Stream { chunks: VecDeque::new(), chunk_size }
    }

    fn last_chunk_with_room(&mut self) -> &mut Chunk {
        let need_new = match self.chunks.back() {
            Some(c) => c.buf.len() >= self.chunk_size,
            None => true,
        };
        if need_new {
            self.chunks.push_back(Chunk::new(self.chunk_size));
        }
        self.chunks.back_mut().expect("just pushed")
    }

    /// Appends `bytes`, splitting across as many chunks as needed.
    pub fn put(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let chunk = self.last_chunk_with_room();
            let room = self.chunk_size - chunk.buf.len();
            let take = room.min(bytes.len());
            chunk.buf.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
        }
    }

    pub fn putc(&mut self, byte: u8) {
        self.put(&[byte]);
    }

    /// Writes CRLF-terminated formatted text, analogous to the
    /// reference's stack-scratch `printf` (Rust's `format!` already
    /// handles the grow-on-overflow case the reference calls out).
    pub fn write_fmt_line(&mut self, args: std::fmt::Arguments<'_>) {
        let text = std::fmt::format(args);
        self.put(text.as_bytes());
    }

    /// Number of unflushed bytes currently buffered.
    pub fn ndata(&self) -> usize {
        self.chunks.iter().map(|c| c.unflushed().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ndata() == 0
    }

    /// Consumes up to `n` bytes into `dst`, returning the number
    /// copied.
    pub fn get(&mut self, dst: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dst.len() {
            let Some(chunk) = self.chunks.front_mut() else { break };
            let avail = chunk.unflushed();
            if avail.is_empty() {
                self.chunks.pop_front();
                continue;
            }
            let take = avail.len().min(dst.len() - copied);
            dst[copied..copied + take].copy_from_slice(&avail[..take]);
            chunk.tail += take;
            copied += take;
        }
        self.drop_drained();
        copied
    }

    fn drop_drained(&mut self) {
        while let Some(front) = self.chunks.front() {
            if front.tail >= front.buf.len() {
                self.chunks.pop_front();
            } else {
                break;
            }
        }
    }

    /// Issues one vectored write of every unflushed chunk to `w`,
    /// then drains exactly the number of bytes the writer accepted.
    /// Loops until the whole stream is flushed or the writer errors.
    pub fn flush<W: Write>(&mut self, w: &mut W) -> Result<usize> {
        let mut total = 0;
        while !self.is_empty() {
            let slices: Vec<IoSlice<'_>> =
                self.chunks.iter().map(|c| IoSlice::new(c.unflushed())).collect();
            if slices.is_empty() {
                break;
            }
            let n = w.write_vectored(&slices)?;
            if n == 0 {
                break;
            }
            self.consume(n);
            total += n;
        }
        Ok(total)
    }

    fn consume(&mut self, mut n: usize) {
        while n > 0 {
            let Some(chunk) = self.chunks.front_mut() else { break };
            let avail = chunk.unflushed().len();
            let take = avail.min(n);
            chunk.tail += take;
            n -= take;
        }
        self.drop_drained();
    }

    /// Drains the stream line-by-line (split on CR/LF), writing only
    /// the lines that match `pattern`, each followed by CRLF. On a regex compile error,
    /// the failure is written to `w` instead and the stream is still
    /// fully drained.
    pub fn flush_with_regex<W: Write>(&mut self, w: &mut W, pattern: &str) -> Result<()> {
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                writeln!(w, "%% Bad regular expression '{pattern}': {e}\r")?;
                self.drain_to_nowhere();
                return Ok(());
            }
        };
        let mut line = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            if self.get(&mut byte) == 0 {
                break;
            }
            match byte[0] {
                b'\r' | b'\n' => {
                    if !line.is_empty() {
                        if let Ok(text) = std::str::from_utf8(&line) {
                            if re.is_match(text) {
                                w.write_all(text.as_bytes())?;
                                w.write_all(b"\r\n")?;
                            }
                        }
                        line.clear();
                    }
                }
                b => line.push(b),
            }
        }
        if !line.is_empty() {
            if let Ok(text) = std::str::from_utf8(&line) {
                if re.is_match(text) {
                    w.write_all(text.as_bytes())?;
                    w.write_all(b"\r\n")?;
                }
            }
        }
        Ok(())
    }

    fn drain_to_nowhere(&mut self) {
        self.chunks.clear();
    }
}

impl Default for Stream {
    fn default() -> Self {
        Stream::new(DEFAULT_CHUNK_SIZE)
    }
}

/// Lets a [`Stream`] stand in as the `term: &mut impl Write` target
/// handlers and [`crate::pipe::apply`] write to, so command output and
/// piped-through subprocess output land in the same accumulator before
/// the session flushes it.
impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.put(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_ndata() {
        let mut s = Stream::new(8);
        s.put(b"hello world");
        assert_eq!(s.ndata(), 11);
    }

    #[test]
    fn get_drains_across_chunks() {
        let mut s = Stream::new(4);
        s.put(b"abcdefgh");
        let mut buf = [0u8; 8];
        let n = s.get(&mut buf);
        assert_eq!(n, 8);
        assert_eq!(&buf, b"abcdefgh");
        assert_eq!(s.ndata(), 0);
    }

    #[test]
    fn flush_writes_everything() {
        let mut s = Stream::new(4);
        s.put(b"0123456789");
        let mut out = Vec::new();
        let n = s.flush(&mut out).unwrap();
        assert_eq!(n, 10);
        assert_eq!(out, b"0123456789");
        assert!(s.is_empty());
    }

    #[test]
    fn regex_filter_keeps_matching_lines_only() {
        let mut s = Stream::new(64);
        s.put(b"show history\r\nshow cmdtree\r\nquit\r\n");
        let mut out = Vec::new();
        s.flush_with_regex(&mut out, "^show ").unwrap();
        assert_eq!(out, b"show history\r\nshow cmdtree\r\n");
    }

    #[test]
    fn bad_regex_reports_and_drains() {
        let mut s = Stream::new(64);
        s.put(b"some output\r\n");
        let mut out = Vec::new();
        s.flush_with_regex(&mut out, "(").unwrap();
        assert!(s.is_empty());
        assert!(String::from_utf8_lossy(&out).contains("Bad regular expression"));
    }
}
