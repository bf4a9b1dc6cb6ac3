// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Options binder: copies matched positional/keyword
//! arguments into a caller-supplied struct via a declarative
//! attribute table.
//!
//! The reference C implementation writes directly into a `struct`
//! at fixed byte offsets via a converter function pointer. Rust has
//! no portable notion of "offset into a struct" outside of
//! `unsafe`/`offset_of!`, so this is re-architected as a small
//! closure-based builder: each attribute is a setter closure over a
//! concrete `T`, type-erased to `Box<dyn Any + Send>` so the command
//! tree can hold binders for many different `T`s uniformly (one per
//! registered command).

use crate::error::{Error, Result};
use crate::frame::MatchFrame;
use std::any::Any;
use std::str::FromStr;

/// Where a bound attribute's source value comes from.
#[derive(Clone, Debug)]
pub enum Source {
    /// `argv[i]` (must be `i < argc`).
    Positional(usize),
    /// The keyword map entry for this key, if present.
    Keyword(String),
}

/// One declarative attribute: a source and a setter closure invoked
/// with the raw matched string.
struct Attr<T> {
    source: Source,
    set: Box<dyn Fn(&mut T, &str) -> Result<()> + Send + Sync>,
}

/// A declarative binder for a concrete result type `T`. Built once
/// at command registration time, reused for every dispatch.
pub struct Binder<T> {
    init: Box<dyn Fn() -> T + Send + Sync>,
    attrs: Vec<Attr<T>>,
}

impl<T: Default> Binder<T> {
    pub fn new() -> Self {
        Binder { init: Box::new(T::default), attrs: Vec::new() }
    }
}

impl<T: Default> Default for Binder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Binder<T> {
    /// Use a custom initializer instead of zero/default-filling the
    /// buffer before binding.
    pub fn with_init(mut self, init: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.init = Box::new(init);
        self
    }

    /// Binds `argv[i]` through `conv` into the field `set` assigns.
    pub fn positional(
        mut self,
        i: usize,
        set: impl Fn(&mut T, &str) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.attrs.push(Attr { source: Source::Positional(i), set: Box::new(set) });
        self
    }

    /// Binds keyword map entry `key` through `conv` into the field
    /// `set` assigns.
    pub fn keyword(
        mut self,
        key: impl Into<String>,
        set: impl Fn(&mut T, &str) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.attrs.push(Attr { source: Source::Keyword(key.into()), set: Box::new(set) });
        self
    }

    /// Runs the binder over a populated match frame.
    pub fn bind(&self, frame: &MatchFrame) -> Result<T> {
        let mut out = (self.init)();
        for attr in &self.attrs {
            match &attr.source {
                Source::Positional(i) => {
                    if let Some(word) = frame.arg(*i) {
                        (attr.set)(&mut out, word)?;
                    }
                }
                Source::Keyword(key) => {
                    if let Some(word) = frame.keyword(key) {
                        (attr.set)(&mut out, word)?;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Type-erases this binder so a [`crate::tree::CommandTree`] node
    /// can hold it alongside binders of unrelated `T`s.
    pub fn erase(self) -> ErasedBinder
    where
        T: Send + 'static,
    {
        ErasedBinder(Box::new(move |frame| {
            self.bind(frame).map(|v| Box::new(v) as Box<dyn Any + Send>)
        }))
    }
}

/// A type-erased [`Binder`], stored on a command tree node.
pub struct ErasedBinder(
    Box<dyn Fn(&MatchFrame) -> Result<Box<dyn Any + Send>> + Send + Sync>,
);

impl ErasedBinder {
    pub fn bind(&self, frame: &MatchFrame) -> Result<Box<dyn Any + Send>> {
        (self.0)(frame)
    }
}

/// Standard converter: copies the raw string as-is.
pub fn string(dst: &mut String, src: &str) -> Result<()> {
    dst.clear();
    dst.push_str(src);
    Ok(())
}

/// Standard converter: parses a signed or unsigned integer,
/// accepting the reference's `0x`/`0t`/`0b`/leading-zero radix
/// prefixes (see [`crate::grammar::parse_int`]).
pub fn integer<T>(dst: &mut T, src: &str) -> Result<()>
where
    T: FromStr,
{
    *dst = crate::grammar::parse_int(src)
        .map_err(|_| Error::BadArgument(src.to_string()))?;
    Ok(())
}

/// Standard converter: a bool-presence-flag, true whenever the
/// keyword or positional matched at all (the converter is only ever
/// invoked when there was a match, so this always sets `true`).
pub fn presence(dst: &mut bool, _src: &str) -> Result<()> {
    *dst = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Opts {
        subcmd: String,
        number: i64,
        eleven: bool,
    }

    #[test]
    fn binds_positional_and_keyword() {
        let binder = Binder::<Opts>::new()
            .positional(0, |o, s| string(&mut o.subcmd, s))
            .keyword("third", |o, s| integer(&mut o.number, s))
            .keyword("eleven", |o, s| presence(&mut o.eleven, s));

        let mut frame = MatchFrame::new();
        frame.push_arg("t1", 64).unwrap();
        frame.set_keyword("third", "42");
        frame.set_keyword("eleven", "1");

        let bound = binder.bind(&frame).unwrap();
        assert_eq!(
            bound,
            Opts { subcmd: "t1".into(), number: 42, eleven: true }
        );
    }

    #[test]
    fn missing_keyword_leaves_default() {
        let binder =
            Binder::<Opts>::new().keyword("third", |o, s| integer(&mut o.number, s));
        let frame = MatchFrame::new();
        let bound = binder.bind(&frame).unwrap();
        assert_eq!(bound.number, 0);
    }

    #[test]
    fn bad_integer_aborts_dispatch() {
        let binder =
            Binder::<Opts>::new().keyword("third", |o, s| integer(&mut o.number, s));
        let mut frame = MatchFrame::new();
        frame.set_keyword("third", "not-a-number");
        assert!(binder.bind(&frame).is_err());
    }
}
