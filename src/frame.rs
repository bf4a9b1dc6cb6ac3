// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The transient per-line match frame.

use std::collections::BTreeMap;

/// Sentinel value recorded for a keyword that appeared without a
/// payload (e.g. `eleven` in `keyword t1 third 42 stage eleven`).
pub const PRESENT: &str = "1";

/// Positional arguments and keyword key/value pairs collected while
/// walking the command tree for one typed line.
#[derive(Clone, Debug, Default)]
pub struct MatchFrame {
    argv: Vec<String>,
    keywords: BTreeMap<String, String>,
}

impl MatchFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument, failing if `maxargc` would be
    /// exceeded.
    pub(crate) fn push_arg(
        &mut self,
        word: &str,
        maxargc: usize,
    ) -> Result<(), crate::error::Error> {
        if self.argv.len() >= maxargc {
            return Err(crate::error::Error::ExceedArgcMax);
        }
        self.argv.push(word.to_string());
        Ok(())
    }

    /// Records a keyword key as present (sentinel value), or
    /// overwrites it with an explicit payload.
    pub(crate) fn set_keyword(&mut self, key: &str, value: impl Into<String>) {
        self.keywords.insert(key.to_string(), value.into());
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }

    pub fn arg(&self, i: usize) -> Option<&str> {
        self.argv.get(i).map(String::as_str)
    }

    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords.get(key).map(String::as_str)
    }

    pub fn has_keyword(&self, key: &str) -> bool {
        self.keywords.contains_key(key)
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keywords.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
