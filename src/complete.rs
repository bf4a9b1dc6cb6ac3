// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Completion and description engines: both drive the same
//! side-effect-free prefix walk over the command tree and differ
//! only in what they do with the candidate token set reached.

use crate::error::Result;
use crate::matcher::prefix_walk;
use crate::token::Token;
use crate::tree::CommandTree;

/// Result of [`complete`].
#[derive(Debug, PartialEq, Eq)]
pub enum Completion {
    /// No candidate's key starts with the in-progress prefix.
    NoMatch,
    /// Exactly one candidate; caller should append a trailing space.
    FullMatch(String),
    /// Multiple candidates share a longest common prefix longer than
    /// the typed prefix; caller replaces the prefix with it, no
    /// trailing space.
    Match(String),
    /// Multiple candidates, none extending the typed prefix further;
    /// caller lists them all.
    ListMatch(Vec<String>),
}

/// Candidate tokens at the node reached by `line`'s complete words,
/// filtered to those whose `key` starts with the in-progress prefix.
///
/// Open question carried over from the reference: a multi-token
/// alternation node only offers its first branch's key as a
/// candidate (matching the reference's observed, possibly-incomplete
/// behavior — not resolved here).
fn candidates<'a>(tree: &'a CommandTree, line: &str) -> Result<(Vec<&'a Token>, String)> {
    let (node_id, prefix) = prefix_walk(tree, line)?;
    let node = tree.node(node_id);
    let mut out = Vec::new();
    for &child in &node.children {
        out.push(&tree.node(child).tokens[0]);
    }
    for &child in &node.keyword_children {
        out.push(&tree.node(child).tokens[0]);
    }
    let filtered: Vec<&Token> =
        out.into_iter().filter(|t| t.key.starts_with(prefix)).collect();
    Ok((filtered, prefix.to_string()))
}

fn longest_common_prefix(words: &[&Token]) -> String {
    let Some(first) = words.first() else { return String::new() };
    let mut lcp = first.key.as_str();
    for tok in &words[1..] {
        let mut end = 0;
        for (a, b) in lcp.bytes().zip(tok.key.bytes()) {
            if a != b {
                break;
            }
            end += 1;
        }
        lcp = &lcp[..end];
    }
    lcp.to_string()
}

/// Computes the completion result for `line`.
pub fn complete(tree: &CommandTree, line: &str) -> Result<Completion> {
    let (cands, prefix) = candidates(tree, line)?;
    Ok(match cands.len() {
        0 => Completion::NoMatch,
        1 => Completion::FullMatch(cands[0].key.clone()),
        _ => {
            let lcp = longest_common_prefix(&cands);
            if lcp.len() > prefix.len() {
                Completion::Match(lcp)
            } else {
                let mut keys: Vec<String> =
                    cands.into_iter().map(|t| t.key.clone()).collect();
                keys.sort();
                keys.dedup();
                Completion::ListMatch(keys)
            }
        }
    })
}

/// One entry of a [`describe`] result: the candidate's display key
/// and help text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub key: String,
    pub desc: String,
}

/// Result of [`describe`]: every candidate at the reached node, plus
/// whether a `<cr>` (bound handler) is valid there too.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Describe {
    pub candidates: Vec<Description>,
    pub cr: bool,
}

/// Computes the `?`-help candidate set and descriptions for `line`.
pub fn describe(tree: &CommandTree, line: &str) -> Result<Describe> {
    let (node_id, prefix) = prefix_walk(tree, line)?;
    let node = tree.node(node_id);
    let mut candidates = Vec::new();
    for &child in node.children.iter().chain(node.keyword_children.iter()) {
        for tok in &tree.node(child).tokens {
            if tok.key.starts_with(&prefix) {
                candidates.push(Description { key: tok.key.clone(), desc: tok.desc.clone() });
            }
        }
    }
    Ok(Describe { candidates, cr: node.is_terminal() })
}

/// Renders a [`Describe`] result the way the reference aligns
/// `<key>  <desc>` columns: keys left-padded to the
/// widest key plus two spaces of gutter, one line per candidate,
/// CRLF-terminated; a trailing `<cr>` line if `cr` is set.
pub fn render_describe(d: &Describe) -> String {
    let width = d.candidates.iter().map(|c| c.key.len()).max().unwrap_or(0);
    let mut out = String::new();
    for c in &d.candidates {
        out.push_str(&format!("  {:width$}  {}\r\n", c.key, c.desc, width = width));
    }
    if d.cr {
        out.push_str("  <cr>\r\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::CommandRegistry;
    use std::sync::Arc;

    fn build() -> CommandTree {
        let mut reg = CommandRegistry::new();
        reg.register("show history", "show\nhistory", Arc::new(|_f, _b, _o, _c| Ok(0)));
        reg.register("show cmdtree", "show\ncmdtree", Arc::new(|_f, _b, _o, _c| Ok(0)));
        reg.register("shutdown", "shutdown", Arc::new(|_f, _b, _o, _c| Ok(0)));
        let (tree, failures) = reg.compile();
        assert!(failures.is_empty());
        tree
    }

    #[test]
    fn full_match_appends_space() {
        let tree = build();
        assert_eq!(
            complete(&tree, "show hist").unwrap(),
            Completion::FullMatch("history".into())
        );
    }

    #[test]
    fn lcp_correctness() {
        let tree = build();
        assert_eq!(complete(&tree, "s").unwrap(), Completion::Match("sh".into()));
    }

    #[test]
    fn list_match_when_lcp_not_longer_than_prefix() {
        let tree = build();
        assert_eq!(
            complete(&tree, "sh").unwrap(),
            Completion::ListMatch(vec!["show".into(), "shutdown".into()])
        );
    }

    #[test]
    fn no_match_for_unknown_prefix() {
        let tree = build();
        assert_eq!(complete(&tree, "zz").unwrap(), Completion::NoMatch);
    }

    #[test]
    fn completion_idempotence() {
        let tree = build();
        let once = complete(&tree, "s").unwrap();
        let Completion::Match(lcp) = once else { panic!("expected Match") };
        assert_eq!(lcp, "sh");
        let twice = complete(&tree, "sh").unwrap();
        let Completion::ListMatch(_) = twice else { panic!("expected ListMatch after sh") };
    }

    #[test]
    fn describe_show_lists_both_branches() {
        let tree = build();
        let d = describe(&tree, "show ").unwrap();
        let mut keys: Vec<&str> = d.candidates.iter().map(|c| c.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["cmdtree", "history"]);
        assert!(!d.cr);
    }

    #[test]
    fn describe_reports_cr_when_handler_bound() {
        let tree = build();
        let d = describe(&tree, "show history ").unwrap();
        assert!(d.cr);
        assert!(d.candidates.is_empty());
    }

    #[test]
    fn render_aligns_columns() {
        let tree = build();
        let d = describe(&tree, "show ").unwrap();
        let rendered = render_describe(&d);
        assert!(rendered.contains("history"));
        assert!(rendered.contains("cmdtree"));
        assert!(rendered.ends_with("\r\n"));
    }
}
