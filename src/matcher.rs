// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Matcher / dispatcher: word-tokenizes a typed line, walks
//! the [`CommandTree`] with match-class precedence, populates a
//! [`MatchFrame`], and invokes the bound handler.

use crate::control::Control;
use crate::error::{Error, Result};
use crate::frame::{MatchFrame, PRESENT};
use crate::stream::Stream;
use crate::token::TokenKind;
use crate::tree::{CommandTree, NodeId};
use std::any::Any;

/// A trailing `| <regex>` or `| <shell command>` suffix, split off
/// before matching begins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipeSuffix {
    Include(String),
    Shell(String),
}

/// Splits a raw line into its matchable words and an optional pipe
/// suffix. Everything after the first unquoted `|` is
/// the suffix and does not participate in tree matching.
pub fn split_pipe(line: &str) -> (&str, Option<PipeSuffix>) {
    let Some(bar) = line.find('|') else {
        return (line, None);
    };
    let (head, tail) = (&line[..bar], &line[bar + 1..]);
    let tail = tail.trim();
    let suffix = if let Some(pattern) = tail.strip_prefix("include") {
        PipeSuffix::Include(pattern.trim().to_string())
    } else {
        PipeSuffix::Shell(tail.to_string())
    };
    (head, Some(suffix))
}

fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// The one node a `MATCH`/`LIST_MATCH` classification needs, plus
/// class, for the completion/describe walk; also the return
/// type of the side-effecting dispatch walk in [`dispatch`].
struct WalkOutcome {
    node: NodeId,
    frame: MatchFrame,
}

/// Finds the best child by match-class precedence among
/// `candidates` for `word`. Ties are broken by the order the
/// candidates are given in, which callers arrange to be tree
/// insertion order.
fn best_match<'a>(
    tree: &CommandTree,
    candidates: impl Iterator<Item = &'a NodeId>,
    word: &str,
) -> Option<(NodeId, u8)> {
    let mut best: Option<(NodeId, u8)> = None;
    for &id in candidates {
        let node = tree.node(id);
        let class = node.tokens.iter().map(|t| t.precedence(word)).max().unwrap_or(0);
        if class == 0 {
            continue;
        }
        match best {
            Some((_, bc)) if bc >= class => {}
            _ => best = Some((id, class)),
        }
    }
    best
}

/// Walks the tree against `words`, optionally recording positional
/// arguments and keyword pairs into a frame (disabled for the
/// completion/describe engine, which only needs the reached node).
/// Returns the node reached and, if side effects were requested, the
/// populated frame.
///
/// `maxargc` bounds the positional argument count; ignored when
/// `record` is false.
fn walk(
    tree: &CommandTree,
    words: &[&str],
    maxargc: usize,
    record: bool,
) -> Result<WalkOutcome> {
    let mut node = tree.root();
    let mut frame = MatchFrame::new();
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        let current = tree.node(node);

        // Keyword loop: greedily consume words that
        // match a keyword branch at this node, in any order, before
        // falling back to positional children.
        if !current.keyword_children.is_empty() {
            if let Some((kw_id, _)) =
                best_match(tree, current.keyword_children.iter(), word)
            {
                i += 1;
                let key = tree.node(kw_id).tokens[0].key.clone();
                if record {
                    frame.set_keyword(&key, PRESENT);
                }
                let kw_node = tree.node(kw_id);
                if kw_node.children.first().is_some() && i < words.len() {
                    if record {
                        frame.set_keyword(&key, words[i]);
                    }
                    i += 1;
                }
                continue;
            }
        }

        let Some((next, class)) = best_match(tree, current.children.iter(), word)
        else {
            log::warn!("no_match on word '{word}'");
            return Err(Error::NoMatch);
        };
        let next_node = tree.node(next);
        let is_vararg = next_node.tokens.iter().any(|t| t.kind == TokenKind::Vararg);
        let is_multi = next_node.tokens.len() > 1;
        let is_literal_single =
            !is_multi && next_node.tokens[0].kind == TokenKind::Literal;

        if is_vararg {
            if record {
                for &w in &words[i..] {
                    frame.push_arg(w, maxargc)?;
                }
            }
            node = next;
            i = words.len();
            break;
        }

        if is_multi || !is_literal_single {
            if record {
                frame.push_arg(word, maxargc)?;
            }
        }
        debug_assert!(class > 0);
        node = next;
        i += 1;
    }
    Ok(WalkOutcome { node, frame })
}

/// Outcome of a successful dispatch: the handler's own return code
/// plus the frame it was invoked with (callers that need the frame
/// for logging/tests can inspect it; most don't).
pub struct Dispatched {
    pub status: i32,
    pub frame: MatchFrame,
}

/// Matches and dispatches one already pipe-stripped, already
/// tokenized command line against `tree`, writing the handler's
/// output to `out`. `control` borrows the
/// per-session state (tree/history access, quit-request latch) that
/// built-in handlers need.
pub fn dispatch(
    tree: &CommandTree,
    line: &str,
    maxargc: usize,
    out: &mut Stream,
    control: &mut Control<'_>,
) -> Result<Dispatched> {
    let words = tokenize(line);
    if words.is_empty() {
        return Err(Error::Invalid);
    }
    let outcome = walk(tree, &words, maxargc, true)?;
    let node = tree.node(outcome.node);
    let Some(handler) = node.handler.clone() else {
        log::warn!("incomplete command '{line}'");
        return Err(Error::Incomplete);
    };
    let bound: Option<Box<dyn Any + Send>> = match &node.binder {
        Some(binder) => Some(binder.bind(&outcome.frame)?),
        None => None,
    };
    log::debug!("dispatch '{line}' -> node {}", outcome.node);
    let status = handler(&outcome.frame, bound.as_deref(), out, control)?;
    if status != 0 {
        return Err(Error::HandlerFailed(status));
    }
    Ok(Dispatched { status, frame: outcome.frame })
}

/// Runs the side-effect-free prefix walk used by completion and
/// description: walks every *complete* word, leaving the
/// in-progress final word (if any) unconsumed.
///
/// Returns the node reached and the in-progress prefix (empty if the
/// line ends in whitespace, meaning the next word hasn't started).
pub fn prefix_walk<'a>(tree: &CommandTree, line: &'a str) -> Result<(NodeId, &'a str)> {
    let ends_in_space = line.ends_with(char::is_whitespace);
    let mut words = tokenize(line);
    let prefix = if ends_in_space { "" } else { words.pop().unwrap_or("") };
    let outcome = walk(tree, &words, usize::MAX, false)?;
    Ok((outcome.node, prefix))
}

/// Renders the CRLF-terminated `%%`-prefixed error message for a
/// dispatch failure.
pub fn error_message(err: &Error, line: &str) -> String {
    match err {
        Error::Invalid => format!("%% Invalid command - {line}.\r\n"),
        Error::NoMatch => format!("%% Unknown command - {line}.\r\n"),
        Error::Incomplete => "%% Command incomplete.\r\n".to_string(),
        Error::HandlerFailed(n) => format!("%% Command return error {n}.\r\n"),
        other => format!("%% {other}.\r\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::CommandRegistry;
    use crate::history::History;
    use crate::options::{integer, presence, string, Binder};
    use std::sync::Arc;

    /// Test-only convenience wrapping [`dispatch`] with a throwaway
    /// [`Control`] so individual test bodies don't need to thread one
    /// through by hand.
    fn dispatch_test(tree: &CommandTree, line: &str, out: &mut Stream) -> Result<Dispatched> {
        let history = History::new(32);
        let mut control = Control::new(tree, &history);
        dispatch(tree, line, 64, out, &mut control)
    }

    fn build() -> CommandTree {
        let mut reg = CommandRegistry::new();
        reg.register(
            "keyword (t1|t2) {first|second|third INT} stage {ten|eleven|twelve}",
            "keyword\nt1\nt2\nfirst\nsecond\nthird\nnum\nstage\nten\neleven\ntwelve",
            Arc::new(|_f, _b, _o, _c| Ok(0)),
        );
        reg.register("foo .ARGS", "foo\nargs", Arc::new(|_f, _b, _o, _c| Ok(0)));
        reg.register("show history", "show\nhistory", Arc::new(|_f, _b, _o, _c| Ok(0)));
        reg.register("show cmdtree", "show\ncmdtree", Arc::new(|_f, _b, _o, _c| Ok(0)));
        let (tree, failures) = reg.compile();
        assert!(failures.is_empty());
        tree
    }

    #[derive(Default, Debug, PartialEq)]
    struct KwOpts {
        subcmd: String,
        number: i64,
        eleven: bool,
    }

    #[test]
    fn keyword_order_freedom_scenario() {
        let mut reg = CommandRegistry::new();
        let binder = Binder::<KwOpts>::new()
            .positional(0, |o, s| string(&mut o.subcmd, s))
            .keyword("third", |o, s| integer(&mut o.number, s))
            .keyword("eleven", |o, s| presence(&mut o.eleven, s))
            .erase();
        reg.register_with_binder(
            "keyword (t1|t2) {first|second|third INT} stage {ten|eleven|twelve}",
            "keyword\nt1\nt2\nfirst\nsecond\nthird\nnum\nstage\nten\neleven\ntwelve",
            Arc::new(|_f, _b, _o, _c| Ok(0)),
            binder,
        );
        let (tree, failures) = reg.compile();
        assert!(failures.is_empty());

        let mut out = Stream::default();
        let d1 = dispatch_test(&tree, "keyword t1 third 42 stage eleven", &mut out).unwrap();
        assert_eq!(d1.frame.argv(), &["t1".to_string()]);
        assert_eq!(d1.frame.keyword("third"), Some("42"));
        assert_eq!(d1.frame.keyword("eleven"), Some("1"));

        let d2 = dispatch_test(&tree, "keyword t1 stage eleven third 42", &mut out).unwrap();
        assert_eq!(d1.frame.argv(), d2.frame.argv());
        assert_eq!(d1.frame.keyword("third"), d2.frame.keyword("third"));
        assert_eq!(d1.frame.keyword("eleven"), d2.frame.keyword("eleven"));
    }

    #[test]
    fn vararg_law() {
        let tree = build();
        let mut out = Stream::default();
        let empty = dispatch_test(&tree, "foo", &mut out).unwrap();
        assert!(empty.frame.argv().is_empty());
        let filled = dispatch_test(&tree, "foo a b c", &mut out).unwrap();
        assert_eq!(filled.frame.argv(), &["a", "b", "c"]);
    }

    #[test]
    fn unknown_command_reports_no_match() {
        let tree = build();
        let mut out = Stream::default();
        let err = dispatch_test(&tree, "bogus", &mut out).unwrap_err();
        assert!(matches!(err, Error::NoMatch));
        assert_eq!(error_message(&err, "bogus"), "%% Unknown command - bogus.\r\n");
    }

    #[test]
    fn incomplete_when_handler_absent() {
        let tree = build();
        let mut out = Stream::default();
        let err = dispatch_test(&tree, "show", &mut out).unwrap_err();
        assert!(matches!(err, Error::Incomplete));
    }

    #[test]
    fn handler_failure_surfaces_code() {
        let mut reg = CommandRegistry::new();
        reg.register("boom", "boom", Arc::new(|_f, _b, _o, _c| Ok(3)));
        let (tree, _) = reg.compile();
        let mut out = Stream::default();
        let err = dispatch_test(&tree, "boom", &mut out).unwrap_err();
        assert!(matches!(err, Error::HandlerFailed(3)));
    }

    #[test]
    fn pipe_suffix_splitting() {
        assert_eq!(split_pipe("list | include ^show"), ("list ", Some(PipeSuffix::Include("^show".into()))));
        assert_eq!(split_pipe("show cmdtree | grep foo"), ("show cmdtree ", Some(PipeSuffix::Shell("grep foo".into()))));
        assert_eq!(split_pipe("list"), ("list", None));
    }

    #[test]
    fn dispatch_purity_same_line_twice() {
        let tree = build();
        let mut out1 = Stream::default();
        let mut out2 = Stream::default();
        let a = dispatch_test(&tree, "show history", &mut out1).unwrap();
        let b = dispatch_test(&tree, "show history", &mut out2).unwrap();
        assert_eq!(a.status, b.status);
        assert_eq!(a.frame.argv(), b.frame.argv());
    }
}
