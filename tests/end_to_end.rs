// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end scenarios driven through the public [`clish::Session`]
//! interface.

use clish::config::Config;
use clish::grammar::CommandRegistry;
use clish::options::{integer, presence, string, Binder};
use clish::{register_builtins, Session};
use std::sync::Arc;

#[derive(Default, Debug, PartialEq)]
struct KeywordOpts {
    subcmd: String,
    number: i64,
    eleven: bool,
}

fn build_tree() -> Arc<clish::CommandTree> {
    let mut reg = CommandRegistry::new();
    register_builtins(&mut reg);
    let binder = Binder::<KeywordOpts>::new()
        .positional(0, |o, s| string(&mut o.subcmd, s))
        .keyword("third", |o, s| integer(&mut o.number, s))
        .keyword("eleven", |o, s| presence(&mut o.eleven, s))
        .erase();
    reg.register_with_binder(
        "keyword (t1|t2) {first|second|third INT} stage {ten|eleven|twelve}",
        "keyword\nt1\nt2\nfirst\nsecond\nthird\nnum\nstage\nten\neleven\ntwelve",
        Arc::new(|_frame, _bound, _out, _control| Ok(0)),
        binder,
    );
    let (tree, failures) = reg.compile();
    assert!(failures.is_empty());
    Arc::new(tree)
}

fn feed_str(session: &mut Session, s: &str) {
    for b in s.bytes() {
        session.feed_byte(b).unwrap();
    }
}

fn drain(session: &mut Session) -> String {
    let mut buf = Vec::new();
    session.pending().flush(&mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

/// Keyword order freedom plus bound-struct population.
#[test]
fn scenario_keyword_order_freedom_bound_struct() {
    let tree = build_tree();
    let history = clish::history::History::new(32);
    let mut control = clish::control::Control::new(&tree, &history);
    let mut out = clish::stream::Stream::default();
    let d = clish::matcher::dispatch(
        &tree,
        "keyword t1 third 42 stage eleven",
        64,
        &mut out,
        &mut control,
    )
    .unwrap();
    assert_eq!(d.frame.argv(), &["t1".to_string()]);
    assert_eq!(d.frame.keyword("third"), Some("42"));
    assert_eq!(d.frame.keyword("eleven"), Some("1"));
}

/// `show hist<TAB>` auto-completes with a trailing space and no
/// stray output.
#[test]
fn scenario_tab_completes_show_history() {
    let mut session = Session::new(Config::default(), build_tree());
    drain(&mut session);
    feed_str(&mut session, "show hist");
    drain(&mut session);
    session.feed_byte(0x09).unwrap(); // TAB
    let text = drain(&mut session);
    assert!(text.contains("history "));
}

/// `show ?` lists both branches with aligned descriptions, then
/// reprints the prompt and in-progress line.
#[test]
fn scenario_question_mark_describes_show_branches() {
    let mut session = Session::new(Config::default(), build_tree());
    drain(&mut session);
    feed_str(&mut session, "show ");
    drain(&mut session);
    session.feed_byte(b'?').unwrap();
    let text = drain(&mut session);
    assert!(text.contains("history"));
    assert!(text.contains("cmdtree"));
    assert!(text.ends_with("Chaconne > show "));
}

/// `list | include ^show` filters the command list down to entries
/// starting with `show `.
#[test]
fn scenario_pipe_include_filters_list() {
    let mut session = Session::new(Config::default(), build_tree());
    drain(&mut session);
    feed_str(&mut session, "list | include ^show\r");
    let text = drain(&mut session);
    assert!(text.contains("show {history|cmdtree}"));
    assert!(!text.contains("keyword"));
}

/// 33 distinct history entries, then 33 Ctrl-P presses — the 33rd is
/// a no-op against the oldest retained entry.
#[test]
fn scenario_history_ring_bound_and_recall_exhaustion() {
    let mut session = Session::new(Config::default(), build_tree());
    drain(&mut session);
    for i in 0..33 {
        feed_str(&mut session, &format!("echo{i}\r"));
        drain(&mut session);
    }
    for _ in 0..32 {
        session.feed_byte(0x10).unwrap(); // Ctrl-P
        drain(&mut session);
    }
    session.feed_byte(0x10).unwrap(); // 33rd Ctrl-P: past the ring bound
    let before = drain(&mut session);
    assert_eq!(before, "", "33rd Ctrl-P past the ring bound must be a no-op");
    session.feed_byte(0x10).unwrap();
    let after = drain(&mut session);
    assert_eq!(before, after);
}

/// An unrecognized command reports `%% Unknown command` and the
/// session keeps running.
#[test]
fn scenario_unknown_command_reports_and_continues() {
    let mut session = Session::new(Config::default(), build_tree());
    drain(&mut session);
    feed_str(&mut session, "foo\r");
    let text = drain(&mut session);
    assert!(text.contains("%% Unknown command - foo."));
    assert!(!session.has_quit());
    feed_str(&mut session, "list\r");
    let text = drain(&mut session);
    assert!(text.contains("list"));
}

/// Dispatch purity: running the same command twice from fresh state
/// yields identical side effects.
#[test]
fn dispatch_purity_across_two_sessions() {
    let tree = build_tree();
    let mut a = Session::new(Config::default(), Arc::clone(&tree));
    let mut b = Session::new(Config::default(), Arc::clone(&tree));
    drain(&mut a);
    drain(&mut b);
    feed_str(&mut a, "show cmdtree\r");
    feed_str(&mut b, "show cmdtree\r");
    assert_eq!(drain(&mut a), drain(&mut b));
}
