//! Property-based tests for the engine's cross-cutting invariants. Each test
//! quantifies over grammars/inputs the way a property, rather than a single
//! worked example, is supposed to.

use std::io::Cursor;
use std::rc::Rc;

use parstack::combinator::{and, and_with_dtors, any, char_lit, collect_bytes, count, digit, expect, many, or};
use parstack::parser::{Dtor, Value};
use parstack::{parse_pipe, parse_string, run, Input};
use proptest::prelude::*;

fn ascii_byte() -> impl Strategy<Value = u8> {
    prop::sample::select(vec![b'a', b'b', b'c', b'x', b'y', b'z', b'0', b'1', b'9'])
}

fn ascii_bytes(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(ascii_byte(), 0..max_len)
}

fn and_ab() -> parstack::ParserRef {
    and_with_dtors(
        vec![char_lit(b'a'), char_lit(b'b')],
        Rc::new(|vs: Vec<Value>| -> Value {
            let bytes: Vec<u8> = vs.into_iter().map(|v| *v.downcast::<u8>().unwrap()).collect();
            Box::new(bytes)
        }),
        vec![Rc::new(|_| {}) as Dtor, Rc::new(|_| {}) as Dtor],
    )
}

proptest! {
    // Invariant 1: determinism.
    #[test]
    fn determinism(bytes in ascii_bytes(12)) {
        let p = many(digit(), Rc::new(collect_bytes));
        let first = parse_string("t", bytes.clone(), p.clone());
        let second = parse_string("t", bytes, p);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(*a.downcast::<Vec<u8>>().unwrap(), *b.downcast::<Vec<u8>>().unwrap()),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "one run succeeded and the other failed"),
        }
    }

    // Invariant 3: the furthest-failure merge never reports a position short
    // of any single alternative's own failure position.
    #[test]
    fn position_monotonicity(bytes in ascii_bytes(8)) {
        let alt_a = || and(vec![char_lit(b'a'), char_lit(b'a')], Rc::new(|_| Box::new(())));
        let alt_b = || and(vec![char_lit(b'a'), char_lit(b'b'), char_lit(b'c')], Rc::new(|_| Box::new(())));

        let pos_a = parse_string("t", bytes.clone(), alt_a()).err().map(|e| e.state().pos);
        let pos_b = parse_string("t", bytes.clone(), alt_b()).err().map(|e| e.state().pos);

        if let Err(merged) = parse_string("t", bytes, or(vec![alt_a(), alt_b()])) {
            let furthest = pos_a.into_iter().chain(pos_b).max().expect("or only fails if every branch failed");
            prop_assert_eq!(merged.state().pos, furthest);
        }
    }

    // Invariant 4: And atomicity.
    #[test]
    fn and_atomicity(bytes in ascii_bytes(6)) {
        let mut i = Input::new_string("t", bytes);
        if run(&mut i, and_ab()).is_err() {
            prop_assert_eq!(i.state().pos, 0);
        }
    }

    // Invariant 5: Or first-match — when both alternatives would succeed,
    // the value is the one the first alternative alone would have produced.
    #[test]
    fn or_first_match(bytes in ascii_bytes(6).prop_filter("need at least one byte", |b| !b.is_empty())) {
        let alone = {
            let mut i = Input::new_string("t", bytes.clone());
            run(&mut i, any()).unwrap()
        };
        let chosen = {
            let mut i = Input::new_string("t", bytes);
            run(&mut i, or(vec![any(), any()])).unwrap()
        };
        prop_assert_eq!(*alone.downcast::<u8>().unwrap(), *chosen.downcast::<u8>().unwrap());
    }

    // Invariant 6: repetition greed — Many(Single('a')) consumes the longest
    // run of leading 'a's and stops, leaving everything after it unread.
    #[test]
    fn repetition_greed(lead in 0usize..20, tail in ascii_byte().prop_filter("tail must not be 'a'", |b| *b != b'a')) {
        let mut bytes = vec![b'a'; lead];
        bytes.push(tail);
        let mut i = Input::new_string("t", bytes);
        let v = run(&mut i, many(char_lit(b'a'), Rc::new(|vs: Vec<Value>| -> Value { Box::new(vs.len()) }))).unwrap();
        prop_assert_eq!(*v.downcast::<usize>().unwrap(), lead);
        prop_assert_eq!(i.state().pos, lead as i64);
    }

    // Invariant 7: Count exactness — Count(n, c) succeeds iff at least n
    // matches exist up front, and a shortfall leaves the input untouched.
    #[test]
    fn count_exactness(run_len in 0usize..8, n in 1usize..8) {
        let bytes = vec![b'x'; run_len];
        let mut i = Input::new_string("t", bytes);
        let p = count(n, expect(char_lit(b'x'), "'x'"), Rc::new(|vs: Vec<Value>| -> Value { Box::new(vs.len()) }));
        let result = run(&mut i, p);
        if run_len >= n {
            prop_assert_eq!(*result.unwrap().downcast::<usize>().unwrap(), n);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(i.state().pos, 0);
        }
    }

    // Invariant 8: pipe equivalence — a non-seekable pipe over the same
    // bytes as a string input must produce the same observable result.
    #[test]
    fn pipe_equivalence(bytes in ascii_bytes(10)) {
        let p = many(digit(), Rc::new(collect_bytes));
        let via_string = parse_string("t", bytes.clone(), p.clone());
        let via_pipe = parse_pipe("t", Cursor::new(bytes), p);
        match (via_string, via_pipe) {
            (Ok(a), Ok(b)) => prop_assert_eq!(*a.downcast::<Vec<u8>>().unwrap(), *b.downcast::<Vec<u8>>().unwrap()),
            (Err(a), Err(b)) => prop_assert_eq!(a.to_string(), b.to_string()),
            _ => prop_assert!(false, "string and pipe input disagreed"),
        }
    }

    // Invariant 9: expected-set deduplication — merging errors that name the
    // same phrase twice must not render it twice.
    #[test]
    fn expected_set_deduplication(byte in ascii_byte()) {
        let p = or(vec![
            expect(char_lit(b'z'), "'z'"),
            expect(char_lit(b'z'), "'z'"),
        ]);
        if byte != b'z' {
            let rendered = render_err(&[byte], p);
            let occurrences = rendered.matches("'z'").count();
            prop_assert_eq!(occurrences, 1);
        }
    }
}

fn render_err(bytes: &[u8], parser: parstack::ParserRef) -> String {
    parse_string("t", bytes.to_vec(), parser).unwrap_err().to_string()
}
