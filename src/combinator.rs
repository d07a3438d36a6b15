//! Public combinator constructors.
//!
//! Every function here builds one [`ParserRef`] node. Composite combinators
//! (`many`, `or`, `and`, ...) take already-built parsers as children, so a
//! grammar is assembled bottom-up as an ordinary Rust expression tree; only
//! recursive grammars need [`forward`]/[`define`].
//!
//! The byte-level primitives (`single`, `range`, `one_of`, `string_lit`, ...)
//! already phrase their own diagnostic on mismatch (`'a'`, `'0'-'9'`, `"for"`).
//! [`expect`] is for relabeling a *composite* whose default phrasing reads
//! poorly, the way [`alpha`] and [`whitespace`] below use it.

use std::any::Any;
use std::rc::Rc;

use crate::parser::{node, Apply, ApplyTo, Ctor, Dtor, Fold, Lift, ParserKind, ParserRef, Satisfy, Value};

pub use crate::parser::{cleanup, define, forward, named};

/// A parser that always succeeds, consuming nothing, producing `()`.
pub fn pass() -> ParserRef {
    node(ParserKind::Pass)
}

/// A parser that always fails with a fixed message.
pub fn fail(message: impl Into<String>) -> ParserRef {
    node(ParserKind::Fail(message.into()))
}

/// A parser that always succeeds, producing `ctor()`'s value without
/// touching the input. Each success calls `ctor` again.
pub fn lift(ctor: Lift) -> ParserRef {
    node(ParserKind::Lift(ctor))
}

/// Like [`lift`], but for a value that is cheap to clone and fixed ahead of
/// time: `lift_val(v)` always yields a fresh clone of `v`.
pub fn lift_val<T: Clone + 'static>(value: T) -> ParserRef {
    node(ParserKind::LiftVal(Rc::new(move || -> Value { Box::new(value.clone()) })))
}

/// Yields the cursor's current [`State`], consuming nothing.
pub fn current_state() -> ParserRef {
    node(ParserKind::CurrentState)
}

/// Matches and yields any single byte; fails only at end of input.
pub fn any() -> ParserRef {
    node(ParserKind::Any)
}

/// Matches exactly one byte.
pub fn single(b: u8) -> ParserRef {
    node(ParserKind::Single(b))
}

/// Matches a byte in `lo..=hi`.
pub fn range(lo: u8, hi: u8) -> ParserRef {
    node(ParserKind::Range(lo, hi))
}

/// Matches any byte in `set`.
pub fn one_of(set: impl Into<Vec<u8>>) -> ParserRef {
    node(ParserKind::OneOf(set.into()))
}

/// Matches any byte not in `set`.
pub fn none_of(set: impl Into<Vec<u8>>) -> ParserRef {
    node(ParserKind::NoneOf(set.into()))
}

/// Matches a byte for which `pred` returns true.
pub fn satisfy(pred: Satisfy) -> ParserRef {
    node(ParserKind::Satisfy(pred))
}

/// Matches a byte literal atomically.
pub fn string_lit(lit: impl Into<Vec<u8>>) -> ParserRef {
    node(ParserKind::StringLit(lit.into()))
}

/// A zero-width lookaround over `(last consumed byte, next byte)`.
pub fn anchor(pred: Rc<dyn Fn(u8, u8) -> bool>) -> ParserRef {
    node(ParserKind::Anchor(pred))
}

/// On failure of `child`, replace whatever diagnostic it produced with a
/// single phrase: `"expected <message> at <received>"`.
pub fn expect(child: ParserRef, message: impl Into<String>) -> ParserRef {
    node(ParserKind::Expect(child, message.into()))
}

/// Transform a successful result through `f`. Failures pass through
/// untouched.
pub fn apply(child: ParserRef, f: Apply) -> ParserRef {
    node(ParserKind::Apply(child, f))
}

/// Like [`apply`], but `f` also receives a fixed piece of extra context —
/// the Rust analogue of currying a second argument into a C function
/// pointer via an opaque `void*`.
pub fn apply_to(child: ParserRef, f: ApplyTo, data: Rc<dyn Any>) -> ParserRef {
    node(ParserKind::ApplyTo(child, f, data))
}

/// Commit to `child`: disables backtracking for its duration, so once it
/// starts consuming input a sibling `or` alternative can no longer take
/// over. The usual LL(1)-lookahead-avoidance combinator.
pub fn predict(child: ParserRef) -> ParserRef {
    node(ParserKind::Predict(child))
}

/// Negative lookahead: succeeds with `ctor()`'s value, consuming nothing, iff
/// `child` fails. If `child` succeeds, `dtor` destroys its output and `not`
/// fails.
pub fn not(child: ParserRef, dtor: Dtor, ctor: Ctor) -> ParserRef {
    node(ParserKind::Not(child, dtor, ctor))
}

/// Like [`not`]'s success path, inverted: succeeds with `child`'s output if
/// it matches, or with `ctor()`'s value (discarding the miss) otherwise.
pub fn maybe(child: ParserRef, ctor: Ctor) -> ParserRef {
    node(ParserKind::Maybe(child, ctor))
}

/// Zero or more repetitions of `child`, folded through `fold`.
pub fn many(child: ParserRef, fold: Fold) -> ParserRef {
    many_with_dtor(child, fold, Rc::new(|_| {}))
}

/// Like [`many`], but with an explicit destructor for values dropped by a
/// caller that needs it for parity with the rest of the repeat family
/// (`many` itself never discards a collected value).
pub fn many_with_dtor(child: ParserRef, fold: Fold, dtor: Dtor) -> ParserRef {
    node(ParserKind::Many(child, fold, dtor))
}

/// One or more repetitions of `child`. Fails (with the `"one or more of"`
/// phrasing) if `child` doesn't match even once.
pub fn many1(child: ParserRef, fold: Fold) -> ParserRef {
    many1_with_dtor(child, fold, Rc::new(|_| {}))
}

pub fn many1_with_dtor(child: ParserRef, fold: Fold, dtor: Dtor) -> ParserRef {
    node(ParserKind::Many1(child, fold, dtor))
}

/// Exactly `n` repetitions of `child`: matches are collected greedily until
/// `n` is reached, at which point `count` succeeds immediately without
/// probing further. If `child` fails before `n` matches accumulate, every
/// collected value is destroyed via `dtor` and the whole input position is
/// restored.
pub fn count(n: usize, child: ParserRef, fold: Fold) -> ParserRef {
    count_with_dtor(n, child, fold, Rc::new(|_| {}))
}

pub fn count_with_dtor(n: usize, child: ParserRef, fold: Fold, dtor: Dtor) -> ParserRef {
    node(ParserKind::Count(n, child, fold, dtor))
}

/// Tries each alternative in order, returning the first success. On total
/// failure, merges every alternative's diagnostic into one furthest-failure
/// error (see [`Error::or`]).
pub fn or(alternatives: Vec<ParserRef>) -> ParserRef {
    node(ParserKind::Or(alternatives))
}

/// Matches every parser in `sequence` in order, folding their outputs
/// through `fold`. Atomic: if any element fails, the whole sequence rewinds
/// and every value collected so far is destroyed (in reverse order) via the
/// matching entry in `dtors`.
///
/// `dtors` must have (at least) as many entries as `sequence`; extras are
/// ignored.
pub fn and(sequence: Vec<ParserRef>, fold: Fold) -> ParserRef {
    let dtors = vec![Rc::new(|_: Value| {}) as Dtor; sequence.len()];
    and_with_dtors(sequence, fold, dtors)
}

pub fn and_with_dtors(sequence: Vec<ParserRef>, fold: Fold, dtors: Vec<Dtor>) -> ParserRef {
    node(ParserKind::And(sequence, fold, dtors))
}

/// Drop a parser's value, replacing it with `()`. Handy inside `and`/`many`
/// sequences built for their side effects (a keyword, a delimiter) whose
/// matched text isn't part of the result.
pub fn drop_value(child: ParserRef) -> ParserRef {
    apply(child, Rc::new(|_| Box::new(())))
}

/// Collect the bytes an atomic byte-literal-like sequence matched into a
/// `Vec<u8>`, by folding a `many`/`and` of `u8`-producing children.
pub fn collect_bytes(values: Vec<Value>) -> Value {
    let bytes: Vec<u8> = values
        .into_iter()
        .map(|v| *v.downcast::<u8>().expect("collect_bytes expects u8-producing children"))
        .collect();
    Box::new(bytes)
}

/// A digit `'0'..='9'`. `Range` already reports a `'0'-'9'` expected-phrase
/// on its own, so no relabeling is needed here.
pub fn digit() -> ParserRef {
    range(b'0', b'9')
}

/// An ASCII alphabetic byte. Relabeled: the un-wrapped `Or` of two ranges
/// would otherwise render as the clumsier `"'a'-'z' or 'A'-'Z'"`.
pub fn alpha() -> ParserRef {
    expect(or(vec![range(b'a', b'z'), range(b'A', b'Z')]), "a letter")
}

/// A byte from the ASCII whitespace set `" \t\r\n"`. Relabeled for the same
/// reason as [`alpha`].
pub fn whitespace() -> ParserRef {
    expect(one_of(*b" \t\r\n"), "whitespace")
}

/// Matches a fixed byte string literal. `StringLit` already reports a
/// quoted expected-phrase on its own.
pub fn string(lit: impl Into<Vec<u8>>) -> ParserRef {
    string_lit(lit)
}

/// Matches a single byte `b`. `Single` already reports a quoted
/// expected-phrase on its own.
pub fn char_lit(b: u8) -> ParserRef {
    single(b)
}
