//! Structured parse diagnostics and the furthest-failure merge algebra.
//!
//! An [`Error`] is either a [`Error::Failure`] — a fatal, position-agnostic
//! message produced by [`fail`][crate::combinator::fail], an undefined
//! forward declaration, or file-open failures — or an [`Error::Expected`],
//! the normal shape produced when a primitive fails to match: a position and
//! a deduplicated set of "expected" phrases. The evaluator never discards an
//! `Expected` error outright; it folds every one it sees through [`Error::or`]
//! so the final diagnostic always points at the furthest byte reached.

use std::fmt;

use crate::state::State;

/// A parse diagnostic.
///
/// Rendered with [`Display`][fmt::Display] per the format fixed by the
/// library's contract (tests assert on the exact text):
///
/// - `Failure` renders as `"<file>: error: <message>\n"`.
/// - `Expected` renders as
///   `"<file>:<row+1>:<col+1>: error: expected <e1>, <e2> or <eN> at <received>\n"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A non-positional, message-only failure. Dominates `Expected` errors
    /// at the same position when merged.
    Failure {
        filename: String,
        state: State,
        message: String,
    },
    /// A positional miss: the furthest point reached and what would have
    /// been accepted there.
    Expected {
        filename: String,
        state: State,
        expected: Vec<String>,
        received: u8,
    },
}

impl Error {
    /// Build a fresh single-expected error.
    pub fn expected(
        filename: impl Into<String>,
        state: State,
        expected: impl Into<String>,
        received: u8,
    ) -> Self {
        Error::Expected {
            filename: filename.into(),
            state,
            expected: vec![expected.into()],
            received,
        }
    }

    /// Build a failure (fatal-style, no alternatives).
    pub fn fail(filename: impl Into<String>, state: State, message: impl Into<String>) -> Self {
        Error::Failure {
            filename: filename.into(),
            state,
            message: message.into(),
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            Error::Failure { filename, .. } | Error::Expected { filename, .. } => filename,
        }
    }

    pub fn state(&self) -> State {
        match self {
            Error::Failure { state, .. } | Error::Expected { state, .. } => *state,
        }
    }

    /// Set-membership test against the expected list (always false for a
    /// `Failure`, which carries no expected set).
    pub fn contains_expected(&self, phrase: &str) -> bool {
        match self {
            Error::Expected { expected, .. } => expected.iter().any(|e| e == phrase),
            Error::Failure { .. } => false,
        }
    }

    /// Add a phrase to the expected set if it isn't already present. A
    /// no-op on a `Failure`.
    pub fn add_expected(&mut self, phrase: impl Into<String>) {
        if let Error::Expected { expected, .. } = self {
            let phrase = phrase.into();
            if !expected.iter().any(|e| *e == phrase) {
                expected.push(phrase);
            }
        }
    }

    /// Merge a non-empty batch of errors, keeping only the diagnostics at
    /// the maximum position reached.
    ///
    /// If any contributor at that position is a [`Error::Failure`], it wins
    /// outright (the first one encountered) and every `Expected` set at that
    /// position is dropped. Otherwise the expected phrases of every
    /// contributor at the max position are unioned (deduplicated), and the
    /// received byte recorded is that of the *first* contributor at the max
    /// position.
    ///
    /// Consumes every operand — there is no partial ownership left over.
    pub fn or(errors: Vec<Error>) -> Error {
        assert!(!errors.is_empty(), "Error::or requires at least one error");

        let filename = errors[0].filename().to_string();
        let mut max_state = State::invalid();
        for e in &errors {
            if e.state().pos > max_state.pos {
                max_state = e.state();
            }
        }

        let mut failure: Option<String> = None;
        let mut received: Option<u8> = None;
        let mut merged = Error::Expected {
            filename: filename.clone(),
            state: max_state,
            expected: Vec::new(),
            received: 0,
        };

        for e in &errors {
            if e.state().pos < max_state.pos {
                continue;
            }
            match e {
                Error::Failure { message, .. } => {
                    failure = Some(message.clone());
                    break;
                }
                Error::Expected {
                    expected: exp,
                    received: r,
                    ..
                } => {
                    if received.is_none() {
                        received = Some(*r);
                    }
                    for phrase in exp {
                        merged.add_expected(phrase.clone());
                    }
                }
            }
        }

        if let Some(message) = failure {
            Error::Failure {
                filename,
                state: max_state,
                message,
            }
        } else {
            if let Error::Expected { received: r, .. } = &mut merged {
                *r = received.unwrap_or(0);
            }
            merged
        }
    }

    /// Collapse the expected set into a single phrase `"<prefix><joined>"`,
    /// where `joined` is the usual `"e1, e2, ... or eN"` rendering. Used by
    /// `Many1` (prefix `"one or more of "`) and `Count` (prefix `"<n> of "`).
    ///
    /// A `Failure` passes through unchanged — repetition only ever prefixes
    /// the expected set of a genuine miss.
    pub fn repeat(self, prefix: &str) -> Error {
        match self {
            Error::Failure { .. } => self,
            Error::Expected {
                filename,
                state,
                expected,
                received,
            } => {
                let joined = join_or(&expected);
                Error::Expected {
                    filename,
                    state,
                    expected: vec![format!("{prefix}{joined}")],
                    received,
                }
            }
        }
    }

    /// Prefix as required by a failed `Many1` whose very first attempt
    /// missed: `"one or more of <expected>"`.
    pub fn many1(self) -> Error {
        self.repeat("one or more of ")
    }

    /// Prefix as required by a failed `Count`: `"<n> of <expected>"`.
    pub fn count(self, n: usize) -> Error {
        self.repeat(&format!("{n} of "))
    }
}

impl Default for Error {
    /// An inert placeholder, only ever used as a throwaway during
    /// [`std::mem::take`]; never surfaced to a caller.
    fn default() -> Self {
        Error::Failure {
            filename: String::new(),
            state: State::invalid(),
            message: String::new(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Failure {
                filename, message, ..
            } => write!(f, "{filename}: error: {message}\n"),
            Error::Expected {
                filename,
                state,
                expected,
                received,
            } => {
                let list = if expected.is_empty() {
                    "ERROR: NOTHING EXPECTED".to_string()
                } else {
                    join_or(expected)
                };
                write!(
                    f,
                    "{}:{}:{}: error: expected {} at {}\n",
                    filename,
                    state.row + 1,
                    state.col + 1,
                    list,
                    describe_byte(*received)
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Join expected phrases as `"e1, e2, ... or eN"` (single phrase: itself).
fn join_or(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        _ => {
            let (last, rest) = items.split_last().expect("non-empty");
            let (second_last, head) = rest.split_last().expect("len >= 2");
            let mut out = String::new();
            for item in head {
                out.push_str(item);
                out.push_str(", ");
            }
            out.push_str(second_last);
            out.push_str(" or ");
            out.push_str(last);
            out
        }
    }
}

/// Describe a received byte the way error messages do: a bare name for the
/// common control characters and end-of-input, `'x'` otherwise.
pub fn describe_byte(b: u8) -> String {
    match b {
        0x07 => "bell".to_string(),
        0x08 => "backspace".to_string(),
        0x0c => "formfeed".to_string(),
        0x0d => "carriage return".to_string(),
        0x0b => "vertical tab".to_string(),
        0x00 => "end of input".to_string(),
        0x0a => "newline".to_string(),
        0x09 => "tab".to_string(),
        0x20 => "space".to_string(),
        _ => format!("'{}'", b as char),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exp(pos: i64, phrase: &str, received: u8) -> Error {
        Error::expected("f", State { pos, row: 0, col: pos }, phrase, received)
    }

    #[test]
    fn or_keeps_only_the_furthest_position() {
        let merged = Error::or(vec![exp(1, "'a'", b'x'), exp(3, "'b'", b'y')]);
        assert_eq!(merged.state().pos, 3);
        match merged {
            Error::Expected { expected, .. } => assert_eq!(expected, vec!["'b'".to_string()]),
            _ => panic!("expected Expected"),
        }
    }

    #[test]
    fn or_dedups_and_unions_expected_at_the_max_position() {
        let merged = Error::or(vec![exp(2, "'a'", b'x'), exp(2, "'b'", b'x'), exp(2, "'a'", b'x')]);
        match merged {
            Error::Expected { expected, .. } => {
                assert_eq!(expected, vec!["'a'".to_string(), "'b'".to_string()])
            }
            _ => panic!("expected Expected"),
        }
    }

    #[test]
    fn or_records_the_first_contributor_received_byte_at_max_pos() {
        let merged = Error::or(vec![exp(2, "'a'", b'x'), exp(2, "'b'", b'y')]);
        match merged {
            Error::Expected { received, .. } => assert_eq!(received, b'x'),
            _ => panic!("expected Expected"),
        }
    }

    #[test]
    fn or_prefers_a_failure_at_the_max_position() {
        let fail = Error::fail("f", State { pos: 5, row: 0, col: 5 }, "boom");
        let merged = Error::or(vec![exp(5, "'a'", b'x'), fail.clone()]);
        assert_eq!(merged, fail);
    }

    #[test]
    fn many1_prefixes_a_single_expected_phrase() {
        let e = exp(0, "'0'-'9'", b'a').many1();
        match e {
            Error::Expected { expected, .. } => {
                assert_eq!(expected, vec!["one or more of '0'-'9'".to_string()])
            }
            _ => panic!("expected Expected"),
        }
    }

    #[test]
    fn count_prefixes_with_n() {
        let e = exp(0, "'x'", b'y').count(3);
        match e {
            Error::Expected { expected, .. } => {
                assert_eq!(expected, vec!["3 of 'x'".to_string()])
            }
            _ => panic!("expected Expected"),
        }
    }

    #[test]
    fn display_matches_scenario_single_mismatch() {
        let e = Error::expected("test", State { pos: 1, row: 0, col: 1 }, "'a'", b'b');
        assert_eq!(e.to_string(), "test:1:2: error: expected 'a' at 'b'\n");
    }

    #[test]
    fn display_end_of_input_is_unquoted() {
        let e = Error::expected("test", State::new(), "'a'", 0);
        assert_eq!(e.to_string(), "test:1:1: error: expected 'a' at end of input\n");
    }

    #[test]
    fn display_failure_has_no_position() {
        let e = Error::fail("test", State::new(), "Parser Undefined!");
        assert_eq!(e.to_string(), "test: error: Parser Undefined!\n");
    }

    #[test]
    fn contains_expected_matches_exactly() {
        let e = exp(0, "'a'", b'x');
        assert!(e.contains_expected("'a'"));
        assert!(!e.contains_expected("'b'"));
    }
}
