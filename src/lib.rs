//! A byte-oriented, iterative micro parser combinator engine.
//!
//! A grammar is a tree of [`ParserRef`][parser::ParserRef] nodes, built with
//! the constructors in [`combinator`], and run against one of three input
//! sources with [`parse_string`], [`parse_file`], [`parse_pipe`], or
//! [`parse_contents`]. The evaluator in [`eval`] walks that tree on its own
//! heap-allocated stack rather than the host call stack, so grammar depth
//! (a long `many`, a deeply nested `and`) never risks a stack overflow.
//!
//! ```
//! use parstack::combinator::{digit, many1};
//! use parstack::{combinator, parse_string};
//!
//! let number = many1(digit(), std::rc::Rc::new(combinator::collect_bytes));
//! let result = parse_string("input", "42", number);
//! assert!(result.is_ok());
//! ```
//!
//! Three things are deliberately *not* part of this crate: there is no
//! built-in AST, no grammar-description DSL, and no configuration surface
//! (no config files, no environment variables) — a grammar is just the Rust
//! expression tree you build out of [`combinator`]'s functions.

pub mod combinator;
pub mod error;
mod eval;
pub mod input;
pub mod parser;
pub mod state;
mod trace;

use std::fs::File;

pub use error::Error;
pub use input::Input;
pub use parser::{Value, ParserRef};
pub use state::State;

/// Run `parser` against an already-constructed [`Input`]. The entry points
/// below are thin wrappers over this that also build the `Input`; reach for
/// this one directly when a test or a caller needs to inspect the cursor
/// (e.g. its final position) after a parse attempt.
pub fn run(input: &mut Input, parser: ParserRef) -> Result<Value, Error> {
    eval::eval(input, parser)
}

/// Run `parser` against `input`, a complete in-memory string (or byte
/// buffer — anything `Into<Vec<u8>>`). `filename` is cosmetic: it only ever
/// shows up in diagnostics.
pub fn parse_string(
    filename: impl Into<String>,
    input: impl Into<Vec<u8>>,
    parser: ParserRef,
) -> Result<Value, Error> {
    let filename = filename.into();
    trace::parse_attempt(&filename, "string");
    run(&mut Input::new_string(filename, input), parser)
}

/// Run `parser` against a seekable file handle, enabling backtracking via
/// `seek` rather than an in-memory buffer.
pub fn parse_file(
    filename: impl Into<String>,
    file: impl input::ReadSeek + Send + 'static,
    parser: ParserRef,
) -> Result<Value, Error> {
    let filename = filename.into();
    trace::parse_attempt(&filename, "file");
    run(&mut Input::new_file(filename, file), parser)
}

/// Run `parser` against a non-seekable byte stream (a pipe, a socket).
/// Backtracking is supported by buffering bytes for the duration of the
/// outermost live mark; once every mark is dropped the buffer is freed and
/// the stream is never re-read.
pub fn parse_pipe(
    filename: impl Into<String>,
    pipe: impl std::io::Read + Send + 'static,
    parser: ParserRef,
) -> Result<Value, Error> {
    let filename = filename.into();
    trace::parse_attempt(&filename, "pipe");
    run(&mut Input::new_pipe(filename, pipe), parser)
}

/// Open `filename` from disk and run `parser` against it. A file that can't
/// be opened produces a [`Error::Failure`] (`"Unable to open file!"`)
/// instead of panicking or propagating an [`std::io::Error`] — this mirrors
/// every other entry point's contract of always returning a parstack
/// [`Error`], never a foreign one.
pub fn parse_contents(filename: impl Into<String>, parser: ParserRef) -> Result<Value, Error> {
    let filename = filename.into();
    match File::open(&filename) {
        Ok(file) => parse_file(filename, file, parser),
        Err(_) => Err(Error::fail(filename, State::new(), "Unable to open file!")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator as c;
    use std::io::Cursor;
    use std::rc::Rc;

    #[test]
    fn parse_string_runs_a_grammar() {
        let p = c::single(b'a');
        let v = parse_string("t", "a", p).unwrap();
        assert_eq!(*v.downcast::<u8>().unwrap(), b'a');
    }

    #[test]
    fn parse_file_backtracks_through_seek() {
        let p = c::or(vec![c::string("foo"), c::string("fob")]);
        let v = parse_file("t", Cursor::new(b"fob".to_vec()), p);
        assert!(v.is_ok());
    }

    #[test]
    fn parse_pipe_runs_a_grammar() {
        let p = c::many(c::any(), Rc::new(c::collect_bytes));
        let v = parse_pipe("t", Cursor::new(b"xyz".to_vec()), p).unwrap();
        assert_eq!(*v.downcast::<Vec<u8>>().unwrap(), b"xyz".to_vec());
    }

    #[test]
    fn parse_contents_reports_a_clean_error_for_a_missing_file() {
        let e = parse_contents("/nonexistent/parstack-test-file", c::pass()).unwrap_err();
        assert_eq!(e.to_string(), "/nonexistent/parstack-test-file: error: Unable to open file!\n");
    }
}
