//! Execution tracing, gated behind the `debug` feature.
//!
//! Nothing here runs, and the `tracing` dependency isn't even pulled in,
//! unless the feature is turned on. With it on, every mark/rewind and every
//! top-level parse attempt emits a `tracing` event at `trace` level so a
//! caller can wire up a subscriber (`tracing_subscriber::fmt()`, a test-local
//! `tracing::subscriber::set_default`, whatever fits) to watch a grammar
//! execute.

#[cfg(feature = "debug")]
use crate::state::State;

#[cfg(feature = "debug")]
pub(crate) fn parse_attempt(filename: &str, kind: &str) {
    tracing::trace!(target: "parstack", filename, kind, "starting parse");
}

/// One node dispatch: its debug name, if [`crate::combinator::named`] set
/// one, and its tag. The only place a node's name is ever read.
#[cfg(feature = "debug")]
pub(crate) fn dispatch(filename: &str, name: Option<&str>, kind: &str) {
    tracing::trace!(target: "parstack", filename, name, kind, "dispatch");
}

#[cfg(feature = "debug")]
pub(crate) fn mark(filename: &str, at: State) {
    tracing::trace!(target: "parstack", filename, pos = at.pos, "mark");
}

#[cfg(feature = "debug")]
pub(crate) fn rewind(filename: &str, from: State, to: State) {
    tracing::trace!(
        target: "parstack",
        filename,
        from = from.pos,
        to = to.pos,
        "rewind"
    );
}

#[cfg(not(feature = "debug"))]
pub(crate) fn parse_attempt(_filename: &str, _kind: &str) {}

#[cfg(not(feature = "debug"))]
pub(crate) fn dispatch(_filename: &str, _name: Option<&str>, _kind: &str) {}

#[cfg(not(feature = "debug"))]
pub(crate) fn mark(_filename: &str, _at: crate::state::State) {}

#[cfg(not(feature = "debug"))]
pub(crate) fn rewind(_filename: &str, _from: crate::state::State, _to: crate::state::State) {}
