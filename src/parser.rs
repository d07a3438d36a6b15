//! The combinator node model: a tagged tree (in general a DAG, for recursive
//! grammars) that the evaluator in [`crate::eval`] walks iteratively.
//!
//! A parsed value is type-erased as [`Value`] (`Box<dyn Any>`) — this is a
//! generic engine, not one tied to a particular AST, so every combinator
//! that produces or consumes a value goes through a user-supplied callback
//! (`Fold`, `Apply`, `Ctor`, `Dtor`, ...).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// A type-erased parse result. Dropping one runs the destructors of
/// whatever it contains, same as any other Rust value — the `Dtor` callback
/// exists for combinators that need to unwind a *partial* result explicitly
/// (see `And`/`Count`/`Not`) rather than for memory safety.
pub type Value = Box<dyn Any>;

pub type Dtor = Rc<dyn Fn(Value)>;
pub type Ctor = Rc<dyn Fn() -> Value>;
pub type Fold = Rc<dyn Fn(Vec<Value>) -> Value>;
pub type Apply = Rc<dyn Fn(Value) -> Value>;
pub type ApplyTo = Rc<dyn Fn(Value, Rc<dyn Any>) -> Value>;
pub type Satisfy = Rc<dyn Fn(u8) -> bool>;
pub type AnchorFn = Rc<dyn Fn(u8, u8) -> bool>;
pub type Lift = Rc<dyn Fn() -> Value>;

/// One combinator node. Constructed by the free functions in
/// [`crate::combinator`]; never built directly by callers.
pub struct ParserNode {
    pub(crate) name: RefCell<Option<String>>,
    /// Recursive/shared nodes set this so a tree walk doesn't try to treat
    /// them as uniquely owned. Rust's `Rc` already handles the underlying
    /// memory; this flag is what [`undefine`] and [`cleanup`] consult to
    /// decide whether a node is safe to detach without disturbing other
    /// referents.
    pub(crate) retained: Cell<bool>,
    pub(crate) kind: RefCell<ParserKind>,
}

/// A reference to a node. The combinator tree is a DAG built out of these —
/// recursive grammars share nodes via [`define`].
pub type ParserRef = Rc<ParserNode>;

/// The ~25 combinator kinds, tagged by variant. Each carries exactly the
/// payload its evaluator case needs.
#[derive(Clone)]
pub enum ParserKind {
    /// A forward declaration that was never tied off with [`define`].
    /// Evaluating it is a programmer error, reported as a `Failure`.
    Undefined,
    /// The result of [`define`]: dispatch transparently to the target.
    Alias(ParserRef),
    Pass,
    Fail(String),
    Lift(Lift),
    LiftVal(Lift),
    CurrentState,
    Any,
    Single(u8),
    Range(u8, u8),
    OneOf(Vec<u8>),
    NoneOf(Vec<u8>),
    Satisfy(Satisfy),
    StringLit(Vec<u8>),
    Anchor(AnchorFn),
    Expect(ParserRef, String),
    Apply(ParserRef, Apply),
    ApplyTo(ParserRef, ApplyTo, Rc<dyn Any>),
    Predict(ParserRef),
    Not(ParserRef, Dtor, Ctor),
    Maybe(ParserRef, Ctor),
    Many(ParserRef, Fold, Dtor),
    Many1(ParserRef, Fold, Dtor),
    Count(usize, ParserRef, Fold, Dtor),
    Or(Vec<ParserRef>),
    And(Vec<ParserRef>, Fold, Vec<Dtor>),
}

impl ParserKind {
    /// The variant's tag name, shared by [`fmt::Debug`] and the `debug`-feature
    /// trace dispatch in [`crate::eval`].
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            ParserKind::Undefined => "Undefined",
            ParserKind::Alias(_) => "Alias",
            ParserKind::Pass => "Pass",
            ParserKind::Fail(_) => "Fail",
            ParserKind::Lift(_) => "Lift",
            ParserKind::LiftVal(_) => "LiftVal",
            ParserKind::CurrentState => "State",
            ParserKind::Any => "Any",
            ParserKind::Single(_) => "Single",
            ParserKind::Range(_, _) => "Range",
            ParserKind::OneOf(_) => "OneOf",
            ParserKind::NoneOf(_) => "NoneOf",
            ParserKind::Satisfy(_) => "Satisfy",
            ParserKind::StringLit(_) => "StringLit",
            ParserKind::Anchor(_) => "Anchor",
            ParserKind::Expect(_, _) => "Expect",
            ParserKind::Apply(_, _) => "Apply",
            ParserKind::ApplyTo(_, _, _) => "ApplyTo",
            ParserKind::Predict(_) => "Predict",
            ParserKind::Not(_, _, _) => "Not",
            ParserKind::Maybe(_, _) => "Maybe",
            ParserKind::Many(_, _, _) => "Many",
            ParserKind::Many1(_, _, _) => "Many1",
            ParserKind::Count(_, _, _, _) => "Count",
            ParserKind::Or(_) => "Or",
            ParserKind::And(_, _, _) => "And",
        }
    }
}

impl fmt::Debug for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Closures aren't `Debug`; just name the tag, which is all a tree
        // dump over a combinator DAG can usefully show anyway.
        f.write_str(self.tag())
    }
}

pub(crate) fn node(kind: ParserKind) -> ParserRef {
    Rc::new(ParserNode {
        name: RefCell::new(None),
        retained: Cell::new(false),
        kind: RefCell::new(kind),
    })
}

/// Attach a debug name to a node, returning it for chaining. Purely
/// diagnostic — surfaces in `debug`-feature tracing, not in error messages.
pub fn named(p: ParserRef, name: impl Into<String>) -> ParserRef {
    *p.name.borrow_mut() = Some(name.into());
    p
}

/// Create a forward declaration to be tied into a recursive grammar with
/// [`define`]. Evaluating a forward declaration that was never defined is a
/// programmer error (`Failure("Parser Undefined!")`).
pub fn forward() -> ParserRef {
    let p = node(ParserKind::Undefined);
    p.retained.set(true);
    p
}

/// Tie a forward declaration to its body, closing a recursive grammar.
pub fn define(forward: &ParserRef, body: ParserRef) {
    *forward.kind.borrow_mut() = ParserKind::Alias(body);
}

/// Break a forward declaration back to `Undefined`, releasing whatever it
/// pointed at. Call this on every forward declaration in a recursive
/// grammar before the grammar itself is dropped, to guarantee the
/// `Rc`-cycle `define` may have created is actually torn down.
pub fn undefine(forward: &ParserRef) {
    *forward.kind.borrow_mut() = ParserKind::Undefined;
}

/// Undefine every forward declaration in `forwards`. The Rust analogue of
/// the honor-the-retained-flag disposal pass: once every cycle a recursive
/// grammar created has been broken this way, ordinary `Rc` drop reclaims
/// the rest of the tree on its own.
pub fn cleanup(forwards: &[ParserRef]) {
    for f in forwards {
        undefine(f);
    }
}

/// Follow a chain of [`define`]-created aliases to the real target node.
pub(crate) fn resolve(p: &ParserRef) -> ParserRef {
    let mut current = p.clone();
    loop {
        let next = match &*current.kind.borrow() {
            ParserKind::Alias(target) => Some(target.clone()),
            _ => None,
        };
        match next {
            Some(target) => current = target,
            None => return current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_is_undefined_until_defined() {
        let f = forward();
        assert!(matches!(&*f.kind.borrow(), ParserKind::Undefined));
        define(&f, node(ParserKind::Pass));
        assert!(matches!(resolve(&f).kind.borrow().clone(), ParserKind::Pass));
    }

    #[test]
    fn undefine_breaks_the_alias() {
        let f = forward();
        define(&f, node(ParserKind::Pass));
        undefine(&f);
        assert!(matches!(&*f.kind.borrow(), ParserKind::Undefined));
    }

    #[test]
    fn resolve_follows_multiple_hops() {
        let target = node(ParserKind::Pass);
        let middle = forward();
        define(&middle, target.clone());
        let outer = forward();
        define(&outer, middle);
        assert!(Rc::ptr_eq(&resolve(&outer), &target));
    }
}
