//! The iterative evaluator.
//!
//! Walks a combinator tree against an [`Input`], maintaining its own
//! heap-allocated continuation stack instead of recursing through the host
//! call stack. Grammar nesting depth (a long chain of `Many`/`And`, a deeply
//! left-recursive-looking list) is then bounded only by available memory,
//! not by the size of the process stack.
//!
//! Every combinator kind is one of two shapes here: a primitive that
//! produces a result immediately ([`eval_step`] returns [`Task::Feed`]), or
//! a composite that pushes a [`Cont`] describing what to do with its
//! child's result and asks to evaluate that child ([`Task::Eval`]).
//! [`resume`] is the matching half: given a finished child result and the
//! `Cont` on top of the stack, it either produces a final result or pushes
//! another child to evaluate.

use std::any::Any;
use std::rc::Rc;

use crate::error::Error;
use crate::input::{Consume, Input};
use crate::parser::{resolve, Apply, ApplyTo, Ctor, Dtor, Fold, ParserKind, ParserRef, Value};

type EvalResult = Result<Value, Error>;

enum Cont {
    Expect(String),
    Apply(Apply),
    ApplyTo(ApplyTo, Rc<dyn Any>),
    Predict,
    Not(Dtor, Ctor),
    Maybe(Ctor),
    Many {
        child: ParserRef,
        fold: Fold,
        acc: Vec<Value>,
    },
    Many1 {
        child: ParserRef,
        fold: Fold,
        acc: Vec<Value>,
    },
    Count {
        n: usize,
        child: ParserRef,
        fold: Fold,
        dtor: Dtor,
        acc: Vec<Value>,
    },
    Or {
        rest: std::vec::IntoIter<ParserRef>,
        errs: Vec<Error>,
    },
    And {
        rest: std::vec::IntoIter<ParserRef>,
        fold: Fold,
        dtors: Vec<Dtor>,
        acc: Vec<Value>,
    },
}

enum Task {
    Eval(ParserRef),
    Feed(EvalResult),
}

/// Evaluate `start` against `input`, consuming bytes and returning either
/// the parsed value or the furthest-reaching diagnostic the attempt
/// produced.
///
/// `errors` accumulates every diagnostic recovered from along the way — a
/// losing `Or` alternative, a `Not`/`Maybe` child that failed and was
/// swallowed into a default, a `Many`/`Many1` repetition's terminating miss
/// — none of which are themselves returned, but which still happened. If the
/// parse as a whole fails, that failure is merged with everything in
/// `errors` so the final error reports the furthest position reached along
/// any path considered, not just the one the last frame happened to be on.
/// A successful parse discards `errors` untouched.
pub fn eval(input: &mut Input, start: ParserRef) -> EvalResult {
    let mut stack: Vec<Cont> = Vec::new();
    let mut errors: Vec<Error> = Vec::new();
    let mut task = Task::Eval(start);
    loop {
        task = match task {
            Task::Eval(node) => eval_step(input, node, &mut stack),
            Task::Feed(result) => match stack.pop() {
                Some(cont) => resume(input, cont, result, &mut stack, &mut errors),
                None => {
                    return match result {
                        Ok(v) => Ok(v),
                        Err(e) => {
                            errors.push(e);
                            Err(Error::or(errors))
                        }
                    };
                }
            },
        };
    }
}

/// A byte primitive never advances on mismatch (`Input`'s consumption
/// methods unread the offending byte), so the current state already *is*
/// the failure position — no separate rewind step is needed the way the
/// atomic composites (`StringLit`, `And`, `Count`) require.
fn expected_primitive(filename: &str, input: &Input, consumed: Consume, phrase: impl Into<String>) -> Task {
    match consumed {
        Consume::Matched(b) => Task::Feed(Ok(Box::new(b))),
        Consume::Eof => Task::Feed(Err(Error::expected(filename.to_string(), input.state(), phrase, 0))),
        Consume::Mismatch(b) => Task::Feed(Err(Error::expected(filename.to_string(), input.state(), phrase, b))),
    }
}

fn quoted_char(b: u8) -> String {
    format!("'{}'", b as char)
}

fn chars_list(set: &[u8]) -> String {
    set.iter().map(|b| quoted_char(*b)).collect::<Vec<_>>().join(", ")
}

fn eval_step(input: &mut Input, node: ParserRef, stack: &mut Vec<Cont>) -> Task {
    let node = resolve(&node);
    let filename = input.filename().to_string();
    let kind = node.kind.borrow().clone();
    crate::trace::dispatch(&filename, node.name.borrow().as_deref(), kind.tag());

    match kind {
        ParserKind::Undefined => {
            Task::Feed(Err(Error::fail(filename, input.state(), "Parser Undefined!")))
        }
        ParserKind::Alias(_) => unreachable!("resolve() already followed every alias"),
        ParserKind::Pass => Task::Feed(Ok(Box::new(()))),
        ParserKind::Fail(message) => Task::Feed(Err(Error::fail(filename, input.state(), message))),
        ParserKind::Lift(f) | ParserKind::LiftVal(f) => Task::Feed(Ok(f())),
        ParserKind::CurrentState => Task::Feed(Ok(Box::new(input.state()))),
        ParserKind::Any => match input.any() {
            Some(b) => Task::Feed(Ok(Box::new(b))),
            None => Task::Feed(Err(Error::expected(filename, input.state(), "any character", 0))),
        },
        ParserKind::Single(want) => {
            let phrase = quoted_char(want);
            expected_primitive(&filename, input, input.single(want), phrase)
        }
        ParserKind::Range(lo, hi) => {
            let phrase = format!("{}-{}", quoted_char(lo), quoted_char(hi));
            expected_primitive(&filename, input, input.range(lo, hi), phrase)
        }
        ParserKind::OneOf(set) => {
            let phrase = format!("one of {}", chars_list(&set));
            expected_primitive(&filename, input, input.one_of(&set), phrase)
        }
        ParserKind::NoneOf(set) => {
            let phrase = format!("none of {}", chars_list(&set));
            expected_primitive(&filename, input, input.none_of(&set), phrase)
        }
        ParserKind::Satisfy(pred) => {
            expected_primitive(&filename, input, input.satisfy(|b| pred(b)), "a matching byte")
        }
        ParserKind::StringLit(lit) => {
            let phrase = format!("\"{}\"", String::from_utf8_lossy(&lit));
            input.mark();
            match input.literal_no_rewind(&lit) {
                Consume::Matched(_) => {
                    input.unmark();
                    Task::Feed(Ok(Box::new(())))
                }
                Consume::Mismatch(b) => {
                    // Capture the diagnostic at the actual mismatch point,
                    // then restore the cursor — atomicity governs the input
                    // position, not where the error says the miss was.
                    let state = input.state();
                    input.rewind();
                    Task::Feed(Err(Error::expected(filename, state, phrase, b)))
                }
                Consume::Eof => {
                    let state = input.state();
                    input.rewind();
                    Task::Feed(Err(Error::expected(filename, state, phrase, 0)))
                }
            }
        }
        ParserKind::Anchor(pred) => {
            if input.anchor(|a, b| pred(a, b)) {
                Task::Feed(Ok(Box::new(())))
            } else {
                let received = input.peek();
                Task::Feed(Err(Error::expected(filename, input.state(), "anchor", received)))
            }
        }
        ParserKind::Expect(child, message) => {
            stack.push(Cont::Expect(message));
            Task::Eval(child)
        }
        ParserKind::Apply(child, f) => {
            stack.push(Cont::Apply(f));
            Task::Eval(child)
        }
        ParserKind::ApplyTo(child, f, data) => {
            stack.push(Cont::ApplyTo(f, data));
            Task::Eval(child)
        }
        ParserKind::Predict(child) => {
            input.backtrack_disable();
            stack.push(Cont::Predict);
            Task::Eval(child)
        }
        ParserKind::Not(child, dtor, ctor) => {
            input.mark();
            stack.push(Cont::Not(dtor, ctor));
            Task::Eval(child)
        }
        ParserKind::Maybe(child, ctor) => {
            stack.push(Cont::Maybe(ctor));
            Task::Eval(child)
        }
        ParserKind::Many(child, fold, _dtor) => {
            stack.push(Cont::Many {
                child: child.clone(),
                fold,
                acc: Vec::new(),
            });
            Task::Eval(child)
        }
        ParserKind::Many1(child, fold, _dtor) => {
            stack.push(Cont::Many1 {
                child: child.clone(),
                fold,
                acc: Vec::new(),
            });
            Task::Eval(child)
        }
        ParserKind::Count(n, child, fold, dtor) => {
            input.mark();
            if n == 0 {
                input.unmark();
                return Task::Feed(Ok(fold(Vec::new())));
            }
            stack.push(Cont::Count {
                n,
                child: child.clone(),
                fold,
                dtor,
                acc: Vec::new(),
            });
            Task::Eval(child)
        }
        ParserKind::Or(children) => {
            if children.is_empty() {
                return Task::Feed(Ok(Box::new(())));
            }
            let mut rest = children.into_iter();
            let first = rest.next().expect("checked non-empty");
            stack.push(Cont::Or {
                rest,
                errs: Vec::new(),
            });
            Task::Eval(first)
        }
        ParserKind::And(children, fold, dtors) => {
            if children.is_empty() {
                return Task::Feed(Ok(fold(Vec::new())));
            }
            input.mark();
            let mut rest = children.into_iter();
            let first = rest.next().expect("checked non-empty");
            stack.push(Cont::And {
                rest,
                fold,
                dtors,
                acc: Vec::new(),
            });
            Task::Eval(first)
        }
    }
}

fn resume(
    input: &mut Input,
    cont: Cont,
    result: EvalResult,
    stack: &mut Vec<Cont>,
    errors: &mut Vec<Error>,
) -> Task {
    match cont {
        Cont::Expect(message) => match result {
            Ok(v) => Task::Feed(Ok(v)),
            Err(_) => {
                let received = input.peek();
                Task::Feed(Err(Error::expected(
                    input.filename(),
                    input.state(),
                    message,
                    received,
                )))
            }
        },
        Cont::Apply(f) => Task::Feed(result.map(|v| f(v))),
        Cont::ApplyTo(f, data) => Task::Feed(result.map(|v| f(v, data))),
        Cont::Predict => {
            input.backtrack_enable();
            Task::Feed(result)
        }
        Cont::Not(dtor, ctor) => match result {
            Ok(v) => {
                input.rewind();
                dtor(v);
                let received = input.peek();
                Task::Feed(Err(Error::expected(
                    input.filename(),
                    input.state(),
                    "opposite",
                    received,
                )))
            }
            Err(e) => {
                input.unmark();
                errors.push(e);
                Task::Feed(Ok(ctor()))
            }
        },
        Cont::Maybe(ctor) => match result {
            Ok(v) => Task::Feed(Ok(v)),
            Err(e) => {
                errors.push(e);
                Task::Feed(Ok(ctor()))
            }
        },
        Cont::Many { child, fold, mut acc } => match result {
            Ok(v) => {
                acc.push(v);
                let next = child.clone();
                stack.push(Cont::Many { child, fold, acc });
                Task::Eval(next)
            }
            Err(e) => {
                errors.push(e);
                Task::Feed(Ok(fold(acc)))
            }
        },
        Cont::Many1 { child, fold, mut acc } => match result {
            Ok(v) => {
                acc.push(v);
                let next = child.clone();
                stack.push(Cont::Many1 { child, fold, acc });
                Task::Eval(next)
            }
            Err(e) => {
                if acc.is_empty() {
                    Task::Feed(Err(e.many1()))
                } else {
                    errors.push(e);
                    Task::Feed(Ok(fold(acc)))
                }
            }
        },
        Cont::Count {
            n,
            child,
            fold,
            dtor,
            mut acc,
        } => match result {
            Ok(v) => {
                acc.push(v);
                if acc.len() == n {
                    input.unmark();
                    Task::Feed(Ok(fold(acc)))
                } else {
                    let next = child.clone();
                    stack.push(Cont::Count {
                        n,
                        child,
                        fold,
                        dtor,
                        acc,
                    });
                    Task::Eval(next)
                }
            }
            Err(e) => {
                input.rewind();
                for v in acc.into_iter().rev() {
                    dtor(v);
                }
                Task::Feed(Err(e.count(n)))
            }
        },
        Cont::Or { mut rest, mut errs } => match result {
            Ok(v) => {
                errors.append(&mut errs);
                Task::Feed(Ok(v))
            }
            Err(e) => {
                errs.push(e);
                match rest.next() {
                    Some(next) => {
                        stack.push(Cont::Or { rest, errs });
                        Task::Eval(next)
                    }
                    None => Task::Feed(Err(Error::or(errs))),
                }
            }
        },
        Cont::And {
            mut rest,
            fold,
            dtors,
            mut acc,
        } => match result {
            Ok(v) => {
                acc.push(v);
                match rest.next() {
                    Some(next) => {
                        stack.push(Cont::And {
                            rest,
                            fold,
                            dtors,
                            acc,
                        });
                        Task::Eval(next)
                    }
                    None => {
                        input.unmark();
                        Task::Feed(Ok(fold(acc)))
                    }
                }
            }
            Err(e) => {
                input.rewind();
                for (v, d) in acc.into_iter().zip(dtors.iter()).rev() {
                    d(v);
                }
                Task::Feed(Err(e))
            }
        },
    }
}
