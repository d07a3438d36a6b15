//! The three-mode input abstraction: `String`, `File`, and `Pipe`.
//!
//! All three present the same byte-at-a-time surface with mark/rewind/unmark
//! backtracking. `String` and `File` can always seek; `Pipe` cannot, so it
//! grows a lookahead buffer for the duration that a mark is live (see
//! [`Input::mark`]).

use std::io::{Read, Seek, SeekFrom};

use crate::state::State;
use crate::trace;

/// Something that can both be read from and seeked within — the bound a
/// `File`-mode source needs to support backtracking without buffering.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

enum Source {
    Str(Vec<u8>),
    File(Box<dyn ReadSeek + Send>),
    Pipe(Box<dyn Read + Send>),
}

impl Source {
    fn is_pipe(&self) -> bool {
        matches!(self, Source::Pipe(_))
    }
}

/// The live cursor over one of the three input kinds, plus everything
/// needed to backtrack through it.
pub struct Input {
    filename: String,
    state: State,
    last: u8,
    /// Nestable counter; backtracking primitives are no-ops while this is
    /// below 1. [`Input::backtrack_disable`]/[`Input::backtrack_enable`]
    /// adjust it in balanced pairs around `Predict`.
    backtrack: i32,
    marks: Vec<(State, u8)>,
    source: Source,
    /// Set once the underlying `File`/`Pipe` reader has reported EOF.
    eof: bool,
    /// Single-byte pushback simulating `ungetc` for non-seekable pipes.
    pipe_pending: Option<u8>,
    /// Bytes consumed since `marks[0]` was pushed. `Some` iff at least one
    /// mark is live on a `Pipe` source; grows only past its tail.
    pipe_buffer: Option<Vec<u8>>,
}

/// What a single consumption attempt against the input produced.
enum Consumed {
    Matched(u8),
    Eof,
    Mismatch(u8),
}

impl Input {
    pub fn new_string(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Input {
            filename: filename.into(),
            state: State::new(),
            last: 0,
            backtrack: 1,
            marks: Vec::new(),
            source: Source::Str(bytes.into()),
            eof: false,
            pipe_pending: None,
            pipe_buffer: None,
        }
    }

    pub fn new_file(filename: impl Into<String>, file: impl ReadSeek + Send + 'static) -> Self {
        Input {
            filename: filename.into(),
            state: State::new(),
            last: 0,
            backtrack: 1,
            marks: Vec::new(),
            source: Source::File(Box::new(file)),
            eof: false,
            pipe_pending: None,
            pipe_buffer: None,
        }
    }

    pub fn new_pipe(filename: impl Into<String>, pipe: impl Read + Send + 'static) -> Self {
        Input {
            filename: filename.into(),
            state: State::new(),
            last: 0,
            backtrack: 1,
            marks: Vec::new(),
            source: Source::Pipe(Box::new(pipe)),
            eof: false,
            pipe_pending: None,
            pipe_buffer: None,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    pub fn terminated(&self) -> bool {
        match &self.source {
            Source::Str(bytes) => self.state.pos as usize >= bytes.len(),
            Source::File(_) | Source::Pipe(_) => self.eof,
        }
    }

    fn buffer_in_range(&self) -> bool {
        match (&self.pipe_buffer, self.marks.first()) {
            (Some(buf), Some((mark0, _))) => self.state.pos < mark0.pos + buf.len() as i64,
            _ => false,
        }
    }

    fn buffer_get(&self) -> u8 {
        let mark0_pos = self.marks[0].0.pos;
        let idx = (self.state.pos - mark0_pos) as usize;
        self.pipe_buffer.as_ref().expect("buffer engaged")[idx]
    }

    /// Read one raw byte from the underlying `File`/`Pipe` handle, setting
    /// `eof` on a short read.
    fn raw_read_byte(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        let read = match &mut self.source {
            Source::Str(_) => unreachable!("raw_read_byte only used for File/Pipe"),
            Source::File(f) => f.read(&mut buf),
            Source::Pipe(r) => r.read(&mut buf),
        };
        match read {
            Ok(1) => Some(buf[0]),
            _ => {
                self.eof = true;
                None
            }
        }
    }

    fn seek_back_one(&mut self) {
        if let Source::File(f) = &mut self.source {
            let _ = f.seek(SeekFrom::Current(-1));
        }
    }

    /// Fetch the next raw byte without advancing `state`. Does not
    /// distinguish EOF from a real `\0` byte — callers must check
    /// [`Input::terminated`] immediately afterwards, mirroring the order the
    /// consumption primitives use it in.
    fn getc(&mut self) -> u8 {
        if let Source::Str(bytes) = &self.source {
            let pos = self.state.pos as usize;
            return bytes.get(pos).copied().unwrap_or(0);
        }
        if self.source.is_pipe() {
            if let Some(b) = self.pipe_pending.take() {
                return b;
            }
            if self.buffer_in_range() {
                return self.buffer_get();
            }
        }
        self.raw_read_byte().unwrap_or(0)
    }

    /// Peek the next byte without advancing, or 0 at EOF.
    pub fn peek(&mut self) -> u8 {
        if let Source::Str(bytes) = &self.source {
            let pos = self.state.pos as usize;
            return bytes.get(pos).copied().unwrap_or(0);
        }
        if self.source.is_pipe() {
            if let Some(b) = self.pipe_pending {
                return b;
            }
            if self.buffer_in_range() {
                return self.buffer_get();
            }
            return match self.raw_read_byte() {
                Some(b) => {
                    self.pipe_pending = Some(b);
                    b
                }
                None => 0,
            };
        }
        match self.raw_read_byte() {
            Some(b) => {
                self.seek_back_one();
                b
            }
            None => 0,
        }
    }

    /// Undo a failed consumption attempt on the raw byte `c` that was
    /// fetched via `getc`.
    fn unread(&mut self, c: u8) {
        match &self.source {
            Source::Str(_) => {}
            Source::File(_) => self.seek_back_one(),
            Source::Pipe(_) => {
                if !self.buffer_in_range() {
                    self.pipe_pending = Some(c);
                }
            }
        }
    }

    /// Commit a successfully matched byte: advance position, append to the
    /// pipe lookahead buffer if one is live and not already covering this
    /// byte, and record it as `last`.
    fn commit(&mut self, c: u8) {
        if self.source.is_pipe() && self.pipe_buffer.is_some() && !self.buffer_in_range() {
            self.pipe_buffer.as_mut().expect("buffer engaged").push(c);
        }
        self.last = c;
        self.state.advance(c);
    }

    fn try_consume(&mut self, pred: impl FnOnce(u8) -> bool) -> Consumed {
        let x = self.getc();
        if self.terminated() {
            return Consumed::Eof;
        }
        if pred(x) {
            self.commit(x);
            Consumed::Matched(x)
        } else {
            self.unread(x);
            Consumed::Mismatch(x)
        }
    }

    pub fn any(&mut self) -> Option<u8> {
        match self.try_consume(|_| true) {
            Consumed::Matched(b) => Some(b),
            Consumed::Eof | Consumed::Mismatch(_) => None,
        }
    }

    pub fn single(&mut self, want: u8) -> Consume {
        self.consume(|b| b == want)
    }

    pub fn range(&mut self, lo: u8, hi: u8) -> Consume {
        self.consume(|b| b >= lo && b <= hi)
    }

    pub fn one_of(&mut self, set: &[u8]) -> Consume {
        self.consume(|b| set.contains(&b))
    }

    pub fn none_of(&mut self, set: &[u8]) -> Consume {
        self.consume(|b| !set.contains(&b))
    }

    pub fn satisfy(&mut self, pred: impl FnOnce(u8) -> bool) -> Consume {
        self.consume(pred)
    }

    fn consume(&mut self, pred: impl FnOnce(u8) -> bool) -> Consume {
        match self.try_consume(pred) {
            Consumed::Matched(b) => Consume::Matched(b),
            Consumed::Eof => Consume::Eof,
            Consumed::Mismatch(b) => Consume::Mismatch(b),
        }
    }

    /// Consume a byte literal atomically: either every byte matches and
    /// `state` ends up past the whole literal, or nothing is consumed.
    pub fn literal(&mut self, lit: &[u8]) -> Consume {
        self.mark();
        let outcome = self.literal_no_rewind(lit);
        match outcome {
            Consume::Matched(_) => self.unmark(),
            Consume::Eof | Consume::Mismatch(_) => self.rewind(),
        }
        outcome
    }

    /// Consume a byte literal byte-by-byte, leaving the cursor wherever the
    /// mismatch occurred on failure instead of restoring it — callers that
    /// need the mismatch position for a diagnostic (before deciding whether
    /// and when to rewind) use this directly instead of [`Input::literal`].
    pub(crate) fn literal_no_rewind(&mut self, lit: &[u8]) -> Consume {
        for &want in lit {
            match self.consume(|b| b == want) {
                Consume::Matched(_) => {}
                miss @ (Consume::Eof | Consume::Mismatch(_)) => return miss,
            }
        }
        Consume::Matched(0)
    }

    /// Zero-width lookaround over `(last consumed byte, next byte)`.
    pub fn anchor(&mut self, pred: impl FnOnce(u8, u8) -> bool) -> bool {
        let next = self.peek();
        pred(self.last, next)
    }

    pub fn backtrack_disable(&mut self) {
        self.backtrack -= 1;
    }

    pub fn backtrack_enable(&mut self) {
        self.backtrack += 1;
    }

    /// Push a backtracking mark. A no-op while backtracking is disabled.
    /// The first live mark on a `Pipe` source engages the lookahead buffer.
    pub fn mark(&mut self) {
        if self.backtrack < 1 {
            return;
        }
        trace::mark(&self.filename, self.state);
        self.marks.push((self.state, self.last));
        if self.source.is_pipe() && self.marks.len() == 1 {
            self.pipe_buffer = Some(Vec::new());
        }
    }

    /// Pop the top mark without restoring. Releases the pipe lookahead
    /// buffer when the last mark is dropped.
    pub fn unmark(&mut self) {
        if self.backtrack < 1 {
            return;
        }
        self.marks.pop();
        if self.source.is_pipe() && self.marks.is_empty() {
            self.pipe_buffer = None;
        }
    }

    /// Restore to the top mark and pop it.
    pub fn rewind(&mut self) {
        if self.backtrack < 1 {
            return;
        }
        let (state, last) = *self.marks.last().expect("rewind without a live mark");
        trace::rewind(&self.filename, self.state, state);
        self.state = state;
        self.last = last;
        if let Source::File(f) = &mut self.source {
            let _ = f.seek(SeekFrom::Start(state.pos as u64));
        }
        self.unmark();
    }
}

/// Outcome of one consumption primitive, distinguishing EOF from a genuine
/// byte mismatch so the caller can build the right `received` descriptor.
pub enum Consume {
    Matched(u8),
    Eof,
    Mismatch(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn string_single_match_and_mismatch() {
        let mut i = Input::new_string("t", "ab");
        assert!(matches!(i.single(b'a'), Consume::Matched(b'a')));
        assert_eq!(i.state().pos, 1);
        assert!(matches!(i.single(b'x'), Consume::Mismatch(b'b')));
        assert_eq!(i.state().pos, 1, "failed match must not advance");
    }

    #[test]
    fn string_eof_is_reported() {
        let mut i = Input::new_string("t", "");
        assert!(matches!(i.single(b'a'), Consume::Eof));
    }

    #[test]
    fn mark_rewind_restores_position() {
        let mut i = Input::new_string("t", "abc");
        i.mark();
        i.single(b'a');
        i.single(b'b');
        i.rewind();
        assert_eq!(i.state().pos, 0);
        assert!(matches!(i.single(b'a'), Consume::Matched(b'a')));
    }

    #[test]
    fn backtrack_disabled_makes_mark_rewind_noops() {
        let mut i = Input::new_string("t", "ab");
        i.backtrack_disable();
        i.mark();
        i.single(b'a');
        i.rewind();
        assert_eq!(i.state().pos, 1, "rewind must be a no-op while disabled");
    }

    #[test]
    fn literal_is_atomic_on_mismatch() {
        let mut i = Input::new_string("t", "fob");
        assert!(matches!(i.literal(b"foo"), Consume::Mismatch(b'b')));
        assert_eq!(i.state().pos, 0, "partial literal match must rewind");
    }

    #[test]
    fn file_backtracks_via_seek() {
        // A Cursor<Vec<u8>> is Read + Seek, standing in for a real file.
        let mut i = Input::new_file("t", Cursor::new(b"hello".to_vec()));
        i.mark();
        assert!(matches!(i.single(b'h'), Consume::Matched(b'h')));
        assert!(matches!(i.single(b'e'), Consume::Matched(b'e')));
        i.rewind();
        assert_eq!(i.state().pos, 0);
        assert!(matches!(i.single(b'h'), Consume::Matched(b'h')));
    }

    /// A `Read` that only ever yields one byte per call, to exercise the
    /// pipe lookahead buffer the way a slow pipe would.
    struct OneByteAtATime(std::collections::VecDeque<u8>);

    impl Read for OneByteAtATime {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    #[test]
    fn pipe_buffers_only_while_a_mark_is_live() {
        let mut i = Input::new_pipe("t", OneByteAtATime(b"abc".iter().copied().collect()));
        assert!(matches!(i.single(b'a'), Consume::Matched(b'a')));
        // No mark live yet: nothing should be buffered.
        i.mark();
        assert!(matches!(i.single(b'b'), Consume::Matched(b'b')));
        i.rewind();
        assert_eq!(i.state().pos, 1);
        // Replayed from the buffer, not the (already-drained) pipe.
        assert!(matches!(i.single(b'b'), Consume::Matched(b'b')));
        assert!(matches!(i.single(b'c'), Consume::Matched(b'c')));
    }

    #[test]
    fn pipe_peek_then_consume_agree() {
        let mut i = Input::new_pipe("t", OneByteAtATime(b"xy".iter().copied().collect()));
        assert_eq!(i.peek(), b'x');
        assert!(matches!(i.single(b'x'), Consume::Matched(b'x')));
        assert_eq!(i.peek(), b'y');
    }
}
