//! Ordered queue of chunks with O(1) push and a `take(n)` that preserves
//! byte order across chunk boundaries.

use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;

/// A contiguous slice of bytes, or of decoded text, delivered as one unit.
///
/// Byte chunks are `Bytes`, so slicing shares the underlying storage; text
/// chunks are owned `String` fragments produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Bytes(Bytes),
    Text(String),
}

impl Chunk {
    pub fn len(&self) -> usize {
        match self {
            Chunk::Bytes(b) => b.len(),
            Chunk::Text(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Bytes(b) => b,
            Chunk::Text(s) => s.as_bytes(),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Chunk::Text(_))
    }

    /// Split off the first `n` bytes; `self` keeps the remainder.
    ///
    /// For text chunks `n` must lie on a char boundary; `BufferList`
    /// adjusts requested sizes before calling this.
    fn split_to(&mut self, n: usize) -> Chunk {
        match self {
            Chunk::Bytes(b) => Chunk::Bytes(b.split_to(n)),
            Chunk::Text(s) => {
                let rest = s.split_off(n);
                Chunk::Text(std::mem::replace(s, rest))
            }
        }
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk::Bytes(b)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(v: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for Chunk {
    fn from(v: &[u8]) -> Self {
        Chunk::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Text(s.to_string())
    }
}

/// Largest char-boundary offset of `s` that is `<= n`.
fn floor_char_boundary(s: &str, n: usize) -> usize {
    if n >= s.len() {
        return s.len();
    }
    let mut i = n;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char-boundary offset of `s` that is `>= n`.
fn ceil_char_boundary(s: &str, n: usize) -> usize {
    if n >= s.len() {
        return s.len();
    }
    let mut i = n;
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// For a text chunk, adjust a requested split of `want` bytes to a char
/// boundary. Rounds down, except that a first code point longer than the
/// request is taken whole when nothing has been gathered yet, so a reader
/// always makes progress.
fn boundary_adjust(chunk: &Chunk, want: usize, gathered: usize) -> usize {
    match chunk {
        Chunk::Bytes(_) => want,
        Chunk::Text(s) => {
            let down = floor_char_boundary(s, want);
            if down == 0 && gathered == 0 {
                ceil_char_boundary(s, want)
            } else {
                down
            }
        }
    }
}

/// Ordered sequence of chunks. `total_len` always equals the sum of chunk
/// lengths; the list is empty iff `total_len` is zero.
#[derive(Debug, Default)]
pub struct BufferList {
    chunks: VecDeque<Chunk>,
}

impl BufferList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.chunks.push_back(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_len(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    /// Replace the whole list with `chunks` (used when re-encoding buffered
    /// data after `set_encoding`). Returns the old contents.
    pub fn replace(&mut self, chunks: Vec<Chunk>) -> Vec<Chunk> {
        let old = std::mem::take(&mut self.chunks);
        self.chunks = chunks.into();
        old.into()
    }

    /// Remove and return the first `n` bytes, preserving order across chunk
    /// boundaries. `length` is the caller-tracked total buffered length.
    ///
    /// `n` of `None`, zero, or `>= length` yields the full concatenation and
    /// clears the list. Returns `None` only when the list is empty.
    pub fn take(&mut self, n: Option<usize>, length: usize) -> Option<Chunk> {
        if self.chunks.is_empty() {
            return None;
        }

        let n = match n {
            None | Some(0) => return Some(self.concat_all()),
            Some(n) if n >= length => return Some(self.concat_all()),
            Some(n) => n,
        };

        let first_len = self.chunks[0].len();
        if n < first_len {
            let front = &mut self.chunks[0];
            let cut = boundary_adjust(front, n, 0);
            if cut == front.len() {
                return self.chunks.pop_front();
            }
            return Some(front.split_to(cut));
        }
        if n == first_len {
            return self.chunks.pop_front();
        }

        // Spans several chunks: consume whole front chunks, then split the
        // last one needed.
        let text = self.chunks[0].is_text();
        let mut bytes_out = BytesMut::with_capacity(if text { 0 } else { n });
        let mut text_out = String::with_capacity(if text { n } else { 0 });
        let mut gathered = 0;
        while gathered < n {
            let Some(front) = self.chunks.front_mut() else {
                break;
            };
            let want = n - gathered;
            let part = if want >= front.len() {
                self.chunks.pop_front().unwrap()
            } else {
                let cut = boundary_adjust(front, want, gathered);
                if cut == 0 {
                    break;
                }
                front.split_to(cut)
            };
            gathered += part.len();
            if text {
                match part {
                    Chunk::Text(t) => text_out.push_str(&t),
                    Chunk::Bytes(b) => text_out.push_str(&String::from_utf8_lossy(&b)),
                }
            } else {
                bytes_out.extend_from_slice(part.as_bytes());
            }
        }
        Some(if text {
            Chunk::Text(text_out)
        } else {
            Chunk::Bytes(bytes_out.freeze())
        })
    }

    fn concat_all(&mut self) -> Chunk {
        if self.chunks.len() == 1 {
            return self.chunks.pop_front().unwrap();
        }
        let text = self.chunks.front().map(Chunk::is_text).unwrap_or(false);
        if text {
            let mut s = String::new();
            for c in self.chunks.drain(..) {
                match c {
                    Chunk::Text(t) => s.push_str(&t),
                    Chunk::Bytes(b) => s.push_str(&String::from_utf8_lossy(&b)),
                }
            }
            Chunk::Text(s)
        } else {
            let mut buf = BytesMut::new();
            for c in self.chunks.drain(..) {
                buf.extend_from_slice(c.as_bytes());
            }
            Chunk::Bytes(buf.freeze())
        }
    }
}
