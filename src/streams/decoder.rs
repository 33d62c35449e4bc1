//! Incremental text decoding for chunked input.
//!
//! A multi-byte sequence split across producer chunks is held back until the
//! next chunk completes it, so consumers always observe whole code points.

use super::error::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    pub fn from_label(label: &str) -> Result<Encoding, StreamError> {
        match label.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            other => Err(StreamError::UnknownEncoding(other.to_string())),
        }
    }
}

/// Expected total length of a UTF-8 sequence given its leading byte, or 0
/// for a byte that cannot lead a sequence.
fn utf8_seq_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn is_continuation(b: u8) -> bool {
    (0x80..=0xBF).contains(&b)
}

#[derive(Debug)]
pub struct TextDecoder {
    encoding: Encoding,
    // trailing partial sequence, at most 3 carried bytes
    carry: [u8; 4],
    carry_len: usize,
}

impl TextDecoder {
    pub fn new(encoding: Encoding) -> Self {
        TextDecoder {
            encoding,
            carry: [0; 4],
            carry_len: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decode `data`, returning every complete code point. May return an
    /// empty string when `data` only extends a pending partial sequence.
    pub fn write(&mut self, data: &[u8]) -> String {
        match self.encoding {
            Encoding::Latin1 => data.iter().map(|&b| b as char).collect(),
            Encoding::Utf8 => self.write_utf8(data),
        }
    }

    /// Signal end of input: a dangling partial sequence decodes to U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.carry_len == 0 {
            return String::new();
        }
        self.carry_len = 0;
        '\u{FFFD}'.to_string()
    }

    fn write_utf8(&mut self, data: &[u8]) -> String {
        let mut out = String::with_capacity(data.len());
        let mut pos = 0;

        // First finish any sequence carried over from the previous chunk.
        if self.carry_len > 0 {
            let expected = utf8_seq_len(self.carry[0]);
            while self.carry_len < expected && pos < data.len() && is_continuation(data[pos]) {
                self.carry[self.carry_len] = data[pos];
                self.carry_len += 1;
                pos += 1;
            }
            if self.carry_len == expected {
                match std::str::from_utf8(&self.carry[..expected]) {
                    Ok(s) => out.push_str(s),
                    Err(_) => out.push('\u{FFFD}'),
                }
                self.carry_len = 0;
            } else if pos < data.len() {
                // a non-continuation byte cut the sequence short
                out.push('\u{FFFD}');
                self.carry_len = 0;
            } else {
                // chunk exhausted, keep waiting
                return out;
            }
        }

        // Hold back a trailing partial sequence, if any.
        let body_end = {
            let rest = &data[pos..];
            let mut end = rest.len();
            for back in 1..=3.min(rest.len()) {
                let b = rest[rest.len() - back];
                if is_continuation(b) {
                    continue;
                }
                let expected = utf8_seq_len(b);
                if expected > back {
                    end = rest.len() - back;
                }
                break;
            }
            pos + end
        };

        out.push_str(&String::from_utf8_lossy(&data[pos..body_end]));
        let tail = &data[body_end..];
        self.carry[..tail.len()].copy_from_slice(tail);
        self.carry_len = tail.len();
        out
    }
}
