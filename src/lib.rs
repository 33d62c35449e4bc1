//! Pull-based, buffered, event-driven readable streams for Rust
//!
//! This crate provides a readable byte/text stream that mediates between an
//! asynchronous producer and its consumers: direct pull reads, piped sinks
//! with backpressure, and push-style data-event listeners.
//!
//! ## Features
//!
//! - **Pull reads** with watermark-driven prefetch: `read(n)` refills the
//!   buffer before serving so synchronous producers satisfy short reads in
//!   one call.
//! - **Piping** to any number of [`WriteSink`] destinations, with fan-out
//!   ordering guarantees and `drain`-based backpressure.
//! - **Mode switching**: a pull stream can become a classic data-event
//!   stream, or wrap an existing push stream behind the pull interface.
//! - **Incremental text decoding** that never splits a code point across
//!   chunk boundaries.
//! - **Async interop**: the stream implements `futures::Stream` and
//!   `futures::io::AsyncRead`.
//!
//! ## Example
//!
//! ```
//! use evented_streams::{ByteSource, PullHandle, ReadableOptions, ReadableStream};
//!
//! struct Greeter(bool);
//!
//! impl ByteSource for Greeter {
//!     fn pull(&mut self, _n: usize, done: PullHandle) {
//!         if self.0 {
//!             done.eof();
//!         } else {
//!             self.0 = true;
//!             done.ok(&b"hello"[..]);
//!         }
//!     }
//! }
//!
//! let stream =
//!     ReadableStream::with_source(Greeter(false), ReadableOptions::default()).unwrap();
//! let chunk = stream.read(None).unwrap();
//! assert_eq!(chunk.as_bytes(), b"hello");
//! ```

// Platform abstraction layer
mod platform;

// Unified streams implementation
pub mod streams;

// Re-export everything from streams
pub use streams::*;
