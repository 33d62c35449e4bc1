//! The destination contract consumed by the pipe engine.
//!
//! Writable semantics live outside this crate; the pipe engine only relies
//! on the observable behavior below.

use super::buffer_list::Chunk;
use super::events::EventEmitter;

/// A sink a readable stream can be piped into.
///
/// Destinations are shared, not owned: the pipe engine holds a
/// `SharedPtr<dyn WriteSink>`, registers listeners on [`events`], and never
/// manages the sink's lifetime. One sink may be piped to by several sources
/// at once, so implementations must not assume exclusivity.
///
/// [`events`]: WriteSink::events
pub trait WriteSink {
    /// Accept a chunk. A `false` return means the chunk was buffered and the
    /// caller must not send more until this sink emits `drain`.
    fn write(&self, chunk: &Chunk) -> bool;

    /// No further chunks will arrive.
    fn end(&self);

    /// The emitter the pipe engine subscribes to (`drain`, `unpipe`) and
    /// emits on (`pipe`, `unpipe`).
    fn events(&self) -> &EventEmitter;

    /// Process-wide standard sinks are never auto-ended by `pipe`.
    fn is_std_stream(&self) -> bool {
        false
    }
}
