//! The readable-stream core: read buffer and watermarks, producer protocol,
//! pull reads, the pipe engine and the end-of-stream lifecycle.
//!
//! The engine mediates between an asynchronous producer ([`ByteSource`]) and
//! its consumers: direct [`read`] calls, piped [`WriteSink`] destinations,
//! and data-event listeners. Everything runs on one cooperative context;
//! turn boundaries are [`Scheduler::run`].
//!
//! [`read`]: ReadableStream::read

use super::buffer_list::{BufferList, Chunk};
use super::decoder::{Encoding, TextDecoder};
use super::error::StreamError;
use super::events::{EventEmitter, EventKind, ListenerId, StreamEvent};
use super::legacy::Mode;
use super::scheduler::Scheduler;
use super::writable::WriteSink;
use crate::platform::{SharedPtr, WeakPtr};
use futures::io::AsyncRead;
use futures::stream::Stream;
use log::trace;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

pub type StreamResult<T> = Result<T, StreamError>;

/// Default per-call hint passed to the producer.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;
/// Default threshold below which the engine proactively refills.
pub const DEFAULT_LOW_WATER_MARK: usize = 1024;

/// Construction-time configuration.
#[derive(Clone)]
pub struct ReadableOptions {
    /// Desired byte count per producer call.
    pub buffer_size: usize,
    /// Refill threshold; an explicit zero refills only once a read would
    /// drain the buffer completely.
    pub low_water_mark: usize,
    /// Text encoding label; when set, chunks are decoded before buffering.
    pub encoding: Option<String>,
    /// Deferred-task queue to share with the embedding loop. A private one
    /// is created when absent.
    pub scheduler: Option<Scheduler>,
}

impl Default for ReadableOptions {
    fn default() -> Self {
        ReadableOptions {
            buffer_size: DEFAULT_BUFFER_SIZE,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            encoding: None,
            scheduler: None,
        }
    }
}

/// Options for [`ReadableStream::pipe`].
#[derive(Clone)]
pub struct PipeOptions {
    /// End the destination when this source ends. Defaults to true.
    pub end: bool,
    /// Fixed read size for the flow loop; `None` reads whatever is buffered.
    pub chunk_size: Option<usize>,
}

impl Default for PipeOptions {
    fn default() -> Self {
        PipeOptions {
            end: true,
            chunk_size: None,
        }
    }
}

/// The user-supplied producer.
///
/// The engine guarantees at most one outstanding `pull` at a time. The
/// handle must be completed exactly once (the affine type enforces it),
/// either before `pull` returns (synchronous) or on a later turn.
pub trait ByteSource {
    fn pull(&mut self, n: usize, done: PullHandle);
}

/// Completion handle for one producer call.
///
/// An empty or absent chunk signals end of stream. Completing a handle whose
/// stream has been dropped is a no-op.
pub struct PullHandle {
    core: Option<WeakPtr<StreamCore>>,
}

impl PullHandle {
    pub fn complete(mut self, result: StreamResult<Option<Chunk>>) {
        if let Some(core) = self.core.take().and_then(|w| w.upgrade()) {
            on_pull_complete(&core, result);
        }
    }

    pub fn ok(self, chunk: impl Into<Chunk>) {
        self.complete(Ok(Some(chunk.into())));
    }

    pub fn eof(self) {
        self.complete(Ok(None));
    }

    pub fn fail(self, err: StreamError) {
        self.complete(Err(err));
    }
}

impl Drop for PullHandle {
    fn drop(&mut self) {
        if self.core.is_some() {
            log::debug!("pull handle dropped without completion; stream will stall");
        }
    }
}

pub(crate) struct ReadState {
    pub(crate) buffer_size: usize,
    pub(crate) low_water_mark: usize,
    pub(crate) buffer: RefCell<BufferList>,
    pub(crate) length: Cell<usize>,
    pub(crate) flowing: Cell<bool>,
    pub(crate) ended: Cell<bool>,
    pub(crate) end_emitted: Cell<bool>,
    pub(crate) reading: Cell<bool>,
    // distinguishes a completion that ran before `pull` returned
    pub(crate) sync: Cell<bool>,
    pub(crate) pull_again: Cell<bool>,
    pub(crate) need_readable: Cell<bool>,
    pub(crate) decoder: RefCell<Option<TextDecoder>>,
    pub(crate) pipes: RefCell<Vec<SharedPtr<dyn WriteSink>>>,
}

pub(crate) struct StreamCore {
    pub(crate) state: ReadState,
    pub(crate) source: RefCell<Option<Box<dyn ByteSource>>>,
    pub(crate) emitter: EventEmitter,
    pub(crate) scheduler: Scheduler,
    pub(crate) mode: RefCell<Mode>,
    pub(crate) stored_error: RefCell<Option<StreamError>>,
    pub(crate) waker: RefCell<Option<Waker>>,
}

/// A pull-based, buffered, event-driven source of bytes or decoded text.
///
/// Cheap to clone; clones share the same stream. Identity is pointer
/// identity ([`same`]).
///
/// [`same`]: ReadableStream::same
#[derive(Clone)]
pub struct ReadableStream {
    pub(crate) core: SharedPtr<StreamCore>,
}

impl fmt::Debug for ReadableStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = &self.core.state;
        f.debug_struct("ReadableStream")
            .field("buffered", &st.length.get())
            .field("flowing", &st.flowing.get())
            .field("ended", &st.ended.get())
            .finish()
    }
}

/// Builder mirroring [`ReadableOptions`], for call-site ergonomics.
#[derive(Default)]
pub struct ReadableStreamBuilder {
    options: ReadableOptions,
    source: Option<Box<dyn ByteSource>>,
}

impl ReadableStreamBuilder {
    pub fn source(mut self, source: impl ByteSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn buffer_size(mut self, n: usize) -> Self {
        self.options.buffer_size = n;
        self
    }

    pub fn low_water_mark(mut self, n: usize) -> Self {
        self.options.low_water_mark = n;
        self
    }

    pub fn encoding(mut self, label: &str) -> Self {
        self.options.encoding = Some(label.to_string());
        self
    }

    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.options.scheduler = Some(scheduler);
        self
    }

    pub fn build(self) -> StreamResult<ReadableStream> {
        ReadableStream::from_parts(self.source, self.options)
    }
}

impl ReadableStream {
    pub fn builder() -> ReadableStreamBuilder {
        ReadableStreamBuilder::default()
    }

    /// A stream with no producer installed: every refill attempt reports
    /// [`StreamError::NotImplemented`] on the next turn.
    pub fn new(options: ReadableOptions) -> StreamResult<Self> {
        Self::from_parts(None, options)
    }

    pub fn with_source(
        source: impl ByteSource + 'static,
        options: ReadableOptions,
    ) -> StreamResult<Self> {
        Self::from_parts(Some(Box::new(source)), options)
    }

    fn from_parts(
        source: Option<Box<dyn ByteSource>>,
        options: ReadableOptions,
    ) -> StreamResult<Self> {
        let decoder = match &options.encoding {
            Some(label) => Some(TextDecoder::new(Encoding::from_label(label)?)),
            None => None,
        };
        Ok(ReadableStream {
            core: SharedPtr::new(StreamCore {
                state: ReadState {
                    buffer_size: options.buffer_size,
                    low_water_mark: options.low_water_mark,
                    buffer: RefCell::new(BufferList::new()),
                    length: Cell::new(0),
                    flowing: Cell::new(false),
                    ended: Cell::new(false),
                    end_emitted: Cell::new(false),
                    reading: Cell::new(false),
                    sync: Cell::new(false),
                    pull_again: Cell::new(false),
                    need_readable: Cell::new(false),
                    decoder: RefCell::new(decoder),
                    pipes: RefCell::new(Vec::new()),
                },
                source: RefCell::new(source),
                emitter: EventEmitter::new(),
                scheduler: options.scheduler.unwrap_or_default(),
                mode: RefCell::new(Mode::Pull),
                stored_error: RefCell::new(None),
                waker: RefCell::new(None),
            }),
        })
    }

    pub(crate) fn from_core(core: SharedPtr<StreamCore>) -> Self {
        ReadableStream { core }
    }

    /// Pointer identity: do two handles refer to the same stream?
    pub fn same(&self, other: &ReadableStream) -> bool {
        SharedPtr::ptr_eq(&self.core, &other.core)
    }

    // ----------- event surface -----------

    pub fn events(&self) -> &EventEmitter {
        &self.core.emitter
    }

    pub fn scheduler(&self) -> Scheduler {
        self.core.scheduler.clone()
    }

    /// Subscribe. A first `data` subscription on a pull-mode stream that is
    /// not pipe-flowing switches it to data-event emission, irreversibly.
    pub fn on(&self, kind: EventKind, f: impl Fn(&StreamEvent) + 'static) -> ListenerId {
        let id = self.core.emitter.on(kind, f);
        if kind == EventKind::Data {
            self.data_listener_added();
        }
        id
    }

    pub fn once(&self, kind: EventKind, f: impl Fn(&StreamEvent) + 'static) -> ListenerId {
        let id = self.core.emitter.once(kind, f);
        if kind == EventKind::Data {
            self.data_listener_added();
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.core.emitter.remove_listener(id)
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.core.emitter.listener_count(kind)
    }

    pub(crate) fn emit_event(&self, event: &StreamEvent) {
        if let StreamEvent::Error(err) = event {
            *self.core.stored_error.borrow_mut() = Some(err.clone());
        }
        self.core.emitter.emit(event);
        if matches!(
            event.kind(),
            EventKind::Readable | EventKind::End | EventKind::Error
        ) {
            if let Some(waker) = self.core.waker.borrow_mut().take() {
                waker.wake();
            }
        }
    }

    // ----------- accessors -----------

    pub fn buffered_len(&self) -> usize {
        self.core.state.length.get()
    }

    pub fn is_flowing(&self) -> bool {
        self.core.state.flowing.get()
    }

    pub fn is_ended(&self) -> bool {
        self.core.state.ended.get()
    }

    // ----------- pull-read engine -----------

    /// How much a `read(n)` can return right now. Arms `need_readable` when
    /// the ask exceeds the buffer and the producer has not ended.
    pub(crate) fn plan(&self, n: Option<usize>) -> usize {
        let st = &self.core.state;
        let length = st.length.get();
        if length == 0 && st.ended.get() {
            return 0;
        }
        match n {
            None => length,
            Some(0) => 0,
            Some(n) if n > length => {
                if st.ended.get() {
                    length
                } else {
                    st.need_readable.set(true);
                    0
                }
            }
            Some(n) => n,
        }
    }

    /// Pull up to `n` bytes. `None` means "all buffered". A `None` return
    /// means nothing is available now; a `readable` event follows once data
    /// or end-of-stream arrives.
    pub fn read(&self, n: Option<usize>) -> Option<Chunk> {
        if self.is_wrapped() {
            return self.wrap_read(n);
        }
        let st = &self.core.state;

        let mut available = self.plan(n);
        if available == 0 && st.ended.get() {
            self.finalize_end();
            return None;
        }

        // Refill before the physical take, so a synchronous producer can
        // satisfy an otherwise-short read in this very call.
        let refill = (st.need_readable.get()
            || st.length.get().saturating_sub(available) <= st.low_water_mark)
            && !st.ended.get()
            && !st.reading.get();
        if refill {
            st.reading.set(true);
            self.start_pull();
            if !st.reading.get() {
                // completed synchronously; the buffer may have grown
                available = self.plan(n);
            }
        }

        let result = if available > 0 {
            st.buffer.borrow_mut().take(Some(available), st.length.get())
        } else {
            None
        };
        let returned = match &result {
            Some(chunk) if !chunk.is_empty() => chunk.len(),
            _ => {
                st.need_readable.set(true);
                0
            }
        };
        st.length.set(st.length.get() - returned);
        if returned > 0 {
            trace!("read: returning {} bytes, {} buffered", returned, st.length.get());
        }
        result.filter(|chunk| !chunk.is_empty())
    }

    /// Drive the producer. `reading` must already be set by the caller.
    ///
    /// A synchronous completion that wants a tail-refill sets `pull_again`
    /// instead of recursing, and this loop issues the next call, so the
    /// boxed source is moved out only once per synchronous extent.
    pub(crate) fn start_pull(&self) {
        let st = &self.core.state;
        loop {
            let source = self.core.source.borrow_mut().take();
            let Some(mut source) = source else {
                st.reading.set(false);
                let this = self.clone();
                self.core.scheduler.defer(move || {
                    this.emit_event(&StreamEvent::Error(StreamError::NotImplemented));
                });
                return;
            };
            st.sync.set(true);
            st.pull_again.set(false);
            trace!("pull: requesting {} bytes", st.buffer_size);
            source.pull(
                st.buffer_size,
                PullHandle {
                    core: Some(SharedPtr::downgrade(&self.core)),
                },
            );
            st.sync.set(false);
            *self.core.source.borrow_mut() = Some(source);
            if !st.pull_again.get() {
                break;
            }
        }
    }

    // ----------- end-of-stream finalizer -----------

    /// Idempotent, and only once the buffer is drained. `end` always fires
    /// on a turn boundary, never from inside the call that drained the
    /// buffer.
    pub(crate) fn finalize_end(&self) {
        let st = &self.core.state;
        if st.end_emitted.get() || st.length.get() > 0 {
            return;
        }
        st.ended.set(true);
        st.end_emitted.set(true);
        trace!("end: buffer drained, scheduling terminal event");
        let this = self.clone();
        self.core
            .scheduler
            .defer(move || this.emit_event(&StreamEvent::End));
    }

    // ----------- encoding -----------

    /// Attach a text decoder; subsequent producer chunks are decoded before
    /// buffering. Bytes already buffered are decoded immediately so the
    /// buffer stays homogeneous.
    pub fn set_encoding(&self, label: &str) -> StreamResult<()> {
        let mut decoder = TextDecoder::new(Encoding::from_label(label)?);
        let st = &self.core.state;
        let old = st.buffer.borrow_mut().replace(Vec::new());
        if !old.is_empty() {
            let mut chunks = Vec::new();
            let mut length = 0;
            for chunk in old {
                let text = match chunk {
                    Chunk::Text(t) => t,
                    Chunk::Bytes(b) => decoder.write(&b),
                };
                if !text.is_empty() {
                    length += text.len();
                    chunks.push(Chunk::Text(text));
                }
            }
            st.buffer.borrow_mut().replace(chunks);
            st.length.set(length);
        }
        *st.decoder.borrow_mut() = Some(decoder);
        Ok(())
    }

    // ----------- pipe engine -----------

    /// Attach a destination and start (or join) the flowing loop. Chainable:
    /// returns the destination handle.
    pub fn pipe(
        &self,
        dest: SharedPtr<dyn WriteSink>,
        options: PipeOptions,
    ) -> SharedPtr<dyn WriteSink> {
        let st = &self.core.state;
        st.pipes.borrow_mut().push(dest.clone());
        trace!("pipe: destination attached ({} total)", st.pipes.borrow().len());

        if options.end && !dest.is_std_stream() {
            // auto-end wiring, scoped to this source/destination pair: gone
            // again as soon as this source is unpiped from the destination
            let end_id = {
                let dest = dest.clone();
                self.core
                    .emitter
                    .once(EventKind::End, move |_| dest.end())
            };
            let unpipe_id = SharedPtr::new(Cell::new(None));
            let weak_src = SharedPtr::downgrade(&self.core);
            let dest_events = dest.events().clone();
            let id = {
                let dest_events = dest_events.clone();
                let unpipe_id = unpipe_id.clone();
                dest.events().on(EventKind::Unpipe, move |event| {
                    let StreamEvent::Unpipe(unpiped) = event else {
                        return;
                    };
                    match weak_src.upgrade() {
                        Some(core) if SharedPtr::ptr_eq(&unpiped.core, &core) => {
                            core.emitter.remove_listener(end_id);
                        }
                        Some(_) => return, // a different source detached
                        None => {}         // our source is gone; just clean up
                    }
                    if let Some(own) = unpipe_id.take() {
                        dest_events.remove_listener(own);
                    }
                })
            };
            unpipe_id.set(Some(id));
        }

        dest.events().emit(&StreamEvent::Pipe(self.clone()));

        if !st.flowing.get() {
            st.flowing.set(true);
            trace!("pipe: entering flowing mode");
            let weak = SharedPtr::downgrade(&self.core);
            self.core.scheduler.defer(move || {
                if let Some(core) = weak.upgrade() {
                    flow(&ReadableStream::from_core(core), &options);
                }
            });
        }
        dest
    }

    /// Detach one destination, or all of them. Emits `unpipe` on each
    /// removed destination; a second detach of the same destination is a
    /// no-op. The flow loop notices an empty destination set on its next
    /// iteration; `flowing` is not cleared here.
    pub fn unpipe(&self, dest: Option<&SharedPtr<dyn WriteSink>>) -> &Self {
        let removed: Vec<SharedPtr<dyn WriteSink>> = {
            let mut pipes = self.core.state.pipes.borrow_mut();
            match dest {
                None => pipes.drain(..).collect(),
                Some(d) => match pipes.iter().position(|p| SharedPtr::ptr_eq(p, d)) {
                    Some(ix) => vec![pipes.remove(ix)],
                    None => Vec::new(),
                },
            }
        };
        for dest in removed {
            trace!("unpipe: destination detached");
            dest.events().emit(&StreamEvent::Unpipe(self.clone()));
        }
        self
    }
}

/// The flowing loop: read a chunk, fan it out to every destination, emit
/// `data`, repeat. Suspends on backpressure (until every `drain` owed has
/// fired) or on an empty buffer (until `readable`).
fn flow(src: &ReadableStream, options: &PipeOptions) {
    let st = &src.core.state;
    loop {
        if st.pipes.borrow().is_empty() {
            break;
        }
        let Some(chunk) = src.read(options.chunk_size) else {
            trace!("flow: buffer empty, waiting for readable");
            let weak = SharedPtr::downgrade(&src.core);
            let options = options.clone();
            src.core.emitter.once(EventKind::Readable, move |_| {
                if let Some(core) = weak.upgrade() {
                    flow(&ReadableStream::from_core(core), &options);
                }
            });
            return;
        };

        let dests: Vec<SharedPtr<dyn WriteSink>> = st.pipes.borrow().clone();
        let pending = SharedPtr::new(Cell::new(0usize));
        for dest in &dests {
            if !dest.write(&chunk) {
                pending.set(pending.get() + 1);
                let pending = pending.clone();
                let weak = SharedPtr::downgrade(&src.core);
                let options = options.clone();
                dest.events().once(EventKind::Drain, move |_| {
                    pending.set(pending.get() - 1);
                    if pending.get() == 0 {
                        if let Some(core) = weak.upgrade() {
                            flow(&ReadableStream::from_core(core), &options);
                        }
                    }
                });
            }
        }
        src.emit_event(&StreamEvent::Data(chunk));
        if pending.get() > 0 {
            trace!("flow: suspended on {} drain obligation(s)", pending.get());
            return;
        }
    }

    // every destination is gone
    st.flowing.set(false);
    trace!("flow: no destinations left, leaving flowing mode");
    if src.core.emitter.listener_count(EventKind::Data) > 0 {
        // a data listener keeps the bytes moving in data-event mode
        let _ = src.enter_data_mode();
    }
}

/// Producer-callback processing (one per completed pull).
fn on_pull_complete(core: &SharedPtr<StreamCore>, result: StreamResult<Option<Chunk>>) {
    let stream = ReadableStream::from_core(core.clone());
    let st = &core.state;
    let sync = st.sync.get();
    st.reading.set(false);

    // a zero-length chunk signals end of stream, same as an absent one
    let result = match result {
        Ok(Some(chunk)) if chunk.is_empty() => Ok(None),
        other => other,
    };

    match result {
        Err(err) => {
            trace!("pull: producer error: {}", err);
            stream.emit_event(&StreamEvent::Error(err));
        }
        Ok(None) => {
            trace!("pull: end of stream (sync={})", sync);
            st.ended.set(true);
            flush_decoder(st);
            if !sync {
                if st.length.get() > 0 {
                    stream.emit_event(&StreamEvent::Readable);
                } else {
                    stream.finalize_end();
                }
            }
        }
        Ok(Some(chunk)) => {
            if let Some(chunk) = decode_chunk(st, chunk) {
                let len = chunk.len();
                st.buffer.borrow_mut().push(chunk);
                st.length.set(st.length.get() + len);
                trace!(
                    "pull: {} bytes buffered ({} total, sync={})",
                    len,
                    st.length.get(),
                    sync
                );
            }
            if st.length.get() <= st.low_water_mark && !st.ended.get() {
                // tail-refill to cross the watermark
                st.reading.set(true);
                if sync {
                    st.pull_again.set(true);
                } else {
                    stream.start_pull();
                }
            } else if st.need_readable.get() && !sync {
                st.need_readable.set(false);
                stream.emit_event(&StreamEvent::Readable);
            }
        }
    }
}

/// Run a raw chunk through the decoder when one is attached. `None` when
/// the decoder swallowed everything (partial sequence held back).
pub(crate) fn decode_chunk(st: &ReadState, chunk: Chunk) -> Option<Chunk> {
    let mut decoder = st.decoder.borrow_mut();
    match decoder.as_mut() {
        None => Some(chunk),
        Some(d) => {
            let text = d.write(chunk.as_bytes());
            if text.is_empty() {
                None
            } else {
                Some(Chunk::Text(text))
            }
        }
    }
}

/// At end of stream, a dangling partial sequence decodes to U+FFFD.
pub(crate) fn flush_decoder(st: &ReadState) {
    let tail = match st.decoder.borrow_mut().as_mut() {
        Some(d) => d.finish(),
        None => return,
    };
    if !tail.is_empty() {
        st.length.set(st.length.get() + tail.len());
        st.buffer.borrow_mut().push(Chunk::Text(tail));
    }
}

// ----------- async ecosystem adapters -----------

impl Stream for ReadableStream {
    type Item = StreamResult<Chunk>;

    /// Chunk-at-a-time polling. Each poll is a turn boundary: pending
    /// deferred work runs first.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            this.core.scheduler.run();
            if let Some(err) = this.core.stored_error.borrow_mut().take() {
                return Poll::Ready(Some(Err(err)));
            }
            if let Some(chunk) = this.read(None) {
                return Poll::Ready(Some(Ok(chunk)));
            }
            let st = &this.core.state;
            if st.end_emitted.get() || (st.ended.get() && st.length.get() == 0) {
                return Poll::Ready(None);
            }
            // the read itself may have surfaced an error or deferred work
            if this.core.stored_error.borrow().is_some() {
                continue;
            }
            if this.core.scheduler.is_idle() {
                break;
            }
        }
        *this.core.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl AsyncRead for ReadableStream {
    /// Byte-oriented polling for byte-mode streams.
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        loop {
            this.core.scheduler.run();
            if let Some(err) = this.core.stored_error.borrow_mut().take() {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, err.to_string())));
            }
            let st = &this.core.state;
            // one read both serves buffered bytes and, on an empty buffer,
            // arms need_readable plus a refill (which may fill synchronously)
            let want = match st.length.get() {
                0 => buf.len(),
                len => buf.len().min(len),
            };
            if let Some(chunk) = this.read(Some(want)) {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk.as_bytes()[..n]);
                return Poll::Ready(Ok(n));
            }
            if st.ended.get() && st.length.get() == 0 {
                let _ = this.read(None); // runs the end finalizer
                return Poll::Ready(Ok(0));
            }
            if st.length.get() > 0 || this.core.stored_error.borrow().is_some() {
                continue;
            }
            if this.core.scheduler.is_idle() {
                break;
            }
        }
        *this.core.waker.borrow_mut() = Some(cx.waker().clone());
        Poll::Pending
    }
}
