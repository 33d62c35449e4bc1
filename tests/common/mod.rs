//! Shared fixtures: scripted producers, a recording sink, and a push-stream
//! stand-in for wrap tests.

#![allow(dead_code)]

use evented_streams::{
    ByteSource, Chunk, EventEmitter, EventKind, LegacyStream, PullHandle, Scheduler, StreamError,
    StreamEvent, WriteSink,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Producer scripted with a fixed chunk sequence, then end of stream.
/// Completes synchronously, or on the next turn when given a scheduler.
pub struct ScriptedSource {
    chunks: VecDeque<Vec<u8>>,
    defer_to: Option<Scheduler>,
    outstanding: Rc<Cell<bool>>,
    pulls: Rc<Cell<usize>>,
}

impl ScriptedSource {
    pub fn sync(chunks: &[&[u8]]) -> Self {
        Self::build(chunks, None)
    }

    pub fn deferred(chunks: &[&[u8]], scheduler: Scheduler) -> Self {
        Self::build(chunks, Some(scheduler))
    }

    fn build(chunks: &[&[u8]], defer_to: Option<Scheduler>) -> Self {
        ScriptedSource {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            defer_to,
            outstanding: Rc::new(Cell::new(false)),
            pulls: Rc::new(Cell::new(0)),
        }
    }

    /// Number of pulls issued so far.
    pub fn pull_counter(&self) -> Rc<Cell<usize>> {
        self.pulls.clone()
    }
}

impl ByteSource for ScriptedSource {
    fn pull(&mut self, _n: usize, done: PullHandle) {
        assert!(
            !self.outstanding.replace(true),
            "a second pull was issued while one was in flight"
        );
        self.pulls.set(self.pulls.get() + 1);
        let next = self.chunks.pop_front();
        let outstanding = self.outstanding.clone();
        let complete = move || {
            outstanding.set(false);
            match next {
                Some(chunk) => done.ok(chunk),
                None => done.eof(),
            }
        };
        match &self.defer_to {
            None => complete(),
            Some(scheduler) => scheduler.defer(complete),
        }
    }
}

/// Producer that fails its first pull.
pub struct FailingSource(pub &'static str);

impl ByteSource for FailingSource {
    fn pull(&mut self, _n: usize, done: PullHandle) {
        done.fail(StreamError::from(self.0));
    }
}

/// Recording sink with scripted backpressure.
pub struct MemorySink {
    emitter: EventEmitter,
    written: RefCell<Vec<Chunk>>,
    end_calls: Cell<usize>,
    // write() returns false for these 0-based write indexes
    reject_at: Vec<usize>,
    writes: Cell<usize>,
}

impl MemorySink {
    pub fn new() -> Rc<Self> {
        Self::rejecting(&[])
    }

    pub fn rejecting(indexes: &[usize]) -> Rc<Self> {
        Rc::new(MemorySink {
            emitter: EventEmitter::new(),
            written: RefCell::new(Vec::new()),
            end_calls: Cell::new(0),
            reject_at: indexes.to_vec(),
            writes: Cell::new(0),
        })
    }

    pub fn written(&self) -> Vec<Chunk> {
        self.written.borrow().clone()
    }

    pub fn written_bytes(&self) -> Vec<u8> {
        self.written
            .borrow()
            .iter()
            .flat_map(|c| c.as_bytes().to_vec())
            .collect()
    }

    pub fn is_ended(&self) -> bool {
        self.end_calls.get() > 0
    }

    pub fn end_calls(&self) -> usize {
        self.end_calls.get()
    }

    /// Release a previously signalled backpressure stall.
    pub fn drain(&self) {
        self.emitter.emit(&StreamEvent::Drain);
    }
}

impl WriteSink for MemorySink {
    fn write(&self, chunk: &Chunk) -> bool {
        let index = self.writes.replace(self.writes.get() + 1);
        self.written.borrow_mut().push(chunk.clone());
        !self.reject_at.contains(&index)
    }

    fn end(&self) {
        self.end_calls.set(self.end_calls.get() + 1);
    }

    fn events(&self) -> &EventEmitter {
        &self.emitter
    }
}

/// Push-style stream fixture for `wrap`.
pub struct PushFixture {
    emitter: EventEmitter,
    pub paused: Cell<bool>,
    pub pause_calls: Cell<usize>,
    pub resume_calls: Cell<usize>,
}

impl PushFixture {
    pub fn new() -> Rc<Self> {
        Rc::new(PushFixture {
            emitter: EventEmitter::new(),
            paused: Cell::new(false),
            pause_calls: Cell::new(0),
            resume_calls: Cell::new(0),
        })
    }

    pub fn emit_data(&self, bytes: &[u8]) {
        self.emitter.emit(&StreamEvent::Data(Chunk::from(bytes)));
    }

    pub fn emit_end(&self) {
        self.emitter.emit(&StreamEvent::End);
    }

    pub fn emit(&self, event: &StreamEvent) {
        self.emitter.emit(event);
    }
}

impl LegacyStream for PushFixture {
    fn events(&self) -> &EventEmitter {
        &self.emitter
    }

    fn pause(&self) {
        self.paused.set(true);
        self.pause_calls.set(self.pause_calls.get() + 1);
    }

    fn resume(&self) {
        self.paused.set(false);
        self.resume_calls.set(self.resume_calls.get() + 1);
    }
}

/// Collect every `data` payload and count `end`/`readable`/`error` events.
pub struct EventLog {
    pub data: Rc<RefCell<Vec<Chunk>>>,
    pub ends: Rc<Cell<usize>>,
    pub readables: Rc<Cell<usize>>,
    pub errors: Rc<RefCell<Vec<StreamError>>>,
}

impl EventLog {
    pub fn attach(stream: &evented_streams::ReadableStream) -> Self {
        let log = EventLog {
            data: Rc::new(RefCell::new(Vec::new())),
            ends: Rc::new(Cell::new(0)),
            readables: Rc::new(Cell::new(0)),
            errors: Rc::new(RefCell::new(Vec::new())),
        };
        {
            let ends = log.ends.clone();
            stream.on(EventKind::End, move |_| ends.set(ends.get() + 1));
        }
        {
            let readables = log.readables.clone();
            stream.on(EventKind::Readable, move |_| {
                readables.set(readables.get() + 1)
            });
        }
        {
            let errors = log.errors.clone();
            stream.on(EventKind::Error, move |event| {
                if let StreamEvent::Error(err) = event {
                    errors.borrow_mut().push(err.clone());
                }
            });
        }
        log
    }

    /// Also subscribe to `data` (switches a pull stream to data-event mode).
    pub fn attach_with_data(stream: &evented_streams::ReadableStream) -> Self {
        let log = Self::attach(stream);
        let data = log.data.clone();
        stream.on(EventKind::Data, move |event| {
            if let StreamEvent::Data(chunk) = event {
                data.borrow_mut().push(chunk.clone());
            }
        });
        log
    }

    pub fn data_bytes(&self) -> Vec<u8> {
        self.data
            .borrow()
            .iter()
            .flat_map(|c| c.as_bytes().to_vec())
            .collect()
    }
}
