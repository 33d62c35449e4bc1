//! Named-event dispatch.
//!
//! `readable`, `drain` and `end` are control signals, not notifications: the
//! emitter guarantees delivery order (registration order per event) and
//! exactly-once semantics for `once` listeners, including under reentrant
//! emission.

use super::buffer_list::Chunk;
use super::error::StreamError;
use super::readable::ReadableStream;
use crate::platform::SharedPtr;
use std::cell::{Cell, RefCell};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Readable,
    Data,
    End,
    Error,
    Pipe,
    Unpipe,
    Drain,
    Close,
    Destroy,
    Pause,
    Resume,
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Readable,
    Data(Chunk),
    End,
    Error(StreamError),
    Pipe(ReadableStream),
    Unpipe(ReadableStream),
    Drain,
    Close,
    Destroy,
    Pause,
    Resume,
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            StreamEvent::Readable => EventKind::Readable,
            StreamEvent::Data(_) => EventKind::Data,
            StreamEvent::End => EventKind::End,
            StreamEvent::Error(_) => EventKind::Error,
            StreamEvent::Pipe(_) => EventKind::Pipe,
            StreamEvent::Unpipe(_) => EventKind::Unpipe,
            StreamEvent::Drain => EventKind::Drain,
            StreamEvent::Close => EventKind::Close,
            StreamEvent::Destroy => EventKind::Destroy,
            StreamEvent::Pause => EventKind::Pause,
            StreamEvent::Resume => EventKind::Resume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Callback = SharedPtr<dyn Fn(&StreamEvent)>;

struct Entry {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    callback: Callback,
}

struct EmitterInner {
    entries: RefCell<Vec<Entry>>,
    next_id: Cell<u64>,
}

/// Cheap-clone handle to a listener table.
#[derive(Clone)]
pub struct EventEmitter {
    inner: SharedPtr<EmitterInner>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        EventEmitter {
            inner: SharedPtr::new(EmitterInner {
                entries: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    pub fn on(&self, kind: EventKind, callback: impl Fn(&StreamEvent) + 'static) -> ListenerId {
        self.register(kind, false, SharedPtr::new(callback))
    }

    pub fn once(&self, kind: EventKind, callback: impl Fn(&StreamEvent) + 'static) -> ListenerId {
        self.register(kind, true, SharedPtr::new(callback))
    }

    fn register(&self, kind: EventKind, once: bool, callback: Callback) -> ListenerId {
        let id = ListenerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.entries.borrow_mut().push(Entry {
            id,
            kind,
            once,
            callback,
        });
        id
    }

    /// Returns true when a listener was actually removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut entries = self.inner.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Dispatch `event` to every matching listener, in registration order.
    ///
    /// The listener list is snapshotted first and `once` entries are
    /// deregistered before their callback runs, so listeners may freely
    /// subscribe, unsubscribe and emit from inside a callback. A plain
    /// listener removed by an earlier callback of the same dispatch is
    /// skipped.
    pub fn emit(&self, event: &StreamEvent) {
        let kind = event.kind();
        let snapshot: Vec<(ListenerId, bool, Callback)> = {
            let mut entries = self.inner.entries.borrow_mut();
            let matching: Vec<_> = entries
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| (e.id, e.once, e.callback.clone()))
                .collect();
            entries.retain(|e| e.kind != kind || !e.once);
            matching
        };
        for (id, once, callback) in snapshot {
            if !once {
                let live = self.inner.entries.borrow().iter().any(|e| e.id == id);
                if !live {
                    continue;
                }
            }
            callback(event);
        }
    }
}
