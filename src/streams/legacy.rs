//! Mode switching: data-event emission and wrapping of legacy push streams.
//!
//! A stream starts in pull mode. It may irreversibly enter data-event mode
//! (`on(Data, ..)`, `pause`, `resume`, or the flow loop finding data
//! listeners once every pipe is gone), or become the pull facade of a
//! wrapped push stream. Mode is a tagged variant; `read`, `pause` and
//! `resume` dispatch through it.

use super::buffer_list::Chunk;
use super::error::StreamError;
use super::events::{EventEmitter, EventKind, StreamEvent};
use super::readable::{decode_chunk, flush_decoder, ReadableStream, StreamResult};
use crate::platform::SharedPtr;
use log::trace;
use std::cell::Cell;

/// An external push-style stream, adaptable into the pull interface with
/// [`ReadableStream::wrap`].
pub trait LegacyStream {
    fn events(&self) -> &EventEmitter;

    fn pause(&self) {}

    fn resume(&self) {}
}

pub(crate) enum Mode {
    Pull,
    DataEvents {
        paused: Cell<bool>,
    },
    Wrapped {
        old: SharedPtr<dyn LegacyStream>,
        // set while we hold the wrapped stream paused above the watermark
        old_paused: Cell<bool>,
    },
}

enum Dispatch {
    SwitchFirst,
    Done,
    Forward(SharedPtr<dyn LegacyStream>),
}

impl ReadableStream {
    pub(crate) fn is_wrapped(&self) -> bool {
        matches!(&*self.core.mode.borrow(), Mode::Wrapped { .. })
    }

    pub fn is_paused(&self) -> bool {
        match &*self.core.mode.borrow() {
            Mode::Pull => false,
            Mode::DataEvents { paused } => paused.get(),
            Mode::Wrapped { old_paused, .. } => old_paused.get(),
        }
    }

    /// Hook run by `on`/`once` for `data` subscriptions. While pipe-flowing
    /// the flow loop already emits `data`, so subscribing is enough; the
    /// switch happens only from quiescent pull mode.
    pub(crate) fn data_listener_added(&self) {
        let pull = matches!(&*self.core.mode.borrow(), Mode::Pull);
        if pull && !self.core.state.flowing.get() {
            let _ = self.enter_data_mode();
        }
    }

    /// Irreversibly become a push-style data-event stream: a permanent
    /// `readable` listener drains the buffer into `data` events whenever
    /// the stream is not paused.
    pub(crate) fn enter_data_mode(&self) -> StreamResult<()> {
        match &*self.core.mode.borrow() {
            Mode::DataEvents { .. } => return Ok(()),
            Mode::Wrapped { .. } => return Err(StreamError::ModeConflict),
            Mode::Pull => {}
        }
        if self.core.state.flowing.get() {
            return Err(StreamError::ModeConflict);
        }
        *self.core.mode.borrow_mut() = Mode::DataEvents {
            paused: Cell::new(false),
        };
        trace!("mode: entering data-event emission");

        let weak = SharedPtr::downgrade(&self.core);
        self.core.emitter.on(EventKind::Readable, move |_| {
            if let Some(core) = weak.upgrade() {
                pump_data(&ReadableStream::from_core(core));
            }
        });

        // prime the pump on the next turn
        let this = self.clone();
        self.core
            .scheduler
            .defer(move || this.emit_event(&StreamEvent::Readable));
        Ok(())
    }

    fn set_data_paused(&self, value: bool) {
        if let Mode::DataEvents { paused } = &*self.core.mode.borrow() {
            paused.set(value);
        }
    }

    /// Stop emitting `data`. From pull mode this switches to data-event
    /// mode first, then applies; no recursion through the public surface.
    pub fn pause(&self) -> StreamResult<()> {
        let dispatch = {
            match &*self.core.mode.borrow() {
                Mode::Pull => Dispatch::SwitchFirst,
                Mode::DataEvents { paused } => {
                    paused.set(true);
                    Dispatch::Done
                }
                Mode::Wrapped { old, old_paused } => {
                    old_paused.set(true);
                    Dispatch::Forward(old.clone())
                }
            }
        };
        match dispatch {
            Dispatch::SwitchFirst => {
                self.enter_data_mode()?;
                self.set_data_paused(true);
            }
            Dispatch::Done => {}
            Dispatch::Forward(old) => old.pause(),
        }
        trace!("pause: data emission suspended");
        Ok(())
    }

    /// Resume emitting `data`; re-arms `readable` when bytes are already
    /// buffered. Switches from pull mode first, like [`pause`].
    ///
    /// [`pause`]: ReadableStream::pause
    pub fn resume(&self) -> StreamResult<()> {
        let dispatch = {
            match &*self.core.mode.borrow() {
                Mode::Pull => Dispatch::SwitchFirst,
                Mode::DataEvents { paused } => {
                    paused.set(false);
                    Dispatch::Done
                }
                Mode::Wrapped { old, old_paused } => {
                    old_paused.set(false);
                    Dispatch::Forward(old.clone())
                }
            }
        };
        match dispatch {
            Dispatch::SwitchFirst => {
                self.enter_data_mode()?;
                self.set_data_paused(false);
            }
            Dispatch::Done => {}
            Dispatch::Forward(old) => {
                old.resume();
                return Ok(());
            }
        }
        if self.core.state.length.get() > 0 {
            let this = self.clone();
            self.core
                .scheduler
                .defer(move || this.emit_event(&StreamEvent::Readable));
        }
        // provoke a refill for the pump even when nothing is buffered yet
        let _ = self.read(Some(0));
        Ok(())
    }

    /// Adapt an external push stream into this pull interface. Only a
    /// pristine pull-mode stream can wrap.
    ///
    /// The wrapped stream is throttled with `pause`/`resume` around the low
    /// water mark; its `error`, `close`, `destroy`, `pause` and `resume`
    /// events are re-emitted here.
    pub fn wrap(&self, old: SharedPtr<dyn LegacyStream>) -> StreamResult<()> {
        if !matches!(&*self.core.mode.borrow(), Mode::Pull) || self.core.state.flowing.get() {
            return Err(StreamError::ModeConflict);
        }
        *self.core.mode.borrow_mut() = Mode::Wrapped {
            old: old.clone(),
            old_paused: Cell::new(false),
        };
        trace!("mode: wrapping a legacy push stream");

        let weak = SharedPtr::downgrade(&self.core);
        old.events().on(EventKind::End, move |_| {
            let Some(core) = weak.upgrade() else { return };
            let stream = ReadableStream::from_core(core);
            let st = &stream.core.state;
            st.ended.set(true);
            flush_decoder(st);
            if st.length.get() == 0 {
                stream.finalize_end();
            }
        });

        let weak = SharedPtr::downgrade(&self.core);
        old.events().on(EventKind::Data, move |event| {
            let StreamEvent::Data(chunk) = event else { return };
            let Some(core) = weak.upgrade() else { return };
            wrap_push(&ReadableStream::from_core(core), chunk.clone());
        });

        for kind in [
            EventKind::Error,
            EventKind::Close,
            EventKind::Destroy,
            EventKind::Pause,
            EventKind::Resume,
        ] {
            let weak = SharedPtr::downgrade(&self.core);
            old.events().on(kind, move |event| {
                if let Some(core) = weak.upgrade() {
                    ReadableStream::from_core(core).emit_event(event);
                }
            });
        }
        Ok(())
    }

    /// `read` for wrapped mode: self-contained, serving only from the
    /// buffer. The producer protocol (`reading`, pulls) is not involved.
    pub(crate) fn wrap_read(&self, n: Option<usize>) -> Option<Chunk> {
        let st = &self.core.state;
        let available = self.plan(n);
        if available == 0 {
            if st.ended.get() && st.length.get() == 0 {
                self.finalize_end();
            } else {
                st.need_readable.set(true);
            }
            return None;
        }
        let result = st.buffer.borrow_mut().take(Some(available), st.length.get());
        let returned = match &result {
            Some(chunk) if !chunk.is_empty() => chunk.len(),
            _ => {
                st.need_readable.set(true);
                0
            }
        };
        st.length.set(st.length.get() - returned);

        // drained to the mark: release the throttle
        if st.length.get() <= st.low_water_mark {
            let release = match &*self.core.mode.borrow() {
                Mode::Wrapped { old, old_paused } if old_paused.get() => {
                    old_paused.set(false);
                    Some(old.clone())
                }
                _ => None,
            };
            if let Some(old) = release {
                trace!("wrap: below watermark, resuming wrapped stream");
                old.resume();
            }
        }
        result.filter(|chunk| !chunk.is_empty())
    }
}

/// Drain the buffer into `data` events until empty or paused. Ends with a
/// `read` that returned nothing, which re-arms `need_readable`.
fn pump_data(stream: &ReadableStream) {
    loop {
        if stream.is_paused() {
            return;
        }
        match stream.read(None) {
            Some(chunk) => stream.emit_event(&StreamEvent::Data(chunk)),
            None => return,
        }
    }
}

fn wrap_push(stream: &ReadableStream, chunk: Chunk) {
    let st = &stream.core.state;
    if let Some(chunk) = decode_chunk(st, chunk) {
        let len = chunk.len();
        st.buffer.borrow_mut().push(chunk);
        st.length.set(st.length.get() + len);
    }
    stream.emit_event(&StreamEvent::Readable);

    if st.length.get() > st.low_water_mark {
        let throttle = match &*stream.core.mode.borrow() {
            Mode::Wrapped { old, old_paused } if !old_paused.get() => {
                old_paused.set(true);
                Some(old.clone())
            }
            _ => None,
        };
        if let Some(old) = throttle {
            trace!("wrap: above watermark, pausing wrapped stream");
            old.pause();
        }
    }
}
