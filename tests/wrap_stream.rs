//! Wrapping a legacy push stream behind the pull interface: buffering,
//! watermark throttling and event forwarding.

mod common;

use common::{EventLog, PushFixture};
use evented_streams::{
    Chunk, EventKind, ReadableOptions, ReadableStream, Scheduler, StreamError, StreamEvent,
};
use std::cell::Cell;
use std::rc::Rc;

fn wrapped(
    scheduler: &Scheduler,
    low_water_mark: usize,
) -> (ReadableStream, Rc<PushFixture>) {
    let options = ReadableOptions {
        low_water_mark,
        scheduler: Some(scheduler.clone()),
        ..Default::default()
    };
    let stream = ReadableStream::new(options).unwrap();
    let old = PushFixture::new();
    stream.wrap(old.clone()).unwrap();
    (stream, old)
}

#[test]
fn serves_pushed_data_through_pull_reads() {
    let sched = Scheduler::new();
    let (stream, old) = wrapped(&sched, 1024);
    let log = EventLog::attach(&stream);

    old.emit_data(b"hello");
    old.emit_data(b"world");
    old.emit_end();
    assert!(log.readables.get() >= 2);

    assert_eq!(stream.read(Some(3)).unwrap().as_bytes(), b"hel");
    assert_eq!(stream.read(None).unwrap().as_bytes(), b"loworld");
    assert!(stream.read(None).is_none());
    sched.run();
    assert_eq!(log.ends.get(), 1);

    // idempotent: another read does not re-emit end
    assert!(stream.read(None).is_none());
    sched.run();
    assert_eq!(log.ends.get(), 1);
}

#[test]
fn throttles_the_push_stream_around_the_watermark() {
    let sched = Scheduler::new();
    let (stream, old) = wrapped(&sched, 4);

    old.emit_data(b"abcdef"); // 6 > 4
    assert!(old.paused.get());
    assert_eq!(old.pause_calls.get(), 1);

    // still above the mark after a small read
    assert_eq!(stream.read(Some(1)).unwrap().as_bytes(), b"a");
    assert!(old.paused.get());

    // draining to the mark releases the throttle
    assert_eq!(stream.read(Some(4)).unwrap().as_bytes(), b"bcde");
    assert!(!old.paused.get());
    assert_eq!(old.resume_calls.get(), 1);
}

#[test]
fn forwards_error_and_close_events() {
    let sched = Scheduler::new();
    let (stream, old) = wrapped(&sched, 1024);
    let log = EventLog::attach(&stream);

    let closes = Rc::new(Cell::new(0));
    {
        let closes = closes.clone();
        stream.on(EventKind::Close, move |_| closes.set(closes.get() + 1));
    }

    old.emit(&StreamEvent::Error(StreamError::from("socket reset")));
    old.emit(&StreamEvent::Close);

    assert_eq!(log.errors.borrow().len(), 1);
    assert_eq!(log.errors.borrow()[0].to_string(), "socket reset");
    assert_eq!(closes.get(), 1);
}

#[test]
fn wrap_decodes_text_when_encoding_is_set() {
    let sched = Scheduler::new();
    let options = ReadableOptions {
        encoding: Some("utf8".into()),
        scheduler: Some(sched.clone()),
        ..Default::default()
    };
    let stream = ReadableStream::new(options).unwrap();
    let old = PushFixture::new();
    stream.wrap(old.clone()).unwrap();

    let euro = "€".as_bytes();
    old.emit_data(&euro[..2]); // partial sequence is held back
    assert_eq!(stream.buffered_len(), 0);
    old.emit_data(&euro[2..]);
    assert_eq!(stream.read(None).unwrap(), Chunk::Text("€".into()));
}

#[test]
fn wrap_rejects_streams_that_left_pull_mode() {
    let sched = Scheduler::new();
    let options = ReadableOptions {
        scheduler: Some(sched.clone()),
        ..Default::default()
    };
    let stream = ReadableStream::new(options).unwrap();
    stream.pause().unwrap(); // now in data-event mode

    let old = PushFixture::new();
    assert!(matches!(
        stream.wrap(old),
        Err(StreamError::ModeConflict)
    ));
}
