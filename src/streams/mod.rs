pub mod buffer_list;
pub mod decoder;
pub mod error;
pub mod events;
pub mod legacy;
pub mod readable;
pub mod scheduler;
pub mod writable;

pub use buffer_list::{BufferList, Chunk};
pub use decoder::{Encoding, TextDecoder};
pub use error::StreamError;
pub use events::{EventEmitter, EventKind, ListenerId, StreamEvent};
pub use legacy::LegacyStream;
pub use readable::{
    ByteSource, PipeOptions, PullHandle, ReadableOptions, ReadableStream, ReadableStreamBuilder,
    StreamResult, DEFAULT_BUFFER_SIZE, DEFAULT_LOW_WATER_MARK,
};
pub use scheduler::Scheduler;
pub use writable::WriteSink;
