use crate::platform::SharedPtr;
use std::{error::Error, fmt};

#[derive(Debug, Clone)]
pub enum StreamError {
    /// No pull source was installed; the default source reports this on the
    /// next turn.
    NotImplemented,
    /// The stream cannot change mode in its current state (e.g. entering
    /// data-event mode while piped destinations are driving it).
    ModeConflict,
    /// `set_encoding` was called with a label no decoder recognizes.
    UnknownEncoding(String),
    Other(SharedPtr<dyn Error>),
}

impl StreamError {
    /// Wrap any error type into `StreamError`
    pub fn other<E>(e: E) -> Self
    where
        E: Error + 'static,
    {
        StreamError::Other(SharedPtr::new(e))
    }

    /// Wrap a boxed error
    pub fn other_boxed(e: Box<dyn Error>) -> Self {
        StreamError::Other(e.into())
    }
}

impl From<&str> for StreamError {
    fn from(s: &str) -> Self {
        #[derive(Debug)]
        struct SimpleError(String);
        impl fmt::Display for SimpleError {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl Error for SimpleError {}
        StreamError::Other(SharedPtr::new(SimpleError(s.to_string())))
    }
}

impl From<String> for StreamError {
    fn from(s: String) -> Self {
        StreamError::from(s.as_str())
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        StreamError::Other(SharedPtr::new(e))
    }
}

impl From<Box<dyn Error>> for StreamError {
    fn from(e: Box<dyn Error>) -> Self {
        StreamError::Other(e.into())
    }
}

/// Macro for users to add direct `From` implementations for their error types.
/// This allows using `?` directly without `.map_err(StreamError::other)`.
#[macro_export]
macro_rules! impl_stream_error_from {
    ($($error_type:ty),* $(,)?) => {
        $(
            impl From<$error_type> for $crate::streams::error::StreamError {
                fn from(e: $error_type) -> Self {
                    $crate::streams::error::StreamError::Other(std::rc::Rc::new(e))
                }
            }
        )*
    };
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::NotImplemented => write!(f, "no pull source installed"),
            StreamError::ModeConflict => {
                write!(f, "stream cannot change mode in its current state")
            }
            StreamError::UnknownEncoding(label) => write!(f, "unknown encoding: {}", label),
            StreamError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
