use std::fmt;
use std::string::FromUtf8Error;

/// A stream capability that an operation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Write,
    Seek,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Read => "reading",
            Capability::Write => "writing",
            Capability::Seek => "seeking",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("stream does not support {0}")]
    NotSupported(Capability),

    #[error("no stream attached")]
    Detached,

    #[error("stream is closed")]
    Closed,

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("string is not valid utf-8")]
    Utf8(#[from] FromUtf8Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
