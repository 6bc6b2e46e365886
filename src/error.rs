use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    NotFound,
    BadMode,
    BadArgs,
    OutOfSpace,
    Corrupt,
    BlockFull,
    CrossBoundary,
    ThreadSync,
}

impl Error {
    /// Negative integer of the kind, matching the C return convention
    /// of the exposed file API.
    pub fn code(&self) -> i64 {
        match self {
            Self::NotFound => -1,
            Self::BadMode => -2,
            Self::BadArgs => -3,
            Self::OutOfSpace => -4,
            Self::Corrupt => -5,
            Self::BlockFull => -6,
            Self::CrossBoundary => -7,
            Self::ThreadSync => -8,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::BadMode => write!(f, "bad mode"),
            Self::BadArgs => write!(f, "bad arguments"),
            Self::OutOfSpace => write!(f, "out of space"),
            Self::Corrupt => write!(f, "corrupt disk"),
            Self::BlockFull => write!(f, "block full"),
            Self::CrossBoundary => write!(f, "crosses blob boundary"),
            Self::ThreadSync => write!(f, "thread synchronization"),
        }
    }
}

impl std::error::Error for Error {}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::ThreadSync
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, value)
    }
}
