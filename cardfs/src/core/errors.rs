// SPDX-License-Identifier: MIT

use core::fmt;

pub use cardio::errors::*;
pub use cardpart::errors::*;

macro_rules! chain_display {
    ($($t:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $t {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.msg())?;
                    self.detail(f)?;
                    let mut current = self.source();
                    while let Some(src) = current {
                        write!(f, "\n  caused by: {}", src.msg())?;
                        current = src.source();
                    }
                    Ok(())
                }
            }

            impl core::error::Error for $t {}
        )+
    };
}

/// On-disk structure that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsParsingError {
    Unsupported,
    Corrupted,
    Invalid(&'static str),
    Other(&'static str),
}

impl FsParsingError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsParsingError::Unsupported => "Unsupported entry",
            FsParsingError::Corrupted => "Corrupted entry",
            FsParsingError::Invalid(msg) => msg,
            FsParsingError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        None
    }

    fn detail(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

/// Failures while mounting a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsMountError {
    IO(BlockError),
    Part(PartError),
    Parsing(FsParsingError),
    /// Selected partition record has type 0.
    EmptyPartition(u8),
    /// Boot sector does not end in 0xAA55.
    BadSignature { found: u16 },
    InvalidGeometry(&'static str),
    Other(&'static str),
}

impl FsMountError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsMountError::IO(_) => "IO error",
            FsMountError::Part(_) => "Partition table error",
            FsMountError::Parsing(_) => "Parsing error",
            FsMountError::EmptyPartition(_) => "Partition record is empty",
            FsMountError::BadSignature { .. } => "Boot sector signature mismatch",
            FsMountError::InvalidGeometry(msg) => msg,
            FsMountError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsMountError::IO(e) => Some(FsError::IO(*e)),
            FsMountError::Part(e) => Some(FsError::Part(*e)),
            FsMountError::Parsing(e) => Some(FsError::Parsing(*e)),
            _ => None,
        }
    }

    fn detail(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsMountError::EmptyPartition(n) => write!(f, " (index: {n})"),
            FsMountError::BadSignature { found } => write!(f, " (found: {found:#06X})"),
            _ => Ok(()),
        }
    }
}

/// Failures while walking a cluster chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsCursorError {
    IO(BlockError),
    /// Cluster outside the data area, or a free/bad marker inside a chain.
    InvalidCluster(u32),
    LoopDetected,
    Other(&'static str),
}

impl FsCursorError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsCursorError::IO(_) => "IO error",
            FsCursorError::InvalidCluster(_) => "Invalid cluster in FAT chain",
            FsCursorError::LoopDetected => "Loop detected in FAT chain",
            FsCursorError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsCursorError::IO(e) => Some(FsError::IO(*e)),
            _ => None,
        }
    }

    fn detail(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsCursorError::InvalidCluster(cluster) => write!(f, " (cluster: {cluster})"),
            _ => Ok(()),
        }
    }
}

/// Failures while listing directories or reading files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsResolverError {
    IO(BlockError),
    Cursor(FsCursorError),
    Parsing(FsParsingError),
    NotFound,
    NotADirectory,
    IsADirectory,
    Invalid(&'static str),
    Other(&'static str),
}

impl FsResolverError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsResolverError::IO(_) => "IO error",
            FsResolverError::Cursor(_) => "Cursor error",
            FsResolverError::Parsing(_) => "Parsing error",
            FsResolverError::NotFound => "Path not found",
            FsResolverError::NotADirectory => "Not a directory",
            FsResolverError::IsADirectory => "Is a directory",
            FsResolverError::Invalid(msg) => msg,
            FsResolverError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsResolverError::IO(e) => Some(FsError::IO(*e)),
            FsResolverError::Cursor(e) => Some(FsError::Cursor(*e)),
            FsResolverError::Parsing(e) => Some(FsError::Parsing(*e)),
            _ => None,
        }
    }

    fn detail(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

chain_display!(FsParsingError, FsMountError, FsCursorError, FsResolverError);

/// Top-level error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    IO(BlockError),
    Part(PartError),
    Parsing(FsParsingError),
    Mount(FsMountError),
    Cursor(FsCursorError),
    Resolver(FsResolverError),
    Other(&'static str),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

impl core::error::Error for FsError {}

impl FsError {
    pub fn msg(&self) -> &'static str {
        match self {
            FsError::IO(e) => e.msg(),
            FsError::Part(e) => e.msg(),
            FsError::Parsing(e) => e.msg(),
            FsError::Mount(e) => e.msg(),
            FsError::Cursor(e) => e.msg(),
            FsError::Resolver(e) => e.msg(),
            FsError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<FsError> {
        match self {
            FsError::Parsing(e) => e.source(),
            FsError::Mount(e) => e.source(),
            FsError::Cursor(e) => e.source(),
            FsError::Resolver(e) => e.source(),
            FsError::Part(e) => e.source().and_then(|card| match card {
                CardError::Block(b) => Some(FsError::IO(b)),
                _ => None,
            }),
            FsError::IO(_) => None,
            FsError::Other(_) => None,
        }
    }
}

// === type Fs*Result ===

pub type FsResult<T = ()> = Result<T, FsError>;
pub type FsParsingResult<T = ()> = Result<T, FsParsingError>;
pub type FsMountResult<T = ()> = Result<T, FsMountError>;
pub type FsCursorResult<T = ()> = Result<T, FsCursorError>;
pub type FsResolverResult<T = ()> = Result<T, FsResolverError>;

crate::fs_error_wiring! {
    top => FsError {
        BlockError      : IO,
        PartError       : Part,
        FsParsingError  : Parsing,
        FsMountError    : Mount,
        FsCursorError   : Cursor,
        FsResolverError : Resolver,
    },
    str_into => [
        FsParsingError,
        FsMountError,
        FsCursorError,
        FsResolverError,
    ],
    sub => {
        BlockError     => [ FsMountError::IO, FsCursorError::IO, FsResolverError::IO ],
        PartError      => [ FsMountError::Part ],
        FsParsingError => [ FsMountError::Parsing, FsResolverError::Parsing ],
        FsCursorError  => [ FsResolverError::Cursor ],
    },
}
