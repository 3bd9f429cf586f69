// SPDX-License-Identifier: MIT

use core::fmt;

use cardio::errors::*;

/// Unified error type for partition records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartError {
    IO(BlockError),
    /// Record index outside 1..=4.
    InvalidIndex(u8),
    Invalid(&'static str),
    Other(&'static str),
}

impl PartError {
    pub fn msg(&self) -> &'static str {
        match self {
            PartError::IO(_) => "IO error",
            PartError::InvalidIndex(_) => "Partition index out of range",
            PartError::Invalid(msg) => msg,
            PartError::Other(msg) => msg,
        }
    }

    pub fn source(&self) -> Option<CardError> {
        match self {
            PartError::IO(e) => Some(CardError::Block(*e)),
            _ => None,
        }
    }
}

impl From<&'static str> for PartError {
    fn from(s: &'static str) -> Self {
        PartError::Other(s)
    }
}

impl From<BlockError> for PartError {
    fn from(e: BlockError) -> Self {
        PartError::IO(e)
    }
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        if let PartError::InvalidIndex(n) = self {
            write!(f, " (index: {n})")?;
        }
        let mut current = self.source();
        while let Some(src) = current {
            write!(f, "\n  caused by: {}", src.msg())?;
            current = src.source();
        }
        Ok(())
    }
}

impl core::error::Error for PartError {}

pub type PartResult<T = ()> = Result<T, PartError>;
