// SPDX-License-Identifier: MIT

use std::io::{Error, ErrorKind, Read, Seek, SeekFrom};

use crate::mem::CardImage;
use crate::{TransportError, TransportResult};

/// Card image backed by anything seekable: a file, a raw device, a cursor.
#[derive(Debug)]
pub struct StdImage<T: Read + Seek> {
    io: T,
    len: u64,
}

impl<T: Read + Seek> StdImage<T> {
    /// Wraps `io`, measuring its length once.
    pub fn new(mut io: T) -> Result<Self, Error> {
        let len = io.seek(SeekFrom::End(0))?;
        io.seek(SeekFrom::Start(0))?;
        Ok(Self { io, len })
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.io
    }
}

impl StdImage<std::fs::File> {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        Self::new(std::fs::File::open(path)?)
    }
}

impl<T: Read + Seek> CardImage for StdImage<T> {
    #[inline]
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> TransportResult {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(TransportError::OutOfBounds)?;
        if end > self.len {
            return Err(TransportError::OutOfBounds);
        }
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }
}

impl From<Error> for TransportError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        if e.kind() == ErrorKind::UnexpectedEof {
            return TransportError::OutOfBounds;
        }
        // Leak the string to produce a 'static str. Acceptable for error mapping.
        let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
        TransportError::Bus(leaked_str)
    }
}
