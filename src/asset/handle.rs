//! Offset-based reads over a sequential asset cursor

use super::{AssetSource, AssetStream};
use crate::error::{AssetVfsError, Result};
use crate::path::AssetName;
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

/// Result of a positioned read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The whole buffer was filled
    Full(usize),
    /// The request ran past the end of the asset; only this many bytes
    /// were written and the rest of the buffer is untouched
    Short(usize),
}

impl ReadOutcome {
    pub fn bytes_read(&self) -> usize {
        match *self {
            ReadOutcome::Full(n) | ReadOutcome::Short(n) => n,
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, ReadOutcome::Short(_))
    }
}

/// One opened asset with its length fixed at open
///
/// Each handle owns its own cursor. Two handles over the same asset never
/// observe each other's position.
pub struct AssetHandle {
    name: AssetName,
    stream: Option<Box<dyn AssetStream>>,
    len: u64,
}

impl AssetHandle {
    /// Open `name` from `source` and cache its length
    pub fn open(source: &dyn AssetSource, name: &AssetName) -> Result<Self> {
        let stream = source.open(name)?;
        Ok(Self::from_stream(name.clone(), stream))
    }

    pub fn from_stream(name: AssetName, stream: Box<dyn AssetStream>) -> Self {
        let len = stream.length();
        Self {
            name,
            stream: Some(stream),
            len,
        }
    }

    pub fn name(&self) -> &AssetName {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Asset length as captured at open
    pub fn size(&self) -> Result<u64> {
        if self.stream.is_none() {
            return Err(AssetVfsError::Closed(self.name.to_string()));
        }
        Ok(self.len)
    }

    /// Read `buf.len()` bytes starting at `offset`
    ///
    /// Requests are checked against the cached length, never a fresh query.
    /// An offset at or past the end reads nothing and reports `Short(0)`.
    /// A request straddling the end reads what remains and reports `Short`.
    /// Zero-filling the unread tail is the caller's job.
    ///
    /// # Errors
    ///
    /// `Closed` after [`close`](Self::close); `Io` if the reposition or the
    /// read fails, or the stream ends before the cached length.
    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<ReadOutcome> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| AssetVfsError::Closed(self.name.to_string()))?;

        if buf.is_empty() {
            return Ok(ReadOutcome::Full(0));
        }
        if offset >= self.len {
            trace!(asset = %self.name, offset, len = self.len, "read past end of asset");
            return Ok(ReadOutcome::Short(0));
        }

        let available = (self.len - offset).min(buf.len() as u64) as usize;

        let pos = stream.seek(SeekFrom::Start(offset))?;
        if pos != offset {
            return Err(AssetVfsError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("seek to {offset} landed at {pos}"),
            )));
        }

        let mut filled = 0;
        while filled < available {
            match stream.read(&mut buf[filled..available]) {
                Ok(0) => {
                    return Err(AssetVfsError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "asset {} ended at {} of {} bytes",
                            self.name,
                            offset + filled as u64,
                            self.len
                        ),
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if available < buf.len() {
            Ok(ReadOutcome::Short(available))
        } else {
            Ok(ReadOutcome::Full(available))
        }
    }

    /// Release the underlying asset
    ///
    /// # Errors
    ///
    /// `Closed` if the handle was already closed.
    pub fn close(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(stream) => {
                drop(stream);
                Ok(())
            }
            None => Err(AssetVfsError::Closed(self.name.to_string())),
        }
    }
}

impl std::fmt::Debug for AssetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetHandle")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("open", &self.is_open())
            .finish()
    }
}
