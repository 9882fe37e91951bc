use tracing::debug;

use crate::error::{ProtocolError, Result};
use crate::transport::Transport;

/// Largest frame a reader accepts unless configured otherwise.
pub const DEFAULT_MAX_FRAME_SIZE: usize = i32::MAX as usize;

/// Decorates another transport with 4-byte big-endian length prefixes.
///
/// Writes are buffered until [flush](Transport::flush), which emits
/// `[length][payload]` as a single write. Reads consume one frame at a time,
/// pulling the next header only once the current frame is exhausted.
/// Non-blocking servers need this to find message boundaries.
pub struct FramedTransport<T> {
    inner:          T,
    pending_write:  Vec<u8>,
    remaining_read: usize,
    max_frame_size: usize,
}

impl<T: Transport> FramedTransport<T> {
    pub fn new(inner: T) -> FramedTransport<T> {
        FramedTransport {
            inner,
            pending_write:  Vec::new(),
            remaining_read: 0,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Rejects incoming frames that declare more than `max` bytes.
    pub fn with_max_frame_size(mut self, max: usize) -> FramedTransport<T> {
        self.max_frame_size = max.min(DEFAULT_MAX_FRAME_SIZE);
        self
    }

    /// Bytes of the current incoming frame that have not been read yet.
    pub fn remaining_in_frame(&self) -> usize {
        self.remaining_read
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Reads the next frame header. Returns `false` on a clean end of stream
    /// between frames.
    fn read_header(&mut self) -> Result<bool> {
        let mut header = [0u8; 4];
        if self.inner.read(&mut header[..1])? == 0 {
            return Ok(false);
        }
        self.inner.read_exact(&mut header[1..])?;

        let size = i32::from_be_bytes(header);
        if size < 0 {
            return Err(ProtocolError::InvalidFrameSize(size));
        }
        if size as usize > self.max_frame_size {
            return Err(ProtocolError::FrameTooLarge {
                size:  size as usize,
                limit: self.max_frame_size,
            });
        }
        self.remaining_read = size as usize;
        Ok(true)
    }
}

impl<T: Transport> Transport for FramedTransport<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Zero-length frames are legal; keep going until one has content.
        while self.remaining_read == 0 {
            if !self.read_header()? {
                return Ok(0);
            }
        }

        let wanted = buf.len().min(self.remaining_read);
        let count = self.inner.read(&mut buf[..wanted])?;
        if count == 0 {
            return Err(ProtocolError::Eof);
        }
        self.remaining_read -= count;
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.pending_write.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending_write.is_empty() {
            return self.inner.flush();
        }

        let size = self.pending_write.len();
        if size > i32::MAX as usize {
            self.pending_write.clear();
            return Err(ProtocolError::FrameTooLarge {
                size,
                limit: i32::MAX as usize,
            });
        }

        let mut frame = Vec::with_capacity(4 + size);
        frame.extend_from_slice(&(size as i32).to_be_bytes());
        frame.append(&mut self.pending_write);

        debug!(size, "writing frame");
        self.inner.write(&frame)?;
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.pending_write.clear();
        self.remaining_read = 0;
        self.inner.close()
    }
}
