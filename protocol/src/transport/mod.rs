//! Byte-stream transports that protocols read from and write to.

pub mod buffer;
pub mod framed;
pub mod socket;

pub use buffer::BufferTransport;
pub use framed::FramedTransport;
pub use socket::{SocketFactory, SocketTransport, SocketTransportBuilder};

use crate::error::{ProtocolError, Result};

/// A sequential byte source and sink.
///
/// Transports are single-owner: nothing here is synchronized, and a transport
/// that returned an error is left at an undefined position and should be
/// closed rather than reused.
pub trait Transport {
    /// Reads up to `buf.len()` bytes, returning how many were read. `Ok(0)`
    /// signals end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Fills `buf` completely or fails with [ProtocolError::Eof].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut offset = 0;
        while offset < buf.len() {
            let count = self.read(&mut buf[offset..])?;
            if count == 0 {
                return Err(ProtocolError::Eof);
            }
            offset += count;
        }
        Ok(())
    }

    /// Writes all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Pushes any buffered bytes to the underlying sink.
    fn flush(&mut self) -> Result<()>;

    /// Releases the underlying resources. Calling this more than once is
    /// harmless.
    fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        (**self).read_exact(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
