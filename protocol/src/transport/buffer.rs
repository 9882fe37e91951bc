use crate::error::{ProtocolError, Result};
use crate::transport::Transport;

/// An in-memory transport. Reads replay the write history from the start, so a
/// protocol can encode into one of these and decode straight back out of it.
///
/// Example usage:
///
/// ```
/// use brine_thrift_protocol::{BufferTransport, Transport};
///
/// let mut buffer = BufferTransport::new();
/// buffer.write(&[1, 2, 3]).unwrap();
///
/// let mut out = [0u8; 2];
/// buffer.read_exact(&mut out).unwrap();
/// assert_eq!(out, [1, 2]);
/// assert_eq!(buffer.remaining(), 1);
/// ```
///
#[derive(Debug, Default, Clone)]
pub struct BufferTransport {
    data:   Vec<u8>,
    index:  usize,
    closed: bool,
}

impl BufferTransport {
    /// Creates an empty buffer ready for writing.
    pub fn new() -> BufferTransport {
        BufferTransport::default()
    }

    /// Wraps bytes that were produced elsewhere so they can be read back.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> BufferTransport {
        BufferTransport {
            data:   data.into(),
            index:  0,
            closed: false,
        }
    }

    /// Every byte written so far, including bytes already read.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The bytes that have not been read yet.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.index..]
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    /// Drops all content and rewinds the read position.
    pub fn clear(&mut self) {
        self.data.clear();
        self.index = 0;
    }

    /// Consumes the transport and returns the backing store.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Transport for BufferTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(ProtocolError::NotOpen);
        }
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.data[self.index..self.index + count]);
        self.index += count;
        Ok(count)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.closed {
            return Err(ProtocolError::NotOpen);
        }
        self.data.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[test]
fn read_mirrors_writes() {
    let mut buffer = BufferTransport::new();
    buffer.write(&[1, 2, 3]).unwrap();
    buffer.write(&[]).unwrap();
    buffer.write(&[4, 5]).unwrap();
    assert_eq!(buffer.data(), [1, 2, 3, 4, 5]);

    let mut out = [0u8; 3];
    assert_eq!(buffer.read(&mut out).unwrap(), 3);
    assert_eq!(out, [1, 2, 3]);
    assert_eq!(buffer.unread(), [4, 5]);

    let mut out = [0u8; 4];
    assert_eq!(buffer.read(&mut out).unwrap(), 2);
    assert_eq!(&out[..2], [4, 5]);
    assert_eq!(buffer.read(&mut out).unwrap(), 0);
}

#[test]
fn read_exact_past_end_is_eof() {
    let mut buffer = BufferTransport::from_bytes(vec![9]);
    let mut out = [0u8; 2];
    assert!(matches!(buffer.read_exact(&mut out), Err(ProtocolError::Eof)));
}

#[test]
fn closed_buffer_rejects_io() {
    let mut buffer = BufferTransport::from_bytes(vec![1]);
    buffer.close().unwrap();
    buffer.close().unwrap();
    assert!(matches!(buffer.read(&mut [0u8; 1]), Err(ProtocolError::NotOpen)));
    assert!(matches!(buffer.write(&[1]), Err(ProtocolError::NotOpen)));
}
