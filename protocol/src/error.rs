use std::io;
use thiserror::Error;

/// Everything that can go wrong while moving bytes through a transport or
/// decoding them with a protocol. Transport failures share this family so
/// callers only ever handle one error type at this layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("Unexpected end of stream")]
    Eof,

    #[error("Timed out waiting for the peer")]
    Timeout,

    #[error("Transport is not open")]
    NotOpen,

    #[error("{what} length {len} exceeds the configured limit of {limit}")]
    SizeLimit {
        what:  &'static str,
        len:   i64,
        limit: usize,
    },

    #[error("Negative {what} length: {len}")]
    NegativeSize {
        what: &'static str,
        len:  i64,
    },

    #[error("Read a negative frame size ({0})! Is the other endpoint using framing?")]
    InvalidFrameSize(i32),

    #[error("Frame size {size} exceeds the maximum of {limit} bytes")]
    FrameTooLarge {
        size:  usize,
        limit: usize,
    },

    #[error("Bad version in message header: {0}")]
    BadVersion(String),

    #[error("Unrecognized type tag {0}")]
    UnknownType(u8),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Maximum nesting depth exceeded")]
    DepthLimit,
}

impl From<io::Error> for ProtocolError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ProtocolError::Timeout,
            io::ErrorKind::UnexpectedEof => ProtocolError::Eof,
            _ => ProtocolError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Validates a length read off the wire against an optional limit. This must
/// run before any buffer of that length is allocated.
pub(crate) fn check_length(what: &'static str, len: i64, limit: Option<usize>) -> Result<usize> {
    if len < 0 {
        return Err(ProtocolError::NegativeSize { what, len });
    }
    if let Some(limit) = limit {
        if len as u64 > limit as u64 {
            return Err(ProtocolError::SizeLimit { what, len, limit });
        }
    }
    Ok(len as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeouts_map_to_timeout() {
        let err: ProtocolError = io::Error::new(io::ErrorKind::WouldBlock, "slow").into();
        assert!(matches!(err, ProtocolError::Timeout));
        let err: ProtocolError = io::Error::new(io::ErrorKind::TimedOut, "slow").into();
        assert!(matches!(err, ProtocolError::Timeout));
        let err: ProtocolError = io::Error::new(io::ErrorKind::UnexpectedEof, "short").into();
        assert!(matches!(err, ProtocolError::Eof));
        let err: ProtocolError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, ProtocolError::Io(_)));
    }

    #[test]
    fn length_checks() {
        assert_eq!(check_length("string", 0, None).unwrap(), 0);
        assert_eq!(check_length("string", 10, Some(10)).unwrap(), 10);
        assert!(matches!(
            check_length("string", 11, Some(10)),
            Err(ProtocolError::SizeLimit { len: 11, limit: 10, .. })
        ));
        assert!(matches!(
            check_length("list", -1, None),
            Err(ProtocolError::NegativeSize { len: -1, .. })
        ));
    }

    #[test]
    fn frame_size_message_mentions_framing() {
        let msg = ProtocolError::InvalidFrameSize(-5).to_string();
        assert!(msg.contains("-5"));
        assert!(msg.contains("framing"));
    }
}
