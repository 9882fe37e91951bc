//! Runtime support for moving Thrift data over the wire: byte-stream
//! transports (in-memory, TCP, length-framed) and the protocols that encode
//! values onto them (binary, compact, JSON). See
//! [https://thrift.apache.org/docs/](https://thrift.apache.org/docs/) for the
//! formats themselves.
//!
//! ```
//! use brine_thrift_protocol::*;
//!
//! let mut protocol = CompactProtocol::new(FramedTransport::new(BufferTransport::new()));
//! protocol.write_struct_begin("Point").unwrap();
//! protocol.write_field_begin("x", TType::I32, 1).unwrap();
//! protocol.write_i32(3).unwrap();
//! protocol.write_field_end().unwrap();
//! protocol.write_field_stop().unwrap();
//! protocol.write_struct_end().unwrap();
//! protocol.flush().unwrap();
//!
//! assert_eq!(protocol.transport().inner().data(), [0, 0, 0, 3, 0x15, 0x06, 0x00]);
//!
//! let value = Value::read(&mut protocol, TType::Struct).unwrap();
//! assert_eq!(value.get(1), Some(&Value::I32(3)));
//! ```

pub mod adapter;
pub mod binary;
pub mod compact;
pub mod error;
pub mod json;
pub mod protocol;
pub mod transport;
pub mod ttype;
pub mod util;
pub mod value;

pub use adapter::Adapter;
pub use binary::{BinaryProtocol, BinaryProtocolConfig};
pub use compact::{CompactProtocol, CompactProtocolConfig};
pub use error::{ProtocolError, Result};
pub use json::{JsonProtocol, JsonProtocolConfig};
pub use protocol::{
    FieldIdentifier, ListIdentifier, MapIdentifier, MessageIdentifier, Protocol, SetIdentifier,
};
pub use transport::{
    BufferTransport, FramedTransport, SocketFactory, SocketTransport, SocketTransportBuilder,
    Transport,
};
pub use ttype::{MessageType, TType};
pub use util::{skip, skip_with_depth, DEFAULT_MAX_DEPTH};
pub use value::Value;
