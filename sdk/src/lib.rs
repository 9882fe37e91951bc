//! brine-thrift
//!
//! One import for both halves of the toolchain:
//!
//! - the schema loader (re-exported from `brine-thrift-compiler`),
//! - the transports, protocols and dynamic [Value]s (re-exported from
//!   `brine-thrift-protocol`),
//! - JSON renderings of a loaded [Schema] and of a decoded payload.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

pub use brine_thrift_compiler::{
    FieldNamingPolicy, LoadError, Loader, Location, Report, Schema, ThriftError, TypeId,
};
pub use brine_thrift_protocol::{
    BinaryProtocol, BinaryProtocolConfig, BufferTransport, CompactProtocol, CompactProtocolConfig,
    FramedTransport, JsonProtocol, JsonProtocolConfig, MessageIdentifier, MessageType, Protocol,
    ProtocolError, TType, Transport, Value,
};

pub mod compiler {
    pub use brine_thrift_compiler::*;
}

pub mod protocol {
    pub use brine_thrift_protocol::*;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Thrift(#[from] ThriftError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Error {
        Error::Thrift(ThriftError::LoadFailed(err))
    }
}

/// Which wire encoding a payload uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolKind {
    #[default]
    Binary,
    Compact,
    Json,
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(name: &str) -> Result<ProtocolKind, String> {
        match name {
            "binary" => Ok(ProtocolKind::Binary),
            "compact" => Ok(ProtocolKind::Compact),
            "json" => Ok(ProtocolKind::Json),
            other => Err(format!("unknown protocol {:?}, expected binary, compact or json", other)),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolKind::Binary => "binary",
            ProtocolKind::Compact => "compact",
            ProtocolKind::Json => "json",
        };
        f.write_str(name)
    }
}

/// How to read a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub protocol: ProtocolKind,
    /// The payload is length-prefixed frames.
    pub framed:   bool,
    /// The struct is wrapped in a message envelope.
    pub message:  bool,
    /// Wire type of the top-level value when there is no envelope.
    pub root:     TType,
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions {
            protocol: ProtocolKind::Binary,
            framed:   false,
            message:  false,
            root:     TType::Struct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub name:  String,
    #[serde(rename = "type")]
    pub kind:  String,
    pub seqid: i32,
}

/// A payload read without a schema: field ids and wire types only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Envelope>,
    pub body:    Value,
}

/// A protocol reading from `bytes`, chosen by `options`. No string or
/// container may declare more entries than the payload has bytes, so a
/// corrupt length fails before anything is allocated for it.
pub fn open_protocol(bytes: &[u8], options: &DecodeOptions) -> Box<dyn Protocol> {
    let limit = Some(bytes.len());
    let buffer = BufferTransport::from_bytes(bytes.to_vec());
    let transport: Box<dyn Transport> = if options.framed {
        Box::new(FramedTransport::new(buffer))
    } else {
        Box::new(buffer)
    };
    match options.protocol {
        ProtocolKind::Binary => {
            let config = BinaryProtocolConfig {
                string_length_limit:    limit,
                container_length_limit: limit,
                ..BinaryProtocolConfig::default()
            };
            Box::new(BinaryProtocol::with_config(transport, config))
        }
        ProtocolKind::Compact => {
            let config = CompactProtocolConfig {
                string_length_limit:    limit,
                container_length_limit: limit,
            };
            Box::new(CompactProtocol::with_config(transport, config))
        }
        ProtocolKind::Json => {
            let config = JsonProtocolConfig {
                string_length_limit:    limit,
                container_length_limit: limit,
            };
            Box::new(JsonProtocol::with_config(transport, config))
        }
    }
}

/// Reads one value of type `options.root`, or one message when
/// `options.message` is set.
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<Decoded, Error> {
    let mut protocol = open_protocol(bytes, options);
    if options.message {
        let (identifier, body) = Value::read_message(protocol.as_mut())?;
        Ok(Decoded {
            message: Some(Envelope {
                name:  identifier.name,
                kind:  format!("{:?}", identifier.message_type),
                seqid: identifier.sequence_id,
            }),
            body,
        })
    } else {
        let body = Value::read(protocol.as_mut(), options.root)?;
        Ok(Decoded { message: None, body })
    }
}

/// Decode a payload into a pretty-printed JSON string.
///
/// Example usage:
///
/// ```
/// use brine_thrift::{decode_to_json, DecodeOptions, ProtocolKind};
///
/// // {1: i32 = 3} in the compact protocol.
/// let json = decode_to_json(
///     &[0x15, 0x06, 0x00],
///     &DecodeOptions { protocol: ProtocolKind::Compact, ..DecodeOptions::default() },
/// ).unwrap();
/// assert!(json.contains("\"1\": 3"));
/// ```
///
pub fn decode_to_json(bytes: &[u8], options: &DecodeOptions) -> Result<String, Error> {
    let decoded = decode(bytes, options)?;
    Ok(serde_json::to_string_pretty(&decoded)?)
}

/// The loaded schema as pretty-printed JSON.
pub fn schema_to_json(schema: &Schema) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(schema)?)
}
