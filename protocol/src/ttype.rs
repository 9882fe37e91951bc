use std::convert::TryFrom;
use std::fmt;

use serde::Serialize;

use crate::error::ProtocolError;

/// Wire type tags shared by every protocol. Compact and JSON translate these to
/// their own representation, but callers always deal in `TType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum TType {
    Stop   = 0,
    Void   = 1,
    Bool   = 2,
    Byte   = 3,
    Double = 4,
    I16    = 6,
    I32    = 8,
    I64    = 10,
    String = 11,
    Struct = 12,
    Map    = 13,
    Set    = 14,
    List   = 15,
}

impl TType {
    /// True for the container tags that carry nested values.
    pub fn is_container(self) -> bool {
        matches!(self, TType::Struct | TType::Map | TType::Set | TType::List)
    }

    /// The value-carrying tag named `name`, as printed by `Display`.
    pub fn from_name(name: &str) -> Option<TType> {
        [
            TType::Bool,
            TType::Byte,
            TType::Double,
            TType::I16,
            TType::I32,
            TType::I64,
            TType::String,
            TType::Struct,
            TType::Map,
            TType::Set,
            TType::List,
        ]
        .into_iter()
        .find(|ttype| ttype.to_string() == name)
    }
}

impl TryFrom<u8> for TType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0  => TType::Stop,
            1  => TType::Void,
            2  => TType::Bool,
            3  => TType::Byte,
            4  => TType::Double,
            6  => TType::I16,
            8  => TType::I32,
            10 => TType::I64,
            11 => TType::String,
            12 => TType::Struct,
            13 => TType::Map,
            14 => TType::Set,
            15 => TType::List,
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }
}

impl From<TType> for u8 {
    fn from(value: TType) -> u8 {
        value as u8
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TType::Stop   => "stop",
            TType::Void   => "void",
            TType::Bool   => "bool",
            TType::Byte   => "byte",
            TType::Double => "double",
            TType::I16    => "i16",
            TType::I32    => "i32",
            TType::I64    => "i64",
            TType::String => "string",
            TType::Struct => "struct",
            TType::Map    => "map",
            TType::Set    => "set",
            TType::List   => "list",
        };
        f.write_str(name)
    }
}

/// The kind of an RPC message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum MessageType {
    Call      = 1,
    Reply     = 2,
    Exception = 3,
    Oneway    = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(ProtocolError::InvalidData(format!(
                "Unknown message type {}",
                other
            ))),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> u8 {
        value as u8
    }
}

#[test]
fn ttype_from_byte() {
    assert_eq!(TType::try_from(0).unwrap(), TType::Stop);
    assert_eq!(TType::try_from(8).unwrap(), TType::I32);
    assert_eq!(TType::try_from(15).unwrap(), TType::List);
    assert!(matches!(TType::try_from(5), Err(ProtocolError::UnknownType(5))));
    assert!(matches!(TType::try_from(16), Err(ProtocolError::UnknownType(16))));
    assert_eq!(u8::from(TType::Struct), 12);
}

#[test]
fn ttype_names() {
    assert_eq!(TType::from_name("struct"), Some(TType::Struct));
    assert_eq!(TType::from_name("i64"), Some(TType::I64));
    assert_eq!(TType::from_name("stop"), None);
    assert_eq!(TType::from_name("float"), None);
}

#[test]
fn message_type_from_byte() {
    assert_eq!(MessageType::try_from(1).unwrap(), MessageType::Call);
    assert_eq!(MessageType::try_from(4).unwrap(), MessageType::Oneway);
    assert!(MessageType::try_from(0).is_err());
    assert!(MessageType::try_from(5).is_err());
}
