use std::collections::BTreeMap;
use std::ops::Index;
use std::str;

use serde::ser::{SerializeMap, SerializeSeq, SerializeTuple};
use serde::{Serialize, Serializer};

use crate::error::{ProtocolError, Result};
use crate::protocol::{MessageIdentifier, Protocol};
use crate::ttype::TType;
use crate::util::DEFAULT_MAX_DEPTH;

/// This type holds dynamic Thrift data.
///
/// A Value is driven entirely by the type tags on the wire, so it can decode
/// any payload without a schema. Struct fields are keyed by id because names
/// are never transmitted. Strings and binary are both held as bytes since the
/// wire doesn't distinguish them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    Binary(Vec<u8>),
    Struct(BTreeMap<i16, Value>),
    List {
        element_type: TType,
        elements:     Vec<Value>,
    },
    Set {
        element_type: TType,
        elements:     Vec<Value>,
    },
    Map {
        key_type:   TType,
        value_type: TType,
        entries:    Vec<(Value, Value)>,
    },
}

impl Value {
    /// A string value.
    pub fn string(value: impl Into<String>) -> Value {
        Value::Binary(value.into().into_bytes())
    }

    /// The wire type this value is written as.
    pub fn ttype(&self) -> TType {
        match *self {
            Value::Bool(_) => TType::Bool,
            Value::Byte(_) => TType::Byte,
            Value::I16(_) => TType::I16,
            Value::I32(_) => TType::I32,
            Value::I64(_) => TType::I64,
            Value::Double(_) => TType::Double,
            Value::Binary(_) => TType::String,
            Value::Struct(_) => TType::Struct,
            Value::List { .. } => TType::List,
            Value::Set { .. } => TType::Set,
            Value::Map { .. } => TType::Map,
        }
    }

    /// A convenience method to extract the value out of a [Bool](#variant.Bool).
    /// Returns `false` for other value kinds.
    pub fn as_bool(&self) -> bool {
        match *self {
            Value::Bool(value) => value,
            _ => false,
        }
    }

    /// Widens any integer kind to `i64`. Returns `0` for other value kinds.
    pub fn as_i64(&self) -> i64 {
        match *self {
            Value::Byte(value) => value as i64,
            Value::I16(value) => value as i64,
            Value::I32(value) => value as i64,
            Value::I64(value) => value,
            _ => 0,
        }
    }

    /// A convenience method to extract the value out of a [Double](#variant.Double).
    /// Returns `0.0` for other value kinds.
    pub fn as_double(&self) -> f64 {
        match *self {
            Value::Double(value) => value,
            _ => 0.0,
        }
    }

    /// Returns `""` for other value kinds and for binary that isn't UTF-8.
    pub fn as_str(&self) -> &str {
        match *self {
            Value::Binary(ref bytes) => str::from_utf8(bytes).unwrap_or(""),
            _ => "",
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match *self {
            Value::Binary(ref bytes) => bytes.as_slice(),
            _ => &[],
        }
    }

    /// The elements of a list or set. Returns an empty slice for other value
    /// kinds.
    pub fn as_elements(&self) -> &[Value] {
        match *self {
            Value::List { ref elements, .. } | Value::Set { ref elements, .. } => {
                elements.as_slice()
            }
            _ => &[],
        }
    }

    /// Number of elements, entries or fields. Returns `0` for scalars.
    pub fn len(&self) -> usize {
        match *self {
            Value::List { ref elements, .. } | Value::Set { ref elements, .. } => elements.len(),
            Value::Map { ref entries, .. } => entries.len(),
            Value::Struct(ref fields) => fields.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A convenience method to extract a field out of a [Struct](#variant.Struct).
    /// Returns `None` for other value kinds or if the field isn't present.
    pub fn get(&self, id: i16) -> Option<&Value> {
        match *self {
            Value::Struct(ref fields) => fields.get(&id),
            _ => None,
        }
    }

    /// A convenience method to update a field on a [Struct](#variant.Struct).
    /// Does nothing for other value kinds.
    pub fn set(&mut self, id: i16, value: Value) {
        if let Value::Struct(ref mut fields) = *self {
            fields.insert(id, value);
        }
    }

    /// A convenience method to append to a list or set. Does nothing for other
    /// value kinds.
    pub fn push(&mut self, value: Value) {
        if let Value::List { ref mut elements, .. } | Value::Set { ref mut elements, .. } = *self {
            elements.push(value);
        }
    }

    /// Writes this value through `protocol`. Struct fields go out in id order.
    pub fn write<P: Protocol + ?Sized>(&self, protocol: &mut P) -> Result<()> {
        match *self {
            Value::Bool(value) => protocol.write_bool(value),
            Value::Byte(value) => protocol.write_byte(value),
            Value::I16(value) => protocol.write_i16(value),
            Value::I32(value) => protocol.write_i32(value),
            Value::I64(value) => protocol.write_i64(value),
            Value::Double(value) => protocol.write_double(value),
            Value::Binary(ref bytes) => protocol.write_binary(bytes),

            Value::Struct(ref fields) => {
                protocol.write_struct_begin("")?;
                for (&id, value) in fields {
                    protocol.write_field_begin("", value.ttype(), id)?;
                    value.write(protocol)?;
                    protocol.write_field_end()?;
                }
                protocol.write_field_stop()?;
                protocol.write_struct_end()
            }

            Value::List {
                element_type,
                ref elements,
            } => {
                protocol.write_list_begin(element_type, container_size(elements.len())?)?;
                for element in elements {
                    element.write(protocol)?;
                }
                protocol.write_list_end()
            }

            Value::Set {
                element_type,
                ref elements,
            } => {
                protocol.write_set_begin(element_type, container_size(elements.len())?)?;
                for element in elements {
                    element.write(protocol)?;
                }
                protocol.write_set_end()
            }

            Value::Map {
                key_type,
                value_type,
                ref entries,
            } => {
                protocol.write_map_begin(key_type, value_type, container_size(entries.len())?)?;
                for (key, value) in entries {
                    key.write(protocol)?;
                    value.write(protocol)?;
                }
                protocol.write_map_end()
            }
        }
    }

    /// Reads one value of type `ttype` from `protocol`.
    pub fn read<P: Protocol + ?Sized>(protocol: &mut P, ttype: TType) -> Result<Value> {
        Value::read_with_depth(protocol, ttype, DEFAULT_MAX_DEPTH)
    }

    /// Like [read](#method.read), failing with [ProtocolError::DepthLimit]
    /// once values nest deeper than `max_depth`.
    pub fn read_with_depth<P: Protocol + ?Sized>(
        protocol: &mut P,
        ttype: TType,
        max_depth: usize,
    ) -> Result<Value> {
        if max_depth == 0 {
            return Err(ProtocolError::DepthLimit);
        }
        let depth = max_depth - 1;

        Ok(match ttype {
            TType::Bool => Value::Bool(protocol.read_bool()?),
            TType::Byte => Value::Byte(protocol.read_byte()?),
            TType::I16 => Value::I16(protocol.read_i16()?),
            TType::I32 => Value::I32(protocol.read_i32()?),
            TType::I64 => Value::I64(protocol.read_i64()?),
            TType::Double => Value::Double(protocol.read_double()?),
            TType::String => Value::Binary(protocol.read_binary()?),

            TType::Struct => {
                let mut fields = BTreeMap::new();
                protocol.read_struct_begin()?;
                loop {
                    let field = protocol.read_field_begin()?;
                    if field.is_stop() {
                        break;
                    }
                    let value = Value::read_with_depth(protocol, field.field_type, depth)?;
                    fields.insert(field.id, value);
                    protocol.read_field_end()?;
                }
                protocol.read_struct_end()?;
                Value::Struct(fields)
            }

            TType::List => {
                let list = protocol.read_list_begin()?;
                let mut elements = Vec::new();
                for _ in 0..list.size {
                    elements.push(Value::read_with_depth(protocol, list.element_type, depth)?);
                }
                protocol.read_list_end()?;
                Value::List {
                    element_type: list.element_type,
                    elements,
                }
            }

            TType::Set => {
                let set = protocol.read_set_begin()?;
                let mut elements = Vec::new();
                for _ in 0..set.size {
                    elements.push(Value::read_with_depth(protocol, set.element_type, depth)?);
                }
                protocol.read_set_end()?;
                Value::Set {
                    element_type: set.element_type,
                    elements,
                }
            }

            TType::Map => {
                let map = protocol.read_map_begin()?;
                // Empty compact maps carry no types; Stop stands in for them.
                let key_type = map.key_type.unwrap_or(TType::Stop);
                let value_type = map.value_type.unwrap_or(TType::Stop);
                let mut entries = Vec::new();
                for _ in 0..map.size {
                    let key = Value::read_with_depth(protocol, key_type, depth)?;
                    let value = Value::read_with_depth(protocol, value_type, depth)?;
                    entries.push((key, value));
                }
                protocol.read_map_end()?;
                Value::Map {
                    key_type,
                    value_type,
                    entries,
                }
            }

            TType::Stop | TType::Void => return Err(ProtocolError::UnknownType(ttype.into())),
        })
    }

    /// Reads a whole message: the envelope and the struct it carries.
    pub fn read_message<P: Protocol + ?Sized>(
        protocol: &mut P,
    ) -> Result<(MessageIdentifier, Value)> {
        let identifier = protocol.read_message_begin()?;
        let body = Value::read(protocol, TType::Struct)?;
        protocol.read_message_end()?;
        Ok((identifier, body))
    }

    /// Writes `self` as the struct body of a message.
    pub fn write_message<P: Protocol + ?Sized>(
        &self,
        protocol: &mut P,
        identifier: &MessageIdentifier,
    ) -> Result<()> {
        protocol.write_message_begin(identifier)?;
        self.write(protocol)?;
        protocol.write_message_end()?;
        protocol.flush()
    }
}

fn container_size(len: usize) -> Result<i32> {
    if len > i32::MAX as usize {
        return Err(ProtocolError::SizeLimit {
            what:  "container",
            len:   len as i64,
            limit: i32::MAX as usize,
        });
    }
    Ok(len as i32)
}

impl Index<usize> for Value {
    type Output = Value;

    /// A convenience method that adds support for `self[index]` expressions.
    /// It will panic if this value isn't a list or set or if the provided index
    /// is out of bounds.
    fn index(&self, index: usize) -> &Value {
        match *self {
            Value::List { ref elements, .. } | Value::Set { ref elements, .. } => &elements[index],
            _ => panic!("cannot index into a {} value", self.ttype()),
        }
    }
}

/// Serializes into plain JSON-friendly shapes: binary that is valid UTF-8
/// becomes a string, struct fields are keyed by their id, and maps become
/// lists of `[key, value]` pairs since Thrift keys need not be strings.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            Value::Bool(value) => serializer.serialize_bool(value),
            Value::Byte(value) => serializer.serialize_i8(value),
            Value::I16(value) => serializer.serialize_i16(value),
            Value::I32(value) => serializer.serialize_i32(value),
            Value::I64(value) => serializer.serialize_i64(value),
            Value::Double(value) => serializer.serialize_f64(value),
            Value::Binary(ref bytes) => match str::from_utf8(bytes) {
                Ok(text) => serializer.serialize_str(text),
                Err(_) => serializer.collect_seq(bytes),
            },
            Value::Struct(ref fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (id, value) in fields {
                    map.serialize_entry(&id.to_string(), value)?;
                }
                map.end()
            }
            Value::List { ref elements, .. } | Value::Set { ref elements, .. } => {
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Map { ref entries, .. } => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(&Pair(&entry.0, &entry.1))?;
                }
                seq.end()
            }
        }
    }
}

struct Pair<'a>(&'a Value, &'a Value);

impl<'a> Serialize for Pair<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.0)?;
        tuple.serialize_element(self.1)?;
        tuple.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryProtocol;
    use crate::compact::CompactProtocol;
    use crate::json::JsonProtocol;
    use crate::transport::BufferTransport;
    use crate::ttype::MessageType;

    fn sample() -> Value {
        let mut fields = BTreeMap::new();
        fields.insert(1, Value::string("alice"));
        fields.insert(2, Value::I32(-42));
        fields.insert(
            3,
            Value::List {
                element_type: TType::Double,
                elements:     vec![Value::Double(0.5), Value::Double(-1.0)],
            },
        );
        fields.insert(
            4,
            Value::Map {
                key_type:   TType::String,
                value_type: TType::Bool,
                entries:    vec![(Value::string("on"), Value::Bool(true))],
            },
        );
        Value::Struct(fields)
    }

    #[test]
    fn value_basic() {
        let mut value = sample();
        assert_eq!(value.ttype(), TType::Struct);
        assert_eq!(value.len(), 4);
        assert_eq!(value.get(1).map(Value::as_str), Some("alice"));
        assert_eq!(value.get(2).map(Value::as_i64), Some(-42));
        assert_eq!(value.get(3).map(|v| v[1].as_double()), Some(-1.0));
        assert!(value.get(9).is_none());

        value.set(9, Value::Byte(1));
        assert_eq!(value.len(), 5);

        let mut list = Value::List {
            element_type: TType::I16,
            elements:     vec![],
        };
        assert!(list.is_empty());
        list.push(Value::I16(7));
        assert_eq!(list.as_elements(), [Value::I16(7)]);
        assert_eq!(Value::Bool(true).as_i64(), 0);
        assert_eq!(Value::Binary(vec![0xff]).as_str(), "");
    }

    #[test]
    fn round_trip_through_each_protocol() {
        let value = sample();

        let mut binary = BinaryProtocol::new(BufferTransport::new());
        value.write(&mut binary).unwrap();
        assert_eq!(Value::read(&mut binary, TType::Struct).unwrap(), value);

        let mut compact = CompactProtocol::new(BufferTransport::new());
        value.write(&mut compact).unwrap();
        assert_eq!(Value::read(&mut compact, TType::Struct).unwrap(), value);

        let mut json = JsonProtocol::new(BufferTransport::new());
        value.write(&mut json).unwrap();
        assert_eq!(Value::read(&mut json, TType::Struct).unwrap(), value);
    }

    #[test]
    fn message_round_trip() {
        let identifier = MessageIdentifier::new("getUser", MessageType::Reply, 3);
        let mut p = CompactProtocol::new(BufferTransport::new());
        sample().write_message(&mut p, &identifier).unwrap();

        let (read_identifier, body) = Value::read_message(&mut p).unwrap();
        assert_eq!(read_identifier, identifier);
        assert_eq!(body, sample());
    }

    #[test]
    fn read_is_depth_limited() {
        let mut p = BinaryProtocol::new(BufferTransport::new());
        for _ in 0..4 {
            p.write_list_begin(TType::List, 1).unwrap();
        }
        p.write_list_begin(TType::I32, 0).unwrap();
        assert!(matches!(
            Value::read_with_depth(&mut p, TType::List, 3),
            Err(ProtocolError::DepthLimit)
        ));
    }

    #[test]
    fn serializes_to_plain_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert_eq!(
            json,
            r#"{"1":"alice","2":-42,"3":[0.5,-1.0],"4":[["on",true]]}"#
        );
        let bytes = serde_json::to_string(&Value::Binary(vec![0xff, 0])).unwrap();
        assert_eq!(bytes, "[255,0]");
    }
}
