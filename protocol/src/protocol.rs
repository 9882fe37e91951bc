use crate::error::Result;
use crate::ttype::{MessageType, TType};

/// The envelope around an RPC call or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageIdentifier {
    pub name:         String,
    pub message_type: MessageType,
    pub sequence_id:  i32,
}

impl MessageIdentifier {
    pub fn new(name: impl Into<String>, message_type: MessageType, sequence_id: i32) -> Self {
        MessageIdentifier {
            name: name.into(),
            message_type,
            sequence_id,
        }
    }
}

/// A field header. A `field_type` of [TType::Stop] marks the end of a struct,
/// in which case `id` is meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIdentifier {
    pub field_type: TType,
    pub id:         i16,
}

impl FieldIdentifier {
    pub fn new(field_type: TType, id: i16) -> Self {
        FieldIdentifier { field_type, id }
    }

    pub fn stop() -> Self {
        FieldIdentifier {
            field_type: TType::Stop,
            id:         0,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.field_type == TType::Stop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListIdentifier {
    pub element_type: TType,
    pub size:         i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetIdentifier {
    pub element_type: TType,
    pub size:         i32,
}

/// Map header. The compact protocol does not transmit key and value types
/// for empty maps, so they are optional on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapIdentifier {
    pub key_type:   Option<TType>,
    pub value_type: Option<TType>,
    pub size:       i32,
}

/// A symmetric wire codec layered over a transport.
///
/// Every `*_begin` call must eventually be matched by its `*_end` call. This is
/// not checked at runtime; callers are trusted to pair them. Implementations
/// keep per-call state (the compact protocol's field-id stack, the JSON
/// protocol's separator contexts), so a protocol must not be used from two
/// threads at once.
pub trait Protocol {
    fn write_message_begin(&mut self, identifier: &MessageIdentifier) -> Result<()>;
    fn write_message_end(&mut self) -> Result<()>;
    fn write_struct_begin(&mut self, name: &str) -> Result<()>;
    fn write_struct_end(&mut self) -> Result<()>;
    fn write_field_begin(&mut self, name: &str, field_type: TType, id: i16) -> Result<()>;
    fn write_field_end(&mut self) -> Result<()>;
    fn write_field_stop(&mut self) -> Result<()>;
    fn write_list_begin(&mut self, element_type: TType, size: i32) -> Result<()>;
    fn write_list_end(&mut self) -> Result<()>;
    fn write_set_begin(&mut self, element_type: TType, size: i32) -> Result<()>;
    fn write_set_end(&mut self) -> Result<()>;
    fn write_map_begin(&mut self, key_type: TType, value_type: TType, size: i32) -> Result<()>;
    fn write_map_end(&mut self) -> Result<()>;
    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_byte(&mut self, value: i8) -> Result<()>;
    fn write_i16(&mut self, value: i16) -> Result<()>;
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_i64(&mut self, value: i64) -> Result<()>;
    fn write_double(&mut self, value: f64) -> Result<()>;
    fn write_string(&mut self, value: &str) -> Result<()>;
    fn write_binary(&mut self, value: &[u8]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;

    fn read_message_begin(&mut self) -> Result<MessageIdentifier>;
    fn read_message_end(&mut self) -> Result<()>;
    fn read_struct_begin(&mut self) -> Result<()>;
    fn read_struct_end(&mut self) -> Result<()>;
    fn read_field_begin(&mut self) -> Result<FieldIdentifier>;
    fn read_field_end(&mut self) -> Result<()>;
    fn read_list_begin(&mut self) -> Result<ListIdentifier>;
    fn read_list_end(&mut self) -> Result<()>;
    fn read_set_begin(&mut self) -> Result<SetIdentifier>;
    fn read_set_end(&mut self) -> Result<()>;
    fn read_map_begin(&mut self) -> Result<MapIdentifier>;
    fn read_map_end(&mut self) -> Result<()>;
    fn read_bool(&mut self) -> Result<bool>;
    fn read_byte(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_double(&mut self) -> Result<f64>;
    fn read_string(&mut self) -> Result<String>;
    fn read_binary(&mut self) -> Result<Vec<u8>>;
}

/// Converts raw bytes read off the wire into a `String`.
pub(crate) fn utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| {
        crate::error::ProtocolError::InvalidData(format!("String is not valid UTF-8: {}", e))
    })
}
