use std::convert::TryFrom;
use std::mem;

use crate::error::{check_length, ProtocolError, Result};
use crate::protocol::{
    utf8, FieldIdentifier, ListIdentifier, MapIdentifier, MessageIdentifier, Protocol,
    SetIdentifier,
};
use crate::transport::Transport;
use crate::ttype::{MessageType, TType};

const VERSION: i64 = 1;

/// Options for [JsonProtocol].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonProtocolConfig {
    /// Longest decoded string or binary accepted on read; `None` means unlimited.
    pub string_length_limit: Option<usize>,
    /// Largest list, set or map accepted on read; `None` means unlimited.
    pub container_length_limit: Option<usize>,
}

fn type_name(ttype: TType) -> Result<&'static str> {
    Ok(match ttype {
        TType::Bool   => "tf",
        TType::Byte   => "i8",
        TType::I16    => "i16",
        TType::I32    => "i32",
        TType::I64    => "i64",
        TType::Double => "dbl",
        TType::Struct => "rec",
        TType::String => "str",
        TType::Map    => "map",
        TType::List   => "lst",
        TType::Set    => "set",
        TType::Stop | TType::Void => return Err(ProtocolError::UnknownType(ttype.into())),
    })
}

fn type_of(name: &[u8]) -> Result<TType> {
    Ok(match name {
        b"tf"  => TType::Bool,
        b"i8"  => TType::Byte,
        b"i16" => TType::I16,
        b"i32" => TType::I32,
        b"i64" => TType::I64,
        b"dbl" => TType::Double,
        b"rec" => TType::Struct,
        b"str" => TType::String,
        b"map" => TType::Map,
        b"lst" => TType::List,
        b"set" => TType::Set,
        other => {
            return Err(ProtocolError::InvalidData(format!(
                "Unrecognized type name {:?}",
                String::from_utf8_lossy(other)
            )))
        }
    })
}

/// Separator state for one level of JSON nesting. Reading and writing walk the
/// same state machine; each side keeps its own stack.
#[derive(Debug, Clone, Copy)]
enum Context {
    Base,
    List { first: bool },
    Pair { first: bool, colon: bool },
}

impl Context {
    /// Advances to the next item, returning the separator that precedes it.
    fn next_separator(&mut self) -> Option<u8> {
        match self {
            Context::Base => None,
            Context::List { first } => {
                if *first {
                    *first = false;
                    None
                } else {
                    Some(b',')
                }
            }
            Context::Pair { first, colon } => {
                if *first {
                    *first = false;
                    *colon = true;
                    None
                } else {
                    let separator = if *colon { b':' } else { b',' };
                    *colon = !*colon;
                    Some(separator)
                }
            }
        }
    }

    /// Object keys must be strings, so numbers in key position are quoted.
    fn escape_num(&self) -> bool {
        matches!(self, Context::Pair { colon: true, .. })
    }
}

#[derive(Debug)]
struct ContextStack {
    current: Context,
    stack:   Vec<Context>,
}

impl ContextStack {
    fn new() -> ContextStack {
        ContextStack {
            current: Context::Base,
            stack:   Vec::new(),
        }
    }

    fn push(&mut self, context: Context) {
        self.stack.push(mem::replace(&mut self.current, context));
    }

    fn pop(&mut self) -> Result<()> {
        self.current = self.stack.pop().ok_or_else(|| {
            ProtocolError::InvalidData("unbalanced JSON nesting".to_owned())
        })?;
        Ok(())
    }
}

/// The Thrift JSON encoding.
///
/// Structs become objects keyed by field id, each value tagged with its type
/// name; containers become arrays that lead with their element types and size.
///
/// Example usage:
///
/// ```
/// use brine_thrift_protocol::{BufferTransport, JsonProtocol, Protocol, TType};
///
/// let mut protocol = JsonProtocol::new(BufferTransport::new());
/// protocol.write_struct_begin("Point").unwrap();
/// protocol.write_field_begin("x", TType::I32, 1).unwrap();
/// protocol.write_i32(3).unwrap();
/// protocol.write_field_end().unwrap();
/// protocol.write_field_stop().unwrap();
/// protocol.write_struct_end().unwrap();
/// assert_eq!(protocol.transport().data(), br#"{"1":{"i32":3}}"#);
/// ```
///
pub struct JsonProtocol<T> {
    transport: T,
    config:    JsonProtocolConfig,
    writing:   ContextStack,
    reading:   ContextStack,
    lookahead: Option<u8>,
}

impl<T: Transport> JsonProtocol<T> {
    pub fn new(transport: T) -> JsonProtocol<T> {
        JsonProtocol::with_config(transport, JsonProtocolConfig::default())
    }

    pub fn with_config(transport: T, config: JsonProtocolConfig) -> JsonProtocol<T> {
        JsonProtocol {
            transport,
            config,
            writing:   ContextStack::new(),
            reading:   ContextStack::new(),
            lookahead: None,
        }
    }

    pub fn config(&self) -> &JsonProtocolConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    // writing

    fn write_separator(&mut self) -> Result<()> {
        match self.writing.current.next_separator() {
            Some(separator) => self.transport.write(&[separator]),
            None => Ok(()),
        }
    }

    fn write_json_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_separator()?;
        let mut out = Vec::with_capacity(bytes.len() + 2);
        out.push(b'"');
        for &byte in bytes {
            match byte {
                b'"' => out.extend_from_slice(b"\\\""),
                b'\\' => out.extend_from_slice(b"\\\\"),
                0x08 => out.extend_from_slice(b"\\b"),
                0x0c => out.extend_from_slice(b"\\f"),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                b'\t' => out.extend_from_slice(b"\\t"),
                0x00..=0x1f => out.extend_from_slice(format!("\\u{:04x}", byte).as_bytes()),
                _ => out.push(byte),
            }
        }
        out.push(b'"');
        self.transport.write(&out)
    }

    fn write_json_integer(&mut self, value: i64) -> Result<()> {
        self.write_separator()?;
        let text = if self.writing.current.escape_num() {
            format!("\"{}\"", value)
        } else {
            value.to_string()
        };
        self.transport.write(text.as_bytes())
    }

    fn write_json_double(&mut self, value: f64) -> Result<()> {
        self.write_separator()?;
        let text = if value.is_nan() {
            "\"NaN\"".to_owned()
        } else if value.is_infinite() {
            if value > 0.0 {
                "\"Infinity\"".to_owned()
            } else {
                "\"-Infinity\"".to_owned()
            }
        } else if self.writing.current.escape_num() {
            format!("\"{:?}\"", value)
        } else {
            format!("{:?}", value)
        };
        self.transport.write(text.as_bytes())
    }

    fn write_json_base64(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_separator()?;
        let mut out = Vec::with_capacity(bytes.len() * 4 / 3 + 4);
        out.push(b'"');
        base64::encode(bytes, &mut out);
        out.push(b'"');
        self.transport.write(&out)
    }

    fn write_object_start(&mut self) -> Result<()> {
        self.write_separator()?;
        self.transport.write(b"{")?;
        self.writing.push(Context::Pair { first: true, colon: false });
        Ok(())
    }

    fn write_object_end(&mut self) -> Result<()> {
        self.writing.pop()?;
        self.transport.write(b"}")
    }

    fn write_array_start(&mut self) -> Result<()> {
        self.write_separator()?;
        self.transport.write(b"[")?;
        self.writing.push(Context::List { first: true });
        Ok(())
    }

    fn write_array_end(&mut self) -> Result<()> {
        self.writing.pop()?;
        self.transport.write(b"]")
    }

    // reading

    fn peek(&mut self) -> Result<Option<u8>> {
        if self.lookahead.is_none() {
            let mut buf = [0u8; 1];
            if self.transport.read(&mut buf)? == 1 {
                self.lookahead = Some(buf[0]);
            }
        }
        Ok(self.lookahead)
    }

    fn next_byte(&mut self) -> Result<u8> {
        match self.lookahead.take() {
            Some(byte) => Ok(byte),
            None => {
                let mut buf = [0u8; 1];
                self.transport.read_exact(&mut buf)?;
                Ok(buf[0])
            }
        }
    }

    fn skip_whitespace(&mut self) -> Result<()> {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek()? {
            self.lookahead = None;
        }
        Ok(())
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        self.skip_whitespace()?;
        let byte = self.next_byte()?;
        if byte != expected {
            return Err(ProtocolError::InvalidData(format!(
                "Expected '{}' but found '{}'",
                expected as char, byte as char
            )));
        }
        Ok(())
    }

    fn read_separator(&mut self) -> Result<()> {
        match self.reading.current.next_separator() {
            Some(separator) => self.expect(separator),
            None => Ok(()),
        }
    }

    fn read_hex4(&mut self) -> Result<u16> {
        let mut value = 0u16;
        for _ in 0..4 {
            let byte = self.next_byte()?;
            let digit = (byte as char).to_digit(16).ok_or_else(|| {
                ProtocolError::InvalidData(format!("Invalid hex digit '{}'", byte as char))
            })?;
            value = (value << 4) | digit as u16;
        }
        Ok(value)
    }

    fn read_json_string(&mut self, skip_separator: bool) -> Result<Vec<u8>> {
        if !skip_separator {
            self.read_separator()?;
        }
        self.expect(b'"')?;

        let mut out = Vec::new();
        loop {
            if let Some(limit) = self.config.string_length_limit {
                if out.len() > limit {
                    return Err(ProtocolError::SizeLimit {
                        what:  "string",
                        len:   out.len() as i64,
                        limit,
                    });
                }
            }

            let byte = self.next_byte()?;
            match byte {
                b'"' => break,
                b'\\' => match self.next_byte()? {
                    b'"' => out.push(b'"'),
                    b'\\' => out.push(b'\\'),
                    b'/' => out.push(b'/'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0c),
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'u' => {
                        let unit = self.read_hex4()?;
                        let code = if (0xd800..0xdc00).contains(&unit) {
                            self.expect(b'\\')?;
                            self.expect(b'u')?;
                            let low = self.read_hex4()?;
                            if !(0xdc00..0xe000).contains(&low) {
                                return Err(ProtocolError::InvalidData(
                                    "Unpaired high surrogate in string".to_owned(),
                                ));
                            }
                            0x10000 + (((unit as u32) - 0xd800) << 10) + ((low as u32) - 0xdc00)
                        } else {
                            unit as u32
                        };
                        let ch = char::from_u32(code).ok_or_else(|| {
                            ProtocolError::InvalidData(format!("Invalid code point {:#x}", code))
                        })?;
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                    }
                    other => {
                        return Err(ProtocolError::InvalidData(format!(
                            "Invalid escape '\\{}'",
                            other as char
                        )))
                    }
                },
                _ => out.push(byte),
            }
        }

        if let Some(limit) = self.config.string_length_limit {
            check_length("string", out.len() as i64, Some(limit))?;
        }
        Ok(out)
    }

    fn read_numeric_chars(&mut self) -> Result<String> {
        self.skip_whitespace()?;
        let mut text = String::new();
        while let Some(byte) = self.peek()? {
            match byte {
                b'+' | b'-' | b'.' | b'0'..=b'9' | b'E' | b'e' => {
                    text.push(byte as char);
                    self.lookahead = None;
                }
                _ => break,
            }
        }
        if text.is_empty() {
            return Err(ProtocolError::InvalidData("Expected a number".to_owned()));
        }
        Ok(text)
    }

    fn read_json_integer(&mut self) -> Result<i64> {
        self.read_separator()?;
        let quoted = self.reading.current.escape_num();
        if quoted {
            self.expect(b'"')?;
        }
        let text = self.read_numeric_chars()?;
        if quoted {
            self.expect(b'"')?;
        }
        text.parse::<i64>()
            .map_err(|_| ProtocolError::InvalidData(format!("Invalid integer {:?}", text)))
    }

    fn read_json_double(&mut self) -> Result<f64> {
        self.read_separator()?;
        self.skip_whitespace()?;
        if self.peek()? == Some(b'"') {
            let bytes = self.read_json_string(true)?;
            let text = utf8(bytes)?;
            match text.as_str() {
                "NaN" => return Ok(f64::NAN),
                "Infinity" => return Ok(f64::INFINITY),
                "-Infinity" => return Ok(f64::NEG_INFINITY),
                _ => {}
            }
            if !self.reading.current.escape_num() {
                return Err(ProtocolError::InvalidData(
                    "Numeric data unexpectedly quoted".to_owned(),
                ));
            }
            return text
                .parse::<f64>()
                .map_err(|_| ProtocolError::InvalidData(format!("Invalid double {:?}", text)));
        }

        if self.reading.current.escape_num() {
            // Keys must be quoted; this reports the missing quote.
            self.expect(b'"')?;
        }
        let text = self.read_numeric_chars()?;
        text.parse::<f64>()
            .map_err(|_| ProtocolError::InvalidData(format!("Invalid double {:?}", text)))
    }

    fn read_json_base64(&mut self) -> Result<Vec<u8>> {
        let encoded = self.read_json_string(false)?;
        base64::decode(&encoded)
    }

    fn read_object_start(&mut self) -> Result<()> {
        self.read_separator()?;
        self.expect(b'{')?;
        self.reading.push(Context::Pair { first: true, colon: false });
        Ok(())
    }

    fn read_object_end(&mut self) -> Result<()> {
        self.expect(b'}')?;
        self.reading.pop()
    }

    fn read_array_start(&mut self) -> Result<()> {
        self.read_separator()?;
        self.expect(b'[')?;
        self.reading.push(Context::List { first: true });
        Ok(())
    }

    fn read_array_end(&mut self) -> Result<()> {
        self.expect(b']')?;
        self.reading.pop()
    }

    fn read_type_name(&mut self) -> Result<TType> {
        let name = self.read_json_string(false)?;
        type_of(&name)
    }

    fn read_size(&mut self, what: &'static str) -> Result<i32> {
        let size = self.read_json_integer()?;
        check_length(what, size, self.config.container_length_limit)?;
        i32::try_from(size).map_err(|_| ProtocolError::SizeLimit {
            what,
            len: size,
            limit: i32::MAX as usize,
        })
    }

    fn read_ranged<N: TryFrom<i64>>(&mut self, what: &str) -> Result<N> {
        let value = self.read_json_integer()?;
        N::try_from(value)
            .map_err(|_| ProtocolError::InvalidData(format!("{} out of range for {}", value, what)))
    }
}

impl<T: Transport> Protocol for JsonProtocol<T> {
    fn write_message_begin(&mut self, identifier: &MessageIdentifier) -> Result<()> {
        self.write_array_start()?;
        self.write_json_integer(VERSION)?;
        self.write_json_string(identifier.name.as_bytes())?;
        self.write_json_integer(u8::from(identifier.message_type) as i64)?;
        self.write_json_integer(identifier.sequence_id as i64)
    }

    fn write_message_end(&mut self) -> Result<()> {
        self.write_array_end()
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.write_object_start()
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.write_object_end()
    }

    fn write_field_begin(&mut self, _name: &str, field_type: TType, id: i16) -> Result<()> {
        let name = type_name(field_type)?;
        self.write_json_integer(id as i64)?;
        self.write_object_start()?;
        self.write_json_string(name.as_bytes())
    }

    fn write_field_end(&mut self) -> Result<()> {
        self.write_object_end()
    }

    fn write_field_stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_list_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        check_length("list", size as i64, None)?;
        let name = type_name(element_type)?;
        self.write_array_start()?;
        self.write_json_string(name.as_bytes())?;
        self.write_json_integer(size as i64)
    }

    fn write_list_end(&mut self) -> Result<()> {
        self.write_array_end()
    }

    fn write_set_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        self.write_list_begin(element_type, size)
    }

    fn write_set_end(&mut self) -> Result<()> {
        self.write_array_end()
    }

    fn write_map_begin(&mut self, key_type: TType, value_type: TType, size: i32) -> Result<()> {
        check_length("map", size as i64, None)?;
        let key = type_name(key_type)?;
        let value = type_name(value_type)?;
        self.write_array_start()?;
        self.write_json_string(key.as_bytes())?;
        self.write_json_string(value.as_bytes())?;
        self.write_json_integer(size as i64)?;
        self.write_object_start()
    }

    fn write_map_end(&mut self) -> Result<()> {
        self.write_object_end()?;
        self.write_array_end()
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_json_integer(if value { 1 } else { 0 })
    }

    fn write_byte(&mut self, value: i8) -> Result<()> {
        self.write_json_integer(value as i64)
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_json_integer(value as i64)
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_json_integer(value as i64)
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_json_integer(value)
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_json_double(value)
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_json_string(value.as_bytes())
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.write_json_base64(value)
    }

    fn flush(&mut self) -> Result<()> {
        self.transport.flush()
    }

    fn read_message_begin(&mut self) -> Result<MessageIdentifier> {
        self.read_array_start()?;
        let version = self.read_json_integer()?;
        if version != VERSION {
            return Err(ProtocolError::BadVersion(format!(
                "Expected version {} but got {}",
                VERSION, version
            )));
        }
        let name = utf8(self.read_json_string(false)?)?;
        let message_type: u8 = self.read_ranged("message type")?;
        let sequence_id = self.read_ranged("sequence id")?;
        Ok(MessageIdentifier {
            name,
            message_type: MessageType::try_from(message_type)?,
            sequence_id,
        })
    }

    fn read_message_end(&mut self) -> Result<()> {
        self.read_array_end()
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.read_object_start()
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.read_object_end()
    }

    fn read_field_begin(&mut self) -> Result<FieldIdentifier> {
        self.skip_whitespace()?;
        if self.peek()? == Some(b'}') {
            return Ok(FieldIdentifier::stop());
        }
        let id = self.read_ranged("field id")?;
        self.read_object_start()?;
        let field_type = self.read_type_name()?;
        Ok(FieldIdentifier::new(field_type, id))
    }

    fn read_field_end(&mut self) -> Result<()> {
        self.read_object_end()
    }

    fn read_list_begin(&mut self) -> Result<ListIdentifier> {
        self.read_array_start()?;
        let element_type = self.read_type_name()?;
        let size = self.read_size("list")?;
        Ok(ListIdentifier { element_type, size })
    }

    fn read_list_end(&mut self) -> Result<()> {
        self.read_array_end()
    }

    fn read_set_begin(&mut self) -> Result<SetIdentifier> {
        self.read_array_start()?;
        let element_type = self.read_type_name()?;
        let size = self.read_size("set")?;
        Ok(SetIdentifier { element_type, size })
    }

    fn read_set_end(&mut self) -> Result<()> {
        self.read_array_end()
    }

    fn read_map_begin(&mut self) -> Result<MapIdentifier> {
        self.read_array_start()?;
        let key_type = self.read_type_name()?;
        let value_type = self.read_type_name()?;
        let size = self.read_size("map")?;
        self.read_object_start()?;
        Ok(MapIdentifier {
            key_type: Some(key_type),
            value_type: Some(value_type),
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<()> {
        self.read_object_end()?;
        self.read_array_end()
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_json_integer()? != 0)
    }

    fn read_byte(&mut self) -> Result<i8> {
        self.read_ranged("byte")
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.read_ranged("i16")
    }

    fn read_i32(&mut self) -> Result<i32> {
        self.read_ranged("i32")
    }

    fn read_i64(&mut self) -> Result<i64> {
        self.read_json_integer()
    }

    fn read_double(&mut self) -> Result<f64> {
        self.read_json_double()
    }

    fn read_string(&mut self) -> Result<String> {
        utf8(self.read_json_string(false)?)
    }

    fn read_binary(&mut self) -> Result<Vec<u8>> {
        self.read_json_base64()
    }
}

/// Standard-alphabet base64. Output is unpadded; input padding is tolerated.
mod base64 {
    use crate::error::{ProtocolError, Result};

    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    pub fn encode(input: &[u8], out: &mut Vec<u8>) {
        for chunk in input.chunks(3) {
            let b0 = chunk[0] as u32;
            let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
            let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
            let group = (b0 << 16) | (b1 << 8) | b2;

            out.push(ALPHABET[(group >> 18) as usize & 0x3f]);
            out.push(ALPHABET[(group >> 12) as usize & 0x3f]);
            if chunk.len() > 1 {
                out.push(ALPHABET[(group >> 6) as usize & 0x3f]);
            }
            if chunk.len() > 2 {
                out.push(ALPHABET[group as usize & 0x3f]);
            }
        }
    }

    fn sextet(byte: u8) -> Result<u32> {
        let value = match byte {
            b'A'..=b'Z' => byte - b'A',
            b'a'..=b'z' => byte - b'a' + 26,
            b'0'..=b'9' => byte - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => {
                return Err(ProtocolError::InvalidData(format!(
                    "Invalid base64 character '{}'",
                    byte as char
                )))
            }
        };
        Ok(value as u32)
    }

    pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
        let mut input = input;
        for _ in 0..2 {
            if let Some((b'=', rest)) = input.split_last() {
                input = rest;
            }
        }

        let mut out = Vec::with_capacity(input.len() * 3 / 4);
        for chunk in input.chunks(4) {
            if chunk.len() == 1 {
                return Err(ProtocolError::InvalidData("Truncated base64 input".to_owned()));
            }
            let mut group = 0u32;
            for (i, &byte) in chunk.iter().enumerate() {
                group |= sextet(byte)? << (18 - 6 * i);
            }
            out.push((group >> 16) as u8);
            if chunk.len() > 2 {
                out.push((group >> 8) as u8);
            }
            if chunk.len() > 3 {
                out.push(group as u8);
            }
        }
        Ok(out)
    }

    #[test]
    fn base64_vectors() {
        let enc = |input: &[u8]| {
            let mut out = Vec::new();
            encode(input, &mut out);
            String::from_utf8(out).unwrap()
        };
        assert_eq!(enc(b""), "");
        assert_eq!(enc(b"f"), "Zg");
        assert_eq!(enc(b"fo"), "Zm8");
        assert_eq!(enc(b"foo"), "Zm9v");
        assert_eq!(enc(b"foobar"), "Zm9vYmFy");
        assert_eq!(enc(&[0xff, 0xfe]), "//4");

        assert_eq!(decode(b"Zm9vYmE").unwrap(), b"fooba");
        assert_eq!(decode(b"Zm9vYmE=").unwrap(), b"fooba");
        assert_eq!(decode(b"Zg==").unwrap(), b"f");
        assert!(decode(b"Z").is_err());
        assert!(decode(b"Zm9*").is_err());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferTransport;

    fn write_once(cb: fn(&mut JsonProtocol<BufferTransport>)) -> String {
        let mut protocol = JsonProtocol::new(BufferTransport::new());
        cb(&mut protocol);
        String::from_utf8(protocol.into_inner().into_inner()).unwrap()
    }

    fn reader(text: &str) -> JsonProtocol<BufferTransport> {
        JsonProtocol::new(BufferTransport::from_bytes(text.as_bytes().to_vec()))
    }

    #[test]
    fn struct_fields_are_keyed_by_id() {
        let json = write_once(|p| {
            p.write_struct_begin("S").unwrap();
            p.write_field_begin("a", TType::I32, 1).unwrap();
            p.write_i32(-5).unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("b", TType::Bool, 2).unwrap();
            p.write_bool(true).unwrap();
            p.write_field_end().unwrap();
            p.write_field_stop().unwrap();
            p.write_struct_end().unwrap();
        });
        assert_eq!(json, r#"{"1":{"i32":-5},"2":{"tf":1}}"#);

        let mut p = reader(&json);
        p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::I32, 1));
        assert_eq!(p.read_i32().unwrap(), -5);
        p.read_field_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::Bool, 2));
        assert!(p.read_bool().unwrap());
        p.read_field_end().unwrap();
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
    }

    #[test]
    fn message_envelope() {
        let json = write_once(|p| {
            p.write_message_begin(&MessageIdentifier::new("ping", MessageType::Call, 7))
                .unwrap();
            p.write_struct_begin("args").unwrap();
            p.write_field_stop().unwrap();
            p.write_struct_end().unwrap();
            p.write_message_end().unwrap();
        });
        assert_eq!(json, r#"[1,"ping",1,7,{}]"#);

        let mut p = reader(&json);
        assert_eq!(
            p.read_message_begin().unwrap(),
            MessageIdentifier::new("ping", MessageType::Call, 7)
        );
        p.read_struct_begin().unwrap();
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
        p.read_message_end().unwrap();

        assert!(matches!(
            reader(r#"[2,"ping",1,7]"#).read_message_begin(),
            Err(ProtocolError::BadVersion(_))
        ));
    }

    #[test]
    fn containers() {
        let json = write_once(|p| {
            p.write_list_begin(TType::I32, 3).unwrap();
            for i in 1..=3 {
                p.write_i32(i).unwrap();
            }
            p.write_list_end().unwrap();
        });
        assert_eq!(json, r#"["i32",3,1,2,3]"#);

        let json = write_once(|p| {
            p.write_map_begin(TType::I32, TType::String, 2).unwrap();
            p.write_i32(5).unwrap();
            p.write_string("five").unwrap();
            p.write_i32(6).unwrap();
            p.write_string("six").unwrap();
            p.write_map_end().unwrap();
        });
        assert_eq!(json, r#"["i32","str",2,{"5":"five","6":"six"}]"#);

        let mut p = reader(&json);
        let map = p.read_map_begin().unwrap();
        assert_eq!(map.key_type, Some(TType::I32));
        assert_eq!(map.value_type, Some(TType::String));
        assert_eq!(map.size, 2);
        assert_eq!(p.read_i32().unwrap(), 5);
        assert_eq!(p.read_string().unwrap(), "five");
        assert_eq!(p.read_i32().unwrap(), 6);
        assert_eq!(p.read_string().unwrap(), "six");
        p.read_map_end().unwrap();

        let json = write_once(|p| {
            p.write_set_begin(TType::String, 0).unwrap();
            p.write_set_end().unwrap();
        });
        assert_eq!(json, r#"["str",0]"#);
    }

    #[test]
    fn doubles() {
        let json = write_once(|p| {
            p.write_list_begin(TType::Double, 4).unwrap();
            p.write_double(0.5).unwrap();
            p.write_double(f64::NAN).unwrap();
            p.write_double(f64::INFINITY).unwrap();
            p.write_double(f64::NEG_INFINITY).unwrap();
            p.write_list_end().unwrap();
        });
        assert_eq!(json, r#"["dbl",4,0.5,"NaN","Infinity","-Infinity"]"#);

        let mut p = reader(&json);
        p.read_list_begin().unwrap();
        assert_eq!(p.read_double().unwrap(), 0.5);
        assert!(p.read_double().unwrap().is_nan());
        assert_eq!(p.read_double().unwrap(), f64::INFINITY);
        assert_eq!(p.read_double().unwrap(), f64::NEG_INFINITY);
        p.read_list_end().unwrap();

        assert!(matches!(reader(r#""1.5""#).read_double(), Err(ProtocolError::InvalidData(_))));
    }

    #[test]
    fn double_map_keys_are_quoted() {
        let json = write_once(|p| {
            p.write_map_begin(TType::Double, TType::Bool, 1).unwrap();
            p.write_double(1.5).unwrap();
            p.write_bool(false).unwrap();
            p.write_map_end().unwrap();
        });
        assert_eq!(json, r#"["dbl","tf",1,{"1.5":0}]"#);

        let mut p = reader(&json);
        p.read_map_begin().unwrap();
        assert_eq!(p.read_double().unwrap(), 1.5);
        assert!(!p.read_bool().unwrap());
        p.read_map_end().unwrap();
    }

    #[test]
    fn string_escapes() {
        let json = write_once(|p| p.write_string("a\"b\\\n\u{1}é").unwrap());
        assert_eq!(json, "\"a\\\"b\\\\\\n\\u0001é\"");
        assert_eq!(reader(&json).read_string().unwrap(), "a\"b\\\n\u{1}é");

        assert_eq!(reader(r#""\u00e9\/""#).read_string().unwrap(), "é/");
        assert_eq!(reader(r#""\ud83d\ude00""#).read_string().unwrap(), "😀");
        assert!(reader(r#""\ud83d""#).read_string().is_err());
        assert!(reader(r#""\q""#).read_string().is_err());
        assert!(matches!(reader(r#""abc"#).read_string(), Err(ProtocolError::Eof)));
    }

    #[test]
    fn binary_is_base64() {
        let json = write_once(|p| p.write_binary(b"hello").unwrap());
        assert_eq!(json, r#""aGVsbG8""#);
        assert_eq!(reader(&json).read_binary().unwrap(), b"hello");
        assert_eq!(reader(r#""aGVsbG8=""#).read_binary().unwrap(), b"hello");
    }

    #[test]
    fn whitespace_between_tokens_is_ignored() {
        let mut p = reader("{ \"1\" : { \"i64\" : 9 } ,\n \"3\": {\"str\": \"x\"} }");
        p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::I64, 1));
        assert_eq!(p.read_i64().unwrap(), 9);
        p.read_field_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::String, 3));
        assert_eq!(p.read_string().unwrap(), "x");
        p.read_field_end().unwrap();
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
    }

    #[test]
    fn integers_are_range_checked() {
        assert_eq!(reader("-128").read_byte().unwrap(), -128);
        assert!(matches!(reader("128").read_byte(), Err(ProtocolError::InvalidData(_))));
        assert!(matches!(reader("40000").read_i16(), Err(ProtocolError::InvalidData(_))));
        assert_eq!(reader("-9223372036854775808").read_i64().unwrap(), i64::MIN);
        assert!(matches!(reader("x").read_i32(), Err(ProtocolError::InvalidData(_))));
    }

    #[test]
    fn limits() {
        let config = JsonProtocolConfig {
            string_length_limit:    Some(3),
            container_length_limit: Some(2),
        };
        let mut p = JsonProtocol::with_config(
            BufferTransport::from_bytes(br#""abcdef""#.to_vec()),
            config,
        );
        assert!(matches!(p.read_string(), Err(ProtocolError::SizeLimit { .. })));

        let mut p = JsonProtocol::with_config(
            BufferTransport::from_bytes(br#"["i32",3,1,2,3]"#.to_vec()),
            config,
        );
        assert!(matches!(p.read_list_begin(), Err(ProtocolError::SizeLimit { len: 3, .. })));

        assert!(matches!(
            reader(r#"["i32",-1]"#).read_list_begin(),
            Err(ProtocolError::NegativeSize { .. })
        ));
    }

    #[test]
    fn unknown_type_names_are_rejected() {
        assert!(matches!(
            reader(r#"["u8",0]"#).read_list_begin(),
            Err(ProtocolError::InvalidData(_))
        ));
        let mut p = JsonProtocol::new(BufferTransport::new());
        assert!(matches!(
            p.write_list_begin(TType::Void, 0),
            Err(ProtocolError::UnknownType(1))
        ));
    }
}
