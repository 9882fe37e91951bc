use std::convert::TryFrom;

use crate::error::{check_length, ProtocolError, Result};
use crate::protocol::{
    utf8, FieldIdentifier, ListIdentifier, MapIdentifier, MessageIdentifier, Protocol,
    SetIdentifier,
};
use crate::transport::Transport;
use crate::ttype::{MessageType, TType};

const PROTOCOL_ID: u8 = 0x82;
const VERSION: u8 = 1;
const VERSION_MASK: u8 = 0x1f;
const TYPE_MASK: u8 = 0xe0;
const TYPE_SHIFT_AMOUNT: u8 = 5;

// Compact type nibbles. Booleans get two tags so a bool field's value can ride
// in its header byte.
const COMPACT_STOP: u8 = 0x00;
const COMPACT_BOOLEAN_TRUE: u8 = 0x01;
const COMPACT_BOOLEAN_FALSE: u8 = 0x02;
const COMPACT_BYTE: u8 = 0x03;
const COMPACT_I16: u8 = 0x04;
const COMPACT_I32: u8 = 0x05;
const COMPACT_I64: u8 = 0x06;
const COMPACT_DOUBLE: u8 = 0x07;
const COMPACT_BINARY: u8 = 0x08;
const COMPACT_LIST: u8 = 0x09;
const COMPACT_SET: u8 = 0x0A;
const COMPACT_MAP: u8 = 0x0B;
const COMPACT_STRUCT: u8 = 0x0C;

fn compact_type(ttype: TType) -> Result<u8> {
    Ok(match ttype {
        TType::Stop   => COMPACT_STOP,
        TType::Bool   => COMPACT_BOOLEAN_TRUE,
        TType::Byte   => COMPACT_BYTE,
        TType::I16    => COMPACT_I16,
        TType::I32    => COMPACT_I32,
        TType::I64    => COMPACT_I64,
        TType::Double => COMPACT_DOUBLE,
        TType::String => COMPACT_BINARY,
        TType::List   => COMPACT_LIST,
        TType::Set    => COMPACT_SET,
        TType::Map    => COMPACT_MAP,
        TType::Struct => COMPACT_STRUCT,
        TType::Void   => return Err(ProtocolError::UnknownType(TType::Void.into())),
    })
}

fn ttype_of(compact: u8) -> Result<TType> {
    Ok(match compact {
        COMPACT_STOP => TType::Stop,
        COMPACT_BOOLEAN_TRUE | COMPACT_BOOLEAN_FALSE => TType::Bool,
        COMPACT_BYTE   => TType::Byte,
        COMPACT_I16    => TType::I16,
        COMPACT_I32    => TType::I32,
        COMPACT_I64    => TType::I64,
        COMPACT_DOUBLE => TType::Double,
        COMPACT_BINARY => TType::String,
        COMPACT_LIST   => TType::List,
        COMPACT_SET    => TType::Set,
        COMPACT_MAP    => TType::Map,
        COMPACT_STRUCT => TType::Struct,
        other => return Err(ProtocolError::UnknownType(other)),
    })
}

/// Maps a signed 32-bit integer onto an unsigned one so small magnitudes stay
/// small. `i32::MIN` maps to `u32::MAX` without overflowing.
pub fn zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

pub fn unzigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub fn zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub fn unzigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Options for [CompactProtocol].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompactProtocolConfig {
    /// Longest string or binary accepted on read; `None` means unlimited.
    pub string_length_limit: Option<usize>,
    /// Largest list, set or map accepted on read; `None` means unlimited.
    pub container_length_limit: Option<usize>,
}

/// Field-id bookkeeping for one direction. Each struct frame starts counting
/// from zero; the enclosing frame's last id is restored when it ends.
#[derive(Debug, Default)]
struct FieldIdStack {
    last:  i16,
    stack: Vec<i16>,
}

impl FieldIdStack {
    fn push(&mut self) {
        self.stack.push(self.last);
        self.last = 0;
    }

    fn pop(&mut self) -> Result<()> {
        self.last = self.stack.pop().ok_or_else(|| {
            ProtocolError::InvalidData("struct end without matching struct begin".to_owned())
        })?;
        Ok(())
    }
}

/// The varint/zigzag Thrift encoding.
///
/// Example usage:
///
/// ```
/// use brine_thrift_protocol::{BufferTransport, CompactProtocol, Protocol};
///
/// let mut protocol = CompactProtocol::new(BufferTransport::new());
/// protocol.write_i32(150).unwrap();
/// protocol.write_i32(-150).unwrap();
/// assert_eq!(protocol.transport().data(), [0xAC, 0x02, 0xAB, 0x02]);
/// assert_eq!(protocol.read_i32().unwrap(), 150);
/// assert_eq!(protocol.read_i32().unwrap(), -150);
/// ```
///
pub struct CompactProtocol<T> {
    transport:          T,
    config:             CompactProtocolConfig,
    write_fields:       FieldIdStack,
    read_fields:        FieldIdStack,
    pending_bool_field: Option<i16>,
    pending_bool_value: Option<bool>,
}

impl<T: Transport> CompactProtocol<T> {
    pub fn new(transport: T) -> CompactProtocol<T> {
        CompactProtocol::with_config(transport, CompactProtocolConfig::default())
    }

    pub fn with_config(transport: T, config: CompactProtocolConfig) -> CompactProtocol<T> {
        CompactProtocol {
            transport,
            config,
            write_fields:       FieldIdStack::default(),
            read_fields:        FieldIdStack::default(),
            pending_bool_field: None,
            pending_bool_value: None,
        }
    }

    pub fn config(&self) -> &CompactProtocolConfig {
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

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.transport.write(&[value])
    }

    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.transport.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Write an unsigned 32-bit integer, 7 bits per byte, least significant
    /// group first.
    pub fn write_varint32(&mut self, mut value: u32) -> Result<()> {
        let mut buf = [0u8; 5];
        let mut len = 0;
        loop {
            let byte = value as u8 & 127;
            value >>= 7;

            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }

            buf[len] = byte | 128;
            len += 1;
        }
        self.transport.write(&buf[..len])
    }

    pub fn write_varint64(&mut self, mut value: u64) -> Result<()> {
        let mut buf = [0u8; 10];
        let mut len = 0;
        loop {
            let byte = value as u8 & 127;
            value >>= 7;

            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }

            buf[len] = byte | 128;
            len += 1;
        }
        self.transport.write(&buf[..len])
    }

    pub fn read_varint32(&mut self) -> Result<u32> {
        let mut shift: u32 = 0;
        let mut result: u32 = 0;

        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 127) as u32) << shift;
            if (byte & 128) == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 35 {
                return Err(ProtocolError::InvalidData(
                    "Variable-length int over 5 bytes".to_owned(),
                ));
            }
        }
    }

    pub fn read_varint64(&mut self) -> Result<u64> {
        let mut shift: u32 = 0;
        let mut result: u64 = 0;

        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 127) as u64) << shift;
            if (byte & 128) == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 70 {
                return Err(ProtocolError::InvalidData(
                    "Variable-length int over 10 bytes".to_owned(),
                ));
            }
        }
    }

    fn write_field_header(&mut self, compact: u8, id: i16) -> Result<()> {
        let delta = id as i32 - self.write_fields.last as i32;
        if (1..=15).contains(&delta) {
            self.write_u8(((delta as u8) << 4) | compact)?;
        } else {
            self.write_u8(compact)?;
            self.write_i16(id)?;
        }
        self.write_fields.last = id;
        Ok(())
    }

    fn write_collection_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        check_length("collection", size as i64, None)?;
        let compact = compact_type(element_type)?;
        if size <= 14 {
            self.write_u8(((size as u8) << 4) | compact)
        } else {
            self.write_u8(0xf0 | compact)?;
            self.write_varint32(size as u32)
        }
    }

    fn read_collection_begin(&mut self, what: &'static str) -> Result<(TType, i32)> {
        let header = self.read_u8()?;
        let mut size = ((header >> 4) & 0x0f) as i64;
        if size == 15 {
            size = self.read_varint32()? as i32 as i64;
        }
        check_length(what, size, self.config.container_length_limit)?;
        Ok((ttype_of(header & 0x0f)?, size as i32))
    }
}

impl<T: Transport> Protocol for CompactProtocol<T> {
    fn write_message_begin(&mut self, identifier: &MessageIdentifier) -> Result<()> {
        let message_type = u8::from(identifier.message_type);
        self.write_u8(PROTOCOL_ID)?;
        self.write_u8((VERSION & VERSION_MASK) | ((message_type << TYPE_SHIFT_AMOUNT) & TYPE_MASK))?;
        self.write_varint32(zigzag32(identifier.sequence_id))?;
        self.write_string(&identifier.name)
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        self.write_fields.push();
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        self.write_fields.pop()
    }

    fn write_field_begin(&mut self, _name: &str, field_type: TType, id: i16) -> Result<()> {
        if field_type == TType::Bool {
            // The header is written by write_bool, which knows the value.
            self.pending_bool_field = Some(id);
            Ok(())
        } else {
            let compact = compact_type(field_type)?;
            self.write_field_header(compact, id)
        }
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<()> {
        self.write_u8(COMPACT_STOP)
    }

    fn write_list_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        self.write_collection_begin(element_type, size)
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        self.write_collection_begin(element_type, size)
    }

    fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_map_begin(&mut self, key_type: TType, value_type: TType, size: i32) -> Result<()> {
        check_length("map", size as i64, None)?;
        if size == 0 {
            return self.write_u8(0);
        }
        self.write_varint32(size as u32)?;
        self.write_u8((compact_type(key_type)? << 4) | compact_type(value_type)?)
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        let compact = if value {
            COMPACT_BOOLEAN_TRUE
        } else {
            COMPACT_BOOLEAN_FALSE
        };
        match self.pending_bool_field.take() {
            Some(id) => self.write_field_header(compact, id),
            None => self.write_u8(compact),
        }
    }

    fn write_byte(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_varint32(zigzag32(value as i32))
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_varint32(zigzag32(value))
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_varint64(zigzag64(value))
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.transport.write(&value.to_bits().to_le_bytes())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_binary(value.as_bytes())
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        if value.len() > i32::MAX as usize {
            return Err(ProtocolError::SizeLimit {
                what:  "string",
                len:   value.len() as i64,
                limit: i32::MAX as usize,
            });
        }
        self.write_varint32(value.len() as u32)?;
        self.transport.write(value)
    }

    fn flush(&mut self) -> Result<()> {
        self.transport.flush()
    }

    fn read_message_begin(&mut self) -> Result<MessageIdentifier> {
        let protocol_id = self.read_u8()?;
        if protocol_id != PROTOCOL_ID {
            return Err(ProtocolError::BadVersion(format!(
                "Expected protocol id {:#04x} but got {:#04x}",
                PROTOCOL_ID, protocol_id
            )));
        }

        let version_and_type = self.read_u8()?;
        let version = version_and_type & VERSION_MASK;
        if version != VERSION {
            return Err(ProtocolError::BadVersion(format!(
                "Expected version {} but got {}",
                VERSION, version
            )));
        }

        let message_type = (version_and_type >> TYPE_SHIFT_AMOUNT) & 0x07;
        let sequence_id = unzigzag32(self.read_varint32()?);
        let name = self.read_string()?;

        Ok(MessageIdentifier {
            name,
            message_type: MessageType::try_from(message_type)?,
            sequence_id,
        })
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        self.read_fields.push();
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        self.read_fields.pop()
    }

    fn read_field_begin(&mut self) -> Result<FieldIdentifier> {
        let header = self.read_u8()?;
        let compact = header & 0x0f;
        if compact == COMPACT_STOP {
            return Ok(FieldIdentifier::stop());
        }

        let delta = (header & 0xf0) >> 4;
        let id = if delta == 0 {
            self.read_i16()?
        } else {
            self.read_fields.last.wrapping_add(delta as i16)
        };

        let field_type = ttype_of(compact)?;
        if field_type == TType::Bool {
            self.pending_bool_value = Some(compact == COMPACT_BOOLEAN_TRUE);
        }
        self.read_fields.last = id;

        Ok(FieldIdentifier::new(field_type, id))
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListIdentifier> {
        let (element_type, size) = self.read_collection_begin("list")?;
        Ok(ListIdentifier { element_type, size })
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetIdentifier> {
        let (element_type, size) = self.read_collection_begin("set")?;
        Ok(SetIdentifier { element_type, size })
    }

    fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapIdentifier> {
        let size = self.read_varint32()? as i32;
        check_length("map", size as i64, self.config.container_length_limit)?;
        if size == 0 {
            return Ok(MapIdentifier {
                key_type:   None,
                value_type: None,
                size,
            });
        }

        let types = self.read_u8()?;
        Ok(MapIdentifier {
            key_type:   Some(ttype_of(types >> 4)?),
            value_type: Some(ttype_of(types & 0x0f)?),
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        match self.pending_bool_value.take() {
            Some(value) => Ok(value),
            None => match self.read_u8()? {
                COMPACT_BOOLEAN_TRUE => Ok(true),
                COMPACT_BOOLEAN_FALSE => Ok(false),
                other => Err(ProtocolError::InvalidData(format!(
                    "Invalid compact bool {:#04x}",
                    other
                ))),
            },
        }
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16> {
        Ok(unzigzag32(self.read_varint32()?) as i16)
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(unzigzag32(self.read_varint32()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(unzigzag64(self.read_varint64()?))
    }

    fn read_double(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.transport.read_exact(&mut buf)?;
        Ok(f64::from_bits(u64::from_le_bytes(buf)))
    }

    fn read_string(&mut self) -> Result<String> {
        utf8(self.read_binary()?)
    }

    fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint32()? as i32;
        let len = check_length("string", len as i64, self.config.string_length_limit)?;
        let mut buf = vec![0u8; len];
        self.transport.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferTransport;

    fn write_once(cb: fn(&mut CompactProtocol<BufferTransport>)) -> Vec<u8> {
        let mut protocol = CompactProtocol::new(BufferTransport::new());
        cb(&mut protocol);
        protocol.into_inner().into_inner()
    }

    fn reader(bytes: &[u8]) -> CompactProtocol<BufferTransport> {
        CompactProtocol::new(BufferTransport::from_bytes(bytes.to_vec()))
    }

    #[test]
    fn write_i32_vectors() {
        assert_eq!(write_once(|p| p.write_i32(0).unwrap()), [0x00]);
        assert_eq!(write_once(|p| p.write_i32(1).unwrap()), [0x02]);
        assert_eq!(write_once(|p| p.write_i32(150).unwrap()), [0xAC, 0x02]);
        assert_eq!(write_once(|p| p.write_i32(-1).unwrap()), [0x01]);
        assert_eq!(write_once(|p| p.write_i32(-150).unwrap()), [0xAB, 0x02]);
        assert_eq!(write_once(|p| p.write_i32(-64).unwrap()), [127]);
        assert_eq!(write_once(|p| p.write_i32(64).unwrap()), [128, 1]);
        assert_eq!(write_once(|p| p.write_i32(-129).unwrap()), [129, 2]);
        assert_eq!(write_once(|p| p.write_i32(65535).unwrap()), [254, 255, 7]);
        assert_eq!(
            write_once(|p| p.write_i32(2147483647).unwrap()),
            [254, 255, 255, 255, 15]
        );
        assert_eq!(
            write_once(|p| p.write_i32(-2147483648).unwrap()),
            [255, 255, 255, 255, 15]
        );
    }

    #[test]
    fn read_i32_vectors() {
        let read = |bytes: &[u8]| reader(bytes).read_i32();
        assert!(matches!(read(&[]), Err(ProtocolError::Eof)));
        assert_eq!(read(&[0]).unwrap(), 0);
        assert_eq!(read(&[1]).unwrap(), -1);
        assert_eq!(read(&[2]).unwrap(), 1);
        assert_eq!(read(&[0xAC, 0x02]).unwrap(), 150);
        assert_eq!(read(&[0xAB, 0x02]).unwrap(), -150);
        assert!(matches!(read(&[128]), Err(ProtocolError::Eof)));
        assert_eq!(read(&[128, 0]).unwrap(), 0);
        assert_eq!(read(&[253, 255, 7]).unwrap(), -65535);
        assert_eq!(read(&[254, 255, 255, 255, 15]).unwrap(), 2147483647);
        assert_eq!(read(&[255, 255, 255, 255, 15]).unwrap(), -2147483648);
    }

    #[test]
    fn overlong_varint_is_rejected() {
        assert!(matches!(
            reader(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]).read_i32(),
            Err(ProtocolError::InvalidData(_))
        ));
        assert!(matches!(
            reader(&[0xFF; 11]).read_i64(),
            Err(ProtocolError::InvalidData(_))
        ));
    }

    #[test]
    fn zigzag_extremes() {
        assert_eq!(zigzag32(i32::MIN), u32::MAX);
        assert_eq!(zigzag32(i32::MAX), u32::MAX - 1);
        assert_eq!(unzigzag32(u32::MAX), i32::MIN);
        assert_eq!(zigzag64(i64::MIN), u64::MAX);
        assert_eq!(unzigzag64(u64::MAX), i64::MIN);
        assert_eq!(unzigzag64(u64::MAX - 1), i64::MAX);
    }

    #[test]
    fn write_i64_vectors() {
        assert_eq!(write_once(|p| p.write_i64(0).unwrap()), [0]);
        assert_eq!(write_once(|p| p.write_i64(-1).unwrap()), [1]);
        assert_eq!(write_once(|p| p.write_i64(150).unwrap()), [0xAC, 0x02]);
        assert_eq!(
            write_once(|p| p.write_i64(i64::MIN).unwrap()),
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
        assert_eq!(
            reader(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01])
                .read_i64()
                .unwrap(),
            i64::MIN
        );
        assert_eq!(
            reader(&[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01])
                .read_i64()
                .unwrap(),
            i64::MAX
        );
    }

    #[test]
    fn doubles_are_little_endian() {
        assert_eq!(
            write_once(|p| p.write_double(1.0).unwrap()),
            [0, 0, 0, 0, 0, 0, 0xF0, 0x3F]
        );
        assert_eq!(reader(&[0, 0, 0, 0, 0, 0, 0xF0, 0x3F]).read_double().unwrap(), 1.0);
    }

    #[test]
    fn field_headers_use_deltas() {
        let bytes = write_once(|p| {
            p.write_struct_begin("S").unwrap();
            p.write_field_begin("a", TType::I32, 1).unwrap();
            p.write_i32(0).unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("b", TType::I32, 16).unwrap();
            p.write_i32(0).unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("c", TType::I32, 100).unwrap();
            p.write_i32(0).unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("d", TType::I32, 2).unwrap();
            p.write_i32(0).unwrap();
            p.write_field_end().unwrap();
            p.write_field_stop().unwrap();
            p.write_struct_end().unwrap();
        });
        assert_eq!(
            bytes,
            [
                0x15, 0x00, // delta 1
                0xF5, 0x00, // delta 15
                0x05, 0xC8, 0x01, 0x00, // delta 84: full header, zigzag(100)
                0x05, 0x04, 0x00, // backwards: full header, zigzag(2)
                0x00,
            ]
        );

        let mut p = reader(&bytes);
        p.read_struct_begin().unwrap();
        for expected in [1, 16, 100, 2] {
            let field = p.read_field_begin().unwrap();
            assert_eq!(field, FieldIdentifier::new(TType::I32, expected));
            assert_eq!(p.read_i32().unwrap(), 0);
            p.read_field_end().unwrap();
        }
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
    }

    #[test]
    fn nested_structs_restart_delta_tracking() {
        let bytes = write_once(|p| {
            p.write_struct_begin("Outer").unwrap();
            p.write_field_begin("a", TType::I32, 5).unwrap();
            p.write_i32(1).unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("inner", TType::Struct, 6).unwrap();
            p.write_struct_begin("Inner").unwrap();
            p.write_field_begin("x", TType::I32, 1).unwrap();
            p.write_i32(2).unwrap();
            p.write_field_end().unwrap();
            p.write_field_stop().unwrap();
            p.write_struct_end().unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("b", TType::I32, 7).unwrap();
            p.write_i32(3).unwrap();
            p.write_field_end().unwrap();
            p.write_field_stop().unwrap();
            p.write_struct_end().unwrap();
        });
        assert_eq!(
            bytes,
            [0x55, 0x02, 0x1C, 0x15, 0x04, 0x00, 0x15, 0x06, 0x00]
        );

        let mut p = reader(&bytes);
        p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap().id, 5);
        assert_eq!(p.read_i32().unwrap(), 1);
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::Struct, 6));
        p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap().id, 1);
        assert_eq!(p.read_i32().unwrap(), 2);
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
        assert_eq!(p.read_field_begin().unwrap().id, 7);
        assert_eq!(p.read_i32().unwrap(), 3);
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
    }

    #[test]
    fn bool_fields_fold_into_header() {
        let bytes = write_once(|p| {
            p.write_struct_begin("S").unwrap();
            p.write_field_begin("t", TType::Bool, 1).unwrap();
            p.write_bool(true).unwrap();
            p.write_field_end().unwrap();
            p.write_field_begin("f", TType::Bool, 2).unwrap();
            p.write_bool(false).unwrap();
            p.write_field_end().unwrap();
            p.write_field_stop().unwrap();
            p.write_struct_end().unwrap();
        });
        assert_eq!(bytes, [0x11, 0x12, 0x00]);

        let mut p = reader(&bytes);
        p.read_struct_begin().unwrap();
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::Bool, 1));
        assert!(p.read_bool().unwrap());
        assert_eq!(p.read_field_begin().unwrap(), FieldIdentifier::new(TType::Bool, 2));
        assert!(!p.read_bool().unwrap());
        assert!(p.read_field_begin().unwrap().is_stop());
        p.read_struct_end().unwrap();
    }

    #[test]
    fn bare_bools_use_compact_tags() {
        assert_eq!(write_once(|p| p.write_bool(true).unwrap()), [1]);
        assert_eq!(write_once(|p| p.write_bool(false).unwrap()), [2]);
        assert!(reader(&[1]).read_bool().unwrap());
        assert!(!reader(&[2]).read_bool().unwrap());
        assert!(matches!(reader(&[0]).read_bool(), Err(ProtocolError::InvalidData(_))));
    }

    #[test]
    fn collection_headers() {
        assert_eq!(write_once(|p| p.write_list_begin(TType::I32, 3).unwrap()), [0x35]);
        assert_eq!(write_once(|p| p.write_set_begin(TType::String, 0).unwrap()), [0x08]);
        assert_eq!(
            write_once(|p| p.write_list_begin(TType::Byte, 15).unwrap()),
            [0xF3, 0x0F]
        );
        assert_eq!(write_once(|p| p.write_map_begin(TType::String, TType::I32, 0).unwrap()), [0]);
        assert_eq!(
            write_once(|p| p.write_map_begin(TType::String, TType::I32, 2).unwrap()),
            [0x02, 0x85]
        );

        assert_eq!(
            reader(&[0xF3, 0x0F]).read_list_begin().unwrap(),
            ListIdentifier { element_type: TType::Byte, size: 15 }
        );
        let map = reader(&[0]).read_map_begin().unwrap();
        assert_eq!(map, MapIdentifier { key_type: None, value_type: None, size: 0 });
        let map = reader(&[0x02, 0x85]).read_map_begin().unwrap();
        assert_eq!(map.key_type, Some(TType::String));
        assert_eq!(map.value_type, Some(TType::I32));
        assert!(matches!(reader(&[0x3E]).read_list_begin(), Err(ProtocolError::UnknownType(0x0E))));
    }

    #[test]
    fn limits_are_checked_before_allocating() {
        let config = CompactProtocolConfig {
            string_length_limit:    Some(4),
            container_length_limit: Some(4),
        };
        let mut p = CompactProtocol::with_config(
            BufferTransport::from_bytes(vec![0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
            config,
        );
        assert!(matches!(p.read_binary(), Err(ProtocolError::SizeLimit { limit: 4, .. })));

        let mut p = CompactProtocol::with_config(BufferTransport::from_bytes(vec![0x55]), config);
        assert!(matches!(p.read_list_begin(), Err(ProtocolError::SizeLimit { len: 5, .. })));

        // A declared length that wraps negative is refused, not reinterpreted.
        let mut p = reader(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert!(matches!(p.read_binary(), Err(ProtocolError::NegativeSize { .. })));
    }

    #[test]
    fn message_header() {
        let bytes = write_once(|p| {
            p.write_message_begin(&MessageIdentifier::new("ping", MessageType::Call, 150))
                .unwrap()
        });
        assert_eq!(bytes, [0x82, 0x21, 0xAC, 0x02, 0x04, b'p', b'i', b'n', b'g']);
        assert_eq!(
            reader(&bytes).read_message_begin().unwrap(),
            MessageIdentifier::new("ping", MessageType::Call, 150)
        );

        assert!(matches!(reader(&[0x80, 0x21]).read_message_begin(), Err(ProtocolError::BadVersion(_))));
        assert!(matches!(reader(&[0x82, 0x22]).read_message_begin(), Err(ProtocolError::BadVersion(_))));
    }

    #[test]
    fn sequence_id_is_zigzag_encoded() {
        let bytes = write_once(|p| {
            p.write_message_begin(&MessageIdentifier::new("", MessageType::Call, -1))
                .unwrap()
        });
        assert_eq!(bytes, [0x82, 0x21, 0x01, 0x00]);
        assert_eq!(reader(&bytes).read_message_begin().unwrap().sequence_id, -1);
    }

    #[test]
    fn negative_sequence_ids_round_trip() {
        let mut p = CompactProtocol::new(BufferTransport::new());
        p.write_message_begin(&MessageIdentifier::new("m", MessageType::Oneway, -7)).unwrap();
        assert_eq!(p.transport().data(), [0x82, 0x81, 0x0D, 0x01, b'm']);
        assert_eq!(
            p.read_message_begin().unwrap(),
            MessageIdentifier::new("m", MessageType::Oneway, -7)
        );
    }
}
