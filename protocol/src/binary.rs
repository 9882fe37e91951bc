use std::convert::TryFrom;

use crate::error::{check_length, ProtocolError, Result};
use crate::protocol::{
    utf8, FieldIdentifier, ListIdentifier, MapIdentifier, MessageIdentifier, Protocol,
    SetIdentifier,
};
use crate::transport::Transport;
use crate::ttype::{MessageType, TType};

const VERSION_MASK: u32 = 0xffff_0000;
const VERSION_1: u32 = 0x8001_0000;

/// Options for [BinaryProtocol].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryProtocolConfig {
    /// Reject message headers that lack the version word.
    pub strict_read: bool,
    /// Write the version word in message headers.
    pub strict_write: bool,
    /// Longest string or binary accepted on read; `None` means unlimited.
    pub string_length_limit: Option<usize>,
    /// Largest list, set or map accepted on read; `None` means unlimited.
    pub container_length_limit: Option<usize>,
}

impl Default for BinaryProtocolConfig {
    fn default() -> Self {
        BinaryProtocolConfig {
            strict_read:            false,
            strict_write:           false,
            string_length_limit:    None,
            container_length_limit: None,
        }
    }
}

/// The fixed-width big-endian Thrift encoding.
///
/// Example usage:
///
/// ```
/// use brine_thrift_protocol::{BinaryProtocol, BufferTransport, Protocol};
///
/// let mut protocol = BinaryProtocol::new(BufferTransport::new());
/// protocol.write_i32(-2).unwrap();
/// protocol.write_string("hi").unwrap();
/// assert_eq!(protocol.transport().data(), [255, 255, 255, 254, 0, 0, 0, 2, 104, 105]);
/// assert_eq!(protocol.read_i32().unwrap(), -2);
/// assert_eq!(protocol.read_string().unwrap(), "hi");
/// ```
///
pub struct BinaryProtocol<T> {
    transport: T,
    config:    BinaryProtocolConfig,
}

impl<T: Transport> BinaryProtocol<T> {
    pub fn new(transport: T) -> BinaryProtocol<T> {
        BinaryProtocol::with_config(transport, BinaryProtocolConfig::default())
    }

    pub fn with_config(transport: T, config: BinaryProtocolConfig) -> BinaryProtocol<T> {
        BinaryProtocol { transport, config }
    }

    pub fn config(&self) -> &BinaryProtocolConfig {
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

    fn read_ttype(&mut self) -> Result<TType> {
        TType::try_from(self.read_u8()?)
    }

    fn read_container_size(&mut self, what: &'static str) -> Result<i32> {
        let size = self.read_i32()?;
        check_length(what, size as i64, self.config.container_length_limit)?;
        Ok(size)
    }

    fn read_binary_body(&mut self, len: i32) -> Result<Vec<u8>> {
        let len = check_length("string", len as i64, self.config.string_length_limit)?;
        let mut buf = vec![0u8; len];
        self.transport.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<T: Transport> Protocol for BinaryProtocol<T> {
    fn write_message_begin(&mut self, identifier: &MessageIdentifier) -> Result<()> {
        let message_type = u8::from(identifier.message_type);
        if self.config.strict_write {
            self.write_i32((VERSION_1 | message_type as u32) as i32)?;
            self.write_string(&identifier.name)?;
        } else {
            self.write_string(&identifier.name)?;
            self.write_u8(message_type)?;
        }
        self.write_i32(identifier.sequence_id)
    }

    fn write_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn write_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_begin(&mut self, _name: &str, field_type: TType, id: i16) -> Result<()> {
        self.write_u8(field_type.into())?;
        self.write_i16(id)
    }

    fn write_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_field_stop(&mut self) -> Result<()> {
        self.write_u8(TType::Stop.into())
    }

    fn write_list_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        self.write_u8(element_type.into())?;
        self.write_i32(size)
    }

    fn write_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_set_begin(&mut self, element_type: TType, size: i32) -> Result<()> {
        self.write_u8(element_type.into())?;
        self.write_i32(size)
    }

    fn write_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_map_begin(&mut self, key_type: TType, value_type: TType, size: i32) -> Result<()> {
        self.write_u8(key_type.into())?;
        self.write_u8(value_type.into())?;
        self.write_i32(size)
    }

    fn write_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(if value { 1 } else { 0 })
    }

    fn write_byte(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.transport.write(&value.to_be_bytes())
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.transport.write(&value.to_be_bytes())
    }

    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.transport.write(&value.to_be_bytes())
    }

    fn write_double(&mut self, value: f64) -> Result<()> {
        self.write_i64(value.to_bits() as i64)
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
        self.write_i32(value.len() as i32)?;
        self.transport.write(value)
    }

    fn flush(&mut self) -> Result<()> {
        self.transport.flush()
    }

    fn read_message_begin(&mut self) -> Result<MessageIdentifier> {
        let size = self.read_i32()?;
        let (name, message_type) = if size < 0 {
            let version = size as u32 & VERSION_MASK;
            if version != VERSION_1 {
                return Err(ProtocolError::BadVersion(format!(
                    "Bad version in read_message_begin: {:#010x}",
                    version
                )));
            }
            let message_type = (size as u32 & 0xff) as u8;
            (self.read_string()?, message_type)
        } else {
            if self.config.strict_read {
                return Err(ProtocolError::BadVersion(
                    "Missing version in read_message_begin, old client?".to_owned(),
                ));
            }
            let name = utf8(self.read_binary_body(size)?)?;
            (name, self.read_u8()?)
        };

        Ok(MessageIdentifier {
            name,
            message_type: MessageType::try_from(message_type)?,
            sequence_id:  self.read_i32()?,
        })
    }

    fn read_message_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldIdentifier> {
        let field_type = self.read_ttype()?;
        if field_type == TType::Stop {
            return Ok(FieldIdentifier::stop());
        }
        Ok(FieldIdentifier::new(field_type, self.read_i16()?))
    }

    fn read_field_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListIdentifier> {
        let element_type = self.read_ttype()?;
        let size = self.read_container_size("list")?;
        Ok(ListIdentifier { element_type, size })
    }

    fn read_list_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetIdentifier> {
        let element_type = self.read_ttype()?;
        let size = self.read_container_size("set")?;
        Ok(SetIdentifier { element_type, size })
    }

    fn read_set_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapIdentifier> {
        let key_type = self.read_ttype()?;
        let value_type = self.read_ttype()?;
        let size = self.read_container_size("map")?;
        Ok(MapIdentifier {
            key_type: Some(key_type),
            value_type: Some(value_type),
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? == 1)
    }

    fn read_byte(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.transport.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.transport.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.transport.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    fn read_string(&mut self) -> Result<String> {
        utf8(self.read_binary()?)
    }

    fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.read_i32()?;
        self.read_binary_body(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::BufferTransport;

    fn write_once(cb: fn(&mut BinaryProtocol<BufferTransport>)) -> Vec<u8> {
        let mut protocol = BinaryProtocol::new(BufferTransport::new());
        cb(&mut protocol);
        protocol.into_inner().into_inner()
    }

    fn reader(bytes: &[u8]) -> BinaryProtocol<BufferTransport> {
        BinaryProtocol::new(BufferTransport::from_bytes(bytes.to_vec()))
    }

    #[test]
    fn write_integers() {
        assert_eq!(write_once(|p| p.write_byte(-1).unwrap()), [0xFF]);
        assert_eq!(write_once(|p| p.write_i16(0x0102).unwrap()), [1, 2]);
        assert_eq!(write_once(|p| p.write_i16(-1).unwrap()), [0xFF, 0xFF]);
        assert_eq!(write_once(|p| p.write_i32(1).unwrap()), [0, 0, 0, 1]);
        assert_eq!(write_once(|p| p.write_i32(-1).unwrap()), [0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            write_once(|p| p.write_i32(i32::MIN).unwrap()),
            [0x80, 0, 0, 0]
        );
        assert_eq!(
            write_once(|p| p.write_i64(0x0102_0304_0506_0708).unwrap()),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn read_integers_wrap() {
        assert_eq!(reader(&[0xFF]).read_byte().unwrap(), -1);
        assert_eq!(reader(&[0x80, 0x00]).read_i16().unwrap(), i16::MIN);
        assert_eq!(reader(&[0xFF, 0xFF, 0xFF, 0xFF]).read_i32().unwrap(), -1);
        assert_eq!(
            reader(&[0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).read_i64().unwrap(),
            i64::MAX
        );
        assert!(matches!(reader(&[0, 0, 0]).read_i32(), Err(ProtocolError::Eof)));
    }

    #[test]
    fn doubles_are_big_endian_bit_patterns() {
        assert_eq!(
            write_once(|p| p.write_double(1.0).unwrap()),
            [0x3F, 0xF0, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(reader(&[0x3F, 0xF0, 0, 0, 0, 0, 0, 0]).read_double().unwrap(), 1.0);
        assert_eq!(
            reader(&[0xC0, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18]).read_double().unwrap(),
            -std::f64::consts::PI
        );
    }

    #[test]
    fn strings_are_length_prefixed() {
        assert_eq!(write_once(|p| p.write_string("").unwrap()), [0, 0, 0, 0]);
        assert_eq!(
            write_once(|p| p.write_string("🍕").unwrap()),
            [0, 0, 0, 4, 240, 159, 141, 149]
        );
        assert_eq!(
            reader(&[0, 0, 0, 4, 240, 159, 141, 149]).read_string().unwrap(),
            "🍕"
        );
        assert!(matches!(
            reader(&[0, 0, 0, 2, 0xC3, 0x28]).read_string(),
            Err(ProtocolError::InvalidData(_))
        ));
    }

    #[test]
    fn oversized_string_fails_before_allocating() {
        let config = BinaryProtocolConfig {
            string_length_limit: Some(8),
            ..BinaryProtocolConfig::default()
        };
        // Declares 2 GiB but carries nothing; only the limit check can fail here.
        let mut protocol = BinaryProtocol::with_config(
            BufferTransport::from_bytes(vec![0x7F, 0xFF, 0xFF, 0xFF]),
            config,
        );
        assert!(matches!(
            protocol.read_binary(),
            Err(ProtocolError::SizeLimit { len: 2147483647, limit: 8, .. })
        ));

        let mut protocol = BinaryProtocol::with_config(
            BufferTransport::from_bytes(vec![0, 0, 0, 8, 1, 2, 3, 4, 5, 6, 7, 8]),
            config,
        );
        assert_eq!(protocol.read_binary().unwrap(), [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn negative_string_length_is_rejected() {
        assert!(matches!(
            reader(&[0xFF, 0xFF, 0xFF, 0xFE]).read_binary(),
            Err(ProtocolError::NegativeSize { len: -2, .. })
        ));
    }

    #[test]
    fn container_headers() {
        assert_eq!(
            write_once(|p| p.write_list_begin(TType::I32, 3).unwrap()),
            [8, 0, 0, 0, 3]
        );
        assert_eq!(
            write_once(|p| p.write_map_begin(TType::String, TType::I64, 2).unwrap()),
            [11, 10, 0, 0, 0, 2]
        );

        let list = reader(&[8, 0, 0, 0, 3]).read_list_begin().unwrap();
        assert_eq!(list, ListIdentifier { element_type: TType::I32, size: 3 });

        let map = reader(&[11, 10, 0, 0, 0, 2]).read_map_begin().unwrap();
        assert_eq!(map.key_type, Some(TType::String));
        assert_eq!(map.value_type, Some(TType::I64));
        assert_eq!(map.size, 2);

        assert!(matches!(reader(&[8, 0xFF, 0xFF, 0xFF, 0xFF]).read_list_begin(), Err(ProtocolError::NegativeSize { .. })));
        assert!(matches!(reader(&[5, 0, 0, 0, 1]).read_set_begin(), Err(ProtocolError::UnknownType(5))));
    }

    #[test]
    fn container_limit() {
        let config = BinaryProtocolConfig {
            container_length_limit: Some(2),
            ..BinaryProtocolConfig::default()
        };
        let mut protocol =
            BinaryProtocol::with_config(BufferTransport::from_bytes(vec![8, 0, 0, 0, 3]), config);
        assert!(matches!(protocol.read_list_begin(), Err(ProtocolError::SizeLimit { .. })));
    }

    #[test]
    fn field_headers() {
        assert_eq!(
            write_once(|p| p.write_field_begin("x", TType::I32, 7).unwrap()),
            [8, 0, 7]
        );
        assert_eq!(write_once(|p| p.write_field_stop().unwrap()), [0]);
        assert_eq!(
            reader(&[8, 0, 7]).read_field_begin().unwrap(),
            FieldIdentifier::new(TType::I32, 7)
        );
        assert!(reader(&[0]).read_field_begin().unwrap().is_stop());
    }

    #[test]
    fn unframed_message_header() {
        let bytes = write_once(|p| {
            p.write_message_begin(&MessageIdentifier::new("ping", MessageType::Call, 7))
                .unwrap()
        });
        assert_eq!(bytes, [0, 0, 0, 4, b'p', b'i', b'n', b'g', 1, 0, 0, 0, 7]);

        let message = reader(&bytes).read_message_begin().unwrap();
        assert_eq!(message, MessageIdentifier::new("ping", MessageType::Call, 7));
    }

    #[test]
    fn strict_message_header() {
        let config = BinaryProtocolConfig {
            strict_write: true,
            strict_read:  true,
            ..BinaryProtocolConfig::default()
        };
        let mut protocol = BinaryProtocol::with_config(BufferTransport::new(), config);
        protocol
            .write_message_begin(&MessageIdentifier::new("ok", MessageType::Reply, -1))
            .unwrap();
        assert_eq!(
            protocol.transport().data(),
            [0x80, 0x01, 0x00, 0x02, 0, 0, 0, 2, b'o', b'k', 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            protocol.read_message_begin().unwrap(),
            MessageIdentifier::new("ok", MessageType::Reply, -1)
        );

        let mut strict = BinaryProtocol::with_config(
            BufferTransport::from_bytes(vec![0, 0, 0, 1, b'a', 1, 0, 0, 0, 0]),
            config,
        );
        assert!(matches!(strict.read_message_begin(), Err(ProtocolError::BadVersion(_))));

        let mut wrong = reader(&[0x80, 0x02, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(wrong.read_message_begin(), Err(ProtocolError::BadVersion(_))));
    }
}
