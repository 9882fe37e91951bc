use crate::error::{ProtocolError, Result};
use crate::protocol::Protocol;
use crate::ttype::TType;

/// How deep [skip] will recurse into nested structs and containers.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Consumes exactly one value of type `ttype` from `protocol` and discards it.
///
/// This is what a reader calls when it meets a field id it doesn't know, so
/// that data written by a newer schema can still be read. `Stop`, `Void` and
/// tags the protocol doesn't recognize are errors.
///
/// Example usage:
///
/// ```
/// use brine_thrift_protocol::{skip, BinaryProtocol, BufferTransport, Protocol, TType};
///
/// let mut protocol = BinaryProtocol::new(BufferTransport::new());
/// protocol.write_list_begin(TType::String, 2).unwrap();
/// protocol.write_string("a").unwrap();
/// protocol.write_string("b").unwrap();
/// protocol.write_list_end().unwrap();
///
/// skip(&mut protocol, TType::List).unwrap();
/// assert_eq!(protocol.transport().remaining(), 0);
/// ```
///
pub fn skip<P: Protocol + ?Sized>(protocol: &mut P, ttype: TType) -> Result<()> {
    skip_with_depth(protocol, ttype, DEFAULT_MAX_DEPTH)
}

/// Like [skip], with an explicit nesting limit. Exceeding it fails with
/// [ProtocolError::DepthLimit].
pub fn skip_with_depth<P: Protocol + ?Sized>(
    protocol: &mut P,
    ttype: TType,
    max_depth: usize,
) -> Result<()> {
    if max_depth == 0 {
        return Err(ProtocolError::DepthLimit);
    }

    match ttype {
        TType::Bool => protocol.read_bool().map(drop),
        TType::Byte => protocol.read_byte().map(drop),
        TType::I16 => protocol.read_i16().map(drop),
        TType::I32 => protocol.read_i32().map(drop),
        TType::I64 => protocol.read_i64().map(drop),
        TType::Double => protocol.read_double().map(drop),
        TType::String => protocol.read_binary().map(drop),

        TType::Struct => {
            protocol.read_struct_begin()?;
            loop {
                let field = protocol.read_field_begin()?;
                if field.is_stop() {
                    break;
                }
                skip_with_depth(protocol, field.field_type, max_depth - 1)?;
                protocol.read_field_end()?;
            }
            protocol.read_struct_end()
        }

        TType::List => {
            let list = protocol.read_list_begin()?;
            for _ in 0..list.size {
                skip_with_depth(protocol, list.element_type, max_depth - 1)?;
            }
            protocol.read_list_end()
        }

        TType::Set => {
            let set = protocol.read_set_begin()?;
            for _ in 0..set.size {
                skip_with_depth(protocol, set.element_type, max_depth - 1)?;
            }
            protocol.read_set_end()
        }

        TType::Map => {
            let map = protocol.read_map_begin()?;
            if map.size > 0 {
                let (key_type, value_type) = match (map.key_type, map.value_type) {
                    (Some(key_type), Some(value_type)) => (key_type, value_type),
                    _ => {
                        return Err(ProtocolError::InvalidData(
                            "non-empty map without key and value types".to_owned(),
                        ))
                    }
                };
                for _ in 0..map.size {
                    skip_with_depth(protocol, key_type, max_depth - 1)?;
                    skip_with_depth(protocol, value_type, max_depth - 1)?;
                }
            }
            protocol.read_map_end()
        }

        TType::Stop | TType::Void => Err(ProtocolError::UnknownType(ttype.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryProtocol;
    use crate::compact::CompactProtocol;
    use crate::transport::BufferTransport;

    fn nested_lists(protocol: &mut dyn Protocol, depth: usize) {
        for _ in 0..depth {
            protocol.write_list_begin(TType::List, 1).unwrap();
        }
        protocol.write_list_begin(TType::I32, 0).unwrap();
    }

    #[test]
    fn skips_scalars() {
        let mut p = BinaryProtocol::new(BufferTransport::new());
        p.write_bool(true).unwrap();
        p.write_i64(-1).unwrap();
        p.write_double(2.5).unwrap();
        p.write_string("skip me").unwrap();
        p.write_i16(7).unwrap();

        skip(&mut p, TType::Bool).unwrap();
        skip(&mut p, TType::I64).unwrap();
        skip(&mut p, TType::Double).unwrap();
        skip(&mut p, TType::String).unwrap();
        assert_eq!(p.read_i16().unwrap(), 7);
    }

    #[test]
    fn skips_struct_with_nested_containers() {
        let mut p = CompactProtocol::new(BufferTransport::new());
        p.write_struct_begin("S").unwrap();
        p.write_field_begin("flag", TType::Bool, 1).unwrap();
        p.write_bool(false).unwrap();
        p.write_field_end().unwrap();
        p.write_field_begin("m", TType::Map, 2).unwrap();
        p.write_map_begin(TType::String, TType::List, 1).unwrap();
        p.write_string("k").unwrap();
        p.write_list_begin(TType::I64, 2).unwrap();
        p.write_i64(1).unwrap();
        p.write_i64(2).unwrap();
        p.write_list_end().unwrap();
        p.write_map_end().unwrap();
        p.write_field_end().unwrap();
        p.write_field_begin("empty", TType::Map, 3).unwrap();
        p.write_map_begin(TType::I32, TType::I32, 0).unwrap();
        p.write_map_end().unwrap();
        p.write_field_end().unwrap();
        p.write_field_stop().unwrap();
        p.write_struct_end().unwrap();
        p.write_byte(42).unwrap();

        skip(&mut p, TType::Struct).unwrap();
        assert_eq!(p.read_byte().unwrap(), 42);
        assert_eq!(p.transport().remaining(), 0);
    }

    #[test]
    fn stop_and_void_are_rejected() {
        let mut p = BinaryProtocol::new(BufferTransport::from_bytes(vec![0; 8]));
        assert!(matches!(skip(&mut p, TType::Stop), Err(ProtocolError::UnknownType(0))));
        assert!(matches!(skip(&mut p, TType::Void), Err(ProtocolError::UnknownType(1))));
    }

    #[test]
    fn unknown_element_tag_is_rejected() {
        // A binary list header claiming element type 5, which doesn't exist.
        let mut p = BinaryProtocol::new(BufferTransport::from_bytes(vec![5, 0, 0, 0, 1, 0]));
        assert!(matches!(skip(&mut p, TType::List), Err(ProtocolError::UnknownType(5))));
    }

    #[test]
    fn depth_is_bounded() {
        let mut p = BinaryProtocol::new(BufferTransport::new());
        nested_lists(&mut p, 10);
        assert!(matches!(
            skip_with_depth(&mut p, TType::List, 5),
            Err(ProtocolError::DepthLimit)
        ));

        let mut p = BinaryProtocol::new(BufferTransport::new());
        nested_lists(&mut p, 3);
        skip_with_depth(&mut p, TType::List, 5).unwrap();
        assert_eq!(p.transport().remaining(), 0);
    }
}
