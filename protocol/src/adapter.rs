use crate::error::Result;
use crate::protocol::Protocol;

/// Implemented by every type that knows how to move itself through a
/// [Protocol]; generated bindings implement this for each struct, union and
/// exception. We require `Sized` so that `Self` can be constructed.
///
/// A `read` implementation is expected to [skip](crate::skip) field ids it
/// doesn't recognize, which is what keeps old readers working against newer
/// writers.
pub trait Adapter: Sized {
    fn read(protocol: &mut dyn Protocol) -> Result<Self>;
    fn write(&self, protocol: &mut dyn Protocol) -> Result<()>;
}
