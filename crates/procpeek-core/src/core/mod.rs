mod access;
mod hex;
mod ids;
pub(crate) mod macros;
mod region;
mod width;

pub use self::{
    access::ProcessAccess,
    hex::Hex,
    ids::{Pid, RawHandle, Va},
    region::MemoryRegion,
    width::PointerWidth,
};
