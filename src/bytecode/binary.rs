use crate::bytecode::{ProgramBc, bytecode_error::BytecodeError};

/// Header of the binary container.
pub const MAGIC: &[u8; 4] = b"KBC\x01";

pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

pub fn to_bytes(program: &ProgramBc) -> Result<Vec<u8>, BytecodeError> {
    let mut out = MAGIC.to_vec();
    out.extend(postcard::to_allocvec(program)?);
    Ok(out)
}

pub fn from_bytes(bytes: &[u8]) -> Result<ProgramBc, BytecodeError> {
    let payload = bytes.strip_prefix(MAGIC.as_slice()).ok_or(BytecodeError::BadMagic)?;
    Ok(postcard::from_bytes(payload)?)
}
