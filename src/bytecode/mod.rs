pub mod binary;
pub mod bytecode_error;
pub mod codegen;
pub mod codegen_error;
pub mod disasm;
pub mod ir;
pub mod length;
pub mod op;
pub mod text;
pub mod verify;

pub use bytecode_error::BytecodeError;
pub use codegen::generate;
pub use codegen_error::CodegenError;
pub use ir::{Function, ProgramBc};
pub use op::Op;

/// Loads bytecode in either form: binary if it carries the magic header,
/// text otherwise.
pub fn load(bytes: &[u8]) -> Result<ProgramBc, BytecodeError> {
    if binary::is_binary(bytes) {
        return binary::from_bytes(bytes);
    }

    let source = std::str::from_utf8(bytes).map_err(|e| {
        BytecodeError::syntax(
            // line of the first invalid byte
            bytes[..e.valid_up_to()].iter().filter(|&&b| b == b'\n').count() + 1,
            "bytecode is neither binary nor UTF-8 text",
        )
    })?;
    text::load_text(source)
}
