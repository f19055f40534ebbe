use thiserror::Error;

use crate::bytecode::{Function, Op, ProgramBc};
use crate::lang::Native;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed bytecode in '{function}' at {ip:04}: {message}")]
pub struct VerifyError {
    pub function: String,
    pub ip: usize,
    pub message: String,
}

/// Returns (pops, pushes) for an op. A user call pops its parameters and
/// leaves the callee's return value.
fn effect(op: &Op, program: &ProgramBc) -> Option<(usize, usize)> {
    use Op::*;
    Some(match op {
        Lint(_) | Lboo(_) | Lstr(_) | Lnon => (0, 1),
        Lload(_) | Gload(_) => (0, 1),
        Lstore(_) | Gstore(_) => (1, 0),

        Add | Subtract | Mul | Div => (2, 1),
        And | Or => (2, 1),
        Equal | Nequal | Less | Great | Leq | Geq => (2, 1),
        Neg | Not => (1, 1),

        Pop => (1, 0),
        Jmp(_) => (0, 0),
        Cjmp(_) => (1, 0),
        Ncall(_) => (1, 1),
        Call(name) => (program.function(name)?.param_count, 1),
        Ret => (1, 0),
    })
}

/// Structural checks on one function: every operand refers to something
/// that exists, and the code cannot run off its end.
///
/// The stack check is a linear scan that does not follow jumps. Generated
/// code keeps the operand stack empty between statements, so both arms of
/// an `if` and a loop body each balance on their own.
pub fn verify_function(function: &Function, program: &ProgramBc) -> Result<(), VerifyError> {
    let fail = |ip: usize, message: String| VerifyError {
        function: function.name.clone(),
        ip,
        message,
    };

    if function.local_count < function.param_count {
        return Err(fail(0, "frame smaller than parameter count".into()));
    }

    let len = function.ops.len();
    match function.ops.last() {
        Some(Op::Ret | Op::Jmp(_)) => {}
        _ => return Err(fail(len, "code can run past the last instruction".into())),
    }

    let mut height = 0usize;
    for (ip, op) in function.ops.iter().enumerate() {
        match op {
            Op::Lload(i) | Op::Lstore(i) if *i >= function.local_count => {
                return Err(fail(ip, format!("local slot {} out of range", i)));
            }
            Op::Gload(i) | Op::Gstore(i) if *i >= program.global_count => {
                return Err(fail(ip, format!("global slot {} out of range", i)));
            }
            Op::Jmp(target) | Op::Cjmp(target) if *target >= len => {
                return Err(fail(ip, format!("jump target {} out of range", target)));
            }
            Op::Ncall(i) if Native::from_index(*i).is_none() => {
                return Err(fail(ip, format!("unknown native function {}", i)));
            }
            _ => {}
        }

        let (pops, pushes) = effect(op, program).ok_or_else(|| match op {
            Op::Call(name) => fail(ip, format!("call to undefined function '{}'", name)),
            _ => fail(ip, format!("unknown effect of {:?}", op)),
        })?;

        height = height.checked_sub(pops).ok_or_else(|| {
            fail(
                ip,
                format!("stack underflow: {} needs {} value(s)", op.mnemonic(), pops),
            )
        })?;
        height += pushes;
    }

    Ok(())
}

pub fn verify(program: &ProgramBc) -> Result<(), VerifyError> {
    for function in &program.functions {
        verify_function(function, program)?;
    }
    Ok(())
}
