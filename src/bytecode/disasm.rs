use std::fmt::Write as _;

use crate::bytecode::{Function, Op, ProgramBc, text::format_op};
use crate::lang::Native;

/// Print disassembly of a bytecode program
pub fn print_bc(bc: &ProgramBc) {
    print!("{}", render(bc));
}

/// Disassembly of a whole program
pub fn render(bc: &ProgramBc) -> String {
    let mut out = String::new();

    // writing into a String cannot fail
    let _ = writeln!(out, "=== BYTECODE PROGRAM ===");
    let _ = writeln!(out, "{} global(s)\n", bc.global_count);

    for function in &bc.functions {
        render_function(&mut out, function);
    }

    out
}

fn render_function(out: &mut String, function: &Function) {
    let _ = writeln!(out, "════════════════════════════════════════");
    let _ = writeln!(
        out,
        " {} (params: {}, locals: {})",
        function.name, function.param_count, function.local_count
    );
    let _ = writeln!(out, " {} instructions", function.ops.len());
    let _ = writeln!(out, "════════════════════════════════════════");
    disassemble_ops(out, &function.ops);
    let _ = writeln!(out);
}

/// Disassemble a slice of ops, marking every jump target
pub fn disassemble_ops(out: &mut String, ops: &[Op]) {
    let jump_targets = collect_jump_targets(ops);

    for (ip, op) in ops.iter().enumerate() {
        let is_target = jump_targets.contains(&ip);
        if is_target {
            let _ = writeln!(out, "      ┌──────────────────────────────────");
        }

        let marker = if is_target { "► " } else { "  " };
        let _ = writeln!(out, "{:04} {}{}", ip, marker, describe(op, ip));
    }
}

fn collect_jump_targets(ops: &[Op]) -> Vec<usize> {
    let mut targets = Vec::new();

    for op in ops {
        if let Some(target) = op.jump_target() {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

fn describe(op: &Op, ip: usize) -> String {
    match op {
        Op::Jmp(target) | Op::Cjmp(target) => {
            let direction = if *target <= ip { "↑" } else { "↓" };
            format!("{:<12}{} (→ {:04})", op.mnemonic(), direction, target)
        }
        Op::Ncall(index) => match Native::from_index(*index) {
            Some(native) => format!("{:<12}{}  ; {}", op.mnemonic(), index, native.name()),
            None => format_op(op),
        },
        _ => format_op(op),
    }
}
