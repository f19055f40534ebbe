//! The compile and run pipelines, shared by the CLI and the integration
//! tests.

use thiserror::Error;
use tracing::info;

use crate::bytecode::{CodegenError, ProgramBc, generate};
use crate::frontend::{
    lexer::{LexError, tokenize},
    parser::parse_tokens,
    parser_error::ParserError,
};
use crate::lang::{Program, Value};
use crate::runtime::{Interaction, RuntimeError, Vm, VmConfig};
use crate::semantic::{SemanticError, analyze};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("lexer error at {0}")]
    Lex(#[from] LexError),

    #[error("parse error at {0}")]
    Parse(#[from] ParserError),

    #[error("semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

#[derive(Debug, Error)]
pub enum KindleError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub fn parse_source(source: &str) -> Result<Program, CompileError> {
    let tokens = tokenize(source)?;
    Ok(parse_tokens(tokens)?)
}

/// Source text to function table. Nothing is produced unless every stage
/// succeeds.
pub fn compile_source(source: &str) -> Result<ProgramBc, CompileError> {
    let program = parse_source(source)?;
    let resolutions = analyze(&program)?;
    let bytecode = generate(&program, &resolutions)?;

    info!(
        functions = bytecode.functions.len(),
        globals = bytecode.global_count,
        "compiled program"
    );
    Ok(bytecode)
}

/// Compiles and runs `source`, returning `main`'s result together with the
/// interaction handler.
pub fn run_source<I: Interaction>(
    source: &str,
    io: I,
    config: VmConfig,
) -> Result<(Value, I), KindleError> {
    let bytecode = compile_source(source)?;
    let mut vm = Vm::with_config(io, config);
    let value = vm.run(&bytecode)?;
    Ok((value, vm.into_interaction()))
}
