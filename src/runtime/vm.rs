use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::bytecode::{Op, ProgramBc, verify::verify};
use crate::lang::{Native, Value};
use crate::runtime::interaction::Interaction;
use crate::runtime::runtime_error::{ErrorKind, RuntimeError};

#[derive(Debug, Clone)]
pub struct VmConfig {
    pub max_call_depth: usize,
    pub max_steps: Option<usize>,
    pub max_stack_size: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            max_call_depth: 1000,
            max_steps: None,
            max_stack_size: 10_000,
        }
    }
}

/// Activation record of one call.
#[derive(Debug)]
struct Frame {
    function: usize,
    locals: Vec<Value>,
    /// Next instruction to execute.
    pc: usize,
}

pub struct Vm<I: Interaction> {
    stack: Vec<Value>,
    globals: Vec<Value>,
    frames: Vec<Frame>,
    io: I,
    // Safety limits
    config: VmConfig,
    steps: usize,
}

impl<I: Interaction> Vm<I> {
    pub fn new(io: I) -> Self {
        Self::with_config(io, VmConfig::default())
    }

    pub fn with_config(io: I, config: VmConfig) -> Self {
        Self {
            stack: Vec::new(),
            globals: Vec::new(),
            frames: Vec::new(),
            io,
            config,
            steps: 0,
        }
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn globals(&self) -> &[Value] {
        &self.globals
    }

    /// Number of live frames; zero once a run has finished.
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn interaction(&self) -> &I {
        &self.io
    }

    pub fn into_interaction(self) -> I {
        self.io
    }

    pub fn reset_execution_state(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.steps = 0;
    }

    /// Runs `main` to completion and returns its result. A program without
    /// `main` does nothing and returns none.
    pub fn run(&mut self, prog: &ProgramBc) -> Result<Value, RuntimeError> {
        self.reset_execution_state();
        self.globals = vec![Value::None; prog.global_count];

        let Some(main) = prog.function_index("main") else {
            debug!("no main function, nothing to run");
            return Ok(Value::None);
        };

        verify(prog).map_err(|e| RuntimeError::internal(e.to_string()))?;

        let index: HashMap<&str, usize> = prog
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i))
            .collect();

        self.frames.push(Frame {
            function: main,
            locals: vec![Value::None; prog.functions[main].local_count],
            pc: 0,
        });

        debug!(functions = prog.functions.len(), globals = prog.global_count, "starting execution");

        let result = self.exec(prog, &index);

        match result {
            Ok(value) => {
                debug!(steps = self.steps, "execution finished");
                Ok(value)
            }
            Err(err) => Err(self.attach_call_stack(prog, err)),
        }
    }

    fn attach_call_stack(&self, prog: &ProgramBc, err: RuntimeError) -> RuntimeError {
        self.frames.iter().fold(err, |err, frame| {
            let name = prog
                .functions
                .get(frame.function)
                .map(|f| f.name.as_str())
                .unwrap_or("?");
            err.with_context(name)
        })
    }

    // Execution

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(RuntimeError::limit(format!(
                    "execution step limit exceeded ({})",
                    max
                )));
            }
        }

        if self.stack.len() > self.config.max_stack_size {
            return Err(RuntimeError::limit(format!(
                "stack size limit exceeded ({})",
                self.config.max_stack_size
            )));
        }

        Ok(())
    }

    fn exec(
        &mut self,
        prog: &ProgramBc,
        index: &HashMap<&str, usize>,
    ) -> Result<Value, RuntimeError> {
        loop {
            self.check_limits()?;

            let frame = self.frame_mut()?;
            let (function, pc) = (frame.function, frame.pc);
            frame.pc += 1;

            let code = prog
                .functions
                .get(function)
                .ok_or_else(|| RuntimeError::internal("frame refers to a missing function"))?;
            let op = code.ops.get(pc).ok_or_else(|| {
                RuntimeError::internal(format!("fell off the end of '{}'", code.name))
            })?;

            trace!(function = %code.name, pc, ?op, "exec");

            match op {
                // Literals
                Op::Lint(n) => self.push(Value::Integer(*n)),
                Op::Lboo(b) => self.push(Value::Bool(*b)),
                Op::Lstr(s) => self.push(Value::String(s.clone())),
                Op::Lnon => self.push(Value::None),

                // Variables
                Op::Lload(slot) => {
                    let value = self
                        .frame_mut()?
                        .locals
                        .get(*slot)
                        .cloned()
                        .ok_or_else(|| bad_slot("local", *slot))?;
                    self.push(value);
                }
                Op::Lstore(slot) => {
                    let value = self.pop()?;
                    let target = self
                        .frame_mut()?
                        .locals
                        .get_mut(*slot)
                        .ok_or_else(|| bad_slot("local", *slot))?;
                    *target = value;
                }
                Op::Gload(slot) => {
                    let value = self
                        .globals
                        .get(*slot)
                        .cloned()
                        .ok_or_else(|| bad_slot("global", *slot))?;
                    self.push(value);
                }
                Op::Gstore(slot) => {
                    let value = self.pop()?;
                    let target = self
                        .globals
                        .get_mut(*slot)
                        .ok_or_else(|| bad_slot("global", *slot))?;
                    *target = value;
                }

                // Arithmetic
                Op::Add => {
                    let (left, right) = self.pop_two()?;
                    let result = match (left, right) {
                        (Value::Integer(a), Value::Integer(b)) => Value::Integer(
                            a.checked_add(b).ok_or(ErrorKind::Overflow("add"))?,
                        ),
                        (Value::String(a), Value::String(b)) => Value::String(a + &b),
                        (a, b) => {
                            return Err(operand_error("add", "two integers or two strings", &a, &b));
                        }
                    };
                    self.push(result);
                }
                Op::Subtract => self.int_op("subtract", i64::checked_sub)?,
                Op::Mul => self.int_op("mul", i64::checked_mul)?,
                Op::Div => {
                    let (left, right) = self.pop_ints("div")?;
                    if right == 0 {
                        return Err(ErrorKind::DivisionByZero.into());
                    }
                    let quotient = left.checked_div(right).ok_or(ErrorKind::Overflow("div"))?;
                    self.push(Value::Integer(quotient));
                }
                Op::Neg => match self.pop()? {
                    Value::Integer(n) => {
                        let negated = n.checked_neg().ok_or(ErrorKind::Overflow("neg"))?;
                        self.push(Value::Integer(negated));
                    }
                    other => {
                        return Err(RuntimeError::type_error(
                            "neg",
                            "an integer",
                            other.type_name().to_string(),
                        ));
                    }
                },

                // Logic
                Op::And => {
                    let (left, right) = self.pop_two()?;
                    self.push(Value::Bool(left.is_truthy() && right.is_truthy()));
                }
                Op::Or => {
                    let (left, right) = self.pop_two()?;
                    self.push(Value::Bool(left.is_truthy() || right.is_truthy()));
                }
                Op::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(!value.is_truthy()));
                }

                // Comparison
                Op::Equal => {
                    let (left, right) = self.pop_two()?;
                    self.push(Value::Bool(left == right));
                }
                Op::Nequal => {
                    let (left, right) = self.pop_two()?;
                    self.push(Value::Bool(left != right));
                }
                Op::Less => self.compare("less", Ordering::is_lt)?,
                Op::Great => self.compare("great", Ordering::is_gt)?,
                Op::Leq => self.compare("leq", Ordering::is_le)?,
                Op::Geq => self.compare("geq", Ordering::is_ge)?,

                Op::Pop => {
                    self.pop()?;
                }

                // Control flow
                Op::Jmp(target) => self.frame_mut()?.pc = *target,
                Op::Cjmp(target) => {
                    if self.pop()?.is_truthy() {
                        self.frame_mut()?.pc = *target;
                    }
                }
                Op::Call(name) => {
                    let callee = index.get(name.as_str()).copied().ok_or_else(|| {
                        RuntimeError::internal(format!("call to undefined function '{}'", name))
                    })?;
                    self.call(prog, callee)?;
                }
                Op::Ncall(i) => {
                    let native = Native::from_index(*i).ok_or_else(|| {
                        RuntimeError::internal(format!("unknown native function {}", i))
                    })?;
                    let arg = self.pop()?;
                    let result = self.call_native(native, arg)?;
                    self.push(result);
                }
                Op::Ret => {
                    let value = self.pop()?;
                    self.frames.pop();
                    if self.frames.is_empty() {
                        return Ok(value);
                    }
                    self.push(value);
                }
            }
        }
    }

    fn call(&mut self, prog: &ProgramBc, callee: usize) -> Result<(), RuntimeError> {
        let function = &prog.functions[callee];

        if self.frames.len() >= self.config.max_call_depth {
            return Err(RuntimeError::limit(format!(
                "call depth limit exceeded ({}) - possible infinite recursion in '{}'",
                self.config.max_call_depth, function.name
            )));
        }

        let mut locals = vec![Value::None; function.local_count.max(function.param_count)];
        // the first argument was pushed last
        for slot in locals.iter_mut().take(function.param_count) {
            *slot = self.pop()?;
        }

        self.frames.push(Frame {
            function: callee,
            locals,
            pc: 0,
        });
        Ok(())
    }

    fn call_native(&mut self, native: Native, arg: Value) -> Result<Value, RuntimeError> {
        match native {
            Native::Print => {
                self.io.output(&arg.to_string())?;
                Ok(Value::None)
            }
            Native::Input => {
                let line = self.io.get_input(&arg.to_string())?;
                Ok(Value::String(line))
            }
            Native::StrToInt => match arg {
                Value::String(s) => s
                    .trim()
                    .parse()
                    .map(Value::Integer)
                    .map_err(|_| ErrorKind::InvalidConversion(s).into()),
                other => Err(RuntimeError::type_error(
                    "str_to_int",
                    "a string",
                    other.type_name().to_string(),
                )),
            },
            Native::IntToStr => match arg {
                Value::Integer(n) => Ok(Value::String(n.to_string())),
                other => Err(RuntimeError::type_error(
                    "int_to_str",
                    "an integer",
                    other.type_name().to_string(),
                )),
            },
        }
    }

    // Stack helpers

    fn frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::internal("no active frame"))
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::internal("operand stack underflow"))
    }

    /// Pops the right operand, then the left one.
    fn pop_two(&mut self) -> Result<(Value, Value), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        Ok((left, right))
    }

    fn pop_ints(&mut self, operation: &'static str) -> Result<(i64, i64), RuntimeError> {
        match self.pop_two()? {
            (Value::Integer(a), Value::Integer(b)) => Ok((a, b)),
            (a, b) => Err(operand_error(operation, "two integers", &a, &b)),
        }
    }

    fn int_op(
        &mut self,
        operation: &'static str,
        apply: fn(i64, i64) -> Option<i64>,
    ) -> Result<(), RuntimeError> {
        let (left, right) = self.pop_ints(operation)?;
        let result = apply(left, right).ok_or(ErrorKind::Overflow(operation))?;
        self.push(Value::Integer(result));
        Ok(())
    }

    fn compare(
        &mut self,
        operation: &'static str,
        test: fn(Ordering) -> bool,
    ) -> Result<(), RuntimeError> {
        let ordering = match self.pop_two()? {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(&b),
            (Value::String(a), Value::String(b)) => a.cmp(&b),
            (a, b) => {
                return Err(operand_error(
                    operation,
                    "two integers or two strings",
                    &a,
                    &b,
                ));
            }
        };
        self.push(Value::Bool(test(ordering)));
        Ok(())
    }
}

fn operand_error(
    operation: &'static str,
    expected: &'static str,
    left: &Value,
    right: &Value,
) -> RuntimeError {
    RuntimeError::type_error(
        operation,
        expected,
        format!("{} and {}", left.type_name(), right.type_name()),
    )
}

fn bad_slot(kind: &str, slot: usize) -> RuntimeError {
    RuntimeError::internal(format!("{} slot {} out of range", kind, slot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::Function;
    use crate::runtime::interaction::{InteractionError, RecordingInteraction};

    // =========================================================================
    // Helpers
    // =========================================================================

    fn program_from_ops(ops: Vec<Op>) -> ProgramBc {
        let mut main = Function::new("main", 0, 2);
        main.ops = ops;
        ProgramBc {
            global_count: 2,
            functions: vec![main],
        }
    }

    fn run_program(
        prog: &ProgramBc,
        inputs: &[&str],
    ) -> (Result<Value, RuntimeError>, Vm<RecordingInteraction>) {
        let mut vm = Vm::new(RecordingInteraction::new(inputs.iter().copied()));
        let result = vm.run(prog);
        (result, vm)
    }

    fn run_ops(ops: Vec<Op>) -> Result<Value, RuntimeError> {
        run_program(&program_from_ops(ops), &[]).0
    }

    /// Assert `ops` followed by `ret` returns `expected`
    fn assert_value(mut ops: Vec<Op>, expected: Value) {
        ops.push(Op::Ret);
        let value = run_ops(ops).expect("execution should succeed");
        assert_eq!(value, expected);
    }

    /// Assert execution fails with a message containing the given substring
    fn assert_error(mut ops: Vec<Op>, error_contains: &str) {
        ops.push(Op::Ret);
        match run_ops(ops) {
            Ok(value) => panic!(
                "expected error containing '{}', got value: {:?}",
                error_contains, value
            ),
            Err(e) => assert!(
                e.message().contains(error_contains),
                "expected error containing '{}', got: {}",
                error_contains,
                e.message()
            ),
        }
    }

    fn int(n: i64) -> Value {
        Value::Integer(n)
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    // =========================================================================
    // Literals and variables
    // =========================================================================

    #[test]
    fn test_literals() {
        assert_value(vec![Op::Lint(42)], int(42));
        assert_value(vec![Op::Lboo(true)], Value::Bool(true));
        assert_value(vec![Op::Lstr("hi".into())], string("hi"));
        assert_value(vec![Op::Lnon], Value::None);
    }

    #[test]
    fn test_fresh_slots_are_none() {
        assert_value(vec![Op::Lload(1)], Value::None);
        assert_value(vec![Op::Gload(0)], Value::None);
    }

    #[test]
    fn test_locals_and_globals() {
        assert_value(vec![Op::Lint(5), Op::Lstore(1), Op::Lload(1)], int(5));

        let prog = program_from_ops(vec![Op::Lint(9), Op::Gstore(1), Op::Lnon, Op::Ret]);
        let (result, vm) = run_program(&prog, &[]);
        result.unwrap();
        assert_eq!(vm.globals(), [Value::None, int(9)]);
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    #[test]
    fn test_subtract_operand_order() {
        assert_value(vec![Op::Lint(10), Op::Lint(3), Op::Subtract], int(7));
    }

    #[test]
    fn test_arithmetic() {
        assert_value(vec![Op::Lint(2), Op::Lint(3), Op::Add], int(5));
        assert_value(vec![Op::Lint(4), Op::Lint(-3), Op::Mul], int(-12));
        assert_value(vec![Op::Lint(7), Op::Lint(2), Op::Div], int(3));
        assert_value(vec![Op::Lint(-7), Op::Lint(2), Op::Div], int(-3));
        assert_value(vec![Op::Lint(4), Op::Neg], int(-4));
    }

    #[test]
    fn test_string_concat() {
        assert_value(
            vec![Op::Lstr("ab".into()), Op::Lstr("cd".into()), Op::Add],
            string("abcd"),
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_error(vec![Op::Lint(1), Op::Lint(0), Op::Div], "division by zero");
    }

    #[test]
    fn test_overflow() {
        assert_error(vec![Op::Lint(i64::MAX), Op::Lint(1), Op::Add], "overflow");
        assert_error(vec![Op::Lint(i64::MIN), Op::Lint(-1), Op::Div], "overflow");
        assert_error(vec![Op::Lint(i64::MIN), Op::Neg], "overflow");
    }

    #[test]
    fn test_arithmetic_type_errors() {
        assert_error(
            vec![Op::Lint(1), Op::Lstr("a".into()), Op::Add],
            "expects two integers or two strings, got integer and string",
        );
        assert_error(
            vec![Op::Lstr("a".into()), Op::Lstr("b".into()), Op::Subtract],
            "'subtract' expects two integers",
        );
        assert_error(vec![Op::Lboo(true), Op::Neg], "'neg' expects an integer");
    }

    // =========================================================================
    // Logic and comparison
    // =========================================================================

    #[test]
    fn test_logic_uses_truthiness() {
        assert_value(vec![Op::Lint(1), Op::Lstr("x".into()), Op::And], Value::Bool(true));
        assert_value(vec![Op::Lint(0), Op::Lnon, Op::Or], Value::Bool(false));
        assert_value(vec![Op::Lstr(String::new()), Op::Not], Value::Bool(true));
    }

    #[test]
    fn test_comparisons() {
        assert_value(vec![Op::Lint(1), Op::Lint(2), Op::Less], Value::Bool(true));
        assert_value(vec![Op::Lint(1), Op::Lint(2), Op::Great], Value::Bool(false));
        assert_value(vec![Op::Lint(2), Op::Lint(2), Op::Leq], Value::Bool(true));
        assert_value(vec![Op::Lint(1), Op::Lint(2), Op::Geq], Value::Bool(false));
        assert_value(
            vec![Op::Lstr("a".into()), Op::Lstr("b".into()), Op::Less],
            Value::Bool(true),
        );
    }

    #[test]
    fn test_equality_is_structural() {
        assert_value(vec![Op::Lint(1), Op::Lint(1), Op::Equal], Value::Bool(true));
        assert_value(vec![Op::Lint(1), Op::Lstr("1".into()), Op::Equal], Value::Bool(false));
        assert_value(vec![Op::Lnon, Op::Lnon, Op::Nequal], Value::Bool(false));
    }

    #[test]
    fn test_mixed_comparison_fails() {
        assert_error(vec![Op::Lint(1), Op::Lstr("a".into()), Op::Less], "'less' expects");
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    #[test]
    fn test_cjmp_taken_and_not_taken() {
        // 0 lboo; 1 cjmp 4; 2 lint 0; 3 ret; 4 lint 1
        assert_value(
            vec![Op::Lboo(true), Op::Cjmp(4), Op::Lint(0), Op::Ret, Op::Lint(1)],
            int(1),
        );
        assert_value(
            vec![Op::Lboo(false), Op::Cjmp(4), Op::Lint(0), Op::Ret, Op::Lint(1)],
            int(0),
        );
    }

    #[test]
    fn test_countdown_loop() {
        // local0 = 3; while (local0) local0 = local0 - 1; return local0
        let ops = vec![
            Op::Lint(3),
            Op::Lstore(0),
            Op::Jmp(7),
            Op::Lload(0), // 3
            Op::Lint(1),
            Op::Subtract,
            Op::Lstore(0),
            Op::Lload(0), // 7
            Op::Cjmp(3),
            Op::Lload(0),
        ];
        assert_value(ops, int(0));
    }

    #[test]
    fn test_call_binds_arguments_in_order() {
        // f(a, b) returns a - b; arguments pushed right to left
        let mut f = Function::new("f", 2, 3);
        f.ops = vec![Op::Lload(0), Op::Lload(1), Op::Subtract, Op::Ret];
        let mut prog = program_from_ops(vec![Op::Lint(3), Op::Lint(10), Op::Call("f".into()), Op::Ret]);
        prog.functions.push(f);

        let (result, vm) = run_program(&prog, &[]);
        assert_eq!(result.unwrap(), int(7));
        assert_eq!(vm.frame_depth(), 0);
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn test_no_main_is_noop() {
        let mut prog = program_from_ops(vec![Op::Lnon, Op::Ret]);
        prog.functions[0].name = "helper".into();
        let (result, vm) = run_program(&prog, &[]);
        assert_eq!(result.unwrap(), Value::None);
        assert_eq!(vm.steps(), 0);
    }

    // =========================================================================
    // Natives
    // =========================================================================

    #[test]
    fn test_print_outputs_display_form() {
        let prog = program_from_ops(vec![
            Op::Lboo(true),
            Op::Ncall(0),
            Op::Pop,
            Op::Lnon,
            Op::Ncall(0),
            Op::Ret,
        ]);
        let (result, vm) = run_program(&prog, &[]);
        assert_eq!(result.unwrap(), Value::None);
        assert_eq!(vm.interaction().outputs(), ["TRUE", "NONE"]);
    }

    #[test]
    fn test_input_and_conversions() {
        let prog = program_from_ops(vec![
            Op::Lstr("n? ".into()),
            Op::Ncall(1),
            Op::Ncall(2),
            Op::Lint(1),
            Op::Add,
            Op::Ncall(3),
            Op::Ret,
        ]);
        let (result, vm) = run_program(&prog, &[" 41 "]);
        assert_eq!(result.unwrap(), string("42"));
        assert_eq!(vm.interaction().prompts(), ["n? "]);
    }

    #[test]
    fn test_input_exhausted() {
        let prog = program_from_ops(vec![Op::Lstr("?".into()), Op::Ncall(1), Op::Ret]);
        let (result, _) = run_program(&prog, &[]);
        let err = result.unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Interaction(InteractionError::InputExhausted)
        ));
        assert_eq!(err.call_stack, ["main"]);
    }

    #[test]
    fn test_bad_conversions() {
        assert_error(
            vec![Op::Lstr("12x".into()), Op::Ncall(2)],
            "cannot convert \"12x\"",
        );
        assert_error(vec![Op::Lint(1), Op::Ncall(2)], "'str_to_int' expects a string");
        assert_error(vec![Op::Lstr("1".into()), Op::Ncall(3)], "'int_to_str' expects an integer");
    }

    // =========================================================================
    // Limits and malformed bytecode
    // =========================================================================

    #[test]
    fn test_step_limit() {
        let prog = program_from_ops(vec![Op::Jmp(0)]);
        let mut vm = Vm::with_config(
            RecordingInteraction::default(),
            VmConfig {
                max_steps: Some(50),
                ..VmConfig::default()
            },
        );
        let err = vm.run(&prog).unwrap_err();
        assert!(err.message().contains("step limit exceeded (50)"));
    }

    #[test]
    fn test_call_depth_limit_reports_call_stack() {
        let mut forever = Function::new("forever", 0, 0);
        forever.ops = vec![Op::Call("forever".into()), Op::Ret];
        let mut prog = program_from_ops(vec![Op::Call("forever".into()), Op::Ret]);
        prog.functions.push(forever);

        let mut vm = Vm::with_config(
            RecordingInteraction::default(),
            VmConfig {
                max_call_depth: 10,
                ..VmConfig::default()
            },
        );
        let err = vm.run(&prog).unwrap_err();
        assert!(err.message().contains("call depth limit exceeded (10)"));
        assert_eq!(err.call_stack.len(), 10);
        assert_eq!(err.call_stack[0], "main");
    }

    #[test]
    fn test_malformed_bytecode_is_internal_error() {
        for ops in [
            vec![Op::Add, Op::Ret],
            vec![Op::Lload(7), Op::Ret],
            vec![Op::Jmp(99)],
            vec![Op::Call("ghost".into()), Op::Ret],
            vec![Op::Lint(1), Op::Pop],
        ] {
            let err = run_ops(ops).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::Internal(_)), "{}", err);
        }
    }
}
