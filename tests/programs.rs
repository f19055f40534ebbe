use kindle::compile_source;
use kindle::lang::Value;
use kindle::runtime::{ErrorKind, RecordingInteraction, Vm, VmConfig};

/// Compile and run `source`, returning main's result and everything printed.
fn run(source: &str, inputs: &[&str]) -> (Value, Vec<String>) {
    let program = compile_source(source).expect("program should compile");
    let mut vm = Vm::new(RecordingInteraction::new(inputs.iter().copied()));
    let value = vm.run(&program).expect("program should run");

    assert_eq!(vm.frame_depth(), 0, "frames left after run");
    assert!(vm.stack().is_empty(), "operand stack not empty: {:?}", vm.stack());

    (value, vm.into_interaction().outputs().to_vec())
}

#[test]
fn test_fibonacci_swap_loop() {
    let source = r#"
        decl a, b;

        main() {
            decl t;
            a = 0;
            b = 1;
            while (b < 1000) {
                t = a + b;
                a = b;
                b = t;
            }
            print(b);
        }
    "#;

    let (_, output) = run(source, &[]);
    assert_eq!(output.len(), 1);
    let value: i64 = output[0].parse().unwrap();
    assert!(value >= 1000);
    assert_eq!(value, 1597);
}

#[test]
fn test_fibonacci_in_place_update() {
    let source = "decl a,b; main(){a=0;b=1;while(b<1000){a=a+b;b=a-b;a=a-b;b=a+b;} print(b);}";

    let (value, output) = run(source, &[]);
    assert_eq!(value, Value::None);
    assert_eq!(output, ["1597"]);
}

#[test]
fn test_recursive_factorial() {
    let source = r#"
        fact(n) {
            if (n <= 1) {
                return 1;
            }
            return n * fact(n - 1);
        }

        main() {
            print(fact(5));
            return fact(5);
        }
    "#;

    let (value, output) = run(source, &[]);
    assert_eq!(value, Value::Integer(120));
    assert_eq!(output, ["120"]);
}

#[test]
fn test_subtraction_order() {
    let (value, _) = run("main() { return 10 - 3; }", &[]);
    assert_eq!(value, Value::Integer(7));
}

#[test]
fn test_argument_order() {
    let source = r#"
        sub(a, b) { return a - b; }
        main() { return sub(10, 3) * 10 + sub(1, 2); }
    "#;
    let (value, _) = run(source, &[]);
    assert_eq!(value, Value::Integer(69));
}

#[test]
fn test_break_and_continue() {
    let source = r#"
        main() {
            decl i, sum;
            i = 0;
            sum = 0;
            while (TRUE) {
                i = i + 1;
                if (i > 9) { break; }
                if (i / 2 * 2 == i) { continue; }
                sum = sum + i;
            }
            print(sum);
        }
    "#;
    let (_, output) = run(source, &[]);
    assert_eq!(output, ["25"]);
}

#[test]
fn test_nested_loops_break_inner_only() {
    let source = r#"
        main() {
            decl i, j, count;
            i = 0;
            count = 0;
            while (i < 3) {
                j = 0;
                while (TRUE) {
                    if (j == 2) { break; }
                    count = count + 1;
                    j = j + 1;
                }
                i = i + 1;
            }
            return count;
        }
    "#;
    let (value, _) = run(source, &[]);
    assert_eq!(value, Value::Integer(6));
}

#[test]
fn test_else_if_chain() {
    let source = r#"
        classify(n) {
            if (n < 0) {
                return "negative";
            } else if (n == 0) {
                return "zero";
            } else {
                return "positive";
            }
        }
        main() {
            print(classify(-5));
            print(classify(0));
            print(classify(8));
        }
    "#;
    let (_, output) = run(source, &[]);
    assert_eq!(output, ["negative", "zero", "positive"]);
}

#[test]
fn test_block_locals_do_not_clobber_outer() {
    let source = r#"
        main() {
            decl keep, result;
            keep = 1;
            if (TRUE) {
                decl tmp;
                tmp = 41;
                result = tmp + keep;
            } else {
                decl other;
                other = 0;
                result = other;
            }
            print(keep);
            return result;
        }
    "#;
    let (value, output) = run(source, &[]);
    assert_eq!(value, Value::Integer(42));
    assert_eq!(output, ["1"]);
}

#[test]
fn test_globals_shared_between_functions() {
    let source = r#"
        decl counter;
        bump() { counter = counter + 1; }
        main() {
            counter = 0;
            bump();
            bump();
            bump();
            return counter;
        }
    "#;
    let (value, _) = run(source, &[]);
    assert_eq!(value, Value::Integer(3));
}

#[test]
fn test_natives_and_display() {
    let source = r#"
        main() {
            decl name, n;
            name = input("name? ");
            n = str_to_int(input("age? "));
            print("hello " + name);
            print(int_to_str(n + 1) + "!");
            print(n > 30);
            print(!n);
            print(NONE);
            print(bump());
        }
        bump() { return; }
    "#;
    let (_, output) = run(source, &["kin", "41"]);
    assert_eq!(
        output,
        ["hello kin", "42!", "TRUE", "FALSE", "NONE", "NONE"]
    );
}

#[test]
fn test_program_without_main_does_nothing() {
    let (value, output) = run("helper() { print(1); }", &[]);
    assert_eq!(value, Value::None);
    assert!(output.is_empty());
}

#[test]
fn test_input_exhausted_is_runtime_error() {
    let program = compile_source("main() { print(input(\"?\")); }").unwrap();
    let mut vm = Vm::new(RecordingInteraction::default());
    let err = vm.run(&program).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Interaction(_)));
    assert!(err.to_string().contains("no more input"));
}

#[test]
fn test_runaway_recursion_hits_call_depth_limit() {
    let program = compile_source("f(n) { return f(n + 1); } main() { f(0); }").unwrap();
    let mut vm = Vm::with_config(
        RecordingInteraction::default(),
        VmConfig {
            max_call_depth: 64,
            ..VmConfig::default()
        },
    );
    let err = vm.run(&program).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Limit(_)));
    assert_eq!(err.call_stack.first().map(String::as_str), Some("main"));
}
