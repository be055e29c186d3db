mod common;

#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use rox::error::{LoxError, RuntimeError};
    use rox::interpreter::MAX_CALL_DEPTH;
    use rox::value::Value;

    use super::common::{errors_of, interpreter, output_of, run};

    fn runtime_error(source: &str) -> (String, RuntimeError) {
        let (output, result) = run(source);

        match result {
            Err(mut errors) if errors.len() == 1 => match errors.remove(0) {
                LoxError::Runtime(e) => (output, e),
                other => panic!("expected a runtime error, got {}", other),
            },
            other => panic!("expected exactly one runtime error, got {:?}", other),
        }
    }

    // ── expressions ─────────────────────────────────────────────────────

    #[test]
    fn test_interpreter_01_arithmetic_and_formatting() {
        assert_eq!(
            output_of("print 1 + 2 * 3; print 7 / 2; print -(4 - 6); print 0.1 + 0.2;"),
            "7\n3.5\n2\n0.30000000000000004\n"
        );
    }

    #[test]
    fn test_interpreter_02_strings_and_comparison() {
        assert_eq!(
            output_of(
                r#"
                print "foo" + "bar";
                print "apple" < "banana";
                print 2 >= 2;
                print false < true;
                print 1 == 1.0;
                print "a" != "a";
                print nil == false;
            "#
            ),
            "foobar\ntrue\ntrue\ntrue\ntrue\nfalse\nfalse\n"
        );
    }

    #[test]
    fn test_interpreter_03_truthiness_and_logic() {
        assert_eq!(
            output_of(
                r#"
                if (0) print "zero is truthy";
                if ("") print "empty string is truthy";
                if (nil) print "unreachable"; else print "nil is falsy";
                print nil or "fallback";
                print 1 and 2;
                print false and undefined_name;
                print !nil;
            "#
            ),
            "zero is truthy\nempty string is truthy\nnil is falsy\nfallback\n2\nfalse\ntrue\n"
        );
    }

    #[test]
    fn test_interpreter_04_division_by_zero() {
        let (_, error) = runtime_error("print 1 / 0;");

        assert!(matches!(error, RuntimeError::DivisionByZero { line: 1 }));
        assert_eq!(error.to_string(), "Division by zero.\n[line 1]");
    }

    #[test]
    fn test_interpreter_05_operand_type_errors() {
        let (_, error) = runtime_error("print 1 + \"a\";");
        assert_eq!(
            error.to_string(),
            "Operands must be two numbers or two strings.\n[line 1]"
        );

        let (_, error) = runtime_error("print -\"a\";");
        assert_eq!(error.to_string(), "Operand must be a number.\n[line 1]");

        let (_, error) = runtime_error("print 1 < \"a\";");
        assert!(matches!(error, RuntimeError::TypeError { line: 1, .. }));

        let (_, error) = runtime_error("print nil * 2;");
        assert_eq!(error.to_string(), "Operands must be numbers.\n[line 1]");
    }

    // ── variables and scope ─────────────────────────────────────────────

    #[test]
    fn test_interpreter_06_shadowing() {
        assert_eq!(
            output_of("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_interpreter_07_closure_binds_lexically() {
        let source = r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_interpreter_08_independent_counters() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
            print a();
        "#;

        assert_eq!(output_of(source), "1\n2\n1\n3\n");
    }

    #[test]
    fn test_interpreter_09_undefined_variable() {
        let (_, error) = runtime_error("print nope;");
        assert_eq!(error.to_string(), "Undefined variable 'nope'.\n[line 1]");

        // assignment never creates a global
        let (_, error) = runtime_error("\nnope = 1;");
        assert!(matches!(error, RuntimeError::UndefinedVariable { line: 2, .. }));
    }

    #[test]
    fn test_interpreter_10_recursion() {
        let source = r#"
            fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(15);
        "#;

        assert_eq!(output_of(source), "610\n");
    }

    // ── loops ───────────────────────────────────────────────────────────

    #[test]
    fn test_interpreter_11_for_loop_with_continue_runs_increment() {
        let source = r#"
            for (var i = 0; i < 6; i = i + 1) {
                if (i == 1) continue;
                if (i == 4) break;
                print i;
            }
        "#;

        assert_eq!(output_of(source), "0\n2\n3\n");
    }

    #[test]
    fn test_interpreter_12_break_leaves_only_innermost_loop() {
        let source = r#"
            var outer = 0;
            while (outer < 2) {
                var inner = 0;
                while (true) {
                    inner = inner + 1;
                    if (inner > 2) break;
                }
                print inner;
                outer = outer + 1;
            }
        "#;

        assert_eq!(output_of(source), "3\n3\n");
    }

    #[test]
    fn test_interpreter_13_return_unwinds_through_loops() {
        let source = r#"
            fun find(limit) {
                for (var i = 0; ; i = i + 1) {
                    while (true) {
                        if (i * i > limit) return i;
                        break;
                    }
                }
            }
            print find(10);
        "#;

        assert_eq!(output_of(source), "4\n");
    }

    // ── functions ───────────────────────────────────────────────────────

    #[test]
    fn test_interpreter_14_function_values_and_display() {
        let source = r#"
            fun named() {}
            var anon = fun (x) { return x * 2; };
            print named;
            print anon;
            print anon(21);
            print clock;
            print named();
        "#;

        assert_eq!(
            output_of(source),
            "<fn named>\n<fn anonymous>\n42\n<native fn clock>\nnil\n"
        );
    }

    #[test]
    fn test_interpreter_15_arity_mismatch_runs_nothing() {
        let (output, error) = runtime_error(
            r#"
            fun f(a, b) { print "body ran"; }
            f(1);
        "#,
        );

        assert_eq!(output, "");
        assert!(matches!(
            error,
            RuntimeError::ArityMismatch {
                expected: 2,
                got: 1,
                line: 3
            }
        ));
        assert_eq!(error.to_string(), "Expected 2 arguments but got 1.\n[line 3]");
    }

    #[test]
    fn test_interpreter_16_not_callable() {
        let (_, error) = runtime_error("\"text\"();");
        assert_eq!(
            error.to_string(),
            "Can only call functions and classes.\n[line 1]"
        );
    }

    #[test]
    fn test_interpreter_17_clock_is_a_number() {
        let (mut interp, buffer) = interpreter();

        rox::run_source("print clock() > 1600000000;", &mut interp).expect("run");

        assert_eq!(buffer.contents(), "true\n");
    }

    #[test]
    fn test_interpreter_18_define_native() {
        let (mut interp, buffer) = interpreter();

        interp.define_native("double", 1, |args: &[Value]| match &args[0] {
            Value::Number(n) => Ok(Value::Number(n * 2.0)),
            _ => Err("double expects a number.".to_string()),
        });

        rox::run_source("print double(4);", &mut interp).expect("run");
        assert_eq!(buffer.contents(), "8\n");

        let errors = rox::run_source("double(\"x\");", &mut interp).unwrap_err();
        assert_eq!(errors[0].to_string(), "double expects a number.\n[line 1]");
        assert_eq!(errors[0].exit_code(), 70);
    }

    // ── classes ─────────────────────────────────────────────────────────

    #[test]
    fn test_interpreter_19_fields_and_methods() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            p.x = 10;
            print p.sum();
            print p;
            print Point;
            var m = p.sum;
            print m();
        "#;

        assert_eq!(
            output_of(source),
            "12\n<class Point> instance\n<class Point>\n12\n"
        );
    }

    #[test]
    fn test_interpreter_20_initializer_returns_instance() {
        let source = r#"
            class Box {
                init(v) {
                    this.v = v;
                    if (v > 0) return;
                    this.v = "negative";
                }
            }
            var b = Box(3);
            print b.v;
            print b.init(-1) == b;
            print b.v;
        "#;

        assert_eq!(output_of(source), "3\ntrue\nnegative\n");
    }

    #[test]
    fn test_interpreter_21_super_dispatch_keeps_receiver() {
        let source = r#"
            class A {
                name() { return "A"; }
                describe() { return "I am " + this.name(); }
            }
            class B < A {
                name() { return "B"; }
                describe() { return super.describe() + "!"; }
            }
            class C < B {}
            print C().describe();
        "#;

        assert_eq!(output_of(source), "I am B!\n");
    }

    #[test]
    fn test_interpreter_22_inherited_initializer_and_arity() {
        let source = r#"
            class Base { init(a) { this.a = a; } }
            class Derived < Base {}
            print Derived(5).a;
        "#;

        assert_eq!(output_of(source), "5\n");

        let (_, error) = runtime_error("class Empty {} Empty(1);");
        assert!(matches!(
            error,
            RuntimeError::ArityMismatch {
                expected: 0,
                got: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_interpreter_23_property_errors() {
        let (_, error) = runtime_error("class A {} print A().missing;");
        assert_eq!(error.to_string(), "Undefined property 'missing'.\n[line 1]");

        let (_, error) = runtime_error("var x = 1; print x.field;");
        assert!(matches!(error, RuntimeError::NotAnInstance { line: 1 }));

        let (_, error) = runtime_error("var x = \"s\"; x.field = 1;");
        assert!(matches!(error, RuntimeError::NoFields { line: 1 }));

        let (_, error) = runtime_error(
            "class A {} class B < A { m() { return super.missing; } } B().m();",
        );
        assert!(matches!(error, RuntimeError::UndefinedProperty { ref name, .. } if name == "missing"));
    }

    #[test]
    fn test_interpreter_24_superclass_must_be_a_class() {
        let (_, error) = runtime_error("var NotAClass = 1;\nclass A < NotAClass {}");
        assert_eq!(error.to_string(), "Superclass must be a class.\n[line 2]");
    }

    #[test]
    fn test_interpreter_25_identity_equality() {
        let source = r#"
            class A {}
            var a = A();
            var b = A();
            fun f() {}
            print a == a;
            print a == b;
            print f == f;
            print A == A;
        "#;

        assert_eq!(output_of(source), "true\nfalse\ntrue\ntrue\n");
    }

    // ── program-level behaviour ─────────────────────────────────────────

    #[test]
    fn test_interpreter_26_first_runtime_error_stops_program() {
        let (output, error) = runtime_error("print 1;\nprint nope;\nprint 3;");

        assert_eq!(output, "1\n");
        assert_eq!(error.line(), 2);
    }

    #[test]
    fn test_interpreter_27_static_errors_prevent_execution() {
        let errors = errors_of("print \"side effect\";\n{ var a = a; }");

        assert_eq!(
            errors,
            vec!["[line 2] Error at 'a': Can't read local variable in its own initializer."]
        );

        let (output, _) = run("print \"side effect\";\nprint ;");
        assert_eq!(output, "");
    }

    #[test]
    fn test_interpreter_28_session_survives_errors() {
        let (mut interp, buffer) = interpreter();

        rox::run_source("var total = 0; fun add(n) { total = total + n; }", &mut interp)
            .expect("definitions");

        // The error unwinds out of a block and a call; the next line must
        // still run against the global frame.
        let errors = rox::run_source("{ var local = 1; add(nil); }", &mut interp).unwrap_err();
        assert_eq!(errors[0].exit_code(), 70);

        rox::run_source("add(2); add(3); print total;", &mut interp).expect("later line");
        rox::run_source("print local;", &mut interp).unwrap_err();

        assert_eq!(buffer.contents(), "5\n");
    }

    #[test]
    fn test_interpreter_29_side_effect_free_evaluation_is_repeatable() {
        let (mut interp, buffer) = interpreter();

        rox::run_source("var x = 4; fun sq(n) { return n * n; }", &mut interp).expect("defs");
        rox::run_source("print sq(x) + 1; print sq(x) + 1;", &mut interp).expect("run");

        assert_eq!(buffer.contents(), "17\n17\n");
    }

    // ── limits and formatting ───────────────────────────────────────────

    #[test]
    fn test_interpreter_30_deep_recursion_completes() {
        let source = r#"
            fun depth(n) { if (n > 0) return depth(n - 1) + 1; return 0; }
            print depth(9000);
        "#;

        assert_eq!(output_of(source), "9000\n");
    }

    #[test]
    fn test_interpreter_31_runaway_recursion_is_a_runtime_error() {
        let (mut interp, buffer) = interpreter();

        let errors = rox::run_source(
            "fun forever(n) { return forever(n + 1); }\nforever(0);",
            &mut interp,
        )
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            LoxError::Runtime(RuntimeError::StackOverflow { depth, line: 1 }) if *depth == MAX_CALL_DEPTH
        ));
        assert_eq!(errors[0].exit_code(), 70);

        // The depth counter unwinds with the error.
        rox::run_source(
            "fun depth(n) { if (n > 0) return depth(n - 1) + 1; return 0; } print depth(9000);",
            &mut interp,
        )
        .expect("recursion after overflow");

        assert_eq!(buffer.contents(), "9000\n");
    }

    #[test]
    fn test_interpreter_32_constructor_arity_mismatch_runs_nothing() {
        let (output, error) = runtime_error(r#"class P { init(a) { print "ran"; } } P(1, 2);"#);

        assert_eq!(output, "");
        assert!(matches!(
            error,
            RuntimeError::ArityMismatch {
                expected: 1,
                got: 2,
                line: 1
            }
        ));

        let (output, error) = runtime_error(
            r#"class P { init(a) { print "ran"; } } class Q < P {} Q();"#,
        );

        assert_eq!(output, "");
        assert!(matches!(
            error,
            RuntimeError::ArityMismatch {
                expected: 1,
                got: 0,
                ..
            }
        ));
    }

    #[test]
    fn test_interpreter_33_closures_keep_bindings_across_lines() {
        let (mut interp, buffer) = interpreter();

        rox::run_source(
            "fun make() { var n = 0; fun inc() { n = n + 1; return n; } return inc; } var c = make();",
            &mut interp,
        )
        .expect("definitions");

        rox::run_source("{ var unrelated = 7; print unrelated; }", &mut interp).expect("other line");
        rox::run_source("c(); print c();", &mut interp).expect("closure call");

        assert_eq!(buffer.contents(), "7\n2\n");
    }

    #[test]
    fn test_interpreter_34_number_formatting_switches_to_exponent() {
        assert_eq!(
            output_of(
                "print 10000000; print 9999999; print 0.001; print 0.0001; \
                 print 123456789.5; print -100000000000000000000000; print 2.5;"
            ),
            "1.0E7\n9999999\n0.001\n1.0E-4\n1.234567895E8\n-1.0E23\n2.5\n"
        );
    }
}
