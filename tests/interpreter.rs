#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use rlox::callable::NativeFunction;
    use rlox::error::{LoxError, RuntimeError, RuntimeErrorKind};
    use rlox::interpreter::Interpreter;
    use rlox::lox::Lox;
    use rlox::value::Value;

    /// `print` target that the test can read back after the run.
    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session() -> (Lox, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let lox = Lox::with_interpreter(Interpreter::with_output(Box::new(buffer.clone())));
        (lox, buffer)
    }

    fn run(source: &str) -> (String, Result<(), Vec<LoxError>>) {
        let (mut lox, buffer) = session();
        let result = lox.run(source);
        (buffer.contents(), result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(errors) = result {
            panic!("unexpected errors: {:?}\noutput so far:\n{}", errors, output);
        }
        output
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source).1 {
            Err(mut errors) => match errors.pop() {
                Some(LoxError::Runtime(e)) => e,
                other => panic!("expected a runtime error, got {:?}", other),
            },
            Ok(()) => panic!("expected a runtime error, program succeeded"),
        }
    }

    fn kind_of(source: &str) -> RuntimeErrorKind {
        runtime_error(source).kind
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn arithmetic_and_number_formatting() {
        let output = output_of(
            "print 1 + 2 * 3; print 7 / 2; print -(4 - 6); print 1 / 0; print -1 / 0; print 10 / 4 * 2;",
        );

        assert_eq!(output, "7\n3.5\n2\ninf\n-inf\n5\n");
    }

    #[test]
    fn string_concatenation_and_comparison() {
        let output = output_of(r#"print "foo" + "bar"; print 1 < 2; print 2 <= 1; print 3 >= 3;"#);

        assert_eq!(output, "foobar\ntrue\nfalse\ntrue\n");
    }

    #[test]
    fn equality_is_same_variant_only() {
        let output = output_of(
            r#"
            print nil == nil;
            print 1 == 1;
            print "a" == "a";
            print 1 == "1";
            print nil == false;
            print true != false;
            fun f() {}
            var g = f;
            print f == g;
            fun h() {}
            print f == h;
            "#,
        );

        assert_eq!(output, "true\ntrue\ntrue\nfalse\nfalse\ntrue\ntrue\nfalse\n");
    }

    #[test]
    fn truthiness_empty_string_falsy_zero_truthy() {
        let output = output_of(
            r#"
            if ("") print "yes"; else print "no";
            if (0) print "yes"; else print "no";
            if (nil) print "yes"; else print "no";
            if ("x") print "yes"; else print "no";
            print !"";
            print !0;
            "#,
        );

        assert_eq!(output, "no\nyes\nno\nyes\ntrue\nfalse\n");
    }

    #[test]
    fn logical_operators_return_operands() {
        let output = output_of(
            r#"
            print nil or "fallback";
            print "first" or "second";
            print "" and "unreached";
            print 1 and 2;
            var calls = 0;
            fun bump() { calls = calls + 1; return true; }
            print true or bump();
            print false and bump();
            print calls;
            "#,
        );

        assert_eq!(output, "fallback\nfirst\n\n2\ntrue\nfalse\n0\n");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements and scope
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn loops() {
        let output = output_of(
            r#"
            for (var i = 0; i < 3; i = i + 1) print i;
            var n = 3;
            while (n > 0) { print n; n = n - 1; }
            "#,
        );

        assert_eq!(output, "0\n1\n2\n3\n2\n1\n");
    }

    #[test]
    fn block_scopes_shadow_and_restore() {
        let output = output_of(
            r#"
            var a = "outer";
            {
                var a = "inner";
                print a;
            }
            print a;
            "#,
        );

        assert_eq!(output, "inner\nouter\n");
    }

    #[test]
    fn uninitialized_var_is_nil() {
        assert_eq!(output_of("var x; print x;"), "nil\n");
    }

    #[test]
    fn globals_may_be_redefined() {
        assert_eq!(output_of("var a = 1; var a = 2; print a;"), "2\n");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Functions and closures
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn closure_counter_keeps_its_own_state() {
        let output = output_of(
            r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }
            var counter = makeCounter();
            counter();
            counter();
            var other = makeCounter();
            other();
            "#,
        );

        assert_eq!(output, "1\n2\n1\n");
    }

    #[test]
    fn closure_binding_is_static() {
        let output = output_of(
            r#"
            var a = "global";
            {
                fun showA() { print a; }
                showA();
                var a = "block";
                showA();
            }
            "#,
        );

        assert_eq!(output, "global\nglobal\n");
    }

    #[test]
    fn recursion_and_early_return() {
        let output = output_of(
            r#"
            fun fib(n) {
                if (n < 2) return n;
                return fib(n - 1) + fib(n - 2);
            }
            print fib(15);
            "#,
        );

        assert_eq!(output, "610\n");
    }

    #[test]
    fn return_unwinds_out_of_nested_loops() {
        let output = output_of(
            r#"
            fun find(limit) {
                var i = 0;
                while (true) {
                    for (var j = 0; j < 10; j = j + 1) {
                        if (i * 10 + j >= limit) return i * 10 + j;
                    }
                    i = i + 1;
                }
            }
            print find(23);
            fun noValue() { return; }
            print noValue();
            fun implicit() {}
            print implicit();
            "#,
        );

        assert_eq!(output, "23\nnil\nnil\n");
    }

    #[test]
    fn deep_nesting_resolves_consistently() {
        let output = output_of(
            r#"
            fun outer() {
                var x = "outer";
                fun middle() {
                    fun inner() {
                        print x;
                        x = "changed";
                    }
                    return inner;
                }
                var f = middle();
                f();
                print x;
            }
            outer();
            "#,
        );

        assert_eq!(output, "outer\nchanged\n");
    }

    #[test]
    fn callables_display() {
        let output = output_of(
            r#"
            fun f() {}
            class C { m() {} }
            print f;
            print clock;
            print C;
            print C();
            print C().m;
            "#,
        );

        assert_eq!(output, "<fn f>\n<native fn>\nC\nC instance\n<fn m>\n");
    }

    #[test]
    fn clock_returns_a_number() {
        assert_eq!(output_of("print clock() > 0;"), "true\n");
    }

    #[test]
    fn host_natives_are_callable() {
        let buffer = SharedBuffer::default();
        let mut interpreter = Interpreter::with_output(Box::new(buffer.clone()));
        interpreter.define_native(NativeFunction {
            name: "double",
            arity: 1,
            func: |args: &[Value]| match args {
                [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
                _ => Err(RuntimeError::type_error(0, "Operand must be a number.").into()),
            },
        });

        let mut lox = Lox::with_interpreter(interpreter);
        lox.run("print double(21); print double;").expect("run succeeds");

        assert_eq!(buffer.contents(), "42\n<native fn>\n");
        assert_eq!(kind_of("double(1);"), RuntimeErrorKind::UndefinedVariable);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Classes
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn fields_and_methods() {
        let output = output_of(
            r#"
            class Point {
                init(x, y) {
                    this.x = x;
                    this.y = y;
                }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            "#,
        );

        assert_eq!(output, "3\n12\n");
    }

    #[test]
    fn fields_shadow_methods() {
        let output = output_of(
            r#"
            class A { m() { return "method"; } }
            var a = A();
            print a.m();
            a.m = "field";
            print a.m;
            "#,
        );

        assert_eq!(output, "method\nfield\n");
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let output = output_of(
            r#"
            class Person {
                init(name) { this.name = name; }
                greet() { print "hi " + this.name; }
            }
            var greet = Person("bob").greet;
            greet();
            "#,
        );

        assert_eq!(output, "hi bob\n");
    }

    #[test]
    fn initializer_always_yields_the_instance() {
        let output = output_of(
            r#"
            class Foo {
                init() { return; }
            }
            var foo = Foo();
            print foo;
            print foo.init();
            "#,
        );

        assert_eq!(output, "Foo instance\nFoo instance\n");
    }

    #[test]
    fn super_calls_reach_the_superclass() {
        let output = output_of(
            r#"
            class A { say() { print "A"; } }
            class B < A { say() { super.say(); print "B"; } }
            class C < B {}
            C().say();
            "#,
        );

        assert_eq!(output, "A\nB\n");
    }

    #[test]
    fn super_result_composes_with_subclass() {
        let output = output_of(
            r#"
            class A { m() { return "A"; } }
            class B < A { m() { return super.m() + "B"; } }
            print B().m();
            "#,
        );

        assert_eq!(output, "AB\n");
    }

    #[test]
    fn super_binds_the_original_receiver() {
        let output = output_of(
            r#"
            class A {
                name() { return "A"; }
                show() { print this.name(); }
            }
            class B < A {
                name() { return "B"; }
                show() { super.show(); }
            }
            B().show();
            "#,
        );

        assert_eq!(output, "B\n");
    }

    #[test]
    fn inherited_initializer() {
        let output = output_of(
            r#"
            class Base { init(v) { this.v = v; } }
            class Derived < Base {}
            print Derived(7).v;
            "#,
        );

        assert_eq!(output, "7\n");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Runtime errors
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn type_errors() {
        for source in [
            r#"-"a";"#,
            r#"1 + "a";"#,
            r#""a" < 1;"#,
            "nil * 2;",
            "nil.x;",
            "var n = 1; n.x = 2;",
            "var NotAClass = 1; class B < NotAClass {}",
        ] {
            assert_eq!(kind_of(source), RuntimeErrorKind::TypeError, "{}", source);
        }
    }

    #[test]
    fn type_error_messages() {
        assert_eq!(
            runtime_error(r#"-"a";"#).message,
            "Operand must be a number."
        );
        assert_eq!(
            runtime_error(r#"1 + "a";"#).message,
            "Operands must be two numbers or two strings."
        );
        assert_eq!(
            runtime_error("true - 1;").message,
            "Operands must be numbers."
        );
        assert_eq!(
            runtime_error("nil.x;").message,
            "Only instances have properties."
        );
        assert_eq!(
            runtime_error("var n = 1; n.x = 2;").message,
            "Only instances have fields."
        );
        assert_eq!(
            runtime_error("var NotAClass = 1; class B < NotAClass {}").message,
            "Superclass must be a class."
        );
    }

    #[test]
    fn undefined_variable() {
        let err = runtime_error("print 1;\n\nprint nope;");

        assert_eq!(err.kind, RuntimeErrorKind::UndefinedVariable);
        assert_eq!(err.line, 3);
        assert_eq!(err.to_string(), "Undefined variable 'nope'.\n[line 3]");

        assert_eq!(kind_of("nope = 1;"), RuntimeErrorKind::UndefinedVariable);
    }

    #[test]
    fn undefined_property() {
        let err = runtime_error("class A {}\nA().missing;");

        assert_eq!(err.kind, RuntimeErrorKind::UndefinedProperty);
        assert_eq!(err.message, "Undefined property 'missing'.");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn not_callable() {
        for source in [r#""text"();"#, "nil();", "var x = 3; x();"] {
            let err = runtime_error(source);
            assert_eq!(err.kind, RuntimeErrorKind::NotCallable, "{}", source);
            assert_eq!(err.message, "Can only call functions and classes.");
        }
    }

    #[test]
    fn arity_mismatch() {
        let err = runtime_error("fun f(a, b) {} f(1);");
        assert_eq!(err.kind, RuntimeErrorKind::ArityMismatch);
        assert_eq!(err.message, "Expected 2 arguments but got 1.");

        assert_eq!(
            kind_of("class A { init(x) {} } A();"),
            RuntimeErrorKind::ArityMismatch
        );
        assert_eq!(kind_of("class A {} A(1);"), RuntimeErrorKind::ArityMismatch);
        assert_eq!(kind_of("clock(1);"), RuntimeErrorKind::ArityMismatch);
    }

    #[test]
    fn runtime_error_stops_execution_but_keeps_prior_output() {
        let (output, result) = run("print 1;\nprint nil + 1;\nprint 2;");

        assert_eq!(output, "1\n");
        assert!(matches!(
            result.as_ref().map_err(Vec::as_slice),
            Err([LoxError::Runtime(RuntimeError {
                kind: RuntimeErrorKind::TypeError,
                line: 2,
                ..
            })])
        ));
    }

    #[test]
    fn error_inside_call_leaves_globals_intact() {
        let (mut lox, buffer) = session();

        let first = lox.run(
            r#"
            var state = "before";
            fun f(a) { var local = "x"; state = "during"; }
            f();
            "#,
        );
        assert!(first.is_err());

        lox.run("print state;").expect("second run succeeds");

        // the call failed before its body ran
        assert_eq!(buffer.contents(), "before\n");
    }

    #[test]
    fn environment_restored_after_error_in_block() {
        let (mut lox, buffer) = session();

        let first = lox.run(
            r#"
            var a = "global";
            {
                var a = "local";
                nil();
            }
            "#,
        );
        assert!(first.is_err());

        lox.run("print a;").expect("second run succeeds");
        assert_eq!(buffer.contents(), "global\n");
    }

    // ─────────────────────────────────────────────────────────────────────
    // Static errors block execution
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn static_errors_prevent_any_output() {
        let (output, result) = run("print \"start\";\n{ var a = a; }");

        assert_eq!(output, "");
        let errors = result.expect_err("resolve error expected");
        assert!(errors.iter().all(LoxError::is_static));
    }

    #[test]
    fn globals_persist_across_runs() {
        let (mut lox, buffer) = session();

        lox.run("var count = 1; fun inc() { count = count + 1; }")
            .expect("first run");
        lox.run("inc(); inc();").expect("second run");
        lox.run("{ var local = count; print local; }")
            .expect("third run");

        assert_eq!(buffer.contents(), "3\n");
    }
}
