#[cfg(test)]
mod lox_tests {
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    use rlox::error::LoxError;
    use rlox::interpreter::Interpreter;
    use rlox::lox::{Lox, EXIT_RUNTIME_ERROR, EXIT_STATIC_ERROR};

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

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

    fn printed(buffer: &SharedBuffer) -> String {
        String::from_utf8_lossy(&buffer.0.borrow()).into_owned()
    }

    #[test]
    fn clean_run_exits_zero() {
        let (mut lox, _) = session();

        assert!(lox.run("print 1;").is_ok());
        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
        assert_eq!(lox.exit_code(), 0);
    }

    #[test]
    fn lex_and_parse_errors_are_reported_together() {
        let (mut lox, buffer) = session();

        let errors = lox.run("print 1;\nvar @ = 2;\nprint ;").unwrap_err();

        assert!(errors.len() >= 2, "got {:?}", errors);
        assert!(errors.iter().all(LoxError::is_static));
        assert!(matches!(errors[0], LoxError::Lex { line: 2, .. }));
        assert!(lox.had_error());
        assert_eq!(lox.exit_code(), EXIT_STATIC_ERROR);
        assert_eq!(printed(&buffer), "");
    }

    #[test]
    fn resolve_errors_raise_static_flag() {
        let (mut lox, _) = session();

        let errors = lox.run("return 1;").unwrap_err();

        assert!(matches!(errors.as_slice(), [LoxError::Resolve { .. }]));
        assert_eq!(lox.exit_code(), EXIT_STATIC_ERROR);
    }

    #[test]
    fn runtime_error_raises_runtime_flag() {
        let (mut lox, _) = session();

        let errors = lox.run("print -nil;").unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Operand must be a number.\n[line 1]"
        );
        assert!(!lox.had_error());
        assert!(lox.had_runtime_error());
        assert_eq!(lox.exit_code(), EXIT_RUNTIME_ERROR);
    }

    #[test]
    fn run_file_maps_to_exit_codes() {
        let (mut lox, buffer) = session();
        assert_eq!(lox.run_file("print \"ok\";"), 0);
        assert_eq!(printed(&buffer), "ok\n");

        let (mut lox, _) = session();
        assert_eq!(lox.run_file("print (1;"), EXIT_STATIC_ERROR);

        let (mut lox, buffer) = session();
        assert_eq!(lox.run_file("print 1; nil();"), EXIT_RUNTIME_ERROR);
        assert_eq!(printed(&buffer), "1\n");
    }

    #[test]
    fn repl_survives_bad_lines() {
        let (mut lox, buffer) = session();
        let input = Cursor::new("var a = 1;\nprint a +;\nprint nope;\na = a + 1;\nprint a;\n");
        let mut prompt = Vec::new();

        lox.run_prompt(input, &mut prompt).expect("in-memory I/O");

        assert_eq!(printed(&buffer), "2\n");
        assert_eq!(String::from_utf8(prompt).unwrap(), "> > > > > > \n");

        // each line starts with clean flags
        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
        assert_eq!(lox.exit_code(), 0);
    }

    #[test]
    fn repl_functions_outlive_their_line() {
        let (mut lox, buffer) = session();
        let input = Cursor::new(
            "fun make() { var n = 0; fun next() { n = n + 1; return n; } return next; }\n\
             var next = make();\n\
             print next();\n\
             print next();\n",
        );

        lox.run_prompt(input, io::sink()).expect("in-memory I/O");

        assert_eq!(printed(&buffer), "1\n2\n");
    }
}
