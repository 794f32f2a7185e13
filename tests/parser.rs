#[cfg(test)]
mod parser_tests {
    use rlox::ast::{Expr, LiteralValue, Stmt};
    use rlox::ast_printer::AstPrinter;
    use rlox::error::LoxError;
    use rlox::parser::Parser;
    use rlox::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let (tokens, errors) = Scanner::new(source).scan_all();
        assert!(errors.is_empty(), "scan errors: {:?}", errors);

        Parser::new(tokens).parse()
    }

    fn parse_ok(source: &str) -> Vec<Stmt> {
        parse(source).unwrap_or_else(|errors| panic!("parse errors: {:?}", errors))
    }

    fn print_expr(source: &str) -> String {
        match parse_ok(source).as_slice() {
            [Stmt::Expression(expr)] => AstPrinter.print(expr),
            other => panic!("expected a single expression statement, got {:?}", other),
        }
    }

    #[test]
    fn precedence_and_grouping() {
        assert_eq!(print_expr("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(print_expr("(1 + 2) * 3;"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(print_expr("-a == !b;"), "(== (- a) (! b))");
        assert_eq!(print_expr("a or b and c;"), "(or a (and b c))");
    }

    #[test]
    fn calls_properties_and_assignment() {
        assert_eq!(print_expr("f(1, x)(2);"), "(call (call f 1.0 x) 2.0)");
        assert_eq!(print_expr("a.b.c = 3;"), "(= (. (. a b) c) 3.0)");
        assert_eq!(print_expr("x = y = 1;"), "(= x (= y 1.0))");
        assert_eq!(print_expr("super.m(this);"), "(call (super m) this)");
    }

    #[test]
    fn for_loop_desugars_to_while() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");

        let [Stmt::Block(outer)] = statements.as_slice() else {
            panic!("expected an enclosing block, got {:?}", statements);
        };

        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };

        let Stmt::Block(inner) = body.as_ref() else {
            panic!("expected block body, got {:?}", body);
        };

        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn bare_for_loop_condition_is_true() {
        let statements = parse_ok("for (;;) print 1;");

        match statements.as_slice() {
            [Stmt::While { condition, .. }] => {
                assert_eq!(*condition, Expr::Literal(LiteralValue::True));
            }
            other => panic!("expected bare while, got {:?}", other),
        }
    }

    #[test]
    fn class_with_superclass_and_methods() {
        let statements = parse_ok("class B < A { init(x) { this.x = x; } m() { return 1; } }");

        let [Stmt::Class {
            name,
            superclass,
            methods,
        }] = statements.as_slice()
        else {
            panic!("expected class, got {:?}", statements);
        };

        assert_eq!(name.lexeme, "B");
        assert!(matches!(superclass, Some(Expr::Variable { name, .. }) if name.lexeme == "A"));
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name.lexeme, "init");
        assert_eq!(methods[0].params.len(), 1);
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        let errors = parse("1 + 2 = 3;").expect_err("should fail");

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at '=': Invalid assignment target."
        );
    }

    #[test]
    fn recovers_and_collects_every_error() {
        let errors = parse("var = 1;\nprint 2;\nprint ;\nvar ok = 3;").expect_err("should fail");

        assert_eq!(errors.len(), 2, "got {:?}", errors);
        assert!(errors[0].to_string().starts_with("[line 1]"));
        assert!(errors[1].to_string().contains("Expect expression."));
    }

    #[test]
    fn missing_semicolon_reports_at_end() {
        let errors = parse("print 1").expect_err("should fail");

        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error at end: Expect ';' after value."
        );
    }

    #[test]
    fn resolvable_nodes_get_distinct_ids() {
        let statements = parse_ok("a; a;");

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected {:?}", other),
            })
            .collect();

        assert_ne!(ids[0], ids[1]);
    }
}
