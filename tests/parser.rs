#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
        let (tokens, errors) = rox::scan(source);
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);

        Parser::new(&tokens).parse()
    }

    fn printed(source: &str) -> Vec<String> {
        match parse(source) {
            Ok(statements) => statements.iter().map(AstPrinter::print_stmt).collect(),
            Err(errors) => panic!("parse failed: {:?}", errors),
        }
    }

    fn parse_errors(source: &str) -> Vec<String> {
        match parse(source) {
            Ok(statements) => panic!("expected errors, parsed {:?}", statements),
            Err(errors) => errors.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn test_parser_01_precedence() {
        assert_eq!(
            printed("print 1 + 2 * 3 - -4 / (5);"),
            vec!["(print (- (+ 1.0 (* 2.0 3.0)) (/ (- 4.0) (group 5.0))))"]
        );
    }

    #[test]
    fn test_parser_02_logical_and_comparison() {
        assert_eq!(
            printed("a and b or !c; x <= y == true;"),
            vec!["(; (or (and a b) (! c)))", "(; (== (<= x y) true))"]
        );
    }

    #[test]
    fn test_parser_03_for_desugars_to_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (print i) (; (= i (+ i 1.0)))))"]
        );

        assert_eq!(printed("for (;;) break;"), vec!["(while true (break))"]);
    }

    #[test]
    fn test_parser_04_functions_and_classes() {
        let source = r#"
            fun add(a, b) { return a + b; }
            class B < A {
                init(x) { this.x = x; }
                go() { return super.go(); }
            }
        "#;

        assert_eq!(
            printed(source),
            vec![
                "(fun add (a b) (return (+ a b)))",
                "(class B < A (method init (x) (; (= (. this x) x))) \
                 (method go () (return (call (super go)))))",
            ]
        );
    }

    #[test]
    fn test_parser_05_anonymous_function() {
        assert_eq!(
            printed("var f = fun (n) { return n; }; fun (x) {};"),
            vec!["(var f (fun (n) (return n)))", "(; (fun (x)))"]
        );
    }

    #[test]
    fn test_parser_06_loop_control_and_blocks() {
        assert_eq!(
            printed("while (true) { continue; } var x; { x = nil; }"),
            vec![
                "(while true (block (continue)))",
                "(var x)",
                "(block (; (= x nil)))",
            ]
        );
    }

    #[test]
    fn test_parser_07_single_expression() {
        let (tokens, _) = rox::scan("\"hi\" + (1 == 1)");
        let expr = Parser::new(&tokens).parse_expression().expect("expression");

        assert_eq!(AstPrinter::print(&expr), "(+ hi (group (== 1.0 1.0)))");

        let (tokens, _) = rox::scan("1 2");
        let err = Parser::new(&tokens).parse_expression().unwrap_err();

        assert_eq!(err.to_string(), "[line 1] Error at '2': Expected end of expression");
    }

    #[test]
    fn test_parser_08_reports_every_error() {
        assert_eq!(
            parse_errors("var = 1;\nprint ;\nprint 1"),
            vec![
                "[line 1] Error at '=': Expected variable name",
                "[line 2] Error at ';': Expected expression",
                "[line 3] Error at end: Expected ';' after value",
            ]
        );
    }

    #[test]
    fn test_parser_09_invalid_assignment_target() {
        assert_eq!(
            parse_errors("1 = 2;"),
            vec!["[line 1] Error at '=': Invalid assignment target"]
        );
    }

    #[test]
    fn test_parser_10_references_get_distinct_ids() {
        let statements = parse("a; a;").expect("parse");

        let ids: Vec<_> = statements
            .iter()
            .map(|stmt| match stmt {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected statement {:?}", other),
            })
            .collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }
}
