#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "!= == <= >= ! = < >",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL, "="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "while (x) { break; continue; } classy class",
            &[
                (TokenType::WHILE, "while"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::BREAK, "break"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::CLASS, "class"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_comments_are_skipped() {
        let source = "1 // line comment\n/* block\n comment */ 2";
        let tokens: Vec<_> = Scanner::new(source).filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        // the block comment spans a newline
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_05_literal_display() {
        let tokens: Vec<String> = Scanner::new("42 3.25 \"hi\" nil")
            .filter_map(Result::ok)
            .map(|t| t.to_string())
            .collect();

        assert_eq!(
            tokens,
            vec![
                "NUMBER 42 42.0",
                "NUMBER 3.25 3.25",
                "STRING \"hi\" hi",
                "NIL nil null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_06_unterminated_string() {
        let results: Vec<_> = Scanner::new("\"open\nstill open").collect();

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(errors, vec!["[line 2] Error: Unterminated string."]);
    }

    #[test]
    fn test_scanner_07_unterminated_block_comment() {
        let results: Vec<_> = Scanner::new("/* never closed").collect();

        assert!(results.iter().any(|r| matches!(
            r,
            Err(e) if e.to_string().contains("Unterminated block comment.")
        )));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let messages: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            messages,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );

        // Helper function
        fn assert_token_matches(
            result: &rox::error::Result<Token>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_scanner_08_is_fused_after_eof() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
