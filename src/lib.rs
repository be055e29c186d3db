//! Rox: a tree‑walking interpreter for the Lox language.
//!
//! The pipeline is scanner → parser → resolver → interpreter.  Each static
//! phase collects every error it finds; a later phase only runs when the
//! earlier ones were clean.

pub mod ast;
pub mod ast_printer;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod value;

use log::info;

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// Tokenize `source`.  Scanning never stops early: every token that could
/// be recognised is returned next to every lexical error.
pub fn scan(source: &str) -> (Vec<Token<'_>>, Vec<LoxError>) {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut errors: Vec<LoxError> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => errors.push(e),
        }
    }

    (tokens, errors)
}

/// Run a complete program against `interpreter`.
///
/// Lexical and syntax errors are reported together, then resolution errors;
/// nothing executes unless all of them were clean.  A runtime error stops
/// execution and is returned as [`LoxError::Runtime`].  The interpreter keeps
/// its globals and resolved bindings afterwards, so a REPL can feed it line
/// after line.
pub fn run_source(source: &str, interpreter: &mut Interpreter) -> Result<(), Vec<LoxError>> {
    info!("Running source ({} bytes)", source.len());

    let (tokens, mut errors) = scan(source);

    let statements = match Parser::new(&tokens).parse() {
        Ok(statements) if errors.is_empty() => statements,
        Ok(_) => return Err(errors),
        Err(parse_errors) => {
            errors.extend(parse_errors);
            return Err(errors);
        }
    };

    let locals = Resolver::new().resolve(&statements)?;

    interpreter.resolve(locals);

    interpreter
        .interpret(&statements)
        .map_err(|e| vec![LoxError::Runtime(e)])
}
