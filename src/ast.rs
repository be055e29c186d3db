//! **Abstract syntax tree** shared by the resolver and the interpreter.
//!
//! The node set is closed: both consumers are plain functions matching over
//! [`Expr`] and [`Stmt`].  The tree owns its data (no borrows into the token
//! buffer) so function declarations can be shared with runtime closures via
//! `Rc` and outlive the source they were parsed from.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::token::Token;

static NEXT_EXPR_ID: AtomicUsize = AtomicUsize::new(0);

/// Stable identity of a variable‑reference expression.
///
/// The resolver's distance table is keyed by this id rather than by the
/// node's structure, so two textually identical references resolve
/// independently.  Ids are unique for the whole process, which keeps tables
/// from separate parses (REPL lines) from colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(usize);

impl ExprId {
    /// Allocate a fresh, never‑reused id.
    pub fn fresh() -> Self {
        ExprId(NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// An identifier (or keyword such as `this`) together with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub lexeme: String,
    pub line: usize,
}

impl Ident {
    pub fn new<S: Into<String>>(lexeme: S, line: usize) -> Self {
        Self {
            lexeme: lexeme.into(),
            line,
        }
    }
}

impl From<&Token<'_>> for Ident {
    fn from(token: &Token<'_>) -> Self {
        Ident::new(token.lexeme, token.line)
    }
}

/// A **literal constant** that appears directly in the source code.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// Numeric literal ‑ stored as IEEE‑754 `f64`.
    Number(f64),

    /// String literal without surrounding quotes.
    Str(String),

    True,

    False,

    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Break,
    Continue,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
        })
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        })
    }
}

impl fmt::Display for LoopControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoopControl::Break => "break",
            LoopControl::Continue => "continue",
        })
    }
}

/// Parameters and body of a named function, a method, or an anonymous
/// function expression.  Shared between the AST and every runtime closure
/// built from it.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    /// `None` for anonymous functions.
    pub name: Option<Ident>,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
}

/// **Expression** nodes.  Variants that the resolver binds carry an
/// [`ExprId`].  Nodes are not `Clone`: a copy would share its original's id
/// and with it the original's resolved distance.
#[derive(Debug, PartialEq)]
pub enum Expr {
    /// A literal constant: number, string, `true`, `false`, or `nil`.
    Literal(LiteralValue),

    /// Parenthesised sub‑expression.
    Grouping(Box<Expr>),

    /// *Example:* `!isReady` or `-42`
    Unary {
        operator: UnaryOp,
        line: usize,
        right: Box<Expr>,
    },

    /// *Example:* `a + b`, `x <= y`
    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        line: usize,
        right: Box<Expr>,
    },

    /// Short‑circuiting `and` / `or`.
    Logical {
        left: Box<Expr>,
        operator: LogicalOp,
        right: Box<Expr>,
    },

    /// Variable read.
    Variable { id: ExprId, name: Ident },

    /// `identifier "=" expression`
    Assign {
        id: ExprId,
        name: Ident,
        value: Box<Expr>,
    },

    /// Function‑ or method‑call expression.
    Call {
        callee: Box<Expr>,
        /// Line of the closing `)`, retained for error reporting.
        paren_line: usize,
        arguments: Vec<Expr>,
    },

    /// `fun (a, b) { ... }` used as a value.
    AnonymousFunction(Rc<FunctionDecl>),

    /// object.property
    Get { object: Box<Expr>, name: Ident },

    /// object.property = value
    Set {
        object: Box<Expr>,
        name: Ident,
        value: Box<Expr>,
    },

    /// The `this` keyword inside a method.
    This { id: ExprId, keyword: Ident },

    /// `super.method`
    Super {
        id: ExprId,
        keyword: Ident,
        method: Ident,
    },
}

impl Expr {
    /// Build a variable reference with a fresh identity.
    pub fn variable(name: Ident) -> Self {
        Expr::Variable {
            id: ExprId::fresh(),
            name,
        }
    }
}

/// **Statement** nodes.  A program is a sequence of these.
#[derive(Debug, PartialEq)]
pub enum Stmt {
    /// Stand‑alone expression terminated by a semicolon.
    Expression(Expr),

    Print(Expr),

    /// `"var" IDENT ("=" initializer)? ";"`
    Var {
        name: Ident,
        initializer: Option<Expr>,
    },

    Block(Vec<Stmt>),

    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while` loop.  `increment` runs after every completed or continued
    /// body pass; it is what `for` loops desugar into.
    While {
        condition: Expr,
        body: Box<Stmt>,
        increment: Option<Box<Stmt>>,
    },

    /// `break;` or `continue;`
    LoopControl { keyword: Ident, kind: LoopControl },

    /// Named function declaration.
    Function(Rc<FunctionDecl>),

    Return {
        /// The `return` keyword (for error locations).
        keyword: Ident,
        /// Absent ⇒ `nil` is returned.
        value: Option<Expr>,
    },

    Class {
        name: Ident,
        /// Always an [`Expr::Variable`] when present.
        superclass: Option<Expr>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}
