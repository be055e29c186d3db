//! Static resolver pass for the **Rox** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<&str,bool>` tracking declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer, misplaced
//!    `return`, `this`, `super`, `break` or `continue`, self‑inheritance).
//! 3. Record, for *each* local variable occurrence, how many frames separate
//!    it from its declaration.  Occurrences found in no scope get no entry and
//!    are looked up as globals at runtime.
//!
//! Errors are collected, not thrown: one pass reports every problem, and the
//! caller must not execute a program that produced any.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::ast::{Expr, ExprId, FunctionDecl, Ident, LoopControl, Stmt};
use crate::callable::INITIALIZER;
use crate::error::LoxError;

/// Distance table: hops from each resolved reference to its binding frame.
pub type Locals = HashMap<ExprId, usize>;

/// What kind of function body we are inside.  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body we are inside.  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<&'a str, bool>>, // false=declared, true=defined
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
    /// Loops enclosing the current point within the current function body.
    loop_depth: usize,
    errors: Vec<LoxError>,
}

impl<'a> Default for Resolver<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        info!("Resolver instantiated");

        Resolver {
            scopes: Vec::new(),
            locals: Locals::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Walk all top‑level statements, returning the distance table or every
    /// error found.
    pub fn resolve(mut self, statements: &'a [Stmt]) -> Result<Locals, Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        if self.errors.is_empty() {
            info!("Resolve pass finished: {} local(s)", self.locals.len());
            Ok(self.locals)
        } else {
            info!("Resolve pass finished with {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    /// Resolve a lone expression, as evaluated by the `evaluate` subcommand.
    pub fn resolve_expression(mut self, expr: &'a Expr) -> Result<Locals, Vec<LoxError>> {
        self.resolve_expr(expr);

        if self.errors.is_empty() {
            Ok(self.locals)
        } else {
            Err(self.errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.resolve_class(name, superclass.as_ref(), methods),

            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s);
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define
                self.declare(name);
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }
                self.define(name);
            }

            Stmt::Function(decl) => {
                // the name is visible inside its own body
                if let Some(name) = &decl.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(decl, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                self.resolve_expr(condition);

                self.loop_depth += 1;
                self.resolve_stmt(body);
                if let Some(increment) = increment.as_deref() {
                    self.resolve_stmt(increment);
                }
                self.loop_depth -= 1;
            }

            Stmt::LoopControl { keyword, kind } => {
                if self.loop_depth == 0 {
                    let word: &str = match kind {
                        LoopControl::Break => "break",
                        LoopControl::Continue => "continue",
                    };
                    self.error(keyword, format!("Can't use '{}' outside of a loop.", word));
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }
                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }
                    self.resolve_expr(expr);
                }
            }
        }
    }

    fn resolve_class(
        &mut self,
        name: &'a Ident,
        superclass: Option<&'a Expr>,
        methods: &'a [Rc<FunctionDecl>],
    ) {
        let enclosing_class = self.current_class;
        self.current_class = ClassType::Class;

        self.declare(name);
        self.define(name);

        if let Some(superclass) = superclass {
            if let Expr::Variable {
                name: superclass_name,
                ..
            } = superclass
            {
                if superclass_name.lexeme == name.lexeme {
                    self.error(superclass_name, "A class can't inherit from itself.");
                }
            }

            self.current_class = ClassType::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.bind_implicit("super");
        }

        self.begin_scope();
        self.bind_implicit("this");

        for method in methods {
            let kind = match &method.name {
                Some(method_name) if method_name.lexeme == INITIALIZER => {
                    FunctionType::Initializer
                }
                _ => FunctionType::Method,
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => self.resolve_expr(inner),

            Expr::Unary { right, .. } => self.resolve_expr(right),

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                // Cannot read in own initializer
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme.as_str()) == Some(&false) {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Assign { id, name, value } => {
                // First resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, &name.lexeme);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::AnonymousFunction(decl) => self.resolve_function(decl, FunctionType::Function),

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(*id, &keyword.lexeme);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassType::None => {
                        self.error(keyword, "Can't use 'super' outside of a class.");
                    }
                    ClassType::Class => {
                        self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    }
                    ClassType::Subclass => {}
                }
                self.resolve_local(*id, &keyword.lexeme);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function’s parameters + body.  Loops outside
    /// the function do not count for `break`/`continue` inside it.
    fn resolve_function(&mut self, decl: &'a FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loops = self.loop_depth;
        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for stmt in &decl.body {
            self.resolve_stmt(stmt);
        }
        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loops;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &'a Ident) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(name.lexeme.as_str()) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(&name.lexeme, false);
    }

    fn define(&mut self, name: &'a Ident) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(&name.lexeme, true);
        }
    }

    /// Bind `this` or `super` in the innermost scope.
    fn bind_implicit(&mut self, keyword: &'static str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(keyword, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it unrecorded
    /// (global) if no scope declares it.
    fn resolve_local(&mut self, id: ExprId, name: &str) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name) {
                debug!("Resolved '{}' at depth {}", name, depth);
                self.locals.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name);
    }

    fn error<S: Into<String>>(&mut self, at: &Ident, msg: S) {
        self.errors.push(LoxError::resolve(at.line, &at.lexeme, msg));
    }
}
