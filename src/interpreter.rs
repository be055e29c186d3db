//! Tree‑walking evaluator.
//!
//! Statements produce a [`Flow`] instead of unwinding: `return`, `break` and
//! `continue` travel back up through blocks and loops as ordinary values
//! until the construct that owns them consumes them.  Runtime errors travel
//! the same way through `Result` and stop the program at the top level.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use chrono::Utc;
use log::{debug, info, warn};

use crate::ast::{
    BinaryOp, Expr, ExprId, FunctionDecl, Ident, LiteralValue, LogicalOp, LoopControl, Stmt,
    UnaryOp,
};
use crate::callable::{
    Callable, Instance, LoxClass, LoxFunction, NativeFn, NativeFunction, INITIALIZER,
};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::resolver::Locals;
use crate::value::Value;

/// Deepest call nesting a program may reach before `StackOverflow`.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f` with at least [`RED_ZONE`] bytes of stack, switching to a fresh
/// heap segment when the current one runs low.
#[inline]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Ran to the end; continue with the next statement.
    Completed,
    /// A `return` is unwinding toward the nearest call boundary.
    Returned(Value),
    /// A `break` is unwinding toward the nearest loop.
    Broke,
    /// A `continue` is unwinding toward the nearest loop.
    Continued,
}

pub struct Interpreter {
    globals: EnvRef,
    /// Frame the next statement runs in.
    environment: EnvRef,
    /// Resolver output: hops from the use site to the declaring frame.
    locals: Locals,
    /// Lox calls currently in progress.
    call_depth: usize,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout, with `clock` defined.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new().into_ref();

        let mut interpreter = Self {
            environment: Rc::clone(&globals),
            globals,
            locals: Locals::new(),
            call_depth: 0,
            out,
        };

        debug!("Defining native function 'clock'");

        interpreter.define_native("clock", 0, |_args: &[Value]| {
            let now = Utc::now();
            Ok(Value::Number(now.timestamp_micros() as f64 / 1_000_000.0))
        });

        interpreter
    }

    /// Register a host function as a global.
    pub fn define_native(&mut self, name: &str, arity: usize, func: NativeFn) {
        let native = NativeFunction {
            name: name.to_string(),
            arity,
            func,
        };

        self.globals
            .borrow_mut()
            .define(name, Value::Callable(Callable::Native(Rc::new(native))));
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Merge a resolver table.
    ///
    /// Entries are never evicted: a closure created on one REPL line may run
    /// on any later line and still needs its bindings, so the table grows by
    /// one entry per resolved local reference for the life of the session.
    pub fn resolve(&mut self, locals: Locals) {
        debug!("Recording {} resolved local(s)", locals.len());
        self.locals.extend(locals);
    }

    /// Execute a resolved program.  The first runtime error stops it.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Completed => {}
                // The resolver rejects these; tolerate them rather than abort.
                escaped => warn!("Control signal escaped to top level: {:?}", escaped),
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ── statements ──────────────────────────────────────────────────────

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr)?;
                debug!("print {:?}", value);
                writeln!(self.out, "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}' = {:?}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let environment = Environment::with_enclosing(Rc::clone(&self.environment));
                return self.execute_block(statements, environment.into_ref());
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While {
                condition,
                body,
                increment,
            } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Broke => break,
                        returned @ Flow::Returned(_) => return Ok(returned),
                        Flow::Completed | Flow::Continued => {}
                    }

                    if let Some(increment) = increment {
                        self.execute(increment)?;
                    }
                }
            }

            Stmt::LoopControl { kind, .. } => {
                return Ok(match kind {
                    LoopControl::Break => Flow::Broke,
                    LoopControl::Continue => Flow::Continued,
                });
            }

            Stmt::Function(decl) => {
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                if let Some(name) = &decl.name {
                    debug!("Defining function '{}'", name.lexeme);

                    self.environment.borrow_mut().define(
                        &name.lexeme,
                        Value::Callable(Callable::Function(Rc::new(function))),
                    );
                }
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                return Ok(Flow::Returned(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.class_declaration(name, superclass.as_ref(), methods)?,
        }

        Ok(Flow::Completed)
    }

    /// Run `statements` with `environment` as the current frame.  The
    /// previous frame is restored on every exit path, errors included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> Result<Flow, RuntimeError> {
        let previous: EnvRef = mem::replace(&mut self.environment, environment);

        let result = self.execute_sequence(statements);

        self.environment = previous;

        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Completed => {}
                signal => return Ok(signal),
            }
        }

        Ok(Flow::Completed)
    }

    fn class_declaration(
        &mut self,
        name: &Ident,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), RuntimeError> {
        debug!("Declaring class '{}'", name.lexeme);

        let superclass: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Callable(Callable::Class(class)) => Some(class),
                _ => {
                    let line: usize = match expr {
                        Expr::Variable { name: superclass, .. } => superclass.line,
                        _ => name.line,
                    };
                    return Err(RuntimeError::type_error(line, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Nil);

        // Methods close over a frame holding `super` when there is one.
        let method_closure: EnvRef = match &superclass {
            Some(superclass) => {
                let mut environment = Environment::with_enclosing(Rc::clone(&self.environment));
                environment.define(
                    "super",
                    Value::Callable(Callable::Class(Rc::clone(superclass))),
                );
                environment.into_ref()
            }
            None => Rc::clone(&self.environment),
        };

        let mut table: HashMap<String, Rc<LoxFunction>> = HashMap::with_capacity(methods.len());

        for method in methods {
            let Some(method_name) = &method.name else {
                continue;
            };

            let function = LoxFunction::new(
                Rc::clone(method),
                Rc::clone(&method_closure),
                method_name.lexeme == INITIALIZER,
            );

            table.insert(method_name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass::new(name.lexeme.clone(), table, superclass);

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Callable(Callable::Class(Rc::new(class))),
            name.line,
        )
    }

    // ── expressions ─────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),
                LiteralValue::Str(s) => Value::String(s.clone()),
                LiteralValue::True => Value::Bool(true),
                LiteralValue::False => Value::Bool(false),
                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary {
                operator,
                line,
                right,
            } => {
                let right: Value = self.evaluate(right)?;

                match operator {
                    UnaryOp::Negate => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::type_error(*line, "Operand must be a number.")),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                line,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(*operator, *line, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuits: bool = match operator {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };

                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => {
                        self.globals
                            .borrow_mut()
                            .assign(&name.lexeme, value.clone(), name.line)?
                    }
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren_line,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(RuntimeError::NotCallable { line: *paren_line });
                };

                if args.len() != callable.arity() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: callable.arity(),
                        got: args.len(),
                        line: *paren_line,
                    });
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    warn!("Call depth limit of {} reached", MAX_CALL_DEPTH);
                    return Err(RuntimeError::StackOverflow {
                        depth: MAX_CALL_DEPTH,
                        line: *paren_line,
                    });
                }

                self.call_depth += 1;
                let result = callable.call(self, args, *paren_line);
                self.call_depth -= 1;

                result
            }

            Expr::AnonymousFunction(decl) => {
                let function =
                    LoxFunction::new(Rc::clone(decl), Rc::clone(&self.environment), false);

                Ok(Value::Callable(Callable::Function(Rc::new(function))))
            }

            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, name),
                _ => Err(RuntimeError::NotAnInstance { line: name.line }),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::NoFields { line: name.line });
                };

                let value: Value = self.evaluate(value)?;

                instance.borrow_mut().set(&name.lexeme, value.clone());

                Ok(value)
            }

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),

            Expr::Super {
                id,
                keyword,
                method,
            } => self.super_method(*id, keyword, method),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Ident) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    /// `super.method`: the superclass sits `distance` frames up and the
    /// receiver one frame closer.
    fn super_method(
        &self,
        id: ExprId,
        keyword: &Ident,
        method: &Ident,
    ) -> Result<Value, RuntimeError> {
        let distance: usize = *self.locals.get(&id).ok_or_else(|| {
            RuntimeError::UndefinedVariable {
                name: keyword.lexeme.clone(),
                line: keyword.line,
            }
        })?;

        let superclass: Value =
            Environment::get_at(&self.environment, distance, "super", keyword.line)?;
        let receiver: Value = Environment::get_at(
            &self.environment,
            distance.saturating_sub(1),
            "this",
            keyword.line,
        )?;

        let (Value::Callable(Callable::Class(superclass)), Value::Instance(receiver)) =
            (superclass, receiver)
        else {
            return Err(RuntimeError::type_error(
                keyword.line,
                "Can't use 'super' outside of a subclass method.",
            ));
        };

        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Callable(Callable::BoundMethod(Rc::new(
                found.bind(&receiver),
            )))),
            None => Err(RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }),
        }
    }
}

fn binary(operator: BinaryOp, line: usize, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match operator {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(RuntimeError::type_error(
                line,
                "Operands must be two numbers or two strings.",
            )),
        },

        BinaryOp::Subtract => {
            let (a, b) = number_operands(line, &left, &right)?;
            Ok(Value::Number(a - b))
        }

        BinaryOp::Multiply => {
            let (a, b) = number_operands(line, &left, &right)?;
            Ok(Value::Number(a * b))
        }

        BinaryOp::Divide => {
            let (a, b) = number_operands(line, &left, &right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero { line });
            }
            Ok(Value::Number(a / b))
        }

        BinaryOp::Greater => {
            let ordering = compare(line, &left, &right)?;
            Ok(Value::Bool(ordering == Some(Ordering::Greater)))
        }

        BinaryOp::GreaterEqual => {
            let ordering = compare(line, &left, &right)?;
            Ok(Value::Bool(matches!(
                ordering,
                Some(Ordering::Greater | Ordering::Equal)
            )))
        }

        BinaryOp::Less => {
            let ordering = compare(line, &left, &right)?;
            Ok(Value::Bool(ordering == Some(Ordering::Less)))
        }

        BinaryOp::LessEqual => {
            let ordering = compare(line, &left, &right)?;
            Ok(Value::Bool(matches!(
                ordering,
                Some(Ordering::Less | Ordering::Equal)
            )))
        }

        BinaryOp::Equal => Ok(Value::Bool(left == right)),

        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
    }
}

fn number_operands(line: usize, left: &Value, right: &Value) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::type_error(line, "Operands must be numbers.")),
    }
}

/// Ordering between two mutually ordered values.  `None` only for NaN.
fn compare(line: usize, left: &Value, right: &Value) -> Result<Option<Ordering>, RuntimeError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(a.partial_cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Ok(Some(a.cmp(b))),
        _ => Err(RuntimeError::type_error(
            line,
            "Operands must be two numbers, two strings or two booleans.",
        )),
    }
}
