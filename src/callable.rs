//! Runtime object model: natives, user functions, classes and instances.
//!
//! Everything invocable is one of the closed set of [`Callable`] variants.
//! Method lookup follows the single‑inheritance chain: the instance's own
//! class first, then each superclass in turn; the first match wins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::{FunctionDecl, Ident};
use crate::environment::{EnvRef, Environment};
use crate::error::RuntimeError;
use crate::interpreter::{Flow, Interpreter};
use crate::value::Value;

/// Name of the method implicitly run on construction.
pub const INITIALIZER: &str = "init";

/// Host function signature.  An `Err` becomes [`RuntimeError::Native`].
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// Shared handle to an instance; instances are mutated through fields.
pub type InstanceRef = Rc<RefCell<Instance>>;

/// A host‑provided function with a fixed arity.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: NativeFn,
}

/// A user function closed over the environment it was declared in.
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// `None` for anonymous functions.
    pub fn name(&self) -> Option<&str> {
        self.declaration.name.as_ref().map(|n| n.lexeme.as_str())
    }

    pub fn is_initializer(&self) -> bool {
        self.is_initializer
    }

    /// A copy of this method whose closure gains a frame binding `this`.
    /// The original declaration and closure are left untouched.
    pub fn bind(&self, instance: &InstanceRef) -> LoxFunction {
        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));
        environment.define("this", Value::Instance(Rc::clone(instance)));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: environment.into_ref(),
            is_initializer: self.is_initializer,
        }
    }

    /// Run the body in a fresh frame holding the parameters.  The caller has
    /// already checked the argument count.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!(
            "Calling function '{}' with {} argument(s)",
            self.name().unwrap_or("anonymous"),
            arguments.len()
        );

        let mut environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        let flow: Flow = interpreter.execute_block(&self.declaration.body, environment.into_ref())?;

        // Initializers always hand back the receiver, whatever they returned.
        if self.is_initializer {
            let line: usize = self.declaration.name.as_ref().map_or(0, |n| n.line);
            return Environment::get_at(&self.closure, 0, "this", line);
        }

        match flow {
            Flow::Returned(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }
}

/// A class value: its own methods plus an optional superclass.
pub struct LoxClass {
    name: String,
    methods: HashMap<String, Rc<LoxFunction>>,
    superclass: Option<Rc<LoxClass>>,
}

impl LoxClass {
    pub fn new(
        name: String,
        methods: HashMap<String, Rc<LoxFunction>>,
        superclass: Option<Rc<LoxClass>>,
    ) -> Self {
        Self {
            name,
            methods,
            superclass,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> Option<&Rc<LoxClass>> {
        self.superclass.as_ref()
    }

    /// Search this class, then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// The initializer's arity, or zero without one.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER).map_or(0, |init| init.arity())
    }

    /// Build a new instance and run its initializer, if any.
    pub fn instantiate(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!("Instantiating class '{}'", class.name);

        let instance: InstanceRef = Rc::new(RefCell::new(Instance::new(Rc::clone(class))));

        if let Some(init) = class.find_method(INITIALIZER) {
            init.bind(&instance).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl fmt::Display for LoxClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

/// An object.  Fields spring into existence on first assignment.
pub struct Instance {
    class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<LoxClass> {
        &self.class
    }

    /// Property read: a field if one is set, otherwise a method bound to
    /// `this` instance.
    pub fn get(this: &InstanceRef, name: &Ident) -> Result<Value, RuntimeError> {
        if let Some(value) = this.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method: Option<Rc<LoxFunction>> = this.borrow().class.find_method(&name.lexeme);

        match method {
            Some(method) => Ok(Value::Callable(Callable::BoundMethod(Rc::new(
                method.bind(this),
            )))),
            None => Err(RuntimeError::UndefinedProperty {
                name: name.lexeme.clone(),
                line: name.line,
            }),
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

/// Everything that can appear in call position.
#[derive(Clone)]
pub enum Callable {
    Native(Rc<NativeFunction>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    /// A method already bound to its receiver.
    BoundMethod(Rc<LoxFunction>),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Native(native) => native.arity,
            Callable::Function(function) | Callable::BoundMethod(function) => function.arity(),
            Callable::Class(class) => class.arity(),
        }
    }

    /// Invoke with already‑evaluated arguments.  The argument count must
    /// match [`arity`](Self::arity); `line` locates native failures.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                (native.func)(&arguments).map_err(|message| RuntimeError::Native { message, line })
            }

            Callable::Function(function) | Callable::BoundMethod(function) => {
                function.call(interpreter, arguments)
            }

            Callable::Class(class) => LoxClass::instantiate(class, interpreter, arguments),
        }
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => Rc::ptr_eq(a, b),
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::BoundMethod(a), Callable::BoundMethod(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
            Callable::Function(function) | Callable::BoundMethod(function) => {
                match function.name() {
                    Some(name) => write!(f, "<fn {}>", name),
                    None => write!(f, "<fn anonymous>"),
                }
            }
            Callable::Class(class) => write!(f, "{}", class),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
