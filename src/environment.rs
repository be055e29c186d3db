//! Lexical scope frames.
//!
//! Frames are shared (`Rc<RefCell<_>>`): a child holds its parent, and every
//! closure holds the frame it was created in, so a frame lives exactly as long
//! as the longest of those holders.

use crate::error::RuntimeError;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Shared handle to a scope frame.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: EnvRef) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a frame into a shared handle.
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Insert or overwrite a binding in this frame only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Dynamic lookup walking outward; used for unresolved (global) names.
    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Overwrite the nearest existing binding.  Never creates one.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
        }
    }

    /// Walk exactly `distance` parent links from `env`.
    pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
        let mut current: EnvRef = Rc::clone(env);

        for _ in 0..distance {
            let next: EnvRef = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read a resolved binding `distance` frames up.
    pub fn get_at(
        env: &EnvRef,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        debug!("get_at distance={} name={}", distance, name);

        Environment::ancestor(env, distance)
            .and_then(|frame| {
                let value = frame.borrow().values.get(name).cloned();
                value
            })
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })
    }

    /// Write a resolved binding `distance` frames up.
    pub fn assign_at(
        env: &EnvRef,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        debug!("assign_at distance={} name={}", distance, name);

        let frame: EnvRef =
            Environment::ancestor(env, distance).ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
                line,
            })?;

        frame.borrow_mut().values.insert(name.to_string(), value);

        Ok(())
    }
}
