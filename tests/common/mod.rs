//! Helpers shared by the integration suites.
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::LoxError;
use rox::interpreter::Interpreter;

/// An in‑memory `print` sink that stays readable after the interpreter has
/// taken ownership of its writer half.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A fresh interpreter printing into a buffer the test can inspect.
pub fn interpreter() -> (Interpreter, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let interpreter = Interpreter::with_output(Box::new(buffer.clone()));
    (interpreter, buffer)
}

/// Run `source` in a fresh interpreter; returns printed output and outcome.
pub fn run(source: &str) -> (String, Result<(), Vec<LoxError>>) {
    let (mut interpreter, buffer) = interpreter();
    let result = rox::run_source(source, &mut interpreter);
    (buffer.contents(), result)
}

/// Run a program that must succeed; returns what it printed.
pub fn output_of(source: &str) -> String {
    let (output, result) = run(source);
    if let Err(errors) = result {
        let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
        panic!("program failed:\n{}", rendered.join("\n"));
    }
    output
}

/// Run a program that must fail; returns the rendered errors.
pub fn errors_of(source: &str) -> Vec<String> {
    match run(source).1 {
        Ok(()) => panic!("program unexpectedly succeeded"),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    }
}
