//! Parent‑linked scope frames.
//!
//! A frame is shared by every closure and bound method that captured it, so it
//! lives behind `Rc<RefCell<_>>` and is dropped once the last holder is gone.
//! Execution is single threaded; `RefCell` borrows never overlap because each
//! operation borrows one frame at a time while walking the chain.

use crate::error::RuntimeError;
use crate::value::Value;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Handle to a frame that may be captured by closures.
pub type SharedEnv = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<SharedEnv>,
}

impl Environment {
    /// A root frame (the globals).
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: SharedEnv) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Wrap a fresh child of `enclosing` in a shared handle.
    pub fn child_of(enclosing: &SharedEnv) -> SharedEnv {
        debug!("Creating child scope frame");

        Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            enclosing,
        ))))
    }

    pub fn into_shared(self) -> SharedEnv {
        Rc::new(RefCell::new(self))
    }

    /// Inserts or overwrites `name` in this frame only.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// `true` if this frame itself (not an ancestor) binds `name`.
    pub fn defines(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(RuntimeError::undefined_variable(name, line))
        }
    }

    /// Mutates the nearest frame that already binds `name`; never creates one.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(RuntimeError::undefined_variable(name, line))
        }
    }

    /// Walk exactly `distance` parent links from `env`.
    pub fn ancestor(env: &SharedEnv, distance: usize) -> Option<SharedEnv> {
        let mut frame: SharedEnv = Rc::clone(env);

        for _ in 0..distance {
            let parent = frame.borrow().enclosing.clone()?;
            frame = parent;
        }

        Some(frame)
    }

    /// Local‑only read in the frame `distance` hops out.
    ///
    /// The resolver guarantees the binding exists; a miss means the AST and the
    /// frame chain disagree and is reported as an undefined variable.
    pub fn get_at(
        env: &SharedEnv,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        debug!("get_at distance={} name={}", distance, name);

        let frame =
            Self::ancestor(env, distance).ok_or_else(|| RuntimeError::undefined_variable(name, line))?;
        let value = frame.borrow().values.get(name).cloned();

        value.ok_or_else(|| RuntimeError::undefined_variable(name, line))
    }

    /// Local‑only write (a `define`) in the frame `distance` hops out.
    pub fn assign_at(
        env: &SharedEnv,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<(), RuntimeError> {
        debug!("assign_at distance={} name={}", distance, name);

        let frame =
            Self::ancestor(env, distance).ok_or_else(|| RuntimeError::undefined_variable(name, line))?;

        frame.borrow_mut().define(name, value);

        Ok(())
    }
}
