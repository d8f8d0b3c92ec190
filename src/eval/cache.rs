//! Pluggable evaluation for the renderer, plus a compile cache.
//!
//! Templates evaluate the same handful of expressions over and over (every
//! `flare-for` iteration re-runs the child expressions), so the default
//! evaluator keeps compiled expressions keyed by source text.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::safe_eval::{CompiledExpr, SafeEval};
use super::value::{Env, Value};
use super::EvalError;

/// Anything that can turn expression source plus an environment into a value.
pub trait ExpressionEvaluator {
    fn evaluate(&self, source: &str, env: &Env) -> Result<Value, EvalError>;
}

impl ExpressionEvaluator for SafeEval {
    fn evaluate(&self, source: &str, env: &Env) -> Result<Value, EvalError> {
        self.safe_eval(source, env)
    }
}

// ---------------------------------------------------------------------------
// CachedEval
// ---------------------------------------------------------------------------

/// Maximum cached expressions before the cache is flushed.
const CACHE_CAPACITY: usize = 1024;

/// [`SafeEval`] with a per-source compile cache.
///
/// Compile failures are not cached; they are re-reported on every call.
#[derive(Debug, Default)]
pub struct CachedEval {
    inner: SafeEval,
    compiled: RefCell<HashMap<String, Rc<CompiledExpr>>>,
}

impl CachedEval {
    pub fn new(inner: SafeEval) -> Self {
        Self {
            inner,
            compiled: RefCell::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &SafeEval {
        &self.inner
    }

    /// Compile `source`, or return the cached compilation.
    pub fn compile(&self, source: &str) -> Result<Rc<CompiledExpr>, EvalError> {
        if let Some(hit) = self.compiled.borrow().get(source) {
            return Ok(Rc::clone(hit));
        }
        let compiled = Rc::new(self.inner.compile(source)?);
        let mut cache = self.compiled.borrow_mut();
        if cache.len() >= CACHE_CAPACITY {
            log::debug!("expression cache full ({CACHE_CAPACITY}), flushing");
            cache.clear();
        }
        cache.insert(source.to_owned(), Rc::clone(&compiled));
        Ok(compiled)
    }

    /// Number of cached expressions.
    pub fn len(&self) -> usize {
        self.compiled.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.compiled.borrow_mut().clear();
    }
}

impl From<SafeEval> for CachedEval {
    fn from(inner: SafeEval) -> Self {
        Self::new(inner)
    }
}

impl ExpressionEvaluator for CachedEval {
    fn evaluate(&self, source: &str, env: &Env) -> Result<Value, EvalError> {
        let compiled = self.compile(source)?;
        self.inner.execute(compiled.as_ref(), env)
    }
}
