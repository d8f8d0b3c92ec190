//! Sandboxed expression evaluator: tokenizer, parser, values, interpreter.
//!
//! Expressions are a small, closed subset of Python used by templates for
//! `{{ }}` substitution and `flare-if` / `flare-for` directives. Compile once
//! with [`SafeEval::compile`], then [`SafeEval::execute`] against any number
//! of environments.

pub mod ast;
pub mod builtins;
pub mod cache;
pub mod parser;
pub mod safe_eval;
pub mod tokenizer;
pub mod value;

pub use cache::{CachedEval, ExpressionEvaluator};
pub use safe_eval::{Callable, CompiledExpr, SafeEval, Source};
pub use value::{Env, Value};

use thiserror::Error;

/// Errors raised while compiling or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("expression exceeds limits: {length} chars (max {max_length}), {brackets} brackets (max {max_brackets})")]
    LimitExceeded {
        length: usize,
        max_length: usize,
        brackets: usize,
        max_brackets: usize,
    },
    #[error("expression nests {depth} levels deep (max {max_depth})")]
    TooDeep { depth: usize, max_depth: usize },
    #[error("call to '{0}' is not allowed")]
    NameNotAllowed(String),
    #[error("unsupported syntax: {0}")]
    UnsupportedSyntax(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("division by zero")]
    ZeroDivision,
    #[error("value error: {0}")]
    Value(String),
    #[error("integer overflow in {0}")]
    Overflow(String),
    #[error("error in call to '{name}': {message}")]
    Call { name: String, message: String },
}
