//! Template parsing: HTML-like markup into a reusable [`Template`] tree.

pub mod ast;
pub mod entities;
pub mod parser;

pub use ast::{Template, TemplateNode};
pub use parser::{parse, parse_limited, parse_with, MAX_DEPTH};
