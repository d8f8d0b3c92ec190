//! Widget tree: slotmap-backed arena, host bridge, queries and HTML output.

pub mod host;
pub mod node;
pub mod query;
pub mod serialize;
pub mod tree;

pub use host::{HeadlessHost, Host, HostOp};
pub use node::{NodeData, NodeId, NodeKind};
pub use tree::Dom;

use thiserror::Error;

/// Errors from tree manipulation and property access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("{child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("{0:?} is a text node")]
    NotAnElement(NodeId),
    #[error("'{name}' is no valid attribute for <{tag}>")]
    UnknownAttribute { tag: String, name: String },
    #[error("invalid value for '{name}': {message}")]
    InvalidValue { name: String, message: String },
    #[error("callback already registered for '{event}'")]
    DuplicateListener { event: String },
    #[error("no such listener registered for '{event}'")]
    ListenerNotFound { event: String },
    #[error("cannot insert {child:?} into its own subtree at {parent:?}")]
    CycleDetected { parent: NodeId, child: NodeId },
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
}
