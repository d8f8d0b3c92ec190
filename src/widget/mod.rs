//! Widget classes: capability-composed property tables and the built-in HTML set.

pub mod builtin;
pub mod capability;
pub mod class;

pub use capability::{Accessor, Capability};
pub use class::{BindHook, BuildHook, WidgetClass};
