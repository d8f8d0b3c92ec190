//! Headless testing helpers: Fixture, snapshot helpers.
//!
//! Use the [`Fixture`] to render templates into a headless [`Dom`](crate::dom::Dom)
//! and poke at the result through its bindings. Use [`render_to_html`] and
//! related helpers to capture rendered trees as HTML strings for
//! snapshot-style assertions.

pub mod fixture;
pub mod snapshot;

pub use fixture::Fixture;
pub use snapshot::{nodes_to_html, render_to_html};

/// Route `log` output through `env_logger` for the current test binary.
/// Safe to call from every test.
#[cfg(test)]
pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
