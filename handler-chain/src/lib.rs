//! # Handler chain
//!
//! One [`Registry`] per update kind: an ordered list of typed handlers wrapped by three middleware
//! stages. `Pre` runs once before the handlers, `Process` once per handler (a failure skips only
//! that handler), `Post` once after all of them. Handlers receive a [`Context`] carrying the update,
//! its conversation identity and the state store.

mod context;
mod handler;
mod middleware;
mod registry;

pub use context::Context;
pub use handler::{Filter, Handler, HandlerEntry, HandlerResult};
pub use middleware::{Middleware, MiddlewareStage};
pub use registry::Registry;

// Integration tests live in tests/registry_test.rs
