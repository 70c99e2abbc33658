//! Stock middleware for handler-chain registries.

mod logging_auth;

#[cfg(test)]
mod test;

pub use logging_auth::{AuthMiddleware, LoggingMiddleware};
