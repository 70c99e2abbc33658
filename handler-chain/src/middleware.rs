use crate::context::Context;
use async_trait::async_trait;
use dbot_core::Result;
use std::fmt;

/// Pipeline position of a middleware.
///
/// `Pre` runs once before any handler of the registry, `Process` once per handler and gates it,
/// `Post` once after the handler loop, whatever happened in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MiddlewareStage {
    Pre,
    Process,
    Post,
}

impl MiddlewareStage {
    pub const ALL: [MiddlewareStage; 3] = [
        MiddlewareStage::Pre,
        MiddlewareStage::Process,
        MiddlewareStage::Post,
    ];
}

impl fmt::Display for MiddlewareStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareStage::Pre => f.write_str("pre"),
            MiddlewareStage::Process => f.write_str("process"),
            MiddlewareStage::Post => f.write_str("post"),
        }
    }
}

/// Cross-cutting hook around handlers. Returning an error fails the stage it runs in.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, stage: MiddlewareStage, ctx: &Context) -> Result<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
