//! Middleware for logging and optional auth (allowlist).

use async_trait::async_trait;
use dbot_core::{HandlerError, Result};
use handler_chain::{Context, Middleware, MiddlewareStage};
use std::collections::HashSet;
use tracing::{debug, error, info, instrument};

/// Logs the update on `Pre`, each gated handler on `Process`, completion on `Post`; never fails.
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    #[instrument(skip(self, ctx))]
    async fn call(&self, stage: MiddlewareStage, ctx: &Context) -> Result<()> {
        let identity = ctx.identity();
        match stage {
            MiddlewareStage::Pre => info!(
                update_id = ctx.update_id(),
                chat_id = identity.map(|i| i.chat_id),
                user_id = identity.map(|i| i.user_id),
                "Received update"
            ),
            MiddlewareStage::Process => debug!(update_id = ctx.update_id(), "Running handler"),
            MiddlewareStage::Post => debug!(update_id = ctx.update_id(), "Processed update"),
        }
        Ok(())
    }
}

/// Rejects updates whose sender is not in the allowlist.
///
/// Register on [`MiddlewareStage::Process`]: a `Pre` failure is only logged and does not stop
/// handlers. Updates without a conversation identity (polls) are rejected.
pub struct AuthMiddleware {
    allowed_users: HashSet<i64>,
}

impl AuthMiddleware {
    /// Creates a middleware that allows only the given user ids.
    pub fn new(allowed_users: impl IntoIterator<Item = i64>) -> Self {
        Self {
            allowed_users: allowed_users.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    #[instrument(skip(self, ctx))]
    async fn call(&self, _stage: MiddlewareStage, ctx: &Context) -> Result<()> {
        match ctx.identity() {
            Some(identity) if self.allowed_users.contains(&identity.user_id) => {
                debug!(user_id = identity.user_id, "User authorized");
                Ok(())
            }
            identity => {
                error!(
                    update_id = ctx.update_id(),
                    user_id = identity.map(|i| i.user_id),
                    "Unauthorized access attempt"
                );
                Err(HandlerError::Unauthorized.into())
            }
        }
    }
}
