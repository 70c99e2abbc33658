//! Per-kind handler registry and its three-stage middleware pipeline.

use crate::context::Context;
use crate::handler::{Filter, Handler, HandlerEntry};
use crate::middleware::{Middleware, MiddlewareStage};
use dbot_core::{
    CallbackQuery, ChatMemberUpdated, DbotError, ExecutionMode, Message, Poll, PollAnswer, Result,
    UpdateKind, UpdatePayload,
};
use std::any::type_name;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Handlers and middleware for one [`UpdateKind`].
///
/// Entries are appended in registration order and never removed.
pub struct Registry {
    kind: UpdateKind,
    handlers: Vec<HandlerEntry>,
    pre: Vec<Arc<dyn Middleware>>,
    process: Vec<Arc<dyn Middleware>>,
    post: Vec<Arc<dyn Middleware>>,
}

impl Registry {
    pub fn new(kind: UpdateKind) -> Self {
        Self {
            kind,
            handlers: Vec::new(),
            pre: Vec::new(),
            process: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    /// Appends a handler taking payload `T`.
    ///
    /// `T` is not checked against the registry kind here; a mismatch surfaces as
    /// [`DbotError::CallbackTypeMismatch`] on the first dispatch to this registry.
    pub fn register<T, H>(&mut self, handler: H) -> &mut Self
    where
        T: Send + 'static,
        H: Handler<T> + 'static,
    {
        self.push_entry(HandlerEntry::new(handler, None))
    }

    /// Appends a handler that only runs for payloads accepted by `filter`.
    pub fn register_with_filter<T, H, F>(&mut self, handler: H, filter: F) -> &mut Self
    where
        T: Send + 'static,
        H: Handler<T> + 'static,
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let filter: Filter<T> = Arc::new(filter);
        self.push_entry(HandlerEntry::new(handler, Some(filter)))
    }

    pub fn push_entry(&mut self, entry: HandlerEntry) -> &mut Self {
        debug!(
            kind = %self.kind,
            handler = entry.handler_name(),
            payload_type = entry.payload_type(),
            position = self.handlers.len(),
            "Handler registered"
        );
        self.handlers.push(entry);
        self
    }

    /// Registered entries in registration order.
    pub fn handlers(&self) -> &[HandlerEntry] {
        &self.handlers
    }

    pub fn add_middleware(&mut self, stage: MiddlewareStage, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.stage_mut(stage).push(middleware);
        self
    }

    pub fn middleware(&self, stage: MiddlewareStage) -> &[Arc<dyn Middleware>] {
        match stage {
            MiddlewareStage::Pre => &self.pre,
            MiddlewareStage::Process => &self.process,
            MiddlewareStage::Post => &self.post,
        }
    }

    fn stage_mut(&mut self, stage: MiddlewareStage) -> &mut Vec<Arc<dyn Middleware>> {
        match stage {
            MiddlewareStage::Pre => &mut self.pre,
            MiddlewareStage::Process => &mut self.process,
            MiddlewareStage::Post => &mut self.post,
        }
    }

    /// Runs the middleware of one stage in order; the first error ends the stage.
    pub async fn trigger_middleware(&self, stage: MiddlewareStage, ctx: &Context) -> Result<()> {
        for mw in self.middleware(stage) {
            debug!(
                update_id = ctx.update_id(),
                stage = %stage,
                middleware = mw.name(),
                "step: middleware"
            );
            mw.call(stage, ctx).await?;
        }
        Ok(())
    }

    /// Runs the pipeline for one classified update.
    ///
    /// Every entry is bound to the registry's payload type first; any mismatch fails the whole
    /// call before middleware or handlers run. Then: `Pre` once (failure logged, pipeline
    /// continues), per handler `Process` (failure skips that handler only), filter, handler
    /// call (awaited or spawned per `mode`), and finally `Post` once.
    #[instrument(skip_all, fields(kind = %self.kind, update_id = ctx.update_id()))]
    pub async fn run_pipeline(
        &self,
        payload: UpdatePayload<'_>,
        ctx: &Context,
        mode: ExecutionMode,
    ) -> Result<()> {
        debug_assert_eq!(payload.kind(), self.kind, "payload routed to wrong registry");
        match payload {
            UpdatePayload::Message(p) | UpdatePayload::ChannelPost(p) => {
                self.run_typed::<Message>(p, ctx, mode).await
            }
            UpdatePayload::CallbackQuery(p) => self.run_typed::<CallbackQuery>(p, ctx, mode).await,
            UpdatePayload::Poll(p) => self.run_typed::<Poll>(p, ctx, mode).await,
            UpdatePayload::PollAnswer(p) => self.run_typed::<PollAnswer>(p, ctx, mode).await,
            UpdatePayload::ChatMember(p) | UpdatePayload::MyChatMember(p) => {
                self.run_typed::<ChatMemberUpdated>(p, ctx, mode).await
            }
        }
    }

    async fn run_typed<T>(&self, payload: &T, ctx: &Context, mode: ExecutionMode) -> Result<()>
    where
        T: Clone + Send + Sync + 'static,
    {
        let update_id = ctx.update_id();
        let bound = self
            .handlers
            .iter()
            .map(|entry| {
                entry
                    .bind::<T>()
                    .map(|typed| (entry, typed))
                    .ok_or(DbotError::CallbackTypeMismatch {
                        kind: self.kind,
                        expected: type_name::<T>(),
                        actual: entry.payload_type(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            update_id,
            kind = %self.kind,
            handlers = bound.len(),
            "step: pipeline started"
        );

        if let Err(e) = self.trigger_middleware(MiddlewareStage::Pre, ctx).await {
            warn!(update_id, kind = %self.kind, error = %e, "step: pre middleware failed, continuing");
        }

        for (entry, typed) in bound {
            let handler_name = entry.handler_name();

            if let Err(e) = self.trigger_middleware(MiddlewareStage::Process, ctx).await {
                warn!(
                    update_id,
                    handler = handler_name,
                    error = %e,
                    "step: process middleware failed, handler skipped"
                );
                continue;
            }

            if let Some(filter) = &typed.filter {
                if !filter(payload) {
                    debug!(update_id, handler = handler_name, "step: handler filtered out");
                    continue;
                }
            }

            let handler = typed.handler.clone();
            let payload = payload.clone();
            let ctx = ctx.clone();
            match mode {
                ExecutionMode::Synchronous => {
                    debug!(update_id, handler = handler_name, "step: handler processing");
                    if let Err(e) = handler.handle(payload, ctx).await {
                        error!(update_id, handler = handler_name, error = %e, "Handler failed");
                    }
                }
                ExecutionMode::Asynchronous => {
                    debug!(update_id, handler = handler_name, "step: handler spawned");
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(payload, ctx).await {
                            error!(update_id, handler = handler_name, error = %e, "Handler failed");
                        }
                    });
                }
            }
        }

        if let Err(e) = self.trigger_middleware(MiddlewareStage::Post, ctx).await {
            warn!(update_id, kind = %self.kind, error = %e, "step: post middleware failed");
        }

        info!(update_id, kind = %self.kind, "step: pipeline finished");
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("handlers", &self.handlers)
            .field("pre", &self.pre.len())
            .field("process", &self.process.len())
            .field("post", &self.post.len())
            .finish()
    }
}
