//! Dispatch engine: one consumption loop over the update queue, routing each update through the
//! registry of its kind. Also owns the lifecycle (hooks, graceful shutdown).

use dbot_core::{
    classify, CallbackQuery, ChatMemberUpdated, DbotError, ExecutionMode, Message, Poll,
    PollAnswer, Result, Storage, Update, UpdateKind, User,
};
use handler_chain::{Context, Handler, Middleware, MiddlewareStage, Registry};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::api::BotApi;
use crate::config::{DispatcherConfig, PollingConfig, WebhookConfig};
use crate::lifecycle::{Lifecycle, LifecycleContext, Phase};
use crate::polling::Poller;
use crate::queue::{QueueClosed, UpdateQueue};
use crate::webhook;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShutdownState {
    Running,
    Stopping,
    Stopped,
}

/// Build it, register handlers and middleware, wrap it in an [`Arc`] and call
/// [`Dispatcher::start_polling`] or [`Dispatcher::start_webhook`].
pub struct Dispatcher {
    api: Arc<dyn BotApi>,
    storage: Arc<dyn Storage>,
    registries: [Registry; 7],
    mode: ExecutionMode,
    queue: Arc<UpdateQueue>,
    lifecycle: Lifecycle,
    shutdown: watch::Sender<ShutdownState>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn BotApi>, storage: Arc<dyn Storage>, config: DispatcherConfig) -> Self {
        Self {
            api,
            storage,
            registries: UpdateKind::ALL.map(Registry::new),
            mode: config.mode,
            queue: Arc::new(UpdateQueue::new(config.queue_capacity)),
            lifecycle: Lifecycle::default(),
            shutdown: watch::Sender::new(ShutdownState::Running),
        }
    }

    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.api
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn queue(&self) -> &Arc<UpdateQueue> {
        &self.queue
    }

    pub fn registry(&self, kind: UpdateKind) -> &Registry {
        &self.registries[kind.index()]
    }

    /// Raw registry access. Handlers registered here are type-checked on dispatch only.
    pub fn registry_mut(&mut self, kind: UpdateKind) -> &mut Registry {
        &mut self.registries[kind.index()]
    }

    pub fn register_message_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<Message> + 'static,
    {
        self.registry_mut(UpdateKind::Message)
            .register::<Message, H>(handler);
        self
    }

    pub fn register_callback_query_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<CallbackQuery> + 'static,
    {
        self.registry_mut(UpdateKind::CallbackQuery)
            .register::<CallbackQuery, H>(handler);
        self
    }

    pub fn register_channel_post_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<Message> + 'static,
    {
        self.registry_mut(UpdateKind::ChannelPost)
            .register::<Message, H>(handler);
        self
    }

    pub fn register_poll_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<Poll> + 'static,
    {
        self.registry_mut(UpdateKind::Poll).register::<Poll, H>(handler);
        self
    }

    pub fn register_poll_answer_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<PollAnswer> + 'static,
    {
        self.registry_mut(UpdateKind::PollAnswer)
            .register::<PollAnswer, H>(handler);
        self
    }

    pub fn register_chat_member_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<ChatMemberUpdated> + 'static,
    {
        self.registry_mut(UpdateKind::ChatMember)
            .register::<ChatMemberUpdated, H>(handler);
        self
    }

    pub fn register_my_chat_member_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Handler<ChatMemberUpdated> + 'static,
    {
        self.registry_mut(UpdateKind::MyChatMember)
            .register::<ChatMemberUpdated, H>(handler);
        self
    }

    /// Adds `middleware` to `stage` of every registry.
    pub fn add_global_middleware(
        &mut self,
        stage: MiddlewareStage,
        middleware: Arc<dyn Middleware>,
    ) -> &mut Self {
        for registry in &mut self.registries {
            registry.add_middleware(stage, middleware.clone());
        }
        self
    }

    pub fn on_startup<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.lifecycle.on_startup(hook);
        self
    }

    pub fn on_shutdown<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.lifecycle.on_shutdown(hook);
        self
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_context(&self) -> LifecycleContext {
        LifecycleContext {
            api: self.api.clone(),
            storage: self.storage.clone(),
        }
    }

    /// Enqueues an update as an ingestion adapter would.
    pub async fn feed_update(&self, update: Update) -> std::result::Result<(), QueueClosed> {
        self.queue.sender().send(update).await
    }

    /// Classifies one update and runs the pipeline of its kind.
    ///
    /// Only [`DbotError::UnsupportedUpdateKind`] and [`DbotError::CallbackTypeMismatch`] come
    /// back from here; middleware and handler failures are contained by the pipeline.
    pub async fn process_update(&self, update: Update) -> Result<()> {
        let update = Arc::new(update);
        let payload = classify(&update)?;
        let ctx = Context::new(update.clone(), self.storage.clone());
        self.registries[payload.kind().index()]
            .run_pipeline(payload, &ctx, self.mode)
            .await
    }

    /// Consumes the queue until it is closed and drained.
    ///
    /// Stops at the first error from [`Dispatcher::process_update`] and returns it; the
    /// remaining queued updates are left undispatched.
    #[instrument(skip(self), fields(mode = %self.mode))]
    pub async fn handle_updates(&self) -> Result<()> {
        info!("Dispatch loop started");
        while let Some(update) = self.queue.recv().await {
            let update_id = update.update_id;
            debug!(update_id, "step: update dequeued");
            if let Err(e) = self.process_update(update).await {
                error!(update_id, error = %e, "Dispatch loop stopped");
                return Err(e);
            }
        }
        info!("Update queue closed, dispatch loop stopped");
        Ok(())
    }

    /// Deletes the registered webhook. With `check`, asks the remote first and only deletes
    /// when a webhook url is set.
    pub async fn reset_webhook(&self, check: bool) -> Result<()> {
        if check {
            let info = self.api.get_webhook_info().await?;
            if info.url.is_empty() {
                debug!("No webhook registered");
                return Ok(());
            }
            info!(url = %info.url, pending = info.pending_update_count, "Deleting webhook");
        }
        self.api.delete_webhook(false).await?;
        info!("Webhook deleted");
        Ok(())
    }

    /// Calls `getMe` and logs who the bot is.
    pub async fn welcome(&self) -> Result<User> {
        let me = self.api.get_me().await?;
        info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or(""),
            name = %me.first_name,
            "Bot connected"
        );
        Ok(me)
    }

    pub async fn start_up(&self) {
        self.lifecycle
            .run(Phase::Startup, &self.lifecycle_context(), self.mode)
            .await;
    }

    pub async fn shutdown(&self) {
        self.lifecycle
            .run(Phase::Shutdown, &self.lifecycle_context(), self.mode)
            .await;
    }

    /// Graceful shutdown without exiting: delete the webhook (if any), clear the store, close the
    /// queue, run the shutdown hooks. Remote and store failures are logged and do not stop the
    /// remaining steps.
    ///
    /// Runs once; a second call waits for the first to finish.
    pub async fn shutdown_dispatcher(&self) {
        let first = self.shutdown.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Stopping;
                true
            } else {
                false
            }
        });
        if !first {
            self.wait_for_shutdown().await;
            return;
        }
        info!("step: graceful shutdown started");
        if let Err(e) = self.reset_webhook(true).await {
            warn!(error = %e, "Webhook reset failed during shutdown");
        }
        if let Err(e) = self.storage.clear().await {
            warn!(error = %e, "Store clear failed during shutdown");
        }
        self.queue.close();
        self.shutdown().await;
        self.shutdown.send_replace(ShutdownState::Stopped);
        info!("step: graceful shutdown finished");
    }

    /// Returns once no graceful shutdown is in progress.
    async fn wait_for_shutdown(&self) {
        let mut state = self.shutdown.subscribe();
        // The sender lives in `self`; the wait cannot fail.
        state
            .wait_for(|s| *s != ShutdownState::Stopping)
            .await
            .ok();
    }

    /// Startup steps that only log on failure: greet and, for polling, drop a registered webhook.
    async fn greet(&self, reset_webhook: bool) {
        if let Err(e) = self.welcome().await {
            warn!(error = %e, "getMe failed, continuing");
        }
        if reset_webhook {
            if let Err(e) = self.reset_webhook(true).await {
                warn!(error = %e, "Webhook reset failed, continuing");
            }
        }
    }

    /// On Ctrl-C: [`Dispatcher::shutdown_dispatcher`], then exit the process.
    fn spawn_safe_exit(self: &Arc<Self>) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for interrupt signal");
                return;
            }
            info!("Interrupt received");
            dispatcher.shutdown_dispatcher().await;
            std::process::exit(0);
        });
    }

    /// Runs the polling adapter and the dispatch loop until the queue is closed or the loop
    /// hits a fatal error. When the queue was closed by [`Dispatcher::shutdown_dispatcher`],
    /// returns only after the shutdown hooks have finished.
    pub async fn start_polling(self: Arc<Self>, config: PollingConfig) -> Result<()> {
        config.validate()?;
        self.greet(config.reset_webhook).await;

        let (skip_updates, safe_exit) = (config.skip_updates, config.safe_exit);
        let mut poller = Poller::new(self.api.clone(), config);
        if skip_updates {
            poller.skip_pending().await?;
        }
        if safe_exit {
            self.spawn_safe_exit();
        }

        self.start_up().await;
        let polling = tokio::spawn(poller.run(self.queue.sender()));
        let result = self.handle_updates().await;
        polling.abort();
        self.wait_for_shutdown().await;
        result
    }

    /// Serves the webhook route and runs the dispatch loop until the queue is closed, the loop
    /// hits a fatal error, or the server fails. Binds the address, then registers `config.url`
    /// with the remote when set. Shutdown is awaited as in [`Dispatcher::start_polling`].
    pub async fn start_webhook(self: Arc<Self>, config: WebhookConfig) -> Result<()> {
        config.validate()?;
        self.greet(false).await;

        let listener = TcpListener::bind(config.address).await?;
        if let Some(url) = &config.url {
            self.api
                .set_webhook(url, &UpdateKind::allowed_updates())
                .await?;
            info!(url = %url, "Webhook registered");
        }
        let router = webhook::build_router(&config.path, self.queue.sender());
        if config.safe_exit {
            self.spawn_safe_exit();
        }

        self.start_up().await;
        info!(address = %config.address, path = %config.path, "Webhook server listening");
        let result = tokio::select! {
            result = self.handle_updates() => result,
            served = axum::serve(listener, router).into_future() => served.map_err(DbotError::Io),
        };
        self.wait_for_shutdown().await;
        result
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registries", &self.registries)
            .field("mode", &self.mode)
            .field("queue", &self.queue)
            .field("lifecycle", &self.lifecycle)
            .field("shutdown", &*self.shutdown.borrow())
            .finish_non_exhaustive()
    }
}
