//! Startup and shutdown hooks.

use dbot_core::{ExecutionMode, Storage};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::api::BotApi;

type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type Hook = Arc<dyn Fn(LifecycleContext) -> HookFuture + Send + Sync>;

/// Handed to every hook.
#[derive(Clone)]
pub struct LifecycleContext {
    pub api: Arc<dyn BotApi>,
    pub storage: Arc<dyn Storage>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Startup,
    Shutdown,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Startup => "startup",
            Phase::Shutdown => "shutdown",
        }
    }
}

/// Ordered, append-only hook lists; one entry per registered callback.
#[derive(Default)]
pub struct Lifecycle {
    startup: Vec<Hook>,
    shutdown: Vec<Hook>,
}

fn boxed<F, Fut>(hook: F) -> Hook
where
    F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx: LifecycleContext| -> HookFuture { Box::pin(hook(ctx)) })
}

impl Lifecycle {
    pub fn on_startup<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.startup.push(boxed(hook));
        self
    }

    pub fn on_shutdown<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(LifecycleContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.shutdown.push(boxed(hook));
        self
    }

    pub fn startup_len(&self) -> usize {
        self.startup.len()
    }

    pub fn shutdown_len(&self) -> usize {
        self.shutdown.len()
    }

    /// Runs every hook of `phase` in registration order: awaited one by one in synchronous
    /// mode, spawned in asynchronous mode. A failing hook is logged; the rest still run.
    ///
    /// Spawned startup hooks are left running. Spawned shutdown hooks are joined before this
    /// returns, so the process never exits under them.
    pub(crate) async fn run(&self, phase: Phase, ctx: &LifecycleContext, mode: ExecutionMode) {
        let hooks = match phase {
            Phase::Startup => &self.startup,
            Phase::Shutdown => &self.shutdown,
        };
        let mut spawned = JoinSet::new();
        for (index, hook) in hooks.iter().enumerate() {
            debug!(phase = phase.as_str(), index, "step: lifecycle hook");
            let fut = hook(ctx.clone());
            match mode {
                ExecutionMode::Synchronous => report(phase, index, fut.await),
                ExecutionMode::Asynchronous => {
                    spawned.spawn(async move { report(phase, index, fut.await) });
                }
            }
        }
        match phase {
            Phase::Startup => spawned.detach_all(),
            Phase::Shutdown => {
                while let Some(joined) = spawned.join_next().await {
                    if let Err(e) = joined {
                        error!(phase = phase.as_str(), error = %e, "Lifecycle hook panicked");
                    }
                }
            }
        }
    }
}

fn report(phase: Phase, index: usize, result: anyhow::Result<()>) {
    if let Err(e) = result {
        error!(phase = phase.as_str(), index, error = %e, "Lifecycle hook failed");
    }
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("startup", &self.startup.len())
            .field("shutdown", &self.shutdown.len())
            .finish()
    }
}
