//! Handler callbacks and their type-erased registry entries.

use crate::context::Context;
use async_trait::async_trait;
use std::any::{type_name, Any};
use std::future::Future;
use std::sync::Arc;

pub type HandlerResult = anyhow::Result<()>;

/// Callback for one payload type. Errors are logged by the pipeline and never stop dispatch.
///
/// Implemented for any `Fn(T, Context) -> impl Future<Output = HandlerResult>`.
#[async_trait]
pub trait Handler<T>: Send + Sync {
    async fn handle(&self, payload: T, ctx: Context) -> HandlerResult;
}

#[async_trait]
impl<T, F, Fut> Handler<T> for F
where
    T: Send + 'static,
    F: Fn(T, Context) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, payload: T, ctx: Context) -> HandlerResult {
        (self)(payload, ctx).await
    }
}

/// Synchronous predicate deciding whether a handler wants a payload.
pub type Filter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Handler and filter for one concrete payload type; what an entry binds to.
pub(crate) struct TypedHandler<T> {
    pub(crate) handler: Arc<dyn Handler<T>>,
    pub(crate) filter: Option<Filter<T>>,
}

/// A registered callback, stored without its payload type.
///
/// The payload type is only checked when the owning registry binds the entry during dispatch,
/// so an entry registered on the wrong registry is reported there as a type mismatch.
#[derive(Clone)]
pub struct HandlerEntry {
    payload_type: &'static str,
    handler_name: &'static str,
    has_filter: bool,
    callback: Arc<dyn Any + Send + Sync>,
}

impl HandlerEntry {
    pub fn new<T, H>(handler: H, filter: Option<Filter<T>>) -> Self
    where
        T: Send + 'static,
        H: Handler<T> + 'static,
    {
        Self {
            payload_type: type_name::<T>(),
            handler_name: type_name::<H>(),
            has_filter: filter.is_some(),
            callback: Arc::new(TypedHandler {
                handler: Arc::new(handler) as Arc<dyn Handler<T>>,
                filter,
            }),
        }
    }

    /// Type name of the payload the callback accepts.
    pub fn payload_type(&self) -> &'static str {
        self.payload_type
    }

    pub fn handler_name(&self) -> &'static str {
        self.handler_name
    }

    pub fn has_filter(&self) -> bool {
        self.has_filter
    }

    /// Binds the entry to payload type `T`; `None` if the callback takes something else.
    pub(crate) fn bind<T: 'static>(&self) -> Option<&TypedHandler<T>> {
        self.callback.downcast_ref::<TypedHandler<T>>()
    }
}

impl std::fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("payload_type", &self.payload_type)
            .field("handler_name", &self.handler_name)
            .field("has_filter", &self.has_filter)
            .finish()
    }
}
