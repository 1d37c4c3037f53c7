//! Before/after extension points of the verb pipelines.
//!
//! A [`Hook`] is an async function registered on a [`Schema`](crate::schema::Schema). It
//! receives a clone of the pipeline's current value and resolves to one of:
//!
//! - `Ok(Some(replacement))`: the pipeline continues with `replacement`,
//! - `Ok(None)`: the pipeline continues with its current value,
//! - `Err(error)`: the pipeline stops and `error` is returned to the caller.
//!
//! Hooks are resolved into one slot per verb and phase when the schema is built, so a
//! verb never has to look a hook up by name.

use std::{fmt, future::Future, sync::Arc};

use bson::Uuid;
use futures::future::BoxFuture;
use log::warn;

use crate::{
    envelope::ResultEnvelope,
    error::ActionResult,
    options::QueryOptions,
    record::{Changes, Record},
};

/// Future returned by a hook.
pub type HookFuture<O> = BoxFuture<'static, ActionResult<Option<O>>>;

/// An async extension function taking `I` and optionally replacing a value of type `O`.
pub struct Hook<I, O = I> {
    handler: Arc<dyn Fn(I) -> HookFuture<O> + Send + Sync>,
}

/// Hook run around `put` and `patch`, receiving the record and the requested changes.
pub type UpdateHook = Hook<(Record, Changes), Record>;

/// Hook run before an id lookup. It can only abort.
pub type LookupHook = Hook<Uuid, ()>;

/// Hook run after a list read, receiving the options used and the assembled envelope.
pub type ListHook = Hook<(QueryOptions, ResultEnvelope), ResultEnvelope>;

impl<I: 'static, O: 'static> Hook<I, O> {
    /// Wraps an async function as a hook.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let hook = Hook::new(|mut record: Record| async move {
    ///     record.set(&doc! { "slug": "generated" });
    ///     Ok(Some(record))
    /// });
    /// ```
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult<Option<O>>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |input| -> HookFuture<O> { Box::pin(handler(input)) }),
        }
    }
}

impl<I, O> Hook<I, O> {
    fn call(&self, input: I) -> HookFuture<O> {
        (self.handler)(input)
    }
}

impl<I, O> Clone for Hook<I, O> {
    fn clone(&self) -> Self {
        Self { handler: Arc::clone(&self.handler) }
    }
}

impl<I, O> fmt::Debug for Hook<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

/// Runs an optional hook.
///
/// Without a hook `current` is returned untouched and `input` is never built.
pub(crate) async fn invoke<I, O>(
    hook: Option<&Hook<I, O>>,
    current: O,
    input: impl FnOnce(&O) -> I,
) -> ActionResult<O> {
    let Some(hook) = hook else {
        return Ok(current);
    };

    let replacement = hook
        .call(input(&current))
        .await
        .inspect_err(|err| warn!("Hook aborted the pipeline: {}", err))?;

    Ok(replacement.unwrap_or(current))
}

/// How a hook was registered. A hook registered under the verb's own name wins over one
/// registered under a shared alias, whatever the registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Priority {
    Specific,
    Alias,
}

/// One resolved extension point.
#[derive(Debug, Clone)]
pub(crate) struct Slot<H> {
    entry: Option<(Priority, H)>,
}

impl<H> Default for Slot<H> {
    fn default() -> Self {
        Self { entry: None }
    }
}

impl<H> Slot<H> {
    pub(crate) fn offer(&mut self, priority: Priority, hook: H) {
        let outranked = matches!(&self.entry, Some((current, _)) if *current < priority);
        if !outranked {
            self.entry = Some((priority, hook));
        }
    }

    pub(crate) fn get(&self) -> Option<&H> {
        self.entry.as_ref().map(|(_, hook)| hook)
    }
}

/// Every extension point of a schema.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModelHooks {
    pub(crate) before_post: Slot<Hook<Record>>,
    pub(crate) after_post: Slot<Hook<Record>>,
    pub(crate) before_put: Slot<UpdateHook>,
    pub(crate) after_put: Slot<UpdateHook>,
    pub(crate) before_patch: Slot<UpdateHook>,
    pub(crate) after_patch: Slot<UpdateHook>,
    pub(crate) before_delete: Slot<Hook<Record>>,
    pub(crate) after_delete: Slot<Hook<Record>>,
    pub(crate) before_get_by_id: Slot<LookupHook>,
    pub(crate) after_get_by_id: Slot<Hook<Record>>,
    pub(crate) before_get: Slot<Hook<QueryOptions>>,
    pub(crate) after_get: Slot<ListHook>,
}
