//! Command dispatch.
//!
//! A [`CommandDispatcher`] owns named handler contexts. Each context maps
//! payload tags to handler closures over some state `S`:
//!
//! ```text
//! CommandDispatcher<S>
//!   ├── "actors"  → { "create-actor" → fn(&mut S, CreateActor), ... }
//!   ├── "users"   → { "user-update"  → fn(&mut S, UserUpdate),  ... }
//!   └── "physics" → { ... }
//! ```
//!
//! Lookup order for a payload: its own `route()` if it names one, else the
//! context the caller passed. A missing context or a missing handler is an
//! error; nothing is dropped silently.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use crate::protocol::{Payload, PayloadType};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler context is registered under this name.
    #[error("No handler context '{context}' for payload '{tag}'")]
    NoHandlerContext { context: String, tag: &'static str },

    /// The context exists but has no handler for this payload.
    #[error("Handler context '{context}' has no handler for payload '{tag}'")]
    NoHandler { context: String, tag: &'static str },

    /// The payload's concrete type does not match the registered handler.
    #[error("Payload '{tag}' does not match its handler's type")]
    PayloadMismatch { tag: &'static str },

    /// The handler ran and refused the command.
    #[error("Handler for '{tag}' failed: {reason}")]
    Rejected { tag: &'static str, reason: String },
}

impl DispatchError {
    pub fn rejected(tag: &'static str, reason: impl Into<String>) -> Self {
        DispatchError::Rejected {
            tag,
            reason: reason.into(),
        }
    }
}

type HandlerFn<S> =
    Box<dyn Fn(&mut S, Box<dyn Payload>) -> Result<(), DispatchError> + Send + Sync>;

/// Called once after a handler returns successfully.
pub type OnComplete<S> = Box<dyn FnOnce(&mut S) + Send>;

// ---------------------------------------------------------------------------
// HandlerContext
// ---------------------------------------------------------------------------

pub struct HandlerContext<S> {
    name: String,
    handlers: HashMap<&'static str, HandlerFn<S>>,
}

impl<S: 'static> HandlerContext<S> {
    fn new(name: String) -> Self {
        Self {
            name,
            handlers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle payloads of type `P` with `f`. Replaces any earlier handler.
    pub fn on<P, F>(&mut self, f: F) -> &mut Self
    where
        P: PayloadType,
        F: Fn(&mut S, P) -> Result<(), DispatchError> + Send + Sync + 'static,
    {
        let handler: HandlerFn<S> = Box::new(move |state, payload| {
            let payload = payload
                .into_any()
                .downcast::<P>()
                .map_err(|_| DispatchError::PayloadMismatch { tag: P::TAG })?;
            f(state, *payload)
        });
        self.handlers.insert(P::TAG, handler);
        self
    }

    pub fn handles(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }
}

// ---------------------------------------------------------------------------
// CommandDispatcher
// ---------------------------------------------------------------------------

pub struct CommandDispatcher<S> {
    contexts: HashMap<String, HandlerContext<S>>,
}

impl<S: 'static> CommandDispatcher<S> {
    pub fn new() -> Self {
        Self {
            contexts: HashMap::new(),
        }
    }

    /// Get or create the handler context `name`.
    pub fn context(&mut self, name: &str) -> &mut HandlerContext<S> {
        self.contexts
            .entry(name.to_string())
            .or_insert_with(|| HandlerContext::new(name.to_string()))
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.contexts.contains_key(name)
    }

    pub fn remove_context(&mut self, name: &str) -> bool {
        self.contexts.remove(name).is_some()
    }

    /// Run the handler for `payload`, then `on_complete`.
    ///
    /// `context` is the default target; a payload that names its own route
    /// is dispatched there instead.
    pub fn execute(
        &self,
        state: &mut S,
        context: &str,
        payload: Box<dyn Payload>,
        on_complete: Option<OnComplete<S>>,
    ) -> Result<(), DispatchError> {
        let tag = payload.tag();
        let target = payload.route().unwrap_or(context).to_string();

        let ctx = self
            .contexts
            .get(&target)
            .ok_or_else(|| DispatchError::NoHandlerContext {
                context: target.clone(),
                tag,
            })?;
        let handler = ctx
            .handlers
            .get(tag)
            .ok_or_else(|| DispatchError::NoHandler {
                context: target.clone(),
                tag,
            })?;

        debug!("Dispatching '{}' to '{}'", tag, target);
        handler(state, payload)?;

        if let Some(done) = on_complete {
            done(state);
        }
        Ok(())
    }
}

impl<S: 'static> Default for CommandDispatcher<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payloads::Trace;
    use crate::protocol::TraceSeverity;

    fn trace(msg: &str) -> Box<dyn Payload> {
        Box::new(Trace {
            severity: TraceSeverity::Info,
            message: msg.into(),
        })
    }

    #[test]
    fn handler_receives_typed_payload() {
        let mut d = CommandDispatcher::<Vec<String>>::new();
        d.context("app").on(|log: &mut Vec<String>, t: Trace| {
            log.push(t.message);
            Ok(())
        });
        let mut log = Vec::new();
        d.execute(&mut log, "app", trace("hi"), None).expect("dispatch");
        assert_eq!(log, vec!["hi".to_string()]);
    }

    #[test]
    fn missing_context_is_an_error() {
        let d = CommandDispatcher::<()>::new();
        let err = d.execute(&mut (), "app", trace("x"), None).unwrap_err();
        assert!(matches!(err, DispatchError::NoHandlerContext { context, .. } if context == "app"));
    }

    #[test]
    fn missing_handler_is_an_error() {
        let mut d = CommandDispatcher::<()>::new();
        d.context("app");
        let err = d.execute(&mut (), "app", trace("x"), None).unwrap_err();
        assert!(matches!(err, DispatchError::NoHandler { tag: "trace", .. }));
    }
}
