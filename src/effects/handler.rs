//! Effect handlers keyed by effect kind.

use crate::core::{Effect as EffectDescriptor, Event};
use crate::error::StatechartError;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use stillwater::effect::{BoxedEffect, Effect};

/// Errors that can occur while carrying out effects
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("No handler registered for effect '{kind}'")]
    NoHandler { kind: String },

    #[error("Effect handler failed: {0}")]
    HandlerFailed(String),

    #[error(transparent)]
    Statechart(#[from] StatechartError),

    #[error("Effects did not settle after {rounds} rounds")]
    DidNotSettle { rounds: usize },
}

/// Type alias for effect handler functions.
/// Each call builds a fresh effect producing the events to feed back.
pub type EffectHandler<Env> =
    Arc<dyn Fn(&EffectDescriptor) -> BoxedEffect<Vec<Event>, EffectError, Env> + Send + Sync>;

/// Registry mapping effect kinds to handlers.
pub struct EffectHandlers<Env> {
    handlers: HashMap<String, EffectHandler<Env>>,
    ignored: HashSet<String>,
}

impl<Env: Clone + Send + Sync + 'static> EffectHandlers<Env> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            ignored: HashSet::new(),
        }
    }

    /// Handle effects of `kind` with `handler`, replacing any previous one.
    pub fn register<F>(mut self, kind: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EffectDescriptor) -> BoxedEffect<Vec<Event>, EffectError, Env>
            + Send
            + Sync
            + 'static,
    {
        let kind = kind.into();
        self.ignored.remove(&kind);
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Drop effects of `kind` without running anything.
    pub fn ignore(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        self.handlers.remove(&kind);
        self.ignored.insert(kind);
        self
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind) || self.ignored.contains(kind)
    }

    /// Run the handler for `effect` and return the events it produced.
    pub async fn run(&self, effect: &EffectDescriptor, env: &Env) -> Result<Vec<Event>, EffectError> {
        let kind = effect.kind();
        if self.ignored.contains(kind) {
            tracing::trace!(kind, "ignoring effect");
            return Ok(Vec::new());
        }

        let handler = self
            .handlers
            .get(kind)
            .ok_or_else(|| EffectError::NoHandler {
                kind: kind.to_string(),
            })?;

        (handler)(effect).run(env).await
    }
}

impl<Env: Clone + Send + Sync + 'static> Default for EffectHandlers<Env> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Env> Clone for EffectHandlers<Env> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            ignored: self.ignored.clone(),
        }
    }
}

impl<Env> fmt::Debug for EffectHandlers<Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.handlers.keys().collect();
        kinds.sort();
        let mut ignored: Vec<&String> = self.ignored.iter().collect();
        ignored.sort();
        f.debug_struct("EffectHandlers")
            .field("handlers", &kinds)
            .field("ignored", &ignored)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stillwater::prelude::*;

    #[derive(Clone)]
    struct Mailer {
        accepted: bool,
    }

    fn notify() -> EffectDescriptor {
        EffectDescriptor::Custom {
            kind: "notify".to_string(),
            params: json!({ "to": "ops" }),
        }
    }

    #[tokio::test]
    async fn registered_handler_produces_events() {
        let handlers = EffectHandlers::<Mailer>::new().register("notify", |effect: &EffectDescriptor| {
            let EffectDescriptor::Custom { params, .. } = effect else {
                return fail(EffectError::HandlerFailed("unexpected effect".to_string())).boxed();
            };
            let to = params["to"].clone();
            from_fn(move |env: &Mailer| {
                if env.accepted {
                    Ok(vec![Event::new("SENT").with_data(to.clone())])
                } else {
                    Err(EffectError::HandlerFailed("rejected".to_string()))
                }
            })
            .boxed()
        });

        let events = handlers
            .run(&notify(), &Mailer { accepted: true })
            .await
            .unwrap();
        assert_eq!(events, vec![Event::new("SENT").with_data(json!("ops"))]);

        let err = handlers
            .run(&notify(), &Mailer { accepted: false })
            .await
            .unwrap_err();
        assert!(matches!(err, EffectError::HandlerFailed(message) if message == "rejected"));
    }

    #[tokio::test]
    async fn unknown_kind_has_no_handler() {
        let handlers = EffectHandlers::<Mailer>::new();
        let err = handlers
            .run(&notify(), &Mailer { accepted: true })
            .await
            .unwrap_err();
        assert!(matches!(err, EffectError::NoHandler { kind } if kind == "notify"));
    }

    #[tokio::test]
    async fn ignored_kind_yields_nothing() {
        let handlers = EffectHandlers::<Mailer>::new()
            .register("notify", |_: &EffectDescriptor| pure(vec![Event::new("SENT")]).boxed())
            .ignore("notify");

        assert!(handlers.handles("notify"));
        let events = handlers
            .run(&notify(), &Mailer { accepted: true })
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
