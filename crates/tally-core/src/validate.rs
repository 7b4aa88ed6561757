//! Validation engine
//!
//! A [`Validator`] attaches to a field-value stream and produces one coherent
//! [`ValidationResult`] per value. Synchronous rules are evaluated
//! immediately on every value; asynchronous rules run concurrently and are
//! cancelled the moment a newer value arrives (switch-to-latest), so a result
//! computed from a superseded value can never be observed after a result for
//! a fresher one. Aggregate messages keep rule-array order, synchronous
//! rules first.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::topic::{Topic, TopicSubscriber};

/// Outcome of validating one field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationResult {
    /// Every rule passed
    Valid,
    /// At least one rule failed
    Invalid {
        /// Failure messages, in rule-array order, synchronous rules first
        messages: Vec<String>,
    },
}

impl ValidationResult {
    fn from_messages(messages: Vec<String>) -> Self {
        if messages.is_empty() {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid { messages }
        }
    }

    /// True when every rule passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Failure messages; empty when valid.
    pub fn messages(&self) -> &[String] {
        match self {
            ValidationResult::Valid => &[],
            ValidationResult::Invalid { messages } => messages,
        }
    }
}

/// Pure synchronous rule: a predicate plus its failure message.
pub struct SyncRule<B> {
    check: Arc<dyn Fn(&B) -> bool + Send + Sync>,
    message: String,
}

impl<B> Clone for SyncRule<B> {
    fn clone(&self) -> Self {
        Self {
            check: Arc::clone(&self.check),
            message: self.message.clone(),
        }
    }
}

impl<B> SyncRule<B> {
    /// Rule failing with `message` whenever `check` returns false.
    pub fn new(message: impl Into<String>, check: impl Fn(&B) -> bool + Send + Sync + 'static) -> Self {
        Self {
            check: Arc::new(check),
            message: message.into(),
        }
    }
}

/// Asynchronous rule effect: resolves to a failure message or `None`.
///
/// The engine only governs cancellation, ordering and timeout of these
/// opaque effects; they may call out to external collaborators.
pub struct AsyncRule<B> {
    eval: Arc<dyn Fn(B) -> BoxFuture<'static, Option<String>> + Send + Sync>,
    timeout: Option<Duration>,
}

impl<B> Clone for AsyncRule<B> {
    fn clone(&self) -> Self {
        Self {
            eval: Arc::clone(&self.eval),
            timeout: self.timeout,
        }
    }
}

impl<B> AsyncRule<B> {
    /// Wrap an async effect producing an optional failure message.
    pub fn new<F, Fut>(eval: F) -> Self
    where
        F: Fn(B) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Option<String>> + Send + 'static,
    {
        Self {
            eval: Arc::new(move |value| Box::pin(eval(value))),
            timeout: None,
        }
    }

    /// Override the engine's default timeout for this rule.
    ///
    /// A rule that has not resolved within its timeout is treated as
    /// non-blocking-valid rather than stalling the pipeline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Ordered collection of rules attached to one field.
pub struct RuleSet<B> {
    sync_rules: Vec<SyncRule<B>>,
    async_rules: Vec<AsyncRule<B>>,
}

impl<B> Default for RuleSet<B> {
    fn default() -> Self {
        Self {
            sync_rules: Vec::new(),
            async_rules: Vec::new(),
        }
    }
}

impl<B> Clone for RuleSet<B> {
    fn clone(&self) -> Self {
        Self {
            sync_rules: self.sync_rules.clone(),
            async_rules: self.async_rules.clone(),
        }
    }
}

impl<B> RuleSet<B> {
    /// Empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a synchronous rule.
    pub fn rule(
        mut self,
        message: impl Into<String>,
        check: impl Fn(&B) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.sync_rules.push(SyncRule::new(message, check));
        self
    }

    /// Append an asynchronous rule effect.
    pub fn async_rule(mut self, rule: AsyncRule<B>) -> Self {
        self.async_rules.push(rule);
        self
    }

    /// True when no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.sync_rules.is_empty() && self.async_rules.is_empty()
    }
}

/// Live validation attached to one field-value stream.
pub struct Validator<B> {
    results: Topic<ValidationResult>,
    task: JoinHandle<()>,
    _marker: std::marker::PhantomData<fn() -> B>,
}

impl<B> Validator<B>
where
    B: Clone + PartialEq + Send + Sync + 'static,
{
    /// Attach rules to a field-value stream.
    ///
    /// The stream's replayed value is validated immediately, so the first
    /// aggregate appears without waiting for an edit.
    pub fn attach(
        mut values: TopicSubscriber<B>,
        rules: RuleSet<B>,
        config: &EngineConfig,
    ) -> Self {
        let results = Topic::new(config.channel_capacity);
        let published = results.clone();
        let default_timeout = config.rule_timeout();

        let task = tokio::spawn(async move {
            let mut pending: Option<B> = None;
            loop {
                let value = match pending.take() {
                    Some(v) => v,
                    None => match values.recv().await {
                        Some(v) => v,
                        None => break,
                    },
                };

                let sync_messages: Vec<String> = rules
                    .sync_rules
                    .iter()
                    .filter(|rule| !(rule.check)(&value))
                    .map(|rule| rule.message.clone())
                    .collect();

                let interim = ValidationResult::from_messages(sync_messages.clone());
                published.publish(interim.clone());

                if rules.async_rules.is_empty() {
                    continue;
                }

                let evaluation = eval_async_rules(&rules.async_rules, value, default_timeout);
                tokio::select! {
                    next = values.recv() => match next {
                        // A newer value supersedes this one; the in-flight
                        // evaluation is dropped with the future.
                        Some(v) => pending = Some(v),
                        None => break,
                    },
                    async_messages = evaluation => {
                        let mut all = sync_messages;
                        all.extend(async_messages.into_iter().flatten());
                        let full = ValidationResult::from_messages(all);
                        if full != interim {
                            published.publish(full);
                        }
                    }
                }
            }
            tracing::debug!("validator stream ended");
        });

        Self {
            results,
            task,
            _marker: std::marker::PhantomData,
        }
    }

    /// Subscribe to aggregate results; the latest is replayed first.
    pub fn errors(&self) -> TopicSubscriber<ValidationResult> {
        self.results.subscribe()
    }

    /// Latest aggregate result, if one has been computed.
    pub fn latest(&self) -> Option<ValidationResult> {
        self.results.latest()
    }

    /// Stop validating.
    pub fn detach(&self) {
        self.task.abort();
    }
}

impl<B> Drop for Validator<B> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run every async rule concurrently, preserving rule-array order in the
/// returned messages.
fn eval_async_rules<B: Clone + Send + 'static>(
    rules: &[AsyncRule<B>],
    value: B,
    default_timeout: Duration,
) -> impl std::future::Future<Output = Vec<Option<String>>> {
    let evaluations: Vec<_> = rules
        .iter()
        .map(|rule| {
            let fut = (rule.eval)(value.clone());
            let timeout = rule.timeout.unwrap_or(default_timeout);
            async move {
                match tokio::time::timeout(timeout, fut).await {
                    Ok(message) => message,
                    Err(_) => {
                        tracing::debug!("async rule timed out, treating as non-blocking-valid");
                        None
                    }
                }
            }
        })
        .collect();
    join_all(evaluations)
}
