//! The saga dispatcher: correlates each message with a saga instance,
//! creates instances when allowed, and invokes the saga's handler.

use std::sync::Arc;

use common::{CorrelationKey, InstanceId};
use saga_store::{Revision, SagaData, SagaStore};

use crate::config::{DispatcherConfig, DuplicatePolicy};
use crate::context::SagaContext;
use crate::correlation::{CorrelationRegistry, CorrelationRule};
use crate::error::{DispatchError, Result};
use crate::handler::{HandlerResolver, ResolvedHandler};
use crate::message::Message;
use crate::observer::SagaObserver;
use crate::saga::{Saga, SagaConfig};

/// How a dispatched message was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new instance was created and stored.
    Created { instance_id: InstanceId },
    /// The message was handled by an existing instance.
    Correlated { instance_id: InstanceId },
    /// No instance matched and the message may not start one.
    Uncorrelated,
}

impl DispatchOutcome {
    /// The instance that handled the message, if any.
    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            DispatchOutcome::Created { instance_id }
            | DispatchOutcome::Correlated { instance_id } => Some(*instance_id),
            DispatchOutcome::Uncorrelated => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Created { .. } => "created",
            DispatchOutcome::Correlated { .. } => "correlated",
            DispatchOutcome::Uncorrelated => "uncorrelated",
        }
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatches messages to one saga against one store.
///
/// For every message the dispatcher:
/// 1. resolves the correlation rule for the message's exact runtime type and
///    the most specific handler along its type chain,
/// 2. looks up the instance whose data key equals the message key,
/// 3. hands that instance (or a fresh one, if the message type initiates the
///    saga) to the handler,
/// 4. commits the result to the store once the handler has returned.
///
/// Lookup and commit run inside the store's write region for the message's
/// correlation key. Creation is also checked by the store itself, so even
/// with the region disabled concurrent messages with the same fresh key
/// create a single instance: the losers are re-run against the winner.
pub struct SagaDispatcher<S: Saga, St> {
    saga: S,
    correlations: CorrelationRegistry<S::Data>,
    handlers: HandlerResolver<S>,
    store: St,
    observers: Vec<Arc<dyn SagaObserver<S::Data>>>,
    config: DispatcherConfig,
}

impl<S, St> SagaDispatcher<S, St>
where
    S: Saga,
    St: SagaStore<S::Data>,
{
    /// Creates a dispatcher with default configuration.
    pub fn new(saga: S, store: St) -> Result<Self> {
        Self::with_config(saga, store, DispatcherConfig::default())
    }

    /// Creates a dispatcher, running the saga's configuration step once.
    ///
    /// Fails with `DuplicateCorrelation` if the saga configured a message
    /// type more than once and `config` rejects duplicates.
    pub fn with_config(saga: S, store: St, config: DispatcherConfig) -> Result<Self> {
        let (correlations, handlers) = SagaConfig::<S>::build().into_parts();

        let duplicates = correlations.duplicates();
        if !duplicates.is_empty() {
            match config.duplicate_correlation {
                DuplicatePolicy::Warn => {
                    for message_type in duplicates {
                        tracing::warn!(
                            saga = std::any::type_name::<S>(),
                            message_type = message_type.name(),
                            "correlation configured more than once; last rule wins"
                        );
                    }
                }
                DuplicatePolicy::Reject => {
                    return Err(DispatchError::DuplicateCorrelation {
                        message_types: duplicates.iter().map(|t| t.name()).collect(),
                    });
                }
            }
        }

        tracing::debug!(
            saga = std::any::type_name::<S>(),
            handlers = handlers.len(),
            correlations = correlations.len(),
            "saga dispatcher configured"
        );

        Ok(Self {
            saga,
            correlations,
            handlers,
            store,
            observers: Vec::new(),
            config,
        })
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn register_observer(&mut self, observer: Arc<dyn SagaObserver<S::Data>>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    /// Builder-style variant of [`register_observer`](Self::register_observer).
    pub fn with_observer(mut self, observer: Arc<dyn SagaObserver<S::Data>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn saga(&self) -> &S {
        &self.saga
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Returns a snapshot of every instance currently in the store.
    pub async fn available_saga_data(&self) -> Result<Vec<S::Data>> {
        Ok(self.store.all().await?)
    }

    /// Dispatches one message.
    ///
    /// Routing always uses the message's concrete runtime type, whatever
    /// reference type the caller holds. A failing handler's error is
    /// returned as [`DispatchError::Handler`], which displays exactly like
    /// the handler's own error. Nothing the handler did is committed.
    #[tracing::instrument(
        skip_all,
        fields(saga = std::any::type_name::<S>(), message_type = message.type_name())
    )]
    pub async fn handle(&self, message: &dyn Message) -> Result<DispatchOutcome> {
        let dispatch_start = std::time::Instant::now();
        let message_type = message.message_type();

        let rule = self.correlations.resolve(message_type.id());
        let handler = self.handlers.resolve(message);
        let (rule, handler) = match (rule, handler) {
            (Some(rule), Some(handler)) => (rule, handler),
            (None, Some(_)) => {
                return Err(DispatchError::MissingCorrelation {
                    message_type: message_type.name(),
                });
            }
            (Some(_), None) => {
                return Err(DispatchError::NoHandler {
                    message_type: message_type.name(),
                });
            }
            (None, None) => {
                return Err(DispatchError::NotApplicable {
                    saga: std::any::type_name::<S>(),
                    message_type: message_type.name(),
                });
            }
        };

        let key = rule
            .message_key(message)
            .ok_or(DispatchError::MessageTypeMismatch {
                expected: rule.message_type().name(),
                actual: message_type.name(),
            })?;

        let _guard = if self.config.lock_correlation_keys {
            Some(self.store.lock_key(&key).await)
        } else {
            None
        };

        let mut attempt = 0;
        let outcome = loop {
            match self.dispatch_once(message, rule, &handler, &key).await {
                Err(DispatchError::Store(error))
                    if error.is_conflict() && attempt < self.config.commit_retries =>
                {
                    attempt += 1;
                    metrics::counter!("saga_commit_retries_total").increment(1);
                    tracing::debug!(%key, attempt, error = %error, "commit lost a race; retrying");
                }
                result => break result?,
            }
        };

        metrics::counter!("saga_messages_total", "outcome" => outcome.as_str()).increment(1);
        metrics::histogram!("saga_dispatch_duration_seconds")
            .record(dispatch_start.elapsed().as_secs_f64());

        Ok(outcome)
    }

    /// One lookup, handler run and commit.
    ///
    /// The handler may rebuild the saga data wholesale; the instance ID and
    /// the revision read at lookup are restored before committing.
    async fn dispatch_once(
        &self,
        message: &dyn Message,
        rule: &CorrelationRule<S::Data>,
        handler: &ResolvedHandler<'_, '_, S>,
        key: &CorrelationKey,
    ) -> Result<DispatchOutcome> {
        let correlates = |data: &S::Data| rule.matches(data, key);
        let existing = self.store.find_one(&correlates).await?;

        match existing {
            Some(data) => {
                let instance_id = data.id();
                let expected = data.revision();
                tracing::debug!(%instance_id, %key, revision = %expected, "message correlated");
                self.notify(|observer| observer.on_correlated(message, &data));

                let mut context = SagaContext::existing(data);
                self.invoke(handler, &mut context, message).await?;

                let mut data = context.into_data();
                data.set_id(instance_id);
                data.set_revision(expected);
                self.store.update(data, expected).await?;

                Ok(DispatchOutcome::Correlated { instance_id })
            }
            None if self.handlers.is_initiated_by(message.message_type().id()) => {
                let instance_id = InstanceId::new();
                let mut data = S::Data::default();
                data.set_id(instance_id);
                data.set_revision(Revision::initial());
                tracing::info!(%instance_id, %key, "creating saga instance");
                self.notify(|observer| observer.on_created(message, &data));

                let mut context = SagaContext::created(data);
                self.invoke(handler, &mut context, message).await?;

                let mut data = context.into_data();
                data.set_id(instance_id);
                data.set_revision(Revision::initial());
                self.store.insert_unique(data, &correlates).await?;

                Ok(DispatchOutcome::Created { instance_id })
            }
            None => {
                tracing::warn!(%key, "no saga instance matches message; dropping it");
                self.notify(|observer| observer.on_could_not_correlate(message));
                Ok(DispatchOutcome::Uncorrelated)
            }
        }
    }

    /// Runs the handler, reporting failures to observers before returning
    /// them unchanged.
    async fn invoke(
        &self,
        handler: &ResolvedHandler<'_, '_, S>,
        context: &mut SagaContext<S::Data>,
        message: &dyn Message,
    ) -> Result<()> {
        if !handler.is_exact() {
            tracing::debug!(
                handler_type = handler.message_type().name(),
                depth = handler.depth(),
                "dispatching to ancestor handler"
            );
        }

        match handler.invoke(&self.saga, context).await {
            Ok(()) => Ok(()),
            Err(error) => {
                metrics::counter!("saga_handler_failures_total").increment(1);
                tracing::warn!(
                    instance_id = %context.instance_id(),
                    is_new = context.is_new(),
                    error = %error,
                    "saga handler failed"
                );
                self.notify(|observer| observer.on_handler_failed(message, &error));
                Err(error)
            }
        }
    }

    fn notify(&self, f: impl Fn(&dyn SagaObserver<S::Data>)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }
}

impl<S: Saga, St> std::fmt::Debug for SagaDispatcher<S, St> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaDispatcher")
            .field("saga", &std::any::type_name::<S>())
            .field("correlations", &self.correlations)
            .field("handlers", &self.handlers)
            .field("observers", &self.observers.len())
            .field("config", &self.config)
            .finish()
    }
}
