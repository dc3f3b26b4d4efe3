//! Saga definitions and their configuration.

use async_trait::async_trait;
use common::CorrelationKey;

use crate::context::SagaContext;
use crate::correlation::{CorrelationRegistry, CorrelationRule};
use crate::error::HandlerError;
use crate::handler::{HandlerEntry, HandlerResolver};
use crate::message::Message;

/// A long-lived, message-driven process definition.
///
/// A saga declares, once per type, which messages it reacts to and how each
/// of them finds its saga data:
///
/// ```rust,ignore
/// impl Saga for CounterpartUpdater {
///     type Data = CounterpartData;
///
///     fn configure(config: &mut SagaConfig<Self>) {
///         config
///             .initiated_by::<CounterpartCreated>()
///             .initiated_by::<CounterpartUpdated>()
///             .handles::<CounterpartChanged>();
///
///         config
///             .incoming(|m: &CounterpartCreated| m.base.dcid)
///             .correlates_with(|d| d.dcid);
///         config
///             .incoming(|m: &CounterpartUpdated| m.base.dcid)
///             .correlates_with(|d| d.dcid);
///     }
/// }
/// ```
pub trait Saga: Send + Sync + Sized + 'static {
    /// The persisted state of one instance of this saga.
    type Data: saga_store::SagaData;

    /// Registers handlers and correlation rules. Called once, when a
    /// dispatcher is built for this saga.
    fn configure(config: &mut SagaConfig<Self>);
}

/// Capability to handle messages of type `M` addressed to an existing
/// instance.
#[async_trait]
pub trait Handles<M: Message>: Saga {
    /// Reacts to a message. Errors propagate to the caller of
    /// [`SagaDispatcher::handle`](crate::SagaDispatcher::handle) unchanged.
    async fn handle(
        &self,
        context: &mut SagaContext<Self::Data>,
        message: &M,
    ) -> Result<(), HandlerError>;
}

/// Capability to create a new instance when a message of type `M` matches
/// no existing one.
pub trait InitiatedBy<M: Message>: Handles<M> {}

/// The handler table and correlation rules of one saga type.
pub struct SagaConfig<S: Saga> {
    correlations: CorrelationRegistry<S::Data>,
    handlers: HandlerResolver<S>,
}

impl<S: Saga> SagaConfig<S> {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self {
            correlations: CorrelationRegistry::new(),
            handlers: HandlerResolver::new(),
        }
    }

    /// Creates the configuration by running [`Saga::configure`].
    pub fn build() -> Self {
        let mut config = Self::new();
        S::configure(&mut config);
        config
    }

    /// Declares that `M` may start a new instance.
    pub fn initiated_by<M>(&mut self) -> &mut Self
    where
        S: InitiatedBy<M>,
        M: Message,
    {
        self.handlers.register(HandlerEntry::new::<M>(true));
        self
    }

    /// Declares that `M` is handled for existing instances only.
    pub fn handles<M>(&mut self) -> &mut Self
    where
        S: Handles<M>,
        M: Message,
    {
        self.handlers.register(HandlerEntry::new::<M>(false));
        self
    }

    /// Starts a correlation rule for messages of type `M`.
    ///
    /// The rule is registered by [`Incoming::correlates_with`].
    pub fn incoming<M, K, F>(&mut self, message_key: F) -> Incoming<'_, S, M, K, F>
    where
        M: Message,
        K: Into<CorrelationKey>,
        F: Fn(&M) -> K + Send + Sync + 'static,
    {
        Incoming {
            config: self,
            message_key,
            _marker: std::marker::PhantomData,
        }
    }

    /// Registers a prebuilt correlation rule. A later rule for the same
    /// message type replaces an earlier one.
    pub fn correlate(&mut self, rule: CorrelationRule<S::Data>) -> &mut Self {
        self.correlations.register(rule);
        self
    }

    pub fn correlations(&self) -> &CorrelationRegistry<S::Data> {
        &self.correlations
    }

    pub fn handlers(&self) -> &HandlerResolver<S> {
        &self.handlers
    }

    /// Splits the configuration into its registry and resolver.
    pub fn into_parts(self) -> (CorrelationRegistry<S::Data>, HandlerResolver<S>) {
        (self.correlations, self.handlers)
    }
}

impl<S: Saga> Default for SagaConfig<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Saga> std::fmt::Debug for SagaConfig<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaConfig")
            .field("saga", &std::any::type_name::<S>())
            .field("correlations", &self.correlations)
            .field("handlers", &self.handlers)
            .finish()
    }
}

/// A correlation rule under construction. See [`SagaConfig::incoming`].
#[must_use = "the rule is only registered by calling `correlates_with`"]
pub struct Incoming<'c, S: Saga, M, K, F> {
    config: &'c mut SagaConfig<S>,
    message_key: F,
    _marker: std::marker::PhantomData<fn(&M) -> K>,
}

impl<'c, S, M, K, F> Incoming<'c, S, M, K, F>
where
    S: Saga,
    M: Message,
    K: Into<CorrelationKey>,
    F: Fn(&M) -> K + Send + Sync + 'static,
{
    /// Completes the rule with the selector that reads the same key from
    /// saga data.
    pub fn correlates_with<G>(self, data_key: G) -> &'c mut SagaConfig<S>
    where
        G: Fn(&S::Data) -> K + Send + Sync + 'static,
    {
        self.config
            .correlate(CorrelationRule::new::<M, K, F, G>(self.message_key, data_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use common::InstanceId;
    use saga_store::{Revision, SagaData};
    use std::any::TypeId;

    #[derive(Debug, Clone, Default)]
    struct InvoiceData {
        id: InstanceId,
        revision: Revision,
        invoice_number: u32,
    }

    impl SagaData for InvoiceData {
        fn id(&self) -> InstanceId {
            self.id
        }

        fn set_id(&mut self, id: InstanceId) {
            self.id = id;
        }

        fn revision(&self) -> Revision {
            self.revision
        }

        fn set_revision(&mut self, revision: Revision) {
            self.revision = revision;
        }
    }

    #[derive(Debug)]
    struct InvoiceIssued {
        invoice_number: u32,
    }

    impl Message for InvoiceIssued {}

    #[derive(Debug)]
    struct InvoicePaid {
        invoice_number: u32,
    }

    impl Message for InvoicePaid {}

    struct InvoiceSaga;

    impl Saga for InvoiceSaga {
        type Data = InvoiceData;

        fn configure(config: &mut SagaConfig<Self>) {
            config
                .initiated_by::<InvoiceIssued>()
                .handles::<InvoicePaid>();
            config
                .incoming(|m: &InvoiceIssued| m.invoice_number)
                .correlates_with(|d| d.invoice_number);
            config
                .incoming(|m: &InvoicePaid| m.invoice_number)
                .correlates_with(|d| d.invoice_number);
        }
    }

    #[async_trait]
    impl Handles<InvoiceIssued> for InvoiceSaga {
        async fn handle(
            &self,
            context: &mut SagaContext<InvoiceData>,
            message: &InvoiceIssued,
        ) -> Result<(), HandlerError> {
            context.data_mut().invoice_number = message.invoice_number;
            Ok(())
        }
    }

    impl InitiatedBy<InvoiceIssued> for InvoiceSaga {}

    #[async_trait]
    impl Handles<InvoicePaid> for InvoiceSaga {
        async fn handle(
            &self,
            _context: &mut SagaContext<InvoiceData>,
            _message: &InvoicePaid,
        ) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn build_runs_configure() {
        let config = SagaConfig::<InvoiceSaga>::build();

        assert_eq!(config.handlers().len(), 2);
        assert_eq!(config.correlations().len(), 2);
        assert!(config.correlations().duplicates().is_empty());
    }

    #[test]
    fn capabilities_are_recorded() {
        let config = SagaConfig::<InvoiceSaga>::build();
        let handlers = config.handlers();

        assert!(handlers.is_initiated_by(TypeId::of::<InvoiceIssued>()));
        assert!(!handlers.is_initiated_by(TypeId::of::<InvoicePaid>()));
        assert_eq!(
            handlers
                .get(TypeId::of::<InvoicePaid>())
                .map(|e| e.message_type()),
            Some(MessageType::of::<InvoicePaid>())
        );
    }

    #[test]
    fn repeated_incoming_is_recorded_as_duplicate() {
        let mut config = SagaConfig::<InvoiceSaga>::build();
        config
            .incoming(|m: &InvoicePaid| m.invoice_number + 1)
            .correlates_with(|d| d.invoice_number);

        assert_eq!(config.correlations().len(), 2);
        assert_eq!(
            config.correlations().duplicates(),
            &[MessageType::of::<InvoicePaid>()]
        );
    }
}
