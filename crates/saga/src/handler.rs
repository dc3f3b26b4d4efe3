//! Handler resolution by runtime message type.
//!
//! Handlers are stored in a table keyed by the `TypeId` of the message type
//! they were registered for. Resolution walks the message's type chain
//! (concrete type first, then each ancestor view) and picks the first
//! registered entry, so an exact-type handler always wins over an ancestor
//! handler regardless of how the caller typed its reference.

use std::any::TypeId;
use std::collections::HashMap;

use futures_util::future::BoxFuture;

use crate::context::SagaContext;
use crate::error::DispatchError;
use crate::message::{Message, MessageType};
use crate::saga::{Handles, Saga};

/// Future returned by a type-erased handler.
pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), DispatchError>>;

/// Type-erased handler: downcasts the message view and calls the saga's
/// [`Handles`] implementation for that type.
pub type HandlerFn<S> = for<'a> fn(
    &'a S,
    &'a mut SagaContext<<S as Saga>::Data>,
    &'a dyn Message,
) -> HandlerFuture<'a>;

fn invoke<'a, S, M>(
    saga: &'a S,
    context: &'a mut SagaContext<S::Data>,
    message: &'a dyn Message,
) -> HandlerFuture<'a>
where
    S: Handles<M>,
    M: Message,
{
    Box::pin(async move {
        let typed = message
            .downcast_ref::<M>()
            .ok_or_else(|| DispatchError::MessageTypeMismatch {
                expected: std::any::type_name::<M>(),
                actual: message.type_name(),
            })?;
        <S as Handles<M>>::handle(saga, context, typed)
            .await
            .map_err(DispatchError::Handler)
    })
}

/// A registered handler and the capabilities of its message type.
pub struct HandlerEntry<S: Saga> {
    message_type: MessageType,
    initiates: bool,
    invoke: HandlerFn<S>,
}

impl<S: Saga> HandlerEntry<S> {
    pub(crate) fn new<M>(initiates: bool) -> Self
    where
        S: Handles<M>,
        M: Message,
    {
        Self {
            message_type: MessageType::of::<M>(),
            initiates,
            invoke: invoke::<S, M>,
        }
    }

    /// The message type this handler was registered for.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Whether this message type may create new instances.
    pub fn initiates(&self) -> bool {
        self.initiates
    }
}

/// A handler picked for one message, bound to the view of the message it
/// was registered for.
pub struct ResolvedHandler<'h, 'm, S: Saga> {
    entry: &'h HandlerEntry<S>,
    view: &'m dyn Message,
    depth: usize,
}

impl<'h, 'm, S: Saga> ResolvedHandler<'h, 'm, S> {
    /// The message type of the matched handler.
    pub fn message_type(&self) -> MessageType {
        self.entry.message_type
    }

    /// How many ancestor steps were taken; 0 means an exact match.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_exact(&self) -> bool {
        self.depth == 0
    }

    /// Runs the handler.
    pub fn invoke<'a>(
        &self,
        saga: &'a S,
        context: &'a mut SagaContext<S::Data>,
    ) -> HandlerFuture<'a>
    where
        'm: 'a,
    {
        (self.entry.invoke)(saga, context, self.view)
    }
}

/// Table of handlers keyed by message type.
pub struct HandlerResolver<S: Saga> {
    handlers: HashMap<TypeId, HandlerEntry<S>>,
}

impl<S: Saga> HandlerResolver<S> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler entry.
    ///
    /// Registering the same message type twice keeps one entry; it initiates
    /// if either registration did.
    pub fn register(&mut self, entry: HandlerEntry<S>) {
        let id = entry.message_type.id();
        match self.handlers.get_mut(&id) {
            Some(existing) => existing.initiates |= entry.initiates,
            None => {
                self.handlers.insert(id, entry);
            }
        }
    }

    /// Finds the most specific handler for the message's runtime type.
    ///
    /// Returns `None` when neither the concrete type nor any ancestor has a
    /// handler.
    pub fn resolve<'h, 'm>(
        &'h self,
        message: &'m dyn Message,
    ) -> Option<ResolvedHandler<'h, 'm, S>> {
        message.type_chain().enumerate().find_map(|(depth, view)| {
            self.handlers
                .get(&view.message_type().id())
                .map(|entry| ResolvedHandler { entry, view, depth })
        })
    }

    /// Returns true if the exact message type was registered as initiating.
    pub fn is_initiated_by(&self, message_type: TypeId) -> bool {
        self.handlers
            .get(&message_type)
            .is_some_and(|entry| entry.initiates)
    }

    /// Returns the entry registered for an exact message type.
    pub fn get(&self, message_type: TypeId) -> Option<&HandlerEntry<S>> {
        self.handlers.get(&message_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S: Saga> Default for HandlerResolver<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Saga> std::fmt::Debug for HandlerResolver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self
            .handlers
            .values()
            .map(|e| e.message_type.name())
            .collect();
        types.sort_unstable();
        f.debug_struct("HandlerResolver")
            .field("handlers", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::saga::SagaConfig;
    use async_trait::async_trait;
    use common::InstanceId;
    use saga_store::{Revision, SagaData};

    #[derive(Debug, Clone, Default)]
    struct TraceData {
        id: InstanceId,
        revision: Revision,
        seen: Vec<&'static str>,
    }

    impl SagaData for TraceData {
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
    struct Changed {
        id: i32,
    }

    impl Message for Changed {}

    #[derive(Debug)]
    struct Created {
        base: Changed,
    }

    impl Message for Created {
        fn parent(&self) -> Option<&dyn Message> {
            Some(&self.base)
        }
    }

    #[derive(Debug)]
    struct Deleted {
        base: Changed,
    }

    impl Message for Deleted {
        fn parent(&self) -> Option<&dyn Message> {
            Some(&self.base)
        }
    }

    #[derive(Debug)]
    struct Unrelated;

    impl Message for Unrelated {}

    struct TraceSaga;

    impl Saga for TraceSaga {
        type Data = TraceData;

        fn configure(config: &mut SagaConfig<Self>) {
            config.initiated_by::<Created>().handles::<Changed>();
        }
    }

    #[async_trait]
    impl Handles<Created> for TraceSaga {
        async fn handle(
            &self,
            context: &mut SagaContext<TraceData>,
            _message: &Created,
        ) -> Result<(), HandlerError> {
            context.data_mut().seen.push("Created");
            Ok(())
        }
    }

    #[async_trait]
    impl Handles<Changed> for TraceSaga {
        async fn handle(
            &self,
            context: &mut SagaContext<TraceData>,
            message: &Changed,
        ) -> Result<(), HandlerError> {
            if message.id < 0 {
                return Err("negative id".into());
            }
            context.data_mut().seen.push("Changed");
            Ok(())
        }
    }

    impl crate::saga::InitiatedBy<Created> for TraceSaga {}

    fn resolver() -> HandlerResolver<TraceSaga> {
        SagaConfig::<TraceSaga>::build().into_parts().1
    }

    #[test]
    fn exact_type_wins_over_ancestor() {
        let resolver = resolver();
        let message = Created {
            base: Changed { id: 1 },
        };
        let message: &dyn Message = &message;

        let resolved = resolver.resolve(message).unwrap();
        assert_eq!(resolved.message_type(), MessageType::of::<Created>());
        assert!(resolved.is_exact());
    }

    #[test]
    fn falls_back_to_nearest_ancestor() {
        let resolver = resolver();
        let message = Deleted {
            base: Changed { id: 1 },
        };

        let resolved = resolver.resolve(&message).unwrap();
        assert_eq!(resolved.message_type(), MessageType::of::<Changed>());
        assert_eq!(resolved.depth(), 1);
    }

    #[test]
    fn unknown_types_are_not_applicable() {
        assert!(resolver().resolve(&Unrelated).is_none());
    }

    #[test]
    fn initiation_is_tracked_per_exact_type() {
        let resolver = resolver();
        assert!(resolver.is_initiated_by(TypeId::of::<Created>()));
        assert!(!resolver.is_initiated_by(TypeId::of::<Changed>()));
        assert!(!resolver.is_initiated_by(TypeId::of::<Deleted>()));
    }

    #[test]
    fn duplicate_registration_keeps_initiation() {
        let mut resolver = resolver();
        resolver.register(HandlerEntry::new::<Created>(false));
        assert_eq!(resolver.len(), 2);
        assert!(resolver.is_initiated_by(TypeId::of::<Created>()));
    }

    #[tokio::test]
    async fn invoking_ancestor_handler_passes_ancestor_view() {
        let resolver = resolver();
        let message = Deleted {
            base: Changed { id: 5 },
        };
        let mut context = SagaContext::created(TraceData::default());

        let resolved = resolver.resolve(&message).unwrap();
        resolved.invoke(&TraceSaga, &mut context).await.unwrap();

        assert_eq!(context.data().seen, vec!["Changed"]);
    }

    #[tokio::test]
    async fn handler_failure_is_wrapped_unchanged() {
        let resolver = resolver();
        let message = Deleted {
            base: Changed { id: -1 },
        };
        let mut context = SagaContext::existing(TraceData::default());

        let resolved = resolver.resolve(&message).unwrap();
        let error = resolved.invoke(&TraceSaga, &mut context).await.unwrap_err();

        assert!(matches!(error, DispatchError::Handler(_)));
        assert_eq!(error.to_string(), "negative id");
    }
}
