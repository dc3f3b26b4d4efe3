//! Correlation rules: how a message finds the saga instance it belongs to.

use std::any::TypeId;
use std::collections::HashMap;

use common::CorrelationKey;
use saga_store::SagaData;

use crate::message::{Message, MessageType};

type MessageKeyFn = Box<dyn Fn(&dyn Message) -> Option<CorrelationKey> + Send + Sync>;
type DataKeyFn<D> = Box<dyn Fn(&D) -> CorrelationKey + Send + Sync>;

/// Pairs a key selector on one message type with a key selector on saga
/// data. A message correlates with an instance when both selectors produce
/// equal keys.
pub struct CorrelationRule<D> {
    message_type: MessageType,
    message_key: MessageKeyFn,
    data_key: DataKeyFn<D>,
}

impl<D: SagaData> CorrelationRule<D> {
    /// Builds a rule for messages of type `M`.
    pub fn new<M, K, F, G>(message_key: F, data_key: G) -> Self
    where
        M: Message,
        K: Into<CorrelationKey>,
        F: Fn(&M) -> K + Send + Sync + 'static,
        G: Fn(&D) -> K + Send + Sync + 'static,
    {
        Self {
            message_type: MessageType::of::<M>(),
            message_key: Box::new(move |message: &dyn Message| -> Option<CorrelationKey> {
                message.downcast_ref::<M>().map(|m| message_key(m).into())
            }),
            data_key: Box::new(move |data: &D| -> CorrelationKey { data_key(data).into() }),
        }
    }

    /// The exact message type this rule applies to.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Extracts the key from a message.
    ///
    /// Returns `None` if the message's concrete type is not the rule's type.
    pub fn message_key(&self, message: &dyn Message) -> Option<CorrelationKey> {
        (self.message_key)(message)
    }

    /// Extracts the key from saga data.
    pub fn data_key(&self, data: &D) -> CorrelationKey {
        (self.data_key)(data)
    }

    /// Returns true if `data` carries `key`.
    pub fn matches(&self, data: &D, key: &CorrelationKey) -> bool {
        &self.data_key(data) == key
    }
}

impl<D> std::fmt::Debug for CorrelationRule<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationRule")
            .field("message_type", &self.message_type.name())
            .finish_non_exhaustive()
    }
}

/// At most one [`CorrelationRule`] per exact message type.
///
/// Lookup never walks ancestors: a rule for a supertype does not apply to
/// its subtypes, and vice versa.
pub struct CorrelationRegistry<D> {
    rules: HashMap<TypeId, CorrelationRule<D>>,
    duplicates: Vec<MessageType>,
}

impl<D: SagaData> CorrelationRegistry<D> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            duplicates: Vec::new(),
        }
    }

    /// Registers a rule, replacing any rule already registered for the same
    /// message type. The replaced rule is returned and the type is recorded
    /// in [`duplicates`](Self::duplicates).
    pub fn register(&mut self, rule: CorrelationRule<D>) -> Option<CorrelationRule<D>> {
        let message_type = rule.message_type();
        let replaced = self.rules.insert(message_type.id(), rule);
        if replaced.is_some() {
            self.duplicates.push(message_type);
        }
        replaced
    }

    /// Finds the rule for an exact message type.
    pub fn resolve(&self, message_type: TypeId) -> Option<&CorrelationRule<D>> {
        self.rules.get(&message_type)
    }

    /// Message types that were registered more than once.
    pub fn duplicates(&self) -> &[MessageType] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<D: SagaData> Default for CorrelationRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> std::fmt::Debug for CorrelationRegistry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.rules.values().map(|r| r.message_type.name()).collect();
        types.sort_unstable();
        f.debug_struct("CorrelationRegistry")
            .field("rules", &types)
            .field("duplicates", &self.duplicates.len())
            .finish()
    }
}
