//! Messages and their runtime type chain.
//!
//! Rust has no inheritance, so a message's "supertype" is modelled by
//! composition: a message embeds the value of its nearest ancestor and
//! exposes it through [`Message::parent`]. Walking `parent()` from the
//! concrete value yields the chain used by handler resolution, most
//! specific first.

use std::any::{Any, TypeId};

/// Upcast to `&dyn Any`, implemented for every `'static` type.
///
/// Call it through `&dyn Message`, not through a `Box<dyn Message>`: on the
/// box itself it returns the box.
pub trait AsAny: Any {
    /// Returns `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A message that can be dispatched to a saga.
///
/// ```rust,ignore
/// #[derive(Debug)]
/// struct CounterpartChanged { dcid: i32 }
/// impl Message for CounterpartChanged {}
///
/// #[derive(Debug)]
/// struct CounterpartCreated { base: CounterpartChanged }
/// impl Message for CounterpartCreated {
///     fn parent(&self) -> Option<&dyn Message> {
///         Some(&self.base)
///     }
/// }
/// ```
pub trait Message: AsAny + Send + Sync + std::fmt::Debug {
    /// The nearest ancestor view of this message, if it has one.
    fn parent(&self) -> Option<&dyn Message> {
        None
    }

    /// Name of the concrete type, for logs and errors.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn Message {
    /// Returns the concrete runtime type of this message.
    pub fn message_type(&self) -> MessageType {
        MessageType {
            id: self.as_any().type_id(),
            name: self.type_name(),
        }
    }

    /// Returns true if the concrete runtime type is `T`.
    pub fn is<T: Message>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Views the message as its concrete type `T`.
    pub fn downcast_ref<T: Message>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Iterates the message and its ancestors, most specific first.
    pub fn type_chain(&self) -> TypeChain<'_> {
        TypeChain { next: Some(self) }
    }
}

/// Runtime identity of a message type.
///
/// Equality and hashing use only the `TypeId`; the name is carried for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct MessageType {
    id: TypeId,
    name: &'static str,
}

impl MessageType {
    /// The message type of `M`.
    pub fn of<M: Message>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: std::any::type_name::<M>(),
        }
    }

    /// Returns the `TypeId`.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl std::hash::Hash for MessageType {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Iterator over a message's ancestor views. See [`Message::parent`].
pub struct TypeChain<'a> {
    next: Option<&'a dyn Message>,
}

impl<'a> Iterator for TypeChain<'a> {
    type Item = &'a dyn Message;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Changed {
        dcid: i32,
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
    struct Recreated {
        base: Created,
    }

    impl Message for Recreated {
        fn parent(&self) -> Option<&dyn Message> {
            Some(&self.base)
        }
    }

    #[test]
    fn message_type_uses_runtime_type_behind_box() {
        let boxed: Box<dyn Message> = Box::new(Created {
            base: Changed { dcid: 800 },
        });
        let message: &dyn Message = &*boxed;

        assert_eq!(message.message_type(), MessageType::of::<Created>());
        assert_ne!(message.message_type(), MessageType::of::<Changed>());
        assert!(message.is::<Created>());
    }

    #[test]
    fn type_chain_walks_most_specific_first() {
        let message = Recreated {
            base: Created {
                base: Changed { dcid: 1 },
            },
        };
        let message: &dyn Message = &message;

        let chain: Vec<MessageType> = message.type_chain().map(|m| m.message_type()).collect();
        assert_eq!(
            chain,
            vec![
                MessageType::of::<Recreated>(),
                MessageType::of::<Created>(),
                MessageType::of::<Changed>(),
            ]
        );
    }

    #[test]
    fn ancestor_view_downcasts_to_ancestor() {
        let message = Created {
            base: Changed { dcid: 800 },
        };
        let message: &dyn Message = &message;

        let ancestor = message.type_chain().nth(1).unwrap();
        assert_eq!(ancestor.downcast_ref::<Changed>().unwrap().dcid, 800);
        assert!(message.downcast_ref::<Changed>().is_none());
    }

    #[test]
    fn type_name_reports_concrete_type() {
        let message: &dyn Message = &Changed { dcid: 3 };
        assert!(message.type_name().ends_with("Changed"));
        assert_eq!(
            MessageType::of::<Changed>().to_string(),
            message.message_type().name()
        );
    }
}
