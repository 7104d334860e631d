//! Dispatch tables for remote interfaces.
//!
//! An [`InterfaceRegistry`] is built once at startup and maps an interface
//! type id to its [`Operation`]s. Delivery requests are correlated against
//! it by method name and argument count; exactly one match is required.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use herald_broker::SubscriberTypes;
use herald_core::normalize_type_id;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

type Encoder = dyn Fn(Vec<Value>) -> Result<Vec<Value>, String> + Send + Sync;

/// Argument lists that [`Operation::typed`] can check.
///
/// Implemented for tuples of one to eight elements, one element per
/// argument, so the arity always matches the tuple.
pub trait Arguments: DeserializeOwned + Serialize + 'static {
    /// Number of arguments.
    const ARITY: usize;
}

macro_rules! impl_arguments {
    ($arity:literal => $($name:ident),+) => {
        impl<$($name),+> Arguments for ($($name,)+)
        where
            $($name: DeserializeOwned + Serialize + 'static),+
        {
            const ARITY: usize = $arity;
        }
    };
}

impl_arguments!(1 => A1);
impl_arguments!(2 => A1, A2);
impl_arguments!(3 => A1, A2, A3);
impl_arguments!(4 => A1, A2, A3, A4);
impl_arguments!(5 => A1, A2, A3, A4, A5);
impl_arguments!(6 => A1, A2, A3, A4, A5, A6);
impl_arguments!(7 => A1, A2, A3, A4, A5, A6, A7);
impl_arguments!(8 => A1, A2, A3, A4, A5, A6, A7, A8);

/// One remote operation: a name, an arity and an argument encoder.
#[derive(Clone)]
pub struct Operation {
    name: String,
    arity: usize,
    encode: Arc<Encoder>,
}

impl Operation {
    /// Operation whose arguments are forwarded as given.
    #[must_use]
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            encode: Arc::new(Ok::<Vec<Value>, String>),
        }
    }

    /// Operation whose arguments must deserialize into the tuple `A`.
    ///
    /// The arity is taken from `A`. Arguments are checked and re-encoded
    /// through `A` before the call goes out.
    #[must_use]
    pub fn typed<A: Arguments>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: A::ARITY,
            encode: Arc::new(|args: Vec<Value>| -> Result<Vec<Value>, String> {
                let typed: A =
                    serde_json::from_value(Value::Array(args)).map_err(|e| e.to_string())?;
                match serde_json::to_value(typed).map_err(|e| e.to_string())? {
                    Value::Array(values) => Ok(values),
                    single => Ok(vec![single]),
                }
            }),
        }
    }

    /// Operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of arguments.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Check and encode call arguments.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch if the arguments do not fit
    /// the operation's signature.
    pub fn encode(&self, args: Vec<Value>) -> Result<Vec<Value>, String> {
        (self.encode)(args)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// A remote interface and its operations.
#[derive(Debug, Clone)]
pub struct InterfaceDef {
    type_id: String,
    operations: Vec<Operation>,
}

impl InterfaceDef {
    /// Start a definition. The type id is normalized.
    #[must_use]
    pub fn new(type_id: &str) -> Self {
        Self {
            type_id: normalize_type_id(type_id),
            operations: Vec::new(),
        }
    }

    /// Add an operation.
    #[must_use]
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Normalized type id.
    #[must_use]
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Operations in declaration order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Find the single operation called `method` taking `arity` arguments.
    #[must_use]
    pub fn correlate(&self, method: &str, arity: usize) -> Correlation<'_> {
        let mut matches = self
            .operations
            .iter()
            .filter(|op| op.name == method && op.arity == arity);

        match (matches.next(), matches.next()) {
            (None, _) => Correlation::NotFound,
            (Some(op), None) => Correlation::Found(op),
            (Some(_), Some(_)) => Correlation::Ambiguous(matches.count().saturating_add(2)),
        }
    }
}

/// Result of matching a method call against an interface.
#[derive(Debug, Clone)]
pub enum Correlation<'a> {
    /// Exactly one operation matches.
    Found(&'a Operation),
    /// No operation matches.
    NotFound,
    /// This many operations match.
    Ambiguous(usize),
}

/// Interfaces known to this process, keyed by normalized type id.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    interfaces: HashMap<String, InterfaceDef>,
}

impl InterfaceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface, replacing any earlier definition of the same type.
    pub fn register(&mut self, interface: InterfaceDef) {
        debug!(
            type_id = interface.type_id(),
            operations = interface.operations.len(),
            "registered interface"
        );
        self.interfaces
            .insert(interface.type_id.clone(), interface);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, interface: InterfaceDef) -> Self {
        self.register(interface);
        self
    }

    /// Look up an interface by type id in either spelling.
    #[must_use]
    pub fn get(&self, type_id: &str) -> Option<&InterfaceDef> {
        self.interfaces.get(&normalize_type_id(type_id))
    }

    /// Number of registered interfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Returns true if no interfaces are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

impl SubscriberTypes for InterfaceRegistry {
    fn resolves(&self, type_id: &str) -> bool {
        self.get(type_id).is_some()
    }
}
