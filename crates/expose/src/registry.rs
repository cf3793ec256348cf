//! The registry of exposed methods.
//!
//! A [`Registry`] maps an identifier (the last path segment of a request) to a
//! [`MethodDescriptor`]: the ordered parameter schema and the bound method. It is assembled
//! once through [`RegistryBuilder`] before serving starts and is read-only afterwards.
//!
//! The shape of every method is checked by the compiler at the [`RegistryBuilder::add`] call:
//! the method must take the provider followed by exactly one argument per declared param, in
//! the declared order, and return something implementing
//! [`IntoInvocation`](crate::IntoInvocation).
//!
//! ```compile_fail
//! use micro_expose::{Failure, Registry, Reply, SafeString, param};
//!
//! struct Echo;
//!
//! impl Echo {
//!     fn echo(&self, name: SafeString) -> Result<Reply, Failure> {
//!         Ok(Reply::new(format!("Echo {name}")))
//!     }
//! }
//!
//! // two params declared, but `echo` takes one argument
//! let _ = Registry::builder().add("Echo", (param::<SafeString, _>("name"), param::<u32, _>("age")), Echo::echo);
//! ```
//!
//! ```compile_fail
//! use micro_expose::{Registry, SafeString, param};
//!
//! struct Echo;
//!
//! impl Echo {
//!     // does not return a payload, options and failure
//!     fn echo(&self, _name: SafeString) -> (i32, Option<String>) {
//!         (42, None)
//!     }
//! }
//!
//! let _ = Registry::builder().add("Echo", (param::<SafeString, _>("name"),), Echo::echo);
//! ```
//!
//! Everything the compiler can not see (duplicate identifiers or param names, malformed
//! identifiers, too many params) is reported by [`RegistryBuilder::build`] as a
//! [`RegistryError`]. Such an error is a programming mistake: the process must not start
//! serving with it.

use crate::invoke::{BoundCall, IntoInvocation};
use crate::method::Method;
use crate::param::{Lookup, ParamList};
use crate::Failure;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// The most params a single method may declare.
pub const MAX_PARAMS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("identifier {identifier:?} is invalid, it must be non-empty and must not contain '/'")]
    InvalidIdentifier { identifier: String },

    #[error("identifier {identifier:?} is registered more than once")]
    DuplicateIdentifier { identifier: String },

    #[error("method {identifier} declares {count} params, exceed the limit {max}")]
    TooManyParams { identifier: String, count: usize, max: usize },

    #[error("method {identifier} declares an empty param name")]
    EmptyParamName { identifier: String },

    #[error("method {identifier} declares param {name:?} more than once")]
    DuplicateParam { identifier: String, name: String },
}

/// Binds the arguments of one method and defers the call until the provider is at hand.
trait ErasedMethod<P>: Send + Sync {
    fn bind<'a>(&'a self, lookup: &dyn Lookup) -> Result<Bound<'a, P>, Failure>;
}

/// Arguments bound for one call: the count of bound params, and the call itself when every
/// declared param was bound.
pub(crate) struct Bound<'a, P> {
    pub(crate) bound: usize,
    pub(crate) call: Option<BoundCall<'a, P>>,
}

struct TypedMethod<Ps, M> {
    params: Ps,
    method: M,
}

impl<P, Ps, M> ErasedMethod<P> for TypedMethod<Ps, M>
where
    P: 'static,
    Ps: ParamList,
    M: Method<P, Ps::Args>,
{
    fn bind<'a>(&'a self, lookup: &dyn Lookup) -> Result<Bound<'a, P>, Failure> {
        let binding = self.params.bind(lookup)?;
        let bound = binding.bound();
        let call = binding.into_args().map(|args| {
            Box::new(move |provider: &P| self.method.call(provider, args).into_invocation()) as BoundCall<'a, P>
        });
        Ok(Bound { bound, call })
    }
}

/// One exposed method: its identifier, its ordered param names and the bound method.
pub struct MethodDescriptor<P> {
    identifier: String,
    param_names: Vec<String>,
    method: Box<dyn ErasedMethod<P>>,
}

impl<P> MethodDescriptor<P> {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn arity(&self) -> usize {
        self.param_names.len()
    }

    pub(crate) fn bind(&self, lookup: &dyn Lookup) -> Result<Bound<'_, P>, Failure> {
        self.method.bind(lookup)
    }
}

impl<P> fmt::Debug for MethodDescriptor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("identifier", &self.identifier)
            .field("param_names", &self.param_names)
            .finish_non_exhaustive()
    }
}

/// The read-only table of exposed methods of provider `P`.
pub struct Registry<P> {
    methods: HashMap<String, MethodDescriptor<P>>,
}

impl<P: 'static> Registry<P> {
    pub fn builder() -> RegistryBuilder<P> {
        RegistryBuilder::new()
    }

    /// Resolves an identifier, an unknown identifier is a normal request-time condition.
    #[inline]
    pub fn resolve(&self, identifier: &str) -> Option<&MethodDescriptor<P>> {
        self.methods.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}

impl<P: Provider> Registry<P> {
    /// Builds the registry the provider declares through [`Provider::expose`].
    pub fn for_provider() -> Result<Self, RegistryError> {
        P::expose(Registry::builder()).build()
    }
}

impl<P> fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("methods", &self.methods.values().collect::<Vec<_>>()).finish()
    }
}

/// A provider that declares its own exposed methods.
///
/// # Example
/// ```
/// use micro_expose::{Failure, Provider, RegistryBuilder, Reply, SafeString, param};
///
/// struct Greeter;
///
/// impl Greeter {
///     fn greeting(&self) -> Result<Reply, Failure> {
///         Ok(Reply::new("Hello World"))
///     }
///
///     fn echo(&self, name: SafeString) -> Result<Reply, Failure> {
///         Ok(Reply::new(format!("Echo {name}")))
///     }
/// }
///
/// impl Provider for Greeter {
///     fn expose(methods: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
///         methods.add("Greeting", (), Greeter::greeting).add("Echo", (param("name"),), Greeter::echo)
///     }
/// }
/// ```
pub trait Provider: Sized + Send + Sync + 'static {
    fn expose(methods: RegistryBuilder<Self>) -> RegistryBuilder<Self>;
}

/// Collects method registrations, the first configuration error is kept and reported by
/// [`RegistryBuilder::build`].
pub struct RegistryBuilder<P> {
    methods: HashMap<String, MethodDescriptor<P>>,
    error: Option<RegistryError>,
}

impl<P: 'static> RegistryBuilder<P> {
    fn new() -> Self {
        Self { methods: HashMap::new(), error: None }
    }

    /// Exposes `method` under `identifier`, binding its arguments from `params` in order.
    #[must_use]
    pub fn add<Ps, M>(mut self, identifier: impl Into<String>, params: Ps, method: M) -> Self
    where
        Ps: ParamList,
        M: Method<P, Ps::Args>,
    {
        if self.error.is_some() {
            return self;
        }

        let identifier = identifier.into();
        let param_names = params.names().into_iter().map(str::to_owned).collect::<Vec<_>>();

        if let Err(e) = validate(&identifier, &param_names) {
            self.error = Some(e);
            return self;
        }

        match self.methods.entry(identifier) {
            Entry::Occupied(entry) => {
                self.error = Some(RegistryError::DuplicateIdentifier { identifier: entry.key().clone() });
            }
            Entry::Vacant(entry) => {
                debug!(identifier = %entry.key(), params = ?param_names, "expose method");
                let identifier = entry.key().clone();
                entry.insert(MethodDescriptor {
                    identifier,
                    param_names,
                    method: Box::new(TypedMethod { params, method }),
                });
            }
        }
        self
    }

    pub fn build(self) -> Result<Registry<P>, RegistryError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        info!(methods = self.methods.len(), "registry built");
        Ok(Registry { methods: self.methods })
    }
}

impl<P> fmt::Debug for RegistryBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("identifiers", &self.methods.keys().collect::<Vec<_>>())
            .field("error", &self.error)
            .finish()
    }
}

fn validate(identifier: &str, param_names: &[String]) -> Result<(), RegistryError> {
    if identifier.is_empty() || identifier.contains('/') {
        return Err(RegistryError::InvalidIdentifier { identifier: identifier.to_owned() });
    }

    if param_names.len() > MAX_PARAMS {
        return Err(RegistryError::TooManyParams {
            identifier: identifier.to_owned(),
            count: param_names.len(),
            max: MAX_PARAMS,
        });
    }

    for (i, name) in param_names.iter().enumerate() {
        if name.is_empty() {
            return Err(RegistryError::EmptyParamName { identifier: identifier.to_owned() });
        }
        if param_names[..i].contains(name) {
            return Err(RegistryError::DuplicateParam { identifier: identifier.to_owned(), name: name.clone() });
        }
    }

    Ok(())
}
