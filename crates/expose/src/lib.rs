//! Exposes the methods of a provider object as http endpoints.
//!
//! Each exposed method is registered under an identifier together with the ordered list of
//! its params. A request selects the method by the last segment of its path and supplies the
//! params through its query string; every param is built into a typed argument and checked
//! before the method is called exactly once. The method's result is then written as the
//! response, with the content type, caching and compression its [`ResponseOptions`] ask for.
//!
//! # Example
//! ```
//! use micro_expose::{Dispatcher, Failure, Provider, RegistryBuilder, Reply, SafeString, param};
//! use http::{Request, StatusCode};
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     fn echo(&self, name: SafeString) -> Result<Reply, Failure> {
//!         Ok(Reply::new(format!("Echo {name}")))
//!     }
//! }
//!
//! impl Provider for Greeter {
//!     fn expose(methods: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
//!         methods.add("Echo", (param("name"),), Greeter::echo)
//!     }
//! }
//!
//! let dispatcher = Dispatcher::from_provider(Greeter).expect("valid registrations");
//!
//! let request = Request::get("/Echo?name=Gopher").body(()).unwrap();
//! let response = dispatcher.serve(&request);
//! assert_eq!(response.status(), StatusCode::OK);
//!
//! let request = Request::get("/Echo?name=Go%27pher").body(()).unwrap();
//! let response = dispatcher.serve(&request);
//! assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
//! ```
//!
//! Listening for connections is left to the transport, which drives the dispatcher through
//! [`Handler`].

mod arg;
mod body;
mod clock;
mod dispatcher;
mod failure;
mod handler;
mod invoke;
mod method;
mod options;
mod param;
mod payload;
mod query;
mod registry;
mod response;

pub mod encoding;

pub use arg::{Arg, FromParam, SafeString};
pub use body::ResponseBody;
pub use clock::{Clock, SystemClock};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use encoding::Encoding;
pub use failure::Failure;
pub use handler::Handler;
pub use invoke::{IntoInvocation, InvocationResult, Reply};
pub use method::Method;
pub use options::ResponseOptions;
pub use param::{Binding, Lookup, Param, ParamList, param};
pub use payload::{Json, Payload, Reader, WriteFn, write_fn};
pub use query::{QueryError, QueryParams};
pub use registry::{MAX_PARAMS, MethodDescriptor, Provider, Registry, RegistryBuilder, RegistryError};
