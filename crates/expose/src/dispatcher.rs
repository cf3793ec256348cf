//! The dispatcher drives one request through the pipeline.
//!
//! ```text
//! Resolving -> Binding -> Invoking -> Emitting -> Done
//!                 |           |           |
//!                 +-----------+-----------+--> Done(error response)
//! ```
//!
//! Only `GET` and `POST` requests are served. The identifier is the percent-decoded last
//! segment of the request path and params come from the query string. Binding is strict: a request is only
//! invoked when every declared param is bound and no other query value was supplied, so a
//! missing, an extra or a repeated key is rejected with the generic failure.
//!
//! Provider code runs while binding, invoking and emitting. A panic in any of the three is
//! caught and answered with the generic failure.

use crate::body::ResponseBody;
use crate::clock::{Clock, SystemClock};
use crate::encoding::Encoding;
use crate::invoke::{catch_panic, invoke};
use crate::options::ResponseOptions;
use crate::query::QueryParams;
use crate::registry::{Provider, Registry, RegistryError};
use crate::response::{Pipeline, Stage, classify, generic_failure};
use http::{Method, Request, Response};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::fmt;
use std::str::Utf8Error;
use tracing::{info, warn};

/// Serves requests against the exposed methods of one provider.
///
/// The dispatcher is immutable once built and may be shared by any number of concurrent
/// requests; the provider's methods must therefore be safe to call concurrently.
pub struct Dispatcher<P> {
    registry: Registry<P>,
    provider: P,
    pipeline: Pipeline,
}

impl<P: Send + Sync + 'static> Dispatcher<P> {
    /// A dispatcher with the default options, gzip compression and the system clock.
    pub fn new(registry: Registry<P>, provider: P) -> Self {
        Self::builder(registry, provider).build()
    }

    pub fn builder(registry: Registry<P>, provider: P) -> DispatcherBuilder<P> {
        DispatcherBuilder::new(registry, provider)
    }

    pub fn registry(&self) -> &Registry<P> {
        &self.registry
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn default_options(&self) -> &ResponseOptions {
        self.pipeline.defaults()
    }

    /// Serves one request, every outcome is a response.
    pub fn serve<B>(&self, request: &Request<B>) -> Response<ResponseBody> {
        let method = request.method();
        let uri = request.uri();

        if *method != Method::GET && *method != Method::POST {
            warn!(%method, %uri, "unsupported request method");
            return generic_failure();
        }

        let identifier = match identifier_of(uri.path()) {
            Ok(identifier) => identifier,
            Err(e) => {
                warn!(stage = %Stage::Resolving, %uri, cause = %e, "identifier is not valid utf-8");
                return generic_failure();
            }
        };
        let identifier = &*identifier;
        let Some(descriptor) = self.registry.resolve(identifier) else {
            warn!(stage = %Stage::Resolving, identifier, %uri, "no method exposed for identifier");
            return generic_failure();
        };

        let query = match QueryParams::from_uri(uri) {
            Ok(query) => query,
            Err(e) => {
                warn!(stage = %Stage::Binding, identifier, %uri, cause = %e, "malformed query string");
                return generic_failure();
            }
        };

        let bound = match catch_panic(identifier, || descriptor.bind(&query)) {
            Ok(Ok(bound)) => bound,
            Ok(Err(failure)) | Err(failure) => return classify(Stage::Binding, identifier, failure),
        };

        let declared = descriptor.arity();
        let supplied = query.total();
        let call = match bound.call {
            Some(call) if bound.bound == declared && bound.bound == supplied => call,
            _ => {
                warn!(
                    stage = %Stage::Binding,
                    identifier,
                    %uri,
                    declared,
                    bound = bound.bound,
                    supplied,
                    "param count mismatch"
                );
                return generic_failure();
            }
        };

        let result = invoke(identifier, call, &self.provider);
        self.pipeline.emit(identifier, method, request.headers(), result)
    }
}

impl<P: Provider> Dispatcher<P> {
    /// A dispatcher for the methods the provider exposes itself.
    pub fn from_provider(provider: P) -> Result<Self, RegistryError> {
        Ok(Self::new(Registry::for_provider()?, provider))
    }
}

impl<P> fmt::Debug for Dispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("default_options", self.pipeline.defaults())
            .field("encodings", &self.pipeline.encodings())
            .finish_non_exhaustive()
    }
}

/// The identifier is everything after the last `/`, percent-decoded.
///
/// The segment is split off before decoding, so an escaped `%2F` stays inside the identifier.
fn identifier_of(path: &str) -> Result<Cow<'_, str>, Utf8Error> {
    let segment = path.rsplit('/').next().unwrap_or(path);
    percent_decode_str(segment).decode_utf8()
}

pub struct DispatcherBuilder<P> {
    registry: Registry<P>,
    provider: P,
    default_options: ResponseOptions,
    encodings: Vec<Encoding>,
    clock: Box<dyn Clock>,
}

impl<P: Send + Sync + 'static> DispatcherBuilder<P> {
    fn new(registry: Registry<P>, provider: P) -> Self {
        Self {
            registry,
            provider,
            default_options: ResponseOptions::default(),
            encodings: vec![Encoding::Gzip],
            clock: Box::new(SystemClock),
        }
    }

    /// The options used for results that carry none.
    #[must_use]
    pub fn default_options(mut self, options: ResponseOptions) -> Self {
        self.default_options = options;
        self
    }

    /// The encodings compression may choose from, most preferred first.
    ///
    /// An empty list disables compression.
    #[must_use]
    pub fn encodings(mut self, encodings: impl IntoIterator<Item = Encoding>) -> Self {
        self.encodings.clear();
        for encoding in encodings {
            if !self.encodings.contains(&encoding) {
                self.encodings.push(encoding);
            }
        }
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn build(self) -> Dispatcher<P> {
        info!(methods = self.registry.len(), encodings = ?self.encodings, "dispatcher built");
        Dispatcher {
            registry: self.registry,
            provider: self.provider,
            pipeline: Pipeline::new(self.default_options, self.encodings, self.clock),
        }
    }
}

impl<P> fmt::Debug for DispatcherBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("registry", &self.registry)
            .field("default_options", &self.default_options)
            .field("encodings", &self.encodings)
            .finish_non_exhaustive()
    }
}
