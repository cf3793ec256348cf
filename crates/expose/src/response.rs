//! The response pipeline.
//!
//! A successful [`InvocationResult`] is emitted by `Pipeline::emit`, which applies the
//! effective [`ResponseOptions`] in a fixed order: content type, `Expires`, compression, and
//! finally the payload itself. Every failure exit goes through `classify`, which either
//! answers with the failure's own status or with the opaque generic failure.
//!
//! The payload is written into an in-memory sink before the response is built, so a write
//! error never leaves a half-committed response behind.

use crate::body::ResponseBody;
use crate::clock::Clock;
use crate::encoding::{Encoding, Sink};
use crate::failure::{Failure, is_redirect};
use crate::invoke::{InvocationResult, catch_panic};
use crate::options::ResponseOptions;
use crate::payload::Payload;
use bytes::Bytes;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, EXPIRES, LOCATION};
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use std::fmt;
use std::io;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{debug, error, warn};

const GENERIC_BODY: &str = "error";
const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";

// 10000-01-01T00:00:00Z, the first instant an http date can not express
const MAX_HTTP_DATE_SECS: u64 = 253_402_300_800;

/// The pipeline stage a request left from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Resolving,
    Binding,
    Invoking,
    Emitting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::Binding => "binding",
            Stage::Invoking => "invoking",
            Stage::Emitting => "emitting",
        };
        f.write_str(name)
    }
}

/// The fixed response for every failure that carries no status of its own.
pub(crate) fn generic_failure() -> Response<ResponseBody> {
    plain(StatusCode::INTERNAL_SERVER_ERROR, ResponseBody::from(GENERIC_BODY))
}

fn plain(status: StatusCode, body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
    response
}

/// Maps a failure to its response.
///
/// Only classified failures reach the client with their message, a generic failure's detail
/// is logged and replaced by the generic body.
pub(crate) fn classify(stage: Stage, identifier: &str, failure: Failure) -> Response<ResponseBody> {
    match failure {
        Failure::Generic { message, source: Some(source) } => {
            error!(%stage, identifier, detail = %message, cause = %source, "request failed");
            generic_failure()
        }
        Failure::Generic { message, source: None } => {
            error!(%stage, identifier, detail = %message, "request failed");
            generic_failure()
        }
        Failure::Status { code, message, location } => {
            debug!(%stage, identifier, status = code.as_u16(), detail = %message, "request failed with status");
            let mut response = plain(code, ResponseBody::from(message));
            if let Some(location) = location.filter(|_| is_redirect(code)) {
                match HeaderValue::try_from(location) {
                    Ok(value) => {
                        response.headers_mut().insert(LOCATION, value);
                    }
                    Err(e) => {
                        error!(%stage, identifier, cause = %e, "invalid redirect location");
                        return generic_failure();
                    }
                }
            }
            response
        }
    }
}

/// Emits successful results, configured once per dispatcher.
pub(crate) struct Pipeline {
    defaults: ResponseOptions,
    encodings: Vec<Encoding>,
    clock: Box<dyn Clock>,
}

impl Pipeline {
    pub(crate) fn new(defaults: ResponseOptions, encodings: Vec<Encoding>, clock: Box<dyn Clock>) -> Self {
        Self { defaults, encodings, clock }
    }

    pub(crate) fn defaults(&self) -> &ResponseOptions {
        &self.defaults
    }

    pub(crate) fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    pub(crate) fn emit(
        &self,
        identifier: &str,
        method: &Method,
        request_headers: &HeaderMap,
        result: InvocationResult,
    ) -> Response<ResponseBody> {
        let (payload, options) = match result {
            InvocationResult::Failure(failure) => return classify(Stage::Invoking, identifier, failure),
            InvocationResult::Success { payload, options } => (payload, options),
        };
        let options = options.as_ref().unwrap_or(&self.defaults);
        let mut headers = HeaderMap::new();

        if let Some(content_type) = options.content_type() {
            match HeaderValue::from_str(content_type.as_ref()) {
                Ok(value) => {
                    headers.insert(CONTENT_TYPE, value);
                }
                Err(e) => {
                    error!(stage = %Stage::Emitting, identifier, cause = %e, "invalid content type");
                    return generic_failure();
                }
            }
        }

        if *method == Method::GET && options.cache() > 0 {
            match self.expires(options.cache()) {
                Some(value) => {
                    headers.insert(EXPIRES, value);
                }
                None => warn!(identifier, cache = options.cache(), "cache lifetime out of range, no Expires set"),
            }
        }

        let encoding = if options.compression() { self.negotiate(request_headers) } else { None };
        if let Some(encoding) = encoding {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.name()));
        }

        let Some(payload) = payload else {
            error!(stage = %Stage::Emitting, identifier, "method returned neither a payload nor a failure");
            return generic_failure();
        };

        let body = match catch_panic(identifier, || write_payload(payload, encoding)) {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                error!(stage = %Stage::Emitting, identifier, cause = %e, "failed to write payload");
                return generic_failure();
            }
            Err(failure) => return classify(Stage::Emitting, identifier, failure),
        };

        let mut response = Response::new(ResponseBody::once(body));
        *response.headers_mut() = headers;
        response
    }

    fn expires(&self, cache: u64) -> Option<HeaderValue> {
        let at = self.clock.now().checked_add(Duration::from_secs(cache))?;
        let secs = at.duration_since(UNIX_EPOCH).ok()?.as_secs();
        if secs >= MAX_HTTP_DATE_SECS {
            return None;
        }
        HeaderValue::from_str(&httpdate::fmt_http_date(at)).ok()
    }

    fn negotiate(&self, request_headers: &HeaderMap) -> Option<Encoding> {
        request_headers
            .get_all(ACCEPT_ENCODING)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|accept_encoding| Encoding::negotiate(accept_encoding, &self.encodings))
    }
}

fn write_payload(payload: Box<dyn Payload>, encoding: Option<Encoding>) -> io::Result<Bytes> {
    let mut sink = Sink::new(encoding)?;
    payload.write_to(&mut sink)?;
    sink.finish()
}
