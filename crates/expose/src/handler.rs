//! The boundary to an http transport.
//!
//! Listening, connection handling and request body reading are left to the transport. It
//! hands each request to a [`Handler`] and writes back the response it gets.

use crate::ResponseBody;
use crate::dispatcher::Dispatcher;
use async_trait::async_trait;
use http::{Request, Response};
use http_body::Body;
use std::convert::Infallible;
use std::error::Error;

#[async_trait]
pub trait Handler<ReqBody> {
    type RespBody: Body;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// The request body is never read, params only come from the query string.
#[async_trait]
impl<P, ReqBody> Handler<ReqBody> for Dispatcher<P>
where
    P: Send + Sync + 'static,
    ReqBody: Send + 'static,
{
    type RespBody = ResponseBody;
    type Error = Infallible;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        Ok(self.serve(&req))
    }
}
