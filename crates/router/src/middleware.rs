//! Middleware: decorators around a [`Handler`].
//!
//! A middleware receives the `next` handler and returns a handler wrapping
//! it. A chain `[m0, m1, .., mn]` is composed so that `m0` is outermost:
//! `m0(m1(..mn(terminal)))`. The outermost middleware runs first and decides
//! whether and when the rest of the chain runs.

use crate::ResponseBody;
use crate::handler::{BoxHandler, Handler};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderName, HeaderValue, Request, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};

#[cfg_attr(test, mockall::automock)]
pub trait Middleware: Send + Sync {
    /// wrap `next` into another handler
    fn wrap(&self, next: BoxHandler) -> BoxHandler;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        (**self).wrap(next)
    }
}

/// Folds `middlewares` around `terminal`, first element outermost.
pub fn compose<'a, I>(middlewares: I, terminal: BoxHandler) -> BoxHandler
where
    I: IntoIterator<Item = &'a Arc<dyn Middleware>>,
    I::IntoIter: DoubleEndedIterator,
{
    middlewares.into_iter().rev().fold(terminal, |next, middleware| middleware.wrap(next))
}

pub struct MiddlewareFn<F> {
    f: F,
}

/// Adapts a `Fn(next) -> handler` closure into a [`Middleware`]
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync,
{
    MiddlewareFn { f }
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(BoxHandler) -> BoxHandler + Send + Sync,
{
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        (self.f)(next)
    }
}

impl<F> fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MiddlewareFn")
    }
}

/// Sets a response header, then calls the next handler.
///
/// Handlers further down the chain may still overwrite the header.
#[derive(Clone, Debug)]
pub struct SetHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl SetHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl Middleware for SetHeader {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(SetHeaderHandler { name: self.name.clone(), value: self.value.clone(), next })
    }
}

struct SetHeaderHandler {
    name: HeaderName,
    value: HeaderValue,
    next: BoxHandler,
}

#[async_trait]
impl Handler for SetHeaderHandler {
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>) {
        resp.headers_mut().insert(self.name.clone(), self.value.clone());
        self.next.call(resp, req).await;
    }
}

/// Logs every request that passes through it.
///
/// The rest of the chain runs inside an `http_request` span; once it returns
/// an event with the response status and the elapsed time is emitted.
#[derive(Default, Clone, Copy, Debug)]
pub struct Trace;

impl Middleware for Trace {
    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        Arc::new(TraceHandler { next })
    }
}

struct TraceHandler {
    next: BoxHandler,
}

#[async_trait]
impl Handler for TraceHandler {
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>) {
        let span = info_span!("http_request", method = %req.method(), path = %req.uri().path());
        let start = Instant::now();

        self.next.call(resp, req).instrument(span.clone()).await;

        span.in_scope(|| info!(status = resp.status().as_u16(), elapsed = ?start.elapsed(), "request finished"));
    }
}
