//! Handler capabilities.
//!
//! Two shapes exist:
//! - [`Handler`]: takes the response sink and the request. This is the shape of
//!   the not-found handler, of every handler produced by a middleware, and of
//!   the [`Router`](crate::Router) itself.
//! - [`RouteHandler`]: additionally receives the [`PathParams`] captured by the
//!   matched route pattern.
//!
//! Handlers return nothing: they mutate the response in place.

use crate::{PathParams, ResponseBody};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Request, Response, StatusCode};
use std::fmt;
use std::sync::Arc;

/// A shared, type erased [`Handler`], as passed along a middleware chain.
pub type BoxHandler = Arc<dyn Handler>;

/// A shared, type erased [`RouteHandler`].
pub type BoxRouteHandler = Arc<dyn RouteHandler>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>);
}

#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>, params: &PathParams);
}

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>) {
        (**self).call(resp, req).await;
    }
}

#[async_trait]
impl<H: RouteHandler + ?Sized> RouteHandler for Arc<H> {
    async fn handle(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>, params: &PathParams) {
        (**self).handle(resp, req, params).await;
    }
}

/// Adapts a synchronous closure into a [`Handler`]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Response<ResponseBody>, &Request<Bytes>) + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut Response<ResponseBody>, &Request<Bytes>) + Send + Sync,
{
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>) {
        (self.f)(resp, req);
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Adapts a synchronous closure into a [`RouteHandler`]
pub struct FnRouteHandler<F> {
    f: F,
}

pub fn route_fn<F>(f: F) -> FnRouteHandler<F>
where
    F: Fn(&mut Response<ResponseBody>, &Request<Bytes>, &PathParams) + Send + Sync,
{
    FnRouteHandler { f }
}

#[async_trait]
impl<F> RouteHandler for FnRouteHandler<F>
where
    F: Fn(&mut Response<ResponseBody>, &Request<Bytes>, &PathParams) + Send + Sync,
{
    async fn handle(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>, params: &PathParams) {
        (self.f)(resp, req, params);
    }
}

impl<F> fmt::Debug for FnRouteHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnRouteHandler")
    }
}

/// The default not-found handler: status 404 with the body `404 Not Found`.
#[derive(Default, Clone, Copy, Debug)]
pub struct NotFound;

impl NotFound {
    pub const BODY: &'static str = "404 Not Found";
}

#[async_trait]
impl Handler for NotFound {
    async fn call(&self, resp: &mut Response<ResponseBody>, _req: &Request<Bytes>) {
        *resp.status_mut() = StatusCode::NOT_FOUND;
        resp.headers_mut().insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        resp.body_mut().set(Self::BODY);
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxHandler, BoxRouteHandler, Handler, NotFound, RouteHandler, handler_fn, route_fn};
    use crate::{PathParams, ResponseBody};
    use bytes::Bytes;
    use http::{Request, Response, StatusCode};
    use std::fmt::Write;
    use std::sync::Arc;

    fn assert_is_handler<T: Handler>(_handler: &T) {
        // no op
    }

    fn assert_is_route_handler<T: RouteHandler>(_handler: &T) {
        // no op
    }

    fn request(path: &str) -> Request<Bytes> {
        Request::builder().uri(path).body(Bytes::new()).unwrap()
    }

    #[test]
    fn assert_fns_are_handlers() {
        let handler = handler_fn(|resp, _req| resp.body_mut().push_str("hi"));
        assert_is_handler(&handler);

        let boxed: BoxHandler = Arc::new(handler);
        assert_is_handler(&boxed);

        let route_handler = route_fn(|_resp, _req, _params| {});
        assert_is_route_handler(&route_handler);

        let boxed: BoxRouteHandler = Arc::new(route_handler);
        assert_is_route_handler(&boxed);
    }

    #[tokio::test]
    async fn test_route_fn_receives_params() {
        let handler = route_fn(|resp, _req, params| {
            write!(resp.body_mut(), "Product ID is {}", params.get("pid").unwrap_or_default()).unwrap();
        });

        let params: PathParams = [("pid", "135")].into_iter().collect();
        let mut resp = Response::new(ResponseBody::empty());
        handler.handle(&mut resp, &request("/product/135"), &params).await;

        assert_eq!(resp.body().as_bytes(), b"Product ID is 135");
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut resp = Response::new(ResponseBody::from("partial output"));
        NotFound.call(&mut resp, &request("/nowhere")).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.body().as_bytes(), b"404 Not Found");
        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }
}
