//! A path router for HTTP requests.
//!
//! Routes are regular expressions matched against the whole request path,
//! scanned in registration order; the first match wins and its named groups
//! are handed to the route handler as [`PathParams`]. Requests that match no
//! route go to the not-found handler. Every request passes through an ordered
//! middleware chain first.
//!
//! ```no_run
//! use micro_router::{Router, middleware::SetHeader, route_fn};
//! use http::{HeaderName, HeaderValue};
//! use std::fmt::Write;
//!
//! # fn main() -> Result<(), micro_router::RouterError> {
//! let mut router = Router::builder()
//!     .route("^/help$", route_fn(|resp, _req, _params| resp.body_mut().push_str("help page")))
//!     .route(
//!         "^/product/(?P<pid>[0-9]+)$",
//!         route_fn(|resp, _req, params| {
//!             let _ = write!(resp.body_mut(), "Product ID is {}", params.get("pid").unwrap_or_default());
//!         }),
//!     )
//!     .build()?;
//!
//! router.add_middleware(SetHeader::new(HeaderName::from_static("x-custom-id"), HeaderValue::from_static("112233")));
//! # Ok(())
//! # }
//! ```
//!
//! The router does no I/O: the serving layer owns the listener and calls
//! [`Router::handle`] (or [`Handler::call`]) for each request.

mod body;
mod error;
mod request;

pub mod handler;
pub mod middleware;
pub mod pattern;
pub mod router;

pub use body::ResponseBody;
pub use error::{PatternErrorKind, PatternSyntaxError, RouterError};
pub use handler::{BoxHandler, BoxRouteHandler, Handler, NotFound, RouteHandler, handler_fn, route_fn};
pub use middleware::{Middleware, middleware_fn};
pub use pattern::RoutePattern;
pub use request::PathParams;
pub use router::{DispatchMode, Route, RouteTable, Router, RouterBuilder};
