//! Route table, router construction and request dispatch.
//!
//! Routes are kept in a fixed ordered sequence and scanned front to back: the
//! first route whose pattern matches the whole request path wins. There is no
//! specificity ranking, registration order is the only tie breaker. When no
//! route matches, the not-found handler runs.
//!
//! Every request first passes through the middleware chain. The chain is
//! composed on first use and cached until the router is mutated again, which
//! needs `&mut Router` and therefore cannot happen once the router is shared
//! with the serving layer.

use crate::handler::{BoxHandler, BoxRouteHandler, Handler, NotFound, RouteHandler};
use crate::middleware::{self, Middleware};
use crate::pattern::{self, RoutePattern};
use crate::{PathParams, ResponseBody, RouterError};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response, StatusCode};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, error, info, trace, warn};

const INCOMPLETE_BODY: &str = "500 Internal Server Error";

/// How a matched route handler is run.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// the handler is awaited on the task serving the request
    #[default]
    Inline,
    /// the handler runs on its own tokio task, which the serving task awaits
    ///
    /// The handler sees a copy of the request without its extensions. A
    /// panic inside the handler is resumed on the serving task. If the task
    /// is cancelled instead, e.g. by a runtime shutdown, the response becomes
    /// `500 Internal Server Error`. Outside a tokio runtime this falls back
    /// to [`DispatchMode::Inline`].
    Spawned,
}

/// A compiled route: a pattern bound to the handler it dispatches to.
pub struct Route {
    pattern: RoutePattern,
    handler: BoxRouteHandler,
}

impl Route {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RouteHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("pattern", &self.pattern.as_str()).finish_non_exhaustive()
    }
}

/// The ordered input of a router: pattern text mapped to its handler.
///
/// Patterns keep the position of their first insertion. Inserting a pattern
/// that is already present replaces its handler in place, so a table never
/// holds two routes with the same pattern text.
#[derive(Default)]
pub struct RouteTable {
    entries: Vec<(String, BoxRouteHandler)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handler` for `pattern`, returning the handler it replaced.
    pub fn insert<H>(&mut self, pattern: impl Into<String>, handler: H) -> Option<BoxRouteHandler>
    where
        H: RouteHandler + 'static,
    {
        self.insert_shared(pattern, Arc::new(handler))
    }

    pub fn insert_shared(&mut self, pattern: impl Into<String>, handler: BoxRouteHandler) -> Option<BoxRouteHandler> {
        let pattern = pattern.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == pattern) {
            Some((_, slot)) => {
                debug!(pattern = %pattern, "replacing route handler");
                Some(std::mem::replace(slot, handler))
            }
            None => {
                self.entries.push((pattern, handler));
                None
            }
        }
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.iter().any(|(existing, _)| existing == pattern)
    }

    /// registered patterns, in table order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(pattern, _)| pattern.as_str())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.patterns()).finish()
    }
}

impl IntoIterator for RouteTable {
    type Item = (String, BoxRouteHandler);
    type IntoIter = std::vec::IntoIter<(String, BoxRouteHandler)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<P, H> Extend<(P, H)> for RouteTable
where
    P: Into<String>,
    H: RouteHandler + 'static,
{
    fn extend<T: IntoIterator<Item = (P, H)>>(&mut self, iter: T) {
        for (pattern, handler) in iter {
            self.insert(pattern, handler);
        }
    }
}

impl<P, H> FromIterator<(P, H)> for RouteTable
where
    P: Into<String>,
    H: RouteHandler + 'static,
{
    fn from_iter<T: IntoIterator<Item = (P, H)>>(iter: T) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

/// Configures and builds a [`Router`].
pub struct RouterBuilder {
    table: RouteTable,
    not_found: BoxHandler,
    middlewares: Vec<Arc<dyn Middleware>>,
    dispatch: DispatchMode,
    size_limit: usize,
}

impl RouterBuilder {
    fn new() -> Self {
        Self {
            table: RouteTable::new(),
            not_found: Arc::new(NotFound),
            middlewares: Vec::new(),
            dispatch: DispatchMode::default(),
            size_limit: pattern::DEFAULT_SIZE_LIMIT,
        }
    }

    pub fn route<H: RouteHandler + 'static>(mut self, pattern: impl Into<String>, handler: H) -> Self {
        self.table.insert(pattern, handler);
        self
    }

    /// adds every entry of `table`, in its iteration order
    pub fn routes<I, P, H>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (P, H)>,
        P: Into<String>,
        H: RouteHandler + 'static,
    {
        self.table.extend(table);
        self
    }

    pub fn not_found<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.not_found = Arc::new(handler);
        self
    }

    /// appends a middleware, the first one appended runs outermost
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// upper bound, in bytes, of the compiled program of a single pattern
    pub fn pattern_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Compiles every pattern and builds the router.
    ///
    /// # Errors
    ///
    /// Fails on the first pattern that does not compile; no router is
    /// produced in that case.
    pub fn build(self) -> Result<Router, RouterError> {
        let mut routes = Vec::with_capacity(self.table.len());
        for (pattern, handler) in self.table {
            let pattern = RoutePattern::compile_with_limit(pattern, self.size_limit)
                .inspect_err(|e| error!(pattern = e.pattern(), cause = %e, "failed to compile route pattern"))?;
            routes.push(Route { pattern, handler });
        }

        info!(routes = routes.len(), middlewares = self.middlewares.len(), "router built");

        Ok(Router {
            routes: routes.into(),
            not_found: self.not_found,
            middlewares: self.middlewares,
            dispatch: self.dispatch,
            chain: OnceCell::new(),
        })
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("table", &self.table)
            .field("middlewares", &self.middlewares.len())
            .field("dispatch", &self.dispatch)
            .field("size_limit", &self.size_limit)
            .finish_non_exhaustive()
    }
}

/// Path router with an ordered middleware chain.
///
/// `Router` is itself a [`Handler`]: the serving layer calls it once per
/// request, concurrently, usually through an `Arc<Router>`.
pub struct Router {
    routes: Arc<[Route]>,
    not_found: BoxHandler,
    middlewares: Vec<Arc<dyn Middleware>>,
    dispatch: DispatchMode,
    chain: OnceCell<BoxHandler>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Builds a router from `table` with default settings.
    ///
    /// Routes are scanned in the iteration order of `table`. Pass an ordered
    /// collection (a [`RouteTable`], a `Vec`, a `BTreeMap`) when patterns may
    /// overlap: the iteration order of a `HashMap` is unspecified, and so is
    /// the route order built from it.
    ///
    /// # Errors
    ///
    /// Fails if any pattern does not compile.
    pub fn new<I, P, H>(table: I) -> Result<Self, RouterError>
    where
        I: IntoIterator<Item = (P, H)>,
        P: Into<String>,
        H: RouteHandler + 'static,
    {
        Self::builder().routes(table).build()
    }

    /// Appends a middleware to the chain, outside-in.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
        self.chain.take();
    }

    pub fn set_not_found_handler<H: Handler + 'static>(&mut self, handler: H) {
        self.not_found = Arc::new(handler);
        self.chain.take();
    }

    pub fn set_dispatch_mode(&mut self, dispatch: DispatchMode) {
        self.dispatch = dispatch;
        self.chain.take();
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.dispatch
    }

    /// the compiled routes, in scan order
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Finds the route a request for `path` dispatches to, with its captures.
    pub fn find(&self, path: &str) -> Option<(&Route, PathParams)> {
        find_route(&self.routes, path)
    }

    /// Handles `req` with a fresh `200 OK` response and returns it.
    pub async fn handle(&self, req: &Request<Bytes>) -> Response<ResponseBody> {
        let mut resp = Response::new(ResponseBody::empty());
        self.call(&mut resp, req).await;
        resp
    }

    fn chain(&self) -> &BoxHandler {
        self.chain.get_or_init(|| {
            trace!(middlewares = self.middlewares.len(), "composing middleware chain");
            let scan = RouteScan {
                routes: Arc::clone(&self.routes),
                not_found: Arc::clone(&self.not_found),
                dispatch: self.dispatch,
            };
            middleware::compose(&self.middlewares, Arc::new(scan))
        })
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>) {
        if self.middlewares.is_empty() {
            scan(&self.routes, &*self.not_found, self.dispatch, resp, req).await;
        } else {
            self.chain().call(resp, req).await;
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("middlewares", &self.middlewares.len())
            .field("dispatch", &self.dispatch)
            .finish_non_exhaustive()
    }
}

/// The innermost handler of a middleware chain.
struct RouteScan {
    routes: Arc<[Route]>,
    not_found: BoxHandler,
    dispatch: DispatchMode,
}

#[async_trait]
impl Handler for RouteScan {
    async fn call(&self, resp: &mut Response<ResponseBody>, req: &Request<Bytes>) {
        scan(&self.routes, &*self.not_found, self.dispatch, resp, req).await;
    }
}

fn find_route<'r>(routes: &'r [Route], path: &str) -> Option<(&'r Route, PathParams)> {
    routes.iter().find_map(|route| route.pattern.captures(path).map(|params| (route, params)))
}

async fn scan(
    routes: &[Route],
    not_found: &dyn Handler,
    dispatch: DispatchMode,
    resp: &mut Response<ResponseBody>,
    req: &Request<Bytes>,
) {
    let path = req.uri().path();
    match find_route(routes, path) {
        Some((route, params)) => {
            debug!(pattern = route.pattern.as_str(), path, "route matched");
            dispatch_to(dispatch, route, resp, req, params).await;
        }
        None => {
            debug!(path, "no route matched, falling back to not-found handler");
            not_found.call(resp, req).await;
        }
    }
}

async fn dispatch_to(
    dispatch: DispatchMode,
    route: &Route,
    resp: &mut Response<ResponseBody>,
    req: &Request<Bytes>,
    params: PathParams,
) {
    let runtime = match dispatch {
        DispatchMode::Inline => None,
        DispatchMode::Spawned => match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime),
            Err(e) => {
                warn!(cause = %e, "spawned dispatch needs a tokio runtime, running handler inline");
                None
            }
        },
    };

    let Some(runtime) = runtime else {
        route.handler.handle(resp, req, &params).await;
        return;
    };

    let handler = Arc::clone(&route.handler);
    let req = clone_request(req);
    let mut spawned_resp = std::mem::take(resp);
    let task = runtime.spawn(async move {
        handler.handle(&mut spawned_resp, &req, &params).await;
        spawned_resp
    });

    complete(resp, task.await);
}

/// Moves the response of a spawned handler back into `resp`.
fn complete(resp: &mut Response<ResponseBody>, joined: Result<Response<ResponseBody>, JoinError>) {
    match joined {
        Ok(done) => *resp = done,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            error!(cause = %e, "route handler task did not complete");
            let mut failed = Response::new(ResponseBody::from(INCOMPLETE_BODY));
            *failed.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            failed.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
            *resp = failed;
        }
    }
}

fn clone_request(req: &Request<Bytes>) -> Request<Bytes> {
    let mut cloned = Request::new(req.body().clone());
    *cloned.method_mut() = req.method().clone();
    *cloned.uri_mut() = req.uri().clone();
    *cloned.version_mut() = req.version();
    *cloned.headers_mut() = req.headers().clone();
    cloned
}
