use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use micro_router::middleware::SetHeader;
use micro_router::{
    BoxRouteHandler, PatternErrorKind, ResponseBody, RouteTable, Router, RouterError, middleware_fn, route_fn,
};
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn request(path: &str) -> Request<Bytes> {
    Request::builder().method(Method::GET).uri(path).body(Bytes::new()).unwrap()
}

fn text(resp: &Response<ResponseBody>) -> String {
    String::from_utf8(resp.body().as_bytes().to_vec()).unwrap()
}

fn page(body: &'static str) -> BoxRouteHandler {
    Arc::new(route_fn(move |resp, _req, _params| resp.body_mut().push_str(body)))
}

#[test]
fn test_new_router() {
    let mut routes: HashMap<&str, BoxRouteHandler> = HashMap::new();
    routes.insert("^/help$", page(""));
    routes.insert("^/contact$", page(""));

    let router = Router::new(routes).unwrap();

    assert_eq!(router.len(), 2);
    for route in router.routes() {
        let pattern = route.pattern().as_str();
        assert!(pattern == "^/help$" || pattern == "^/contact$", "unexpected route pattern '{pattern}'");
    }
}

#[test]
fn test_new_router_with_broken_pattern() {
    let mut routes: HashMap<&str, BoxRouteHandler> = HashMap::new();
    routes.insert("^/help$", page("help"));
    routes.insert("a broken regex???", page("broken"));

    match Router::new(routes) {
        Err(RouterError::Pattern(e)) => {
            assert_eq!(e.pattern(), "a broken regex???");
            assert!(matches!(e.kind(), PatternErrorKind::NestedRepetition { .. }), "{e}");
        }
        Ok(router) => panic!("expected router construction to fail, got {router:?}"),
    }
}

#[test]
fn test_new_router_with_unclosed_group() {
    let routes = vec![("^/help$", page("help")), ("^/product/(?P<pid>[0-9]+$", page("product"))];

    let Err(RouterError::Pattern(e)) = Router::new(routes) else {
        panic!("router must not build with an unclosed group");
    };
    assert!(matches!(e.kind(), PatternErrorKind::Syntax(_)), "{e}");
}

#[tokio::test]
async fn test_routing() {
    let router = Router::builder()
        .route("^/help$", page("Hello from the help page!"))
        .route("^/another/page$", page("Hello from another page!"))
        .build()
        .unwrap();

    let resp = router.handle(&request("/help")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(&resp), "Hello from the help page!");

    let resp = router.handle(&request("/another/page")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(&resp), "Hello from another page!");
}

#[tokio::test]
async fn test_routing_passes_empty_params_for_plain_patterns() {
    let seen = Arc::new(Mutex::new(None));
    let record = Arc::clone(&seen);

    let router = Router::builder()
        .route("^/help$", route_fn(move |_resp, _req, params| *record.lock().unwrap() = Some(params.clone())))
        .route("^/contact$", page("contact"))
        .build()
        .unwrap();

    router.handle(&request("/help")).await;

    let params = seen.lock().unwrap().take().expect("help handler should have run");
    assert!(params.is_empty());
}

#[tokio::test]
async fn test_routing_with_params() {
    let router = Router::builder()
        .route("^/product$", page("Hello from the product page!"))
        .route(
            "^/product/(?P<pid>[0-9]+)$",
            route_fn(|resp, _req, params| {
                write!(resp.body_mut(), "Product ID is {}", params.get("pid").unwrap_or_default()).unwrap();
            }),
        )
        .build()
        .unwrap();

    let resp = router.handle(&request("/product/135")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(&resp), "Product ID is 135");

    let resp = router.handle(&request("/product")).await;
    assert_eq!(text(&resp), "Hello from the product page!");
}

#[tokio::test]
async fn test_routing_not_found() {
    let router = Router::builder().route("^/page$", page("Hello from a page!")).build().unwrap();

    let resp = router.handle(&request("/a/not/found/page")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(&resp), "404 Not Found");

    let resp = router.handle(&request("/nowhere")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(text(&resp), "404 Not Found");
}

#[tokio::test]
async fn test_not_found_runs_no_route_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let router = Router::builder()
        .route(
            "^/page$",
            route_fn(move |_resp, _req, _params| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .build()
        .unwrap();

    router.handle(&request("/page/")).await;
    router.handle(&request("/pages")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    router.handle(&request("/page")).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_middlewares() {
    let mut router = Router::builder().route("^/page$", page("ok")).build().unwrap();

    router.add_middleware(SetHeader::new(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json")));
    router.add_middleware(SetHeader::new(HeaderName::from_static("x-custom-id"), HeaderValue::from_static("112233")));

    for _ in 0..3 {
        let resp = router.handle(&request("/page")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(text(&resp), "ok");
        assert_eq!(resp.headers()["x-custom-id"], "112233");
        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/json");
    }
}

#[tokio::test]
async fn test_pass_through_middleware_is_transparent() {
    let plain = Router::builder().route("^/page$", page("Hello from a page!")).build().unwrap();
    let chained = Router::builder()
        .route("^/page$", page("Hello from a page!"))
        .middleware(middleware_fn(|next| next))
        .build()
        .unwrap();
    assert_eq!(plain.middleware_count(), 0);
    assert_eq!(chained.middleware_count(), 1);

    for path in ["/page", "/elsewhere"] {
        let a = plain.handle(&request(path)).await;
        let b = chained.handle(&request(path)).await;

        assert_eq!(a.status(), b.status());
        assert_eq!(a.headers(), b.headers());
        assert_eq!(text(&a), text(&b));
    }
}

#[tokio::test]
async fn test_route_table_input() {
    let mut table = RouteTable::new();
    table.insert("^/help$", route_fn(|resp, _req, _params| resp.body_mut().push_str("help")));
    table.insert(
        "^/category/(?P<cid>[0-9]+)$",
        route_fn(|resp, _req, params| {
            write!(resp.body_mut(), "Category ID is {}", params.get("cid").unwrap_or_default()).unwrap();
        }),
    );

    let router = Router::new(table).unwrap();
    assert_eq!(text(&router.handle(&request("/category/42")).await), "Category ID is 42");
    assert_eq!(text(&router.handle(&request("/help")).await), "help");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests() {
    let router = Arc::new(
        Router::builder()
            .route(
                "^/product/(?P<pid>[0-9]+)$",
                route_fn(|resp, _req, params| {
                    write!(resp.body_mut(), "{}", params.get("pid").unwrap_or_default()).unwrap();
                }),
            )
            .middleware(SetHeader::new(HeaderName::from_static("x-router"), HeaderValue::from_static("micro")))
            .build()
            .unwrap(),
    );

    let tasks = (0..64).map(|id| {
        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let resp = router.handle(&request(&format!("/product/{id}"))).await;
            (id, resp)
        })
    });

    for joined in futures::future::join_all(tasks).await {
        let (id, resp) = joined.unwrap();
        assert_eq!(text(&resp), id.to_string());
        assert_eq!(resp.headers()["x-router"], "micro");
    }
}
