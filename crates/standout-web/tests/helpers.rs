use axum::body::{to_bytes, Body};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use standout_web::minijinja::Value;
use standout_web::{
    handler_fn, render_template, setup, template, Error, HelperError, RenderEnvironment,
    RenderError, RequestHead, RouteTable,
};
use tower::ServiceExt;

async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn routes() -> RouteTable {
    RouteTable::new()
        .route("index", "/")
        .route("other", "/user/{name}")
        .route("uid", "/uid/{id}")
}

fn empty_handler() -> impl standout_web::Handler {
    handler_fn(|_req| async { Ok::<_, anyhow::Error>(json!({})) })
}

/// Serves `source` at `/` with the default helpers wired to `routes()`.
fn app_with(source: &str) -> Router {
    let env = RenderEnvironment::builder()
        .templates([("tmpl.html".to_string(), source.to_string())])
        .routes(routes())
        .build()
        .unwrap();
    setup(
        Router::new().route("/", get(template("tmpl.html", empty_handler()))),
        env,
    )
}

// url() reverses named routes, with and without parameters
#[tokio::test]
async fn test_url() {
    let app = app_with("{{ url('index') }}, {{ url('other', name='John_Doe') }}");
    let (status, text) = get_text(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "/, /user/John_Doe");
}

#[tokio::test]
async fn test_url_with_query() {
    let app = app_with("{{ url('index', query_={'foo': 'bar'}) }}");
    let (_, text) = get_text(app, "/").await;
    assert_eq!(text, "/?foo=bar");
}

#[tokio::test]
async fn test_url_int_param() {
    let app = app_with("{{ url('uid', id=1) }}");
    let (_, text) = get_text(app, "/").await;
    assert_eq!(text, "/uid/1");
}

// Parameters that are neither strings nor integers are rejected
#[tokio::test]
async fn test_url_param_forbidden_type() {
    async fn index(req: Request) -> Response {
        let head = RequestHead::from_request(&req);
        let err = render_template("tmpl.html", &head, &json!({}))
            .await
            .unwrap_err();
        match err {
            Error::Render(RenderError::HelperArgument(HelperError::Argument {
                name,
                kind,
                value,
            })) => {
                assert_eq!(
                    (name.as_str(), kind.as_str(), value.as_str()),
                    ("name", "bool", "true")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
        StatusCode::OK.into_response()
    }

    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ url('other', name=true) }}")])
        .routes(routes())
        .build()
        .unwrap();
    let app = setup(Router::new().route("/", get(index)), env);

    let (status, _) = get_text(app, "/").await;
    assert_eq!(status, StatusCode::OK);
}

// Without default helpers url() is an unknown symbol
#[tokio::test]
async fn test_helpers_disabled() {
    async fn index(req: Request) -> Response {
        let head = RequestHead::from_request(&req);
        let err = render_template("tmpl.html", &head, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::HelperMissing(_))));
        assert!(err.to_string().contains("url"));
        StatusCode::OK.into_response()
    }

    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ url('index') }}")])
        .default_helpers(false)
        .build()
        .unwrap();
    let app = setup(Router::new().route("/", get(index)), env);

    let (status, _) = get_text(app, "/").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_static() {
    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ static('whatever.js') }}")])
        .static_root_url("/static")
        .build()
        .unwrap();
    let app = setup(
        Router::new().route("/", get(template("tmpl.html", empty_handler()))),
        env,
    );

    let (_, text) = get_text(app, "/").await;
    assert_eq!(text, "/static/whatever.js");
}

// static() without a configured root reports the missing setting
#[tokio::test]
async fn test_static_var_missing() {
    async fn index(req: Request) -> Response {
        let head = RequestHead::from_request(&req);
        let err = render_template("tmpl.html", &head, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::StaticRootMissing)));
        assert!(err.to_string().contains("static_root_url"));
        StatusCode::OK.into_response()
    }

    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ static('whatever.js') }}")])
        .build()
        .unwrap();
    let app = setup(Router::new().route("/", get(index)), env);

    let (status, _) = get_text(app, "/").await;
    assert_eq!(status, StatusCode::OK);
}

// Custom helpers are callable as functions and as filters
#[tokio::test]
async fn test_filters() {
    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ add_2(5) }} {{ 1|add_2 }}")])
        .function("add_2", Value::from_function(|x: i64| x + 2))
        .build()
        .unwrap();
    let app = setup(
        Router::new().route("/", get(template("tmpl.html", empty_handler()))),
        env,
    );

    let (_, text) = get_text(app, "/").await;
    assert_eq!(text, "7 3");
}

// A custom helper registered under a default name replaces it
#[tokio::test]
async fn test_custom_helper_overrides_default() {
    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ url('index') }}")])
        .routes(routes())
        .function(
            "url",
            Value::from_function(|name: String| format!("custom:{}", name)),
        )
        .build()
        .unwrap();
    let app = setup(
        Router::new().route("/", get(template("tmpl.html", empty_handler()))),
        env,
    );

    let (_, text) = get_text(app, "/").await;
    assert_eq!(text, "custom:index");
}

// Handler data shadows helper globals of the same name
#[tokio::test]
async fn test_context_shadows_globals() {
    let env = RenderEnvironment::builder()
        .templates([("tmpl.html", "{{ site }}")])
        .global("site", "global")
        .build()
        .unwrap();
    let app = setup(
        Router::new().route(
            "/",
            get(template(
                "tmpl.html",
                handler_fn(|_req| async { Ok::<_, anyhow::Error>(json!({"site": "local"})) }),
            )),
        ),
        env,
    );

    let (_, text) = get_text(app, "/").await;
    assert_eq!(text, "local");
}

// One route table drives both the router and url()
#[tokio::test]
async fn test_nested_route_table() {
    let admin = RouteTable::new()
        .route("admin_index", "/")
        .route("admin_user", "/users/{id}");
    let routes = RouteTable::new().route("index", "/").nest("/admin", &admin);

    let env = RenderEnvironment::builder()
        .templates([(
            "tmpl.html",
            "{{ url('admin_index') }} {{ url('admin_user', id=7) }} {{ request.matched_path|safe }}",
        )])
        .routes(routes.clone())
        .build()
        .unwrap();

    let admin_router = Router::new().route(
        admin.pattern("admin_user").unwrap(),
        get(template("tmpl.html", empty_handler())),
    );
    let app = setup(Router::new().nest("/admin", admin_router), env);

    let (status, text) = get_text(app, "/admin/users/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "/admin /admin/users/7 /admin/users/{id}");
}
