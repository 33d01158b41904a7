use bytes::Bytes;
use http::{Method, Request, Response, header};
use http_body_util::Full;
use serde::Deserialize;
use serde_json::json;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use weblite::binder::{Args, ParamSpec, TargetType, bound_fn};
use weblite::{DispatchError, Exchange, HandlerResult, RouteGroup, Router, before_fn};

#[derive(Deserialize, Debug)]
struct User {
    name: String,
    email: String,
}

async fn hello(_exchange: &mut Exchange, _args: Args) -> HandlerResult {
    Ok(Some(json!("Hello World")))
}

async fn delayed(_exchange: &mut Exchange, _args: Args) -> HandlerResult {
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    Ok(Some(json!("Waited 50ms")))
}

async fn no_content(_exchange: &mut Exchange, _args: Args) -> HandlerResult {
    Ok(None)
}

async fn params(_exchange: &mut Exchange, args: Args) -> HandlerResult {
    Ok(Some(json!(format!(
        "required={} optional={:?}",
        args.bool(0).unwrap_or_default(),
        args.str(1),
    ))))
}

async fn create_user(_exchange: &mut Exchange, args: Args) -> HandlerResult {
    let user: User = args.decode(0).map_err(DispatchError::handler)?;
    Ok(Some(json!(format!("created {} <{}>", user.name, user.email))))
}

async fn panel(_exchange: &mut Exchange, _args: Args) -> HandlerResult {
    Ok(Some(json!("admin panel")))
}

async fn admin_only(exchange: &mut Exchange) -> Result<(), DispatchError> {
    if exchange.header("x-admin").is_some() {
        Ok(())
    } else {
        Err(DispatchError::forbidden("admins only"))
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut router = Router::new();
    router
        .mount(
            RouteGroup::new("/hello")
                .get("", Vec::new(), bound_fn(hello))
                .get("/delay", Vec::new(), bound_fn(delayed))
                .get("/gone", Vec::new(), bound_fn(no_content))
                .get(
                    "/params",
                    vec![
                        ParamSpec::query("required").typed(TargetType::Bool).with_default(false),
                        ParamSpec::query("optional").optional(),
                    ],
                    bound_fn(params),
                )
                .post("/user", vec![ParamSpec::body()], bound_fn(create_user)),
        )
        .unwrap();

    // decorators wrap routes registered after them, so the guard stays off
    // the /hello group above
    router.decorate(before_fn(admin_only));
    router.mount(RouteGroup::new("/admin").get("/panel", Vec::new(), bound_fn(panel))).unwrap();

    show("GET /hello", router.dispatch(get("/hello")).await);
    show("GET /hello/delay", router.dispatch(get("/hello/delay")).await);
    show("GET /hello/gone", router.dispatch(get("/hello/gone")).await);
    show("GET /hello/params", router.dispatch(get("/hello/params?required=true")).await);
    show(
        "POST /hello/user",
        router
            .dispatch(post_json("/hello/user", r#"{"name":"ada","email":"ada@example.org"}"#))
            .await,
    );
    show("GET /admin/panel (anonymous)", router.dispatch(get("/admin/panel")).await);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/admin/panel")
        .header("x-admin", "1")
        .body(Full::new(Bytes::new()))
        .unwrap();
    show("GET /admin/panel (admin)", router.dispatch(request).await);
}

fn get(uri: &str) -> Request<Full<Bytes>> {
    Request::builder().method(Method::GET).uri(uri).body(Full::new(Bytes::new())).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_owned())))
        .unwrap()
}

fn show(label: &str, response: Response<Bytes>) {
    println!("{label} -> {} {}", response.status(), String::from_utf8_lossy(response.body()));
}
