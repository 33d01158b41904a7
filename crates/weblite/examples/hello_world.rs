use bytes::Bytes;
use http::{Method, Request};
use http_body_util::Full;
use serde_json::json;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use weblite::{Exchange, HandlerResult, Router, handler_fn};

async fn hello_world(exchange: &mut Exchange) -> HandlerResult {
    Ok(Some(json!(format!("hello {}", exchange.path_param("name").unwrap_or("world")))))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut router = Router::new();
    router.get("/hello/:name", handler_fn(hello_world)).unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/hello/earth")
        .body(Full::new(Bytes::new()))
        .unwrap();

    let response = router.dispatch(request).await;
    println!("{} {}", response.status(), String::from_utf8_lossy(response.body()));
}
