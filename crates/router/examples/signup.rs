//! Builds a small router and drives it with in-memory requests.
//!
//! run with `cargo run --example signup`

use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use micro_router::decode::{Decode, MultipartForm};
use micro_router::extract::{Form, Json, Locals, Query};
use micro_router::middleware::{Next, logger, middleware_fn, recovery};
use micro_router::responder::Redirect;
use micro_router::router::{get, post};
use micro_router::{PathParams, ReqBody, Request, RequestExt, Responder, Router, handler_fn};
use serde::{Deserialize, Serialize};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Default, Decode, Serialize, Deserialize)]
struct Signup {
    #[form = "email,required"]
    email: String,
    #[serde(rename = "display")]
    display_name: String,
    age: Option<u8>,
    interests: Vec<String>,
}

#[derive(Debug, Default, Decode)]
struct Paging {
    page: u32,
    #[query = "per_page"]
    size: Option<u32>,
}

#[derive(Serialize)]
struct Account {
    id: String,
    owner: String,
}

async fn create_account(Form(signup): Form<Signup>) -> (StatusCode, String) {
    info!(?signup, "signup received");
    (StatusCode::CREATED, format!("welcome {} <{}>", signup.display_name, signup.email))
}

async fn show_account(params: PathParams, locals: Locals) -> Json<Account> {
    Json(Account {
        id: params.get("id").unwrap_or_default().to_owned(),
        owner: locals.get_cloned::<String>("user").unwrap_or_default(),
    })
}

async fn upload_avatar(form: MultipartForm) -> (StatusCode, String) {
    match form.file("avatar") {
        Some(file) => (StatusCode::CREATED, format!("stored {} ({} bytes)", file.file_name(), file.len())),
        None => (StatusCode::BAD_REQUEST, "no avatar sent".to_owned()),
    }
}

async fn list_accounts(Query(paging): Query<Paging>) -> String {
    format!("page {} of size {}", paging.page, paging.size.unwrap_or(20))
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let auth = middleware_fn(|req: Request, next: Next| async move {
        match req.headers().get("x-user").and_then(|value| value.to_str().ok()).map(str::to_owned) {
            Some(user) => {
                req.set_local("user", user);
                next.invoke(req).await
            }
            None => (StatusCode::UNAUTHORIZED, "login first").response_to(),
        }
    });

    let router = match Router::builder()
        .with_global_middleware(recovery())
        .with_global_middleware(logger())
        .route("/signup", post(handler_fn(create_account)))
        .route("/join", get(handler_fn(|| async { Redirect::permanent("/signup") })))
        .group("/accounts", |accounts| {
            accounts
                .with_middleware(auth)
                .route("/", get(handler_fn(list_accounts)))
                .route("/{id}", get(handler_fn(show_account)))
                .route("/{id}/avatar", post(handler_fn(upload_avatar)))
        })
        .build()
    {
        Ok(router) => router,
        Err(e) => {
            error!(cause = %e, "invalid routes");
            return;
        }
    };

    for route in router.routes() {
        info!(method = %route.method, path = %route.path, middlewares = route.middleware_count, "route");
    }

    let requests = [
        http::Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(ReqBody::from("email=ann%40example.com&display=Ann&age=41&interests=rust,http")),
        http::Request::builder()
            .method(Method::POST)
            .uri("/signup")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(ReqBody::from("display=Nobody")),
        http::Request::builder().uri("/accounts/?page=2&per_page=50").header("x-user", "ann").body(ReqBody::empty()),
        http::Request::builder().uri("/accounts/42").header("x-user", "ann").body(ReqBody::empty()),
        http::Request::builder().uri("/accounts/42").body(ReqBody::empty()),
        http::Request::builder()
            .method(Method::POST)
            .uri("/accounts/42/avatar")
            .header("x-user", "ann")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=AVATAR")
            .body(ReqBody::from(concat!(
                "--AVATAR\r\n",
                "Content-Disposition: form-data; name=\"avatar\"; filename=\"ann.png\"\r\n",
                "Content-Type: image/png\r\n\r\n",
                "not really a png\r\n",
                "--AVATAR--\r\n",
            ))),
        http::Request::builder().uri("/join").body(ReqBody::empty()),
        http::Request::builder().uri("/missing").body(ReqBody::empty()),
    ];

    for req in requests {
        let req = match req {
            Ok(req) => req,
            Err(e) => {
                error!(cause = %e, "invalid request");
                continue;
            }
        };

        let resp = router.dispatch(req).await;
        let status = resp.status();
        match resp.into_body().collect().await {
            Ok(body) => info!(%status, body = %String::from_utf8_lossy(&body.to_bytes()), "response"),
            Err(e) => error!(%status, cause = %e, "read response body failed"),
        }
    }
}
