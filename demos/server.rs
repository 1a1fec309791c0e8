//! Demo server exercising the render helpers
//!
//! `cargo run --example server`, then:
//!
//! ```text
//! curl -i 'localhost:3000/users?page=2&per_page=3'
//! curl -i -H 'accept: text/html' localhost:3000/users/2
//! curl -i 'localhost:3000/users?page=9'
//! curl -i -H 'accept: application/xml' localhost:3000/users/4
//! curl -i -H 'content-type: application/x-www-form-urlencoded' -d 'id=99&name=Zoe' localhost:3000/users
//! curl -N -H 'accept: text/event-stream' localhost:3000/events
//! curl -i -H 'range: bytes=0-63' localhost:3000/files/Cargo.toml
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{Either, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, Version};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use hyper_render::http::{inline, server_error, HttpResponse};
use hyper_render::render::stream;
use hyper_render::render::{channel, EventBody};
use hyper_render::{
    logger, ApiError, DecodeError, HttpError, Pagination, Param, Render, RenderConfig,
};

type DemoBody = Either<Full<Bytes>, EventBody>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Debug, Serialize)]
struct Tick {
    n: u32,
}

const USER_HTML: &str = "<h1>{{ name }}</h1><p>#{{ id }}</p>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RenderConfig::load_from("render")?;
    logger::init(&config.logging)?;

    let mut render = Render::new(config);
    render.error_map_mut().insert_with(
        |e: &DecodeError| matches!(e, DecodeError::UnknownContentType),
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
    );
    render
        .html_templates_mut()
        .add_template("user.html", USER_HTML)?;
    let render = Arc::new(render);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    println!("[DEMO] Listening on http://127.0.0.1:3000");

    loop {
        let (stream, _) = listener.accept().await?;
        let render = Arc::clone(&render);
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle(req, Arc::clone(&render)));
            if let Err(e) = http1::Builder::new()
                .keep_alive(true)
                .serve_connection(io, service)
                .await
            {
                logger::log_error(&format!("Connection error: {e}"));
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    render: Arc<Render>,
) -> Result<Response<DemoBody>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let resp = match (&method, path.as_str()) {
        (&Method::GET, "/users") => list_users(&render, &req),
        (&Method::POST, "/users") => create_user(&render, req).await,
        (&Method::GET, "/events") => return Ok(events(req.version()).await),
        (&Method::GET, p) if p.starts_with("/users/") => show_user(&render, &req, &p[7..]),
        (&Method::GET, p) if p.starts_with("/files/") && !p.contains("..") => {
            inline(&req, &p[7..]).await
        }
        _ => render.error(&req, &ApiError::NotFound, &[]),
    };
    Ok(resp.map(Either::Left))
}

fn all_users() -> Vec<User> {
    ["Ana", "Ben", "Cleo", "Dan", "Eve", "Finn", "Gus", "Hana", "Ivo", "Jade"]
        .iter()
        .zip(1..)
        .map(|(name, id)| User {
            id,
            name: (*name).to_string(),
        })
        .collect()
}

fn list_users(render: &Render, req: &Request<Incoming>) -> HttpResponse {
    let users = all_users();
    let total = u64::try_from(users.len()).unwrap_or(u64::MAX);
    let p = Pagination::from_request(req, total, &render.config().pagination);

    let per_page = usize::try_from(p.per_page()).unwrap_or(usize::MAX);
    let skip = usize::try_from(p.page().saturating_sub(1)).unwrap_or(usize::MAX);
    let page: Vec<&User> = users
        .iter()
        .skip(skip.saturating_mul(per_page))
        .take(per_page)
        .collect();

    p.render(render, req, &page, &[])
}

fn show_user(render: &Render, req: &Request<Incoming>, id: &str) -> HttpResponse {
    let id = match id.parse::<u64>() {
        Ok(id) => id,
        Err(e) => return render.error(req, &HttpError::new(StatusCode::BAD_REQUEST, e), &[]),
    };
    match all_users().into_iter().find(|u| u.id == id) {
        Some(user) => render.respond(req, &user, &[Param::template("tmpl://user.html")]),
        None => render.error(req, &ApiError::NotFound, &[]),
    }
}

async fn create_user(render: &Render, req: Request<Incoming>) -> HttpResponse {
    let (parts, body) = req.into_parts();
    let head = Request::from_parts(parts.clone(), ());

    match render.decode::<User, _>(Request::from_parts(parts, body)).await {
        Ok(Some(user)) => render.respond(&head, &user, &[Param::Status(201)]),
        Ok(None) => render.error(
            &head,
            &HttpError::new(StatusCode::BAD_REQUEST, "empty payload"),
            &[],
        ),
        Err(e) => render.error(&head, &e, &[]),
    }
}

async fn events(version: Version) -> Response<DemoBody> {
    let (mut sink, pending) = channel(16);
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        for n in 1..=5 {
            if tx.send(Tick { n }).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    });

    tokio::spawn(async move {
        let deadline = tokio::time::sleep(Duration::from_secs(10));
        if let Err(e) = stream::stream(version, rx, &mut sink, deadline).await {
            logger::log_warning(&format!("Event stream aborted: {e}"));
        }
    });

    match pending.response().await {
        Some(resp) => resp.map(Either::Right),
        None => server_error(StatusCode::INTERNAL_SERVER_ERROR, "stream not started")
            .map(Either::Left),
    }
}
