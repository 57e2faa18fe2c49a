//! Minimal jhalog example — a hyper service with access logging, a request
//! deadline, and bracketed startup/shutdown.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -v http://localhost:3000/users/42          # access event on stdout
//!   curl -H 'x-request-id: abc-123' http://localhost:3000/users/42
//!   curl http://localhost:3000/healthz              # ignored, no event
//!   curl http://localhost:3000/slow                 # 504 after 2 s
//!   curl http://localhost:3000/boom                 # 500, panic logged
//!
//! Stop with Ctrl-C to see the shutdown event flush before exit.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use jhalog::{Config, Jhalog, Response, context};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let log = Jhalog::new(
        Config::new()
            .ignore_paths(["/healthz"])
            .request_timeout(Duration::from_secs(2))
            .server_version(env!("CARGO_PKG_VERSION")),
    )?;
    let app = log.wrap(handle);

    // Backend first, user startup in the middle, startup event last.
    log.startup(|| async {
        info!("user startup: opening pools, warming caches");
    })
    .await?;

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!("listening on 0.0.0.0:3000");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };
                let app = app.clone();
                tokio::spawn(async move {
                    let svc = service_fn(move |mut req: hyper::Request<Incoming>| {
                        let app = app.clone();
                        // The peer address rides along in the extensions so
                        // the middleware can resolve `client_ip` when the
                        // config allows it.
                        req.extensions_mut().insert(peer);
                        async move { Ok::<_, Infallible>(app.call(req).await) }
                    });
                    if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        error!(peer = %peer, "connection error: {e}");
                    }
                });
            }
        }
    }

    // User shutdown first, shutdown event after it, backend flush last.
    log.shutdown(|| async {
        info!("user shutdown: draining, closing pools");
    })
    .await?;
    Ok(())
}

async fn handle(req: hyper::Request<Incoming>) -> Response {
    match req.uri().path() {
        "/healthz" => text("live"),
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(10)).await;
            text("you will never see this")
        }
        "/boom" => panic!("demo panic: pretend the database vanished"),
        path if path.starts_with("/users/") => {
            let id = path.trim_start_matches("/users/");
            // Any field set here lands on this request's event only.
            let _ = context::set("user_id", id);
            text(&format!("hello, user {id}"))
        }
        _ => {
            let mut resp = text("not found");
            *resp.status_mut() = http::StatusCode::NOT_FOUND;
            resp
        }
    }
}

fn text(body: &str) -> Response {
    http::Response::new(Full::new(Bytes::copy_from_slice(body.as_bytes())))
}
