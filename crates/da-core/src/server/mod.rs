//! HTTP layer for the browser front end.
//!
//! A fixed pool of worker threads shares one listening socket. Every
//! request is routed by [`routes::Route::parse`] and answered by
//! [`routes::handle`]; workers hold no state beyond the shared
//! [`routes::RouteContext`], so slow device commands only occupy their own
//! worker.

pub mod query;
pub mod routes;

pub use routes::{ApiResponse, Route, RouteContext};

use crate::config::AuditorConfig;
use crate::inspect::DeviceInspector;
use crate::logging::{generate_request_id, request_span};
use da_common::{Error, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const ACCEPT_POLL: Duration = Duration::from_secs(1);
const ALLOW_METHODS: &str = "GET, OPTIONS";
const ALLOW_HEADERS: &str = "*";

/// Handle to the running HTTP server.
pub struct HttpServer {
    server: Arc<tiny_http::Server>,
    shutdown: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
    addr: SocketAddr,
}

impl HttpServer {
    /// Bind and start `config.workers` worker threads.
    pub fn start(config: &AuditorConfig, inspector: DeviceInspector) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("invalid bind address: {}", e)))?;

        let server = tiny_http::Server::http(addr).map_err(|e| {
            Error::Io(std::io::Error::other(format!(
                "failed to listen on {}: {}",
                addr, e
            )))
        })?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        let server = Arc::new(server);

        let ctx = Arc::new(RouteContext {
            inspector,
            index_html: config.index_html.clone(),
        });
        let cors_origin: Arc<str> = Arc::from(config.cors_allow_origin.as_str());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(config.workers);
        for n in 0..config.workers.max(1) {
            let server = Arc::clone(&server);
            let ctx = Arc::clone(&ctx);
            let origin = Arc::clone(&cors_origin);
            let flag = Arc::clone(&shutdown);
            let handle = thread::Builder::new()
                .name(format!("da-http-{}", n))
                .spawn(move || serve_loop(&server, &ctx, &origin, &flag));
            match handle {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown.store(true, Ordering::SeqCst);
                    return Err(Error::Io(e));
                }
            }
        }

        info!(addr = %addr, workers = workers.len(), "http server started");
        Ok(Self {
            server,
            shutdown,
            workers,
            addr,
        })
    }

    /// The bound address; resolves port 0 to the assigned port.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Block the calling thread until the workers exit.
    pub fn wait(mut self) {
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }

    /// Stop accepting requests and join the workers.
    pub fn shutdown(mut self) {
        self.stop();
        info!("http server stopped");
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn serve_loop(
    server: &tiny_http::Server,
    ctx: &RouteContext,
    cors_origin: &str,
    shutdown: &AtomicBool,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let request = match server.recv_timeout(ACCEPT_POLL) {
            Ok(Some(req)) => req,
            Ok(None) => continue,
            Err(e) => {
                if !shutdown.load(Ordering::SeqCst) {
                    error!(error = %e, "http accept error");
                }
                break;
            }
        };

        if shutdown.load(Ordering::SeqCst) {
            let _ = request
                .respond(tiny_http::Response::from_string("shutting down").with_status_code(503));
            break;
        }

        handle_request(request, ctx, cors_origin);
    }
}

fn handle_request(request: tiny_http::Request, ctx: &RouteContext, cors_origin: &str) {
    let request_id = generate_request_id();
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/");
    let span = request_span(&request_id, &method, path);
    let _guard = span.enter();

    let started = Instant::now();
    let route = Route::parse(&method, &url);
    let preflight = route == Route::Preflight;
    let response = routes::handle(ctx, route);
    let status = response.status;

    let mut reply = tiny_http::Response::from_data(response.body).with_status_code(status);
    for (name, value) in [
        ("Content-Type", response.content_type),
        ("Access-Control-Allow-Origin", cors_origin),
        ("X-Request-Id", request_id.as_str()),
    ] {
        if let Some(header) = header(name, value) {
            reply.add_header(header);
        }
    }
    if preflight {
        for (name, value) in [
            ("Access-Control-Allow-Methods", ALLOW_METHODS),
            ("Access-Control-Allow-Headers", ALLOW_HEADERS),
        ] {
            if let Some(header) = header(name, value) {
                reply.add_header(header);
            }
        }
    }

    match request.respond(reply) {
        Ok(()) => debug!(
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        ),
        Err(e) => warn!(error = %e, status, "failed to send response"),
    }
}

fn header(name: &str, value: &str) -> Option<tiny_http::Header> {
    match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(h) => Some(h),
        Err(()) => {
            warn!(name, value, "invalid response header dropped");
            None
        }
    }
}
