//! Route table and handlers.
//!
//! Routing is pure: [`Route::parse`] maps a method and target to a route, and
//! [`handle`] turns a route into an [`ApiResponse`]. Only the server loop
//! touches sockets.

use super::query::split_target;
use crate::inspect::DeviceInspector;
use da_common::{DeviceId, DevicePath, Error, PackageName};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, warn};

const INDEX_NOT_FOUND: &str = "<h1>Error: index.html not found</h1>";

/// A recognized request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Health,
    Devices,
    Packages { device: String },
    PackageDetails { device: String, package: String },
    ListFiles { device: String, path: Option<String> },
    ReadFile { device: String, path: Option<String> },
    Logs { device: String, query: Option<String> },
    Preflight,
    MethodNotAllowed,
    NotFound,
}

impl Route {
    pub fn parse(method: &str, target: &str) -> Route {
        if method.eq_ignore_ascii_case("OPTIONS") {
            return Route::Preflight;
        }
        let (segments, mut params) = split_target(target);
        if !method.eq_ignore_ascii_case("GET") {
            return Route::MethodNotAllowed;
        }

        let segs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let mut take = |key: &str| params.remove(key);
        match segs.as_slice() {
            [] => Route::Index,
            ["health"] => Route::Health,
            ["devices"] => Route::Devices,
            ["packages", device] => Route::Packages {
                device: device.to_string(),
            },
            ["package", device, package, "details"] => Route::PackageDetails {
                device: device.to_string(),
                package: package.to_string(),
            },
            ["files", device] => Route::ListFiles {
                device: device.to_string(),
                path: take("path"),
            },
            ["files", device, "read"] => Route::ReadFile {
                device: device.to_string(),
                path: take("path"),
            },
            ["logs", device] => Route::Logs {
                device: device.to_string(),
                query: take("query"),
            },
            _ => Route::NotFound,
        }
    }
}

/// A response before it is written to the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub code: u32,
}

impl ApiResponse {
    pub fn json<T: Serialize>(value: &T) -> ApiResponse {
        match serde_json::to_vec(value) {
            Ok(body) => ApiResponse {
                status: 200,
                content_type: "application/json",
                body,
            },
            Err(e) => ApiResponse::from_error(&Error::Json(e)),
        }
    }

    pub fn text(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            content_type: "text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn html(status: u16, body: String) -> ApiResponse {
        ApiResponse {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }

    pub fn empty(status: u16) -> ApiResponse {
        ApiResponse {
            status,
            content_type: "text/plain; charset=utf-8",
            body: Vec::new(),
        }
    }

    /// Input errors are the caller's fault (400); everything else is 500.
    pub fn from_error(err: &Error) -> ApiResponse {
        let status = match err {
            Error::InvalidArgument(_) => 400,
            _ => 500,
        };
        let body = ErrorBody {
            detail: err.to_string(),
            code: err.code(),
        };
        ApiResponse {
            status,
            content_type: "application/json",
            body: serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec()),
        }
    }
}

/// Collaborators the handlers need.
#[derive(Debug, Clone)]
pub struct RouteContext {
    pub inspector: DeviceInspector,
    pub index_html: Option<std::path::PathBuf>,
}

pub fn handle(ctx: &RouteContext, route: Route) -> ApiResponse {
    let result = match route {
        Route::Index => return serve_index(ctx.index_html.as_deref()),
        Route::Health => return ApiResponse::text(200, "ok"),
        Route::Preflight => return ApiResponse::empty(204),
        Route::MethodNotAllowed => return ApiResponse::text(405, "method not allowed"),
        Route::NotFound => {
            let body = ErrorBody {
                detail: "Not Found".to_string(),
                code: 404,
            };
            let mut response = ApiResponse::json(&body);
            response.status = 404;
            return response;
        }
        Route::Devices => return ApiResponse::json(&ctx.inspector.devices()),
        Route::Packages { device } => {
            device_id(&device).and_then(|d| json_result(ctx.inspector.packages(&d)))
        }
        Route::PackageDetails { device, package } => device_id(&device).and_then(|d| {
            let package = PackageName::parse(&package)?;
            json_result(ctx.inspector.package_details(&d, &package))
        }),
        Route::ListFiles { device, path } => device_id(&device).and_then(|d| {
            let path = required_path(path)?;
            json_result(ctx.inspector.list_files(&d, &path))
        }),
        Route::ReadFile { device, path } => device_id(&device).and_then(|d| {
            let path = required_path(path)?;
            json_result(ctx.inspector.read_file(&d, &path))
        }),
        Route::Logs { device, query } => device_id(&device).and_then(|d| {
            let query = query.ok_or_else(|| missing("query"))?;
            json_result(ctx.inspector.logs(&d, &query))
        }),
    };

    result.unwrap_or_else(|err| {
        if matches!(err, Error::InvalidArgument(_)) {
            warn!(error = %err, "rejected request");
        } else {
            error!(error = %err, code = err.code(), "request failed");
        }
        ApiResponse::from_error(&err)
    })
}

fn json_result<T: Serialize>(result: da_common::Result<T>) -> da_common::Result<ApiResponse> {
    result.map(|value| ApiResponse::json(&value))
}

fn device_id(raw: &str) -> da_common::Result<DeviceId> {
    Ok(DeviceId::parse(raw)?)
}

fn required_path(path: Option<String>) -> da_common::Result<DevicePath> {
    let path = path.ok_or_else(|| missing("path"))?;
    Ok(DevicePath::parse(&path)?)
}

fn missing(param: &str) -> Error {
    Error::InvalidArgument(format!("missing query parameter `{}`", param))
}

fn serve_index(configured: Option<&Path>) -> ApiResponse {
    let path = configured.unwrap_or(Path::new("index.html"));
    if !path.exists() {
        return ApiResponse::html(404, INDEX_NOT_FOUND.to_string());
    }
    match std::fs::read_to_string(path) {
        Ok(page) => ApiResponse::html(200, page),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read index page");
            ApiResponse::html(500, format!("<h1>Internal error</h1><p>{}</p>", e))
        }
    }
}

/// Query parameters as a map, for tests and diagnostics.
pub fn query_params(target: &str) -> HashMap<String, String> {
    split_target(target).1
}
