//! Request routing dispatch module
//!
//! Entry point for HTTP request processing. Each request is mapped to a file,
//! offered to the accel handler, and either handed to the frontend with an
//! `X-Accel-Redirect` header or served directly.

use crate::accel::{AccelError, DirConfig, Outcome, RequestRecord, Resolution, X_ACCEL_REDIRECT};
use crate::config::{AppState, Location};
use crate::handler::static_files;
use crate::http::{self, cache};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderName, REFERER, USER_AGENT};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode, Version};
use std::convert::Infallible;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let mut entry = AccessLogEntry::new(
        remote_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.referer = header_string(&parts.headers, &REFERER);
    entry.user_agent = header_string(&parts.headers, &USER_AGENT);

    let (response, record) = if has_parent_segment(parts.uri.path()) {
        logger::log_warning(&format!(
            "Rejected path with parent segment: {}",
            parts.uri.path()
        ));
        (http::build_404_response(), None)
    } else {
        let location = state.location_for(parts.uri.path());
        let dir = location.map_or(state.root_scope, |l| l.dir);
        let mut record = build_record(&state, parts, location).await;
        let response = dispatch(&state, &mut record, &dir, body).await;
        (response, Some(record))
    };

    let response = match &record {
        Some(r) => http::finish_response(response, &r.headers_out, &state.config.http.server_name),
        None => http::finish_response(response, &HeaderMap::new(), &state.config.http.server_name),
    };

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        if let Some(r) = &record {
            entry.body_bytes = r.bytes_sent;
            entry.accel_redirect = r
                .headers_out
                .get(&X_ACCEL_REDIRECT)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        }
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Build the request record for the mapped file
async fn build_record(state: &AppState, parts: Parts, location: Option<&Location>) -> RequestRecord {
    let path = parts.uri.path();
    let resolved = state.map_to_filesystem(path, location);
    let mut record = RequestRecord::new(parts.method, path, resolved);
    record.headers_in = parts.headers;
    record.file = static_files::stat(&record.resolved_path).await;
    if let Some(loc) = location {
        record.filters.clone_from(&loc.filters);
    }
    record
}

/// Run the accel handler, falling back to direct serving when it declines
async fn dispatch<B>(
    state: &AppState,
    record: &mut RequestRecord,
    dir: &DirConfig,
    body: B,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let outcome = match state.accel.resolve(record, dir) {
        Ok(Resolution::Redirect(target)) => {
            match discard_body(body, state.config.http.max_body_size).await {
                Ok(()) => Ok(state.accel.complete(record, dir, target)),
                Err(e) => Err(e),
            }
        }
        Ok(Resolution::Declined(reason)) => Ok(Outcome::Declined(reason)),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(Outcome::Handled) => {
            let last_modified = cache::last_modified(record.mtime);
            http::build_handoff_response(last_modified.as_deref())
        }
        Ok(Outcome::Declined(_)) => serve_declined(record).await,
        Err(e) => {
            logger::log_error(&format!("Accel redirect failed for {}: {e}", record.display_uri()));
            http::build_error_response(error_status(&e))
        }
    }
}

/// Serve a request the accel handler did not take
async fn serve_declined(record: &mut RequestRecord) -> Response<Full<Bytes>> {
    match record.method {
        Method::GET | Method::HEAD => static_files::serve_file(record).await,
        Method::OPTIONS => http::build_options_response(),
        _ => {
            logger::log_warning(&format!("Method not allowed: {}", record.method));
            http::build_405_response()
        }
    }
}

/// Read and drop the request body, bounded by `max_body_size`
async fn discard_body<B>(body: B, max_body_size: u64) -> Result<(), AccelError>
where
    B: Body,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let mut body = std::pin::pin!(Limited::new(body, limit));
    while let Some(frame) = body.frame().await {
        frame.map_err(AccelError::BodyDiscard)?;
    }
    Ok(())
}

fn error_status(error: &AccelError) -> StatusCode {
    match error {
        e if e.is_body_too_large() => StatusCode::PAYLOAD_TOO_LARGE,
        AccelError::BodyDiscard(_) => StatusCode::BAD_REQUEST,
        AccelError::TargetTooLong { .. } | AccelError::InvalidTarget => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn has_parent_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

fn header_string(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
