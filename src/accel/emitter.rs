//! Success-path side effects

use hyper::header::HeaderValue;

use super::{RequestRecord, X_ACCEL_REDIRECT};

/// Hand the request to the frontend
///
/// The access log must report the size of the file the frontend will send,
/// and freshness must follow the file rather than the time of the decision.
pub fn emit(record: &mut RequestRecord, target: HeaderValue) {
    record.headers_out.insert(X_ACCEL_REDIRECT, target);
    record.bytes_sent = record.file.size;
    record.header_only = false;
    if let Some(mtime) = record.file.mtime {
        record.update_mtime(mtime);
    }
}
