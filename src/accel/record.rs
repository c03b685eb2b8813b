//! Per-request record shared between the host server and the accel core.

use hyper::{HeaderMap, Method};
use std::fs::Metadata;
use std::time::SystemTime;

use super::filter::ContentFilter;

/// Metadata of the file a request was mapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    pub exists: bool,
    pub is_regular_file: bool,
    pub size: u64,
    pub mtime: Option<SystemTime>,
}

impl FileInfo {
    /// Nothing exists at the mapped path
    pub const fn missing() -> Self {
        Self {
            exists: false,
            is_regular_file: false,
            size: 0,
            mtime: None,
        }
    }

    /// Regular file of the given size
    pub const fn regular(size: u64, mtime: Option<SystemTime>) -> Self {
        Self {
            exists: true,
            is_regular_file: true,
            size,
            mtime,
        }
    }

    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            exists: true,
            is_regular_file: meta.is_file(),
            size: meta.len(),
            mtime: meta.modified().ok(),
        }
    }
}

/// Request state for one request
///
/// `resolved_path`, `uri` and `file` are filled in by the host before the
/// accel core runs and are never modified by it. `headers_out`,
/// `bytes_sent`, `header_only` and `mtime` are the fields the core may
/// rewrite when it hands the request to the frontend.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    /// Filesystem path the request was mapped to, possibly through an alias
    pub resolved_path: String,
    /// Request path as sent by the client
    pub uri: String,
    pub method: Method,
    /// Only headers are expected in the response (HEAD)
    pub header_only: bool,
    pub headers_in: HeaderMap,
    pub headers_out: HeaderMap,
    pub file: FileInfo,
    /// Content filters attached to the response, in pipeline order
    pub filters: Vec<ContentFilter>,
    /// False for internally generated sub-requests
    pub is_initial: bool,
    /// Byte count reported to the access log
    pub bytes_sent: u64,
    /// Freshness of the response, emitted as `Last-Modified`
    pub mtime: Option<SystemTime>,
}

impl RequestRecord {
    pub fn new(method: Method, uri: impl Into<String>, resolved_path: impl Into<String>) -> Self {
        let header_only = method == Method::HEAD;
        Self {
            resolved_path: resolved_path.into(),
            uri: uri.into(),
            method,
            header_only,
            headers_in: HeaderMap::new(),
            headers_out: HeaderMap::new(),
            file: FileInfo::missing(),
            filters: Vec::new(),
            is_initial: true,
            bytes_sent: 0,
            mtime: None,
        }
    }

    /// Advance the response mtime to `dependency` if it is newer
    pub fn update_mtime(&mut self, dependency: SystemTime) {
        match self.mtime {
            Some(current) if current >= dependency => {}
            _ => self.mtime = Some(dependency),
        }
    }

    /// Host and path for diagnostics, e.g. `example.com/files/a.pdf`
    pub fn display_uri(&self) -> String {
        let host = self
            .headers_in
            .get(hyper::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        format!("{host}{}", self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_head_sets_header_only() {
        assert!(RequestRecord::new(Method::HEAD, "/a", "/srv/a").header_only);
        assert!(!RequestRecord::new(Method::GET, "/a", "/srv/a").header_only);
    }

    #[test]
    fn test_update_mtime_only_moves_forward() {
        let older = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let newer = SystemTime::UNIX_EPOCH + Duration::from_secs(200);

        let mut record = RequestRecord::new(Method::GET, "/a", "/srv/a");
        record.update_mtime(older);
        assert_eq!(record.mtime, Some(older));
        record.update_mtime(newer);
        assert_eq!(record.mtime, Some(newer));
        record.update_mtime(older);
        assert_eq!(record.mtime, Some(newer));
    }

    #[test]
    fn test_display_uri_includes_host() {
        let mut record = RequestRecord::new(Method::GET, "/files/a.pdf", "/srv/a");
        assert_eq!(record.display_uri(), "/files/a.pdf");
        record
            .headers_in
            .insert(hyper::header::HOST, "example.com".parse().unwrap());
        assert_eq!(record.display_uri(), "example.com/files/a.pdf");
    }
}
