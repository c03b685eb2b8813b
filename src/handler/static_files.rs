//! Static file serving module
//!
//! Serves the mapped file when the request was not handed to the frontend.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use tokio::fs;

use crate::accel::{FileInfo, RequestRecord};
use crate::http::{self, cache, mime};
use crate::logger;

/// Stat the mapped path; anything unreadable counts as missing
pub async fn stat(path: &str) -> FileInfo {
    match fs::metadata(path).await {
        Ok(meta) => FileInfo::from_metadata(&meta),
        Err(_) => FileInfo::missing(),
    }
}

/// Serve the record's file from disk
///
/// Updates the record's accounting so the access log reports what was sent.
pub async fn serve_file(record: &mut RequestRecord) -> Response<Full<Bytes>> {
    // Directories and special files are not served
    if !record.file.exists || !record.file.is_regular_file {
        return http::build_404_response();
    }

    let content = match fs::read(&record.resolved_path).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {e}",
                record.resolved_path
            ));
            return http::build_404_response();
        }
    };

    if let Some(mtime) = record.file.mtime {
        record.update_mtime(mtime);
    }
    if !record.header_only {
        record.bytes_sent = content.len() as u64;
    }

    let last_modified = cache::last_modified(record.mtime);
    http::build_file_response(
        Bytes::from(content),
        mime::content_type_for(&record.resolved_path),
        last_modified.as_deref(),
        record.header_only,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::{Method, StatusCode};

    #[tokio::test]
    async fn test_serve_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello world").unwrap();
        let path = path.to_str().unwrap();

        let mut record = RequestRecord::new(Method::GET, "/notes.txt", path);
        record.file = stat(path).await;
        assert!(record.file.is_regular_file);
        assert_eq!(record.file.size, 11);

        let response = serve_file(&mut record).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("last-modified"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");
        assert_eq!(record.bytes_sent, 11);
    }

    #[tokio::test]
    async fn test_head_counts_no_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let path = path.to_str().unwrap();

        let mut record = RequestRecord::new(Method::HEAD, "/notes.txt", path);
        record.file = stat(path).await;
        let response = serve_file(&mut record).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
        assert_eq!(record.bytes_sent, 0);
    }

    #[tokio::test]
    async fn test_directory_and_missing_are_404() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = dir.path().to_str().unwrap();

        let mut record = RequestRecord::new(Method::GET, "/", dir_path);
        record.file = stat(dir_path).await;
        assert!(record.file.exists);
        assert_eq!(serve_file(&mut record).await.status(), StatusCode::NOT_FOUND);

        let missing = format!("{dir_path}/missing");
        let mut record = RequestRecord::new(Method::GET, "/missing", missing.as_str());
        record.file = stat(&missing).await;
        assert!(!record.file.exists);
        assert_eq!(serve_file(&mut record).await.status(), StatusCode::NOT_FOUND);
    }
}
