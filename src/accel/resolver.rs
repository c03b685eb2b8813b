//! Trust and path resolution
//!
//! Recovers the server-relative path of the mapped file and builds the value
//! of the redirect header from it.

use hyper::header::HeaderValue;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

use super::{AccelError, RequestRecord};

/// How the mapped file is tested against the document root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Containment {
    /// Byte prefix test on the path strings as mapped. `..` segments and
    /// symlinks are not resolved.
    #[default]
    Literal,
    /// Both paths are canonicalized with the filesystem and compared by
    /// component. A path that cannot be canonicalized counts as outside.
    Canonical,
}

/// Compute the logical path to append to the trust prefix
///
/// Returns `None` when the file lies outside the document root and
/// `outside_doc_root` does not allow falling back to the client path.
pub fn logical_path<'a>(
    record: &'a RequestRecord,
    doc_root: &str,
    containment: Containment,
    outside_doc_root: bool,
) -> Option<Cow<'a, str>> {
    let inside = match containment {
        Containment::Literal => record
            .resolved_path
            .strip_prefix(doc_root)
            .map(Cow::Borrowed),
        Containment::Canonical => canonical_remainder(&record.resolved_path, doc_root).map(Cow::Owned),
    };

    match inside {
        Some(path) => Some(path),
        None if outside_doc_root => Some(Cow::Borrowed(record.uri.as_str())),
        None => None,
    }
}

fn canonical_remainder(resolved: &str, doc_root: &str) -> Option<String> {
    let root = Path::new(doc_root).canonicalize().ok()?;
    let file = Path::new(resolved).canonicalize().ok()?;
    let rest = file.strip_prefix(&root).ok()?;

    let mut logical = String::new();
    for part in rest.components() {
        logical.push('/');
        logical.push_str(part.as_os_str().to_str()?);
    }
    if logical.is_empty() {
        logical.push('/');
    }
    Some(logical)
}

/// Concatenate prefix and logical path into a header value
///
/// No separator is inserted and nothing is encoded: the prefix fully controls
/// the shape of the result. Targets longer than `max_len` fail instead of
/// being truncated.
pub fn build_target(prefix: &[u8], logical: &str, max_len: usize) -> Result<HeaderValue, AccelError> {
    let len = prefix.len() + logical.len();
    if len > max_len {
        return Err(AccelError::TargetTooLong { len, max: max_len });
    }

    let mut target = Vec::with_capacity(len);
    target.extend_from_slice(prefix);
    target.extend_from_slice(logical.as_bytes());

    HeaderValue::from_bytes(&target).map_err(|_| AccelError::InvalidTarget)
}
