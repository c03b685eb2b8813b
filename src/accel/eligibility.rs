//! Eligibility gates
//!
//! Pure predicates over the request record, run in a fixed order once the
//! request body has been discarded. The first failing gate decides the
//! decline reason.

use hyper::Method;

use super::{DeclineReason, DirConfig, RequestRecord};

pub fn check(record: &RequestRecord, dir: &DirConfig) -> Result<(), DeclineReason> {
    if !is_plain_get(record) {
        return Err(DeclineReason::Method);
    }
    if !record.file.exists || !record.file.is_regular_file {
        return Err(DeclineReason::NotRegularFile);
    }
    if !meets_min_size(record.file.size, dir.min_size) {
        return Err(DeclineReason::BelowMinSize);
    }
    if record.filters.iter().any(|f| f.rewrites_body()) {
        return Err(DeclineReason::BodyRewriteFilter);
    }
    Ok(())
}

/// GET expecting a full body is the only method the frontend can take over
fn is_plain_get(record: &RequestRecord) -> bool {
    record.method == Method::GET && !record.header_only
}

/// Inclusive lower bound
const fn meets_min_size(size: u64, min_size: Option<u64>) -> bool {
    match min_size {
        Some(min) => size >= min,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accel::{ContentFilter, FileInfo};

    fn eligible_record() -> RequestRecord {
        let mut record = RequestRecord::new(Method::GET, "/a.bin", "/var/www/a.bin");
        record.file = FileInfo::regular(50_000, None);
        record
    }

    fn enabled() -> DirConfig {
        DirConfig {
            redirect: Some(true),
            min_size: None,
        }
    }

    #[test]
    fn test_plain_get_passes() {
        assert_eq!(check(&eligible_record(), &enabled()), Ok(()));
    }

    #[test]
    fn test_method_matrix() {
        for method in [Method::HEAD, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS] {
            let mut record = eligible_record();
            record.header_only = method == Method::HEAD;
            record.method = method;
            assert_eq!(check(&record, &enabled()), Err(DeclineReason::Method));
        }

        let mut get_header_only = eligible_record();
        get_header_only.header_only = true;
        assert_eq!(check(&get_header_only, &enabled()), Err(DeclineReason::Method));
    }

    #[test]
    fn test_file_gate() {
        let mut missing = eligible_record();
        missing.file = FileInfo::missing();
        assert_eq!(check(&missing, &enabled()), Err(DeclineReason::NotRegularFile));

        let mut directory = eligible_record();
        directory.file.is_regular_file = false;
        assert_eq!(check(&directory, &enabled()), Err(DeclineReason::NotRegularFile));
    }

    #[test]
    fn test_min_size_boundary_is_inclusive() {
        let record = eligible_record();
        let at = DirConfig {
            min_size: Some(50_000),
            ..enabled()
        };
        assert_eq!(check(&record, &at), Ok(()));

        let above = DirConfig {
            min_size: Some(50_001),
            ..enabled()
        };
        assert_eq!(check(&record, &above), Err(DeclineReason::BelowMinSize));
    }

    #[test]
    fn test_body_rewriting_filter_vetoes() {
        let mut record = eligible_record();
        record.filters = vec![ContentFilter::named("deflate")];
        assert_eq!(check(&record, &enabled()), Ok(()));

        record.filters.push(ContentFilter::named("includes"));
        assert_eq!(check(&record, &enabled()), Err(DeclineReason::BodyRewriteFilter));
    }

    #[test]
    fn test_first_failing_gate_wins() {
        let mut record = eligible_record();
        record.method = Method::POST;
        record.file = FileInfo::missing();
        record.filters = vec![ContentFilter::named("includes")];
        assert_eq!(check(&record, &enabled()), Err(DeclineReason::Method));
    }
}
