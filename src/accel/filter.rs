//! Content filter descriptors
//!
//! A location may attach output filters to its responses. The accel core only
//! cares whether a filter needs to see the response body: handing the request
//! to the frontend skips body generation entirely, so such filters would be
//! silently bypassed.

/// Filters known to rewrite the body during transmission
const BODY_REWRITERS: &[&str] = &["includes", "sub", "substitute"];

/// Output filter attached to a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFilter {
    name: String,
    rewrites_body: bool,
}

impl ContentFilter {
    pub fn new(name: impl Into<String>, rewrites_body: bool) -> Self {
        Self {
            name: name.into(),
            rewrites_body,
        }
    }

    /// Build a descriptor from a configured filter name
    ///
    /// Names are matched case-insensitively against the known body rewriters
    /// (server-side includes and substitution filters). Everything else is
    /// assumed to leave the body content alone.
    pub fn named(name: &str) -> Self {
        let rewrites_body = BODY_REWRITERS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name));
        Self::new(name, rewrites_body)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn rewrites_body(&self) -> bool {
        self.rewrites_body
    }
}
