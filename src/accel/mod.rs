//! X-Accel-Redirect arbitration
//!
//! The backend marks a request as trusted with `X-Accel-Internal`; this module
//! decides whether to honour it and, if so, answers with `X-Accel-Redirect` so
//! the frontend proxy streams the mapped file from disk instead of a body
//! produced here.
//!
//! The decision runs in three steps:
//! 1. [`AccelRedirect::resolve`] checks the trust signal and computes the
//!    redirect target from the mapped path.
//! 2. The host discards the request body.
//! 3. [`AccelRedirect::complete`] runs the eligibility gates and, when all of
//!    them pass, rewrites the record for the frontend.
//!
//! [`AccelRedirect::handle`] chains the three for hosts whose body discard is
//! synchronous.

mod eligibility;
mod emitter;
pub mod filter;
mod record;
pub mod resolver;

use hyper::header::{HeaderName, HeaderValue};
use std::fmt;

use crate::logger;

pub use filter::ContentFilter;
pub use record::{FileInfo, RequestRecord};
pub use resolver::Containment;

/// Trust signal set by the backend; its value prefixes the redirect target
pub const X_ACCEL_INTERNAL: HeaderName = HeaderName::from_static("x-accel-internal");
/// Target handed to the frontend
pub const X_ACCEL_REDIRECT: HeaderName = HeaderName::from_static("x-accel-redirect");
/// Protocol version announcement
pub const X_ACCEL_VERSION: HeaderName = HeaderName::from_static("x-accel-version");

pub const PROTOCOL_VERSION: &str = "0.01";

/// Longest redirect target accepted, in bytes
pub const DEFAULT_MAX_REDIRECT_LEN: usize = 8192;

/// Settings of one directory or location scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirConfig {
    /// Unset behaves as disabled
    pub redirect: Option<bool>,
    /// Minimum file size in bytes, unset means no minimum
    pub min_size: Option<u64>,
}

impl DirConfig {
    /// Fill unset fields from an enclosing scope
    #[must_use]
    pub const fn inherit(self, parent: Self) -> Self {
        Self {
            redirect: match self.redirect {
                Some(v) => Some(v),
                None => parent.redirect,
            },
            min_size: match self.min_size {
                Some(v) => Some(v),
                None => parent.min_size,
            },
        }
    }

    pub const fn is_enabled(&self) -> bool {
        matches!(self.redirect, Some(true))
    }
}

/// Server-wide settings, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccelSettings {
    /// Fall back to the client path for files mapped outside the document root
    pub outside_doc_root: bool,
    pub max_redirect_len: usize,
    pub containment: Containment,
    /// Diagnostic verbosity, 0 disables accel diagnostics
    pub debug_level: u8,
}

impl Default for AccelSettings {
    fn default() -> Self {
        Self {
            outside_doc_root: false,
            max_redirect_len: DEFAULT_MAX_REDIRECT_LEN,
            containment: Containment::Literal,
            debug_level: 0,
        }
    }
}

/// Why a request was left to normal processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    Disabled,
    SubRequest,
    NotInternal,
    OutsideDocRoot,
    Method,
    NotRegularFile,
    BelowMinSize,
    BodyRewriteFilter,
}

impl DeclineReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "redirect disabled",
            Self::SubRequest => "sub-request",
            Self::NotInternal => "no trust signal",
            Self::OutsideDocRoot => "file is outside of document root",
            Self::Method => "request method is not GET",
            Self::NotRegularFile => "request points to not regular file",
            Self::BelowMinSize => "file is smaller than minimum size",
            Self::BodyRewriteFilter => "response uses a body rewriting filter",
        }
    }

    /// Verbosity at which the decline is reported
    const fn debug_level(self) -> u8 {
        match self {
            Self::Method | Self::NotRegularFile => 3,
            _ => 2,
        }
    }
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a completed decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Continue with normal request processing
    Declined(DeclineReason),
    /// Redirect emitted, no content should be generated
    Handled,
}

/// Result of the resolver step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Declined(DeclineReason),
    Redirect(HeaderValue),
}

/// Failures that end the request instead of declining it
#[derive(Debug)]
pub enum AccelError {
    /// Draining the request body failed
    BodyDiscard(Box<dyn std::error::Error + Send + Sync>),
    /// Redirect target exceeds the configured maximum
    TargetTooLong { len: usize, max: usize },
    /// Redirect target is not a valid header value
    InvalidTarget,
}

impl AccelError {
    /// Body discard stopped at the configured body size limit
    pub fn is_body_too_large(&self) -> bool {
        match self {
            Self::BodyDiscard(e) => e.is::<http_body_util::LengthLimitError>(),
            _ => false,
        }
    }
}

impl fmt::Display for AccelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BodyDiscard(e) => write!(f, "failed to discard request body: {e}"),
            Self::TargetTooLong { len, max } => {
                write!(f, "redirect target is {len} bytes, limit is {max}")
            }
            Self::InvalidTarget => f.write_str("redirect target is not a valid header value"),
        }
    }
}

impl std::error::Error for AccelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::BodyDiscard(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Decision engine, shared read-only by all requests
#[derive(Debug, Clone)]
pub struct AccelRedirect {
    doc_root: String,
    settings: AccelSettings,
}

impl AccelRedirect {
    pub fn new(doc_root: impl Into<String>, settings: AccelSettings) -> Self {
        Self {
            doc_root: doc_root.into(),
            settings,
        }
    }

    pub fn doc_root(&self) -> &str {
        &self.doc_root
    }

    pub const fn settings(&self) -> &AccelSettings {
        &self.settings
    }

    /// Check the trust signal and compute the redirect target
    pub fn resolve(&self, record: &RequestRecord, dir: &DirConfig) -> Result<Resolution, AccelError> {
        if !dir.is_enabled() {
            return Ok(Resolution::Declined(DeclineReason::Disabled));
        }
        if !record.is_initial {
            return Ok(Resolution::Declined(DeclineReason::SubRequest));
        }
        let Some(prefix) = record.headers_in.get(X_ACCEL_INTERNAL) else {
            return Ok(Resolution::Declined(DeclineReason::NotInternal));
        };

        let Some(logical) = resolver::logical_path(
            record,
            &self.doc_root,
            self.settings.containment,
            self.settings.outside_doc_root,
        ) else {
            self.debug(2, || {
                format!(
                    "file \"{}\" is outside of document root: {}",
                    record.resolved_path,
                    record.display_uri()
                )
            });
            return Ok(Resolution::Declined(DeclineReason::OutsideDocRoot));
        };

        let target = resolver::build_target(prefix.as_bytes(), &logical, self.settings.max_redirect_len)?;
        self.debug(4, || {
            format!(
                "request from frontend: {} -> {}",
                record.display_uri(),
                String::from_utf8_lossy(target.as_bytes())
            )
        });
        Ok(Resolution::Redirect(target))
    }

    /// Run the eligibility gates and emit the redirect
    ///
    /// Must only be called after the request body has been discarded.
    pub fn complete(&self, record: &mut RequestRecord, dir: &DirConfig, target: HeaderValue) -> Outcome {
        record
            .headers_out
            .insert(X_ACCEL_VERSION, HeaderValue::from_static(PROTOCOL_VERSION));

        if let Err(reason) = eligibility::check(record, dir) {
            self.debug(reason.debug_level(), || {
                format!("{reason}: {}", record.display_uri())
            });
            return Outcome::Declined(reason);
        }

        let shown = String::from_utf8_lossy(target.as_bytes()).into_owned();
        emitter::emit(record, target);
        self.debug(1, || {
            format!("request {} redirected to {shown}", record.display_uri())
        });
        Outcome::Handled
    }

    /// Full decision with a synchronous body discard
    pub fn handle<F>(&self, record: &mut RequestRecord, dir: &DirConfig, discard_body: F) -> Result<Outcome, AccelError>
    where
        F: FnOnce() -> Result<(), AccelError>,
    {
        let target = match self.resolve(record, dir)? {
            Resolution::Declined(reason) => return Ok(Outcome::Declined(reason)),
            Resolution::Redirect(target) => target,
        };
        discard_body()?;
        Ok(self.complete(record, dir, target))
    }

    fn debug<F>(&self, level: u8, message: F)
    where
        F: FnOnce() -> String,
    {
        if level <= self.settings.debug_level {
            logger::log_accel(&message());
        }
    }
}
