//! HTTP protocol layer module
//!
//! Response builders, content types and freshness headers, decoupled from
//! the request handling logic.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_404_response, build_405_response, build_error_response, build_file_response,
    build_handoff_response, build_options_response, finish_response,
};
