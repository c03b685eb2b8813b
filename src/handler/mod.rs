//! Request handler module
//!
//! Maps requests to files and decides between hand-off and direct serving.

mod router;
pub mod static_files;

pub use router::handle_request;
