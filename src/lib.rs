//! Backend-side X-Accel-Redirect support
//!
//! A static file server that, for requests its trusted frontend marks with
//! `X-Accel-Internal`, answers with an `X-Accel-Redirect` header naming the
//! file instead of the file's bytes.

pub mod accel;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
