//! CLI utilities for rtvoice tools.
//!
//! Context configuration, request file loading and output helpers shared by
//! the command-line applications.

pub mod config;
pub mod output;
pub mod request;

pub use config::{Config, Context, load_config, mask_api_key};
pub use output::{Output, OutputFormat, write_file};
pub use request::{RequestError, RequestFormat, load_request, parse_request};
