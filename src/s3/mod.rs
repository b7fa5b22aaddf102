pub mod client;
pub mod helpers;
pub mod upload;

pub use client::build_client;
pub use helpers::{APP_VERSION_TAG, Tags, content_type_for, parse_metadata};
pub use upload::{S3Uploader, build_key};
