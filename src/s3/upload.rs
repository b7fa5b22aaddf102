use async_trait::async_trait;
use aws_sdk_s3::{
    Client, error::DisplayErrorContext, primitives::ByteStream, types::ObjectCannedAcl,
};
use std::io;
use tracing::debug;

use super::helpers::Tags;
use crate::error::UploadError;
use crate::fs::Body;
use crate::publish::{UploadObject, Uploader};

/// Uploads objects to an S3-compatible bucket
pub struct S3Uploader {
    client: Client,
    bucket: String,
    acl: ObjectCannedAcl,
    prefix: Option<String>,
    tags: Tags,
}

impl S3Uploader {
    pub fn new(client: Client, bucket: impl Into<String>, acl: ObjectCannedAcl, tags: Tags) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            acl,
            prefix: None,
            tags,
        }
    }

    /// Store every object under `prefix/`
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn key_for(&self, path: &str) -> String {
        build_key(self.prefix.as_deref(), path)
    }
}

/// Construct the object key for a root-relative path
pub fn build_key(prefix: Option<&str>, path: &str) -> String {
    let path = path.trim_start_matches("./");
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{}/{}", prefix.trim_end_matches('/'), path)
        }
        _ => path.to_string(),
    }
}

#[async_trait]
impl Uploader for S3Uploader {
    async fn upload(&self, object: UploadObject) -> Result<(), UploadError> {
        let (body, length) = byte_stream(object.body).await?;

        let key = self.key_for(&object.path);
        debug!("PUT s3://{}/{} ({} bytes)", self.bucket, key, length);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .acl(self.acl.clone())
            .content_length(length as i64)
            .body(body);

        if !object.content_type.is_empty() {
            request = request.content_type(&object.content_type);
        }

        for (name, value) in self.tags.present() {
            request = request.metadata(name, value);
        }

        request.send().await.map_err(store_failure)?;

        Ok(())
    }
}

/// Turn a body into a request stream, reading files from disk as they are
/// sent instead of loading them into memory
async fn byte_stream(body: Body) -> Result<(ByteStream, u64), UploadError> {
    match body {
        Body::File(file) => {
            let length = file.metadata().await?.len();
            let stream = ByteStream::read_from()
                .file(file)
                .build()
                .await
                .map_err(|e| UploadError::Body(io::Error::other(e)))?;
            Ok((stream, length))
        }
        Body::Bytes(cursor) => {
            let position = cursor.position() as usize;
            let bytes = cursor.into_inner().split_off(position);
            let length = bytes.len() as u64;
            Ok((ByteStream::from(bytes), length))
        }
    }
}

/// Keep the full cause chain; an SDK error's own message is only a label
/// such as "service error"
fn store_failure<E: std::error::Error>(error: E) -> UploadError {
    UploadError::store(DisplayErrorContext(error))
}
