use async_trait::async_trait;
use tracing::info;

use crate::error::UploadError;
use crate::publish::{UploadObject, Uploader};
use crate::s3::build_key;

/// Logs what would be uploaded without contacting the store
#[derive(Debug, Default)]
pub struct DryRunUploader {
    bucket: String,
    prefix: Option<String>,
}

impl DryRunUploader {
    pub fn new(bucket: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix,
        }
    }
}

#[async_trait]
impl Uploader for DryRunUploader {
    async fn upload(&self, object: UploadObject) -> Result<(), UploadError> {
        let key = build_key(self.prefix.as_deref(), &object.path);
        let content_type = if object.content_type.is_empty() {
            "unknown type"
        } else {
            object.content_type.as_str()
        };
        info!("Would upload s3://{}/{} ({})", self.bucket, key, content_type);
        Ok(())
    }

    fn dry_run(&self) -> bool {
        true
    }
}
