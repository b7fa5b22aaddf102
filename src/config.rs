use anyhow::Result;
use std::env;
use std::net::Ipv4Addr;

use crate::error::PublishError;

/// Region used when none is given
pub const DEFAULT_REGION: &str = "us-east-1";

const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";

const RESERVED_BUCKET_PREFIXES: &[&str] = &["xn--", "sthree-"];
const RESERVED_BUCKET_SUFFIXES: &[&str] = &["-s3alias", "--ol-s3"];

/// Static access key pair
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read credentials from `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY`
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::MissingCredentials`] if either is unset or empty
    pub fn from_env() -> Result<Self, PublishError> {
        Self::from_values(env::var(ACCESS_KEY_VAR).ok(), env::var(SECRET_KEY_VAR).ok())
    }

    fn from_values(key: Option<String>, secret: Option<String>) -> Result<Self, PublishError> {
        match (key, secret) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Ok(Self {
                access_key_id: key,
                secret_access_key: secret,
            }),
            _ => Err(PublishError::MissingCredentials),
        }
    }
}

/// Configuration for a publish run
#[derive(Debug, Clone)]
pub struct Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub prefix: Option<String>,
    pub path_style: bool,
    pub credentials: Credentials,
}

impl Config {
    /// Validate the destination settings and bundle them with credentials
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket, region, endpoint or prefix is invalid
    pub fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        prefix: Option<String>,
        path_style: bool,
        credentials: Credentials,
    ) -> Result<Self> {
        Self::validate_bucket_name(&bucket)?;
        Self::validate_region(&region)?;

        let endpoint = endpoint.filter(|e| !e.is_empty());
        if let Some(endpoint) = &endpoint {
            Self::validate_endpoint(endpoint)?;
        }

        let prefix = prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());
        if let Some(prefix) = &prefix {
            Self::validate_prefix(prefix)?;
        }

        Ok(Self {
            bucket,
            region,
            endpoint,
            prefix,
            path_style,
            credentials,
        })
    }

    fn validate_region(region: &str) -> Result<()> {
        if region.trim().is_empty() {
            anyhow::bail!("Region cannot be empty");
        }

        if region.chars().any(char::is_whitespace) {
            anyhow::bail!("Region '{}' must not contain whitespace", region);
        }

        Ok(())
    }

    fn validate_endpoint(endpoint: &str) -> Result<()> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            anyhow::bail!(
                "Endpoint '{}' must start with http:// or https://",
                endpoint
            );
        }

        Ok(())
    }

    /// Validate S3 bucket name according to AWS rules
    /// Bucket names become DNS labels in virtual-hosted URLs, so they follow
    /// the S3 naming rules: dotted lowercase labels that never look like an
    /// IPv4 address.
    fn validate_bucket_name(bucket: &str) -> Result<()> {
        if !(3..=63).contains(&bucket.len()) {
            anyhow::bail!(
                "Bucket name '{}' has {} characters, expected 3 to 63",
                bucket,
                bucket.len()
            );
        }

        if let Some(bad) = bucket
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '0'..='9' | '-' | '.'))
        {
            anyhow::bail!(
                "Bucket name '{}' contains '{}'; use lowercase letters, digits, '-' or '.'",
                bucket,
                bad
            );
        }

        // every dot-separated label must begin and end alphanumeric
        if let Some(label) = bucket.split('.').find(|label| {
            let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
            !alnum(label.chars().next()) || !alnum(label.chars().last())
        }) {
            anyhow::bail!(
                "Bucket name '{}' has label '{}' that does not begin and end with a letter or digit",
                bucket,
                label
            );
        }

        if bucket.parse::<Ipv4Addr>().is_ok() {
            anyhow::bail!("Bucket name '{}' looks like an IP address", bucket);
        }

        if let Some(reserved) = RESERVED_BUCKET_PREFIXES
            .iter()
            .find(|p| bucket.starts_with(*p))
            .or_else(|| RESERVED_BUCKET_SUFFIXES.iter().find(|s| bucket.ends_with(*s)))
        {
            anyhow::bail!("Bucket name '{}' uses reserved '{}'", bucket, reserved);
        }

        Ok(())
    }

    fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.contains("//") {
            anyhow::bail!(
                "Prefix '{}' contains consecutive slashes (not allowed)",
                prefix
            );
        }

        if prefix.split('/').any(|segment| segment == "..") {
            anyhow::bail!("Prefix '{}' contains '..' (not allowed)", prefix);
        }

        if prefix.starts_with('/') {
            anyhow::bail!(
                "Prefix '{}' should not start with '/' (use a relative key prefix)",
                prefix
            );
        }

        Ok(())
    }
}
