use std::collections::BTreeMap;

/// Header prefix S3 puts in front of every user metadata key
pub const METADATA_PREFIX: &str = "x-amz-meta-";

/// Metadata key carrying the published application version, sent as the
/// `x-amz-meta-app-version` header
pub const APP_VERSION_TAG: &str = "app-version";

/// Extension of the last path segment, including the leading dot
///
/// Returns an empty string when the segment has no dot.
pub fn extension(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}

/// Detect Content-Type based on file extension
///
/// Web asset types come from a fixed table, anything else falls back to
/// `mime_guess`. Text types always declare UTF-8. Unknown extensions give
/// an empty string.
pub fn content_type_for(path: &str) -> String {
    let ext = extension(path).trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        return String::new();
    }

    let known = match ext.as_str() {
        // Markup and styles
        "html" | "htm" => Some("text/html; charset=utf-8"),
        "css" => Some("text/css; charset=utf-8"),
        "xml" => Some("text/xml; charset=utf-8"),
        "txt" => Some("text/plain; charset=utf-8"),

        // Scripts and data
        "js" | "mjs" => Some("application/javascript"),
        "json" | "map" => Some("application/json"),
        "wasm" => Some("application/wasm"),
        "webmanifest" => Some("application/manifest+json"),

        // Images
        "avif" => Some("image/avif"),
        "gif" => Some("image/gif"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        "ico" => Some("image/x-icon"),

        // Fonts
        "woff" => Some("font/woff"),
        "woff2" => Some("font/woff2"),

        "pdf" => Some("application/pdf"),
        _ => None,
    };

    if let Some(content_type) = known {
        return content_type.to_string();
    }

    match mime_guess::from_ext(&ext).first_raw() {
        Some(guess) if guess.starts_with("text/") => format!("{}; charset=utf-8", guess),
        Some(guess) => guess.to_string(),
        None => String::new(),
    }
}

/// Parse metadata string into key/value pairs
///
/// Expected format: "key1=value1,key2=value2". Pairs with an empty key or
/// value are dropped.
pub fn parse_metadata(metadata_str: &str) -> BTreeMap<String, String> {
    metadata_str
        .split(',')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?.trim();
            let value = parts.next()?.trim();

            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key.to_string(), value.to_string()))
            }
        })
        .collect()
}

/// Static metadata attached to every object an uploader writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, Option<String>>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags for a release: the app version when given plus any extra pairs
    pub fn for_release(app_version: Option<&str>, extra: BTreeMap<String, String>) -> Self {
        let mut tags = Self::new();
        for (key, value) in extra {
            tags.insert(key, Some(value));
        }
        if let Some(version) = app_version.filter(|v| !v.is_empty()) {
            tags.insert(APP_VERSION_TAG, Some(version.to_string()));
        }
        tags
    }

    /// Add a tag. A leading `x-amz-meta-` is dropped since the store adds it.
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        let key = match key.get(..METADATA_PREFIX.len()) {
            Some(head) if head.eq_ignore_ascii_case(METADATA_PREFIX) => {
                key[METADATA_PREFIX.len()..].to_string()
            }
            _ => key,
        };
        self.0.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Entries that carry a value, in key order
    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }
}
