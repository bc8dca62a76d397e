//! Screenshot loading and MIME normalization
//!
//! The backend rejects unknown content types outright, so anything outside
//! the supported set is relabeled instead of failing the request.

use super::retry::{retry, RetryPolicy};
use crate::error::{LqaError, LqaResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::path::Path;
use tracing::{debug, warn};

pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Base64 image ready to inline into a backend request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Where a screenshot comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef<'a> {
    DataUrl(&'a str),
    Remote(url::Url),
    File(&'a Path),
}

impl<'a> ImageRef<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("data:") {
            return ImageRef::DataUrl(trimmed);
        }
        if let Ok(url) = url::Url::parse(trimmed) {
            if matches!(url.scheme(), "http" | "https") {
                return ImageRef::Remote(url);
            }
        }
        ImageRef::File(Path::new(trimmed))
    }
}

/// Map a declared content type onto the supported set.
///
/// Unsupported or missing types become PNG when the name looks like a PNG,
/// JPEG otherwise.
pub fn normalize_mime(declared: Option<&str>, name: &str) -> String {
    let declared = declared
        .and_then(|d| d.split(';').next())
        .map(|d| d.trim().to_ascii_lowercase());
    let declared = match declared.as_deref() {
        Some("image/jpg") | Some("image/pjpeg") => Some("image/jpeg".to_string()),
        _ => declared,
    };

    if let Some(mime) = declared {
        if SUPPORTED_MIME_TYPES.contains(&mime.as_str()) {
            return mime;
        }
    }

    let fallback = if name.to_ascii_lowercase().contains(".png") {
        "image/png"
    } else {
        "image/jpeg"
    };
    debug!(name, fallback, "unsupported image type, substituting");
    fallback.to_string()
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

fn decode_data_url(reference: &str) -> LqaResult<InlineImage> {
    let body = reference.strip_prefix("data:").unwrap_or(reference);
    let (header, payload) = body
        .split_once(',')
        .ok_or_else(|| LqaError::transport("malformed data URL: missing ','"))?;
    let is_base64 = header.ends_with(";base64");
    let declared = header.split(';').next().filter(|m| !m.is_empty());

    let data = if is_base64 {
        BASE64
            .decode(payload.trim())
            .map_err(|e| LqaError::transport(format!("malformed data URL: {}", e)))?;
        payload.trim().to_string()
    } else {
        BASE64.encode(payload.as_bytes())
    };

    Ok(InlineImage {
        mime_type: normalize_mime(declared, ""),
        data,
    })
}

async fn fetch_remote(client: &reqwest::Client, url: &url::Url) -> LqaResult<InlineImage> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LqaError::transport(format!(
            "image fetch failed ({}): {}",
            status, url
        )));
    }
    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await?;
    Ok(InlineImage {
        mime_type: normalize_mime(declared.as_deref(), url.path()),
        data: BASE64.encode(&bytes),
    })
}

async fn read_file(path: &Path) -> LqaResult<InlineImage> {
    let bytes = tokio::fs::read(path).await?;
    let name = path.to_string_lossy();
    Ok(InlineImage {
        mime_type: normalize_mime(mime_from_extension(path), &name),
        data: BASE64.encode(&bytes),
    })
}

/// Load one screenshot reference into an inline image.
pub async fn load_image(client: &reqwest::Client, reference: &str) -> LqaResult<InlineImage> {
    match ImageRef::parse(reference) {
        ImageRef::DataUrl(data_url) => decode_data_url(data_url),
        ImageRef::Remote(url) => fetch_remote(client, &url).await,
        ImageRef::File(path) => read_file(path).await,
    }
}

/// Load source and target concurrently, each under the retry policy.
pub async fn load_pair(
    client: &reqwest::Client,
    source: &str,
    target: &str,
    policy: &RetryPolicy,
) -> LqaResult<(InlineImage, InlineImage)> {
    let mut source_failures = Vec::new();
    let mut target_failures = Vec::new();
    let result = tokio::try_join!(
        retry(policy, "source image", &mut source_failures, || load_image(
            client, source
        )),
        retry(policy, "target image", &mut target_failures, || load_image(
            client, target
        )),
    );
    if let Err(err) = &result {
        warn!(error = %err, "screenshot could not be loaded");
    }
    result
}
