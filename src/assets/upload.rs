//! Turning an [`ImageUpload`] into bytes plus the extension to store them under.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;

use super::mime::extension_for_mime;
use crate::models::ImageUpload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedUpload {
    pub bytes: Vec<u8>,
    pub extension: String,
}

/// Resolve the upload's payload. `None` means nothing usable was sent.
pub async fn decode_upload(upload: &ImageUpload) -> Option<DecodedUpload> {
    let bytes = match &upload.bytes {
        Some(bytes) => Some(bytes.clone()),
        None => match upload.data_url.as_deref().and_then(decode_data_url) {
            Some(bytes) => Some(bytes),
            None => match upload.path.as_deref() {
                Some(path) => read_client_path(path).await,
                None => None,
            },
        },
    };

    bytes.map(|bytes| DecodedUpload {
        bytes,
        extension: upload_extension(upload),
    })
}

/// Accepts `data:<mime>;base64,<payload>`, `data:<mime>,<percent-encoded>`
/// and bare base64.
pub fn decode_data_url(data_url: &str) -> Option<Vec<u8>> {
    match data_url.split_once(',') {
        Some((meta, payload)) if meta.contains(";base64") => BASE64.decode(payload.trim()).ok(),
        Some((_, payload)) => {
            let decoded = urlencoding::decode_binary(payload.as_bytes()).into_owned();
            (!decoded.is_empty()).then_some(decoded)
        }
        None => BASE64.decode(data_url.trim()).ok(),
    }
}

async fn read_client_path(path: &str) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => return Some(bytes),
        Err(err) => debug!("upload path {path} unreadable: {err}"),
    }

    let normalized = strip_file_scheme(path)?;
    tokio::fs::read(&normalized).await.ok()
}

/// `file:///home/a.png` → `/home/a.png`, `file:///C:/a.png` → `C:/a.png`.
fn strip_file_scheme(path: &str) -> Option<String> {
    let rest = path.trim().strip_prefix("file://")?;
    let bytes = rest.as_bytes();
    let has_drive = bytes.len() >= 3 && bytes[0] == b'/' && bytes[2] == b':';
    Some(if has_drive { rest[1..].to_string() } else { rest.to_string() })
}

fn upload_extension(upload: &ImageUpload) -> String {
    let from_filename = upload
        .filename
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext);
    let from_path = upload
        .path
        .as_deref()
        .and_then(|path| Path::new(path).extension())
        .and_then(|ext| ext.to_str());
    let from_mime = upload
        .data_url
        .as_deref()
        .and_then(|url| url.strip_prefix("data:"))
        .and_then(|rest| rest.split([';', ',']).next())
        .map(extension_for_mime);

    from_filename
        .filter(|ext| !ext.is_empty())
        .or(from_path.filter(|ext| !ext.is_empty()))
        .or(from_mime)
        .unwrap_or("png")
        .to_ascii_lowercase()
}
