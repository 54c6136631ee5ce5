use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Image {index} is not embeddable: {reason}")]
pub struct InvalidImageError {
    pub index: usize,
    pub reason: String,
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    general_purpose::STANDARD
        .decode(compact.as_bytes())
        .ok()
        .filter(|bytes| !bytes.is_empty())
}

fn check_data_uri(value: &str) -> Result<(), String> {
    let rest = &value["data:".len()..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;
    let mut header_parts = header.split(';');
    let mime_type = header_parts.next().unwrap_or("").trim().to_lowercase();
    if !mime_type.starts_with("image/") {
        return Err(format!("data URI media type '{mime_type}' is not an image"));
    }
    if !header_parts.any(|part| part.trim().eq_ignore_ascii_case("base64")) {
        return Err("data URI must be base64 encoded".to_string());
    }
    if decode_base64(payload).is_none() {
        return Err("data URI payload is not valid base64".to_string());
    }
    Ok(())
}

/// Turns a caller-supplied image into something the provider can embed: a
/// base64 `data:` URI or an http(s) URL. Bare base64 blobs are sniffed and
/// wrapped into a data URI.
pub fn normalize_image_reference(raw: &str) -> Result<String, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("image is empty".to_string());
    }

    if value
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
    {
        check_data_uri(value)?;
        return Ok(value.to_string());
    }

    let lowered_prefix: String = value.chars().take(8).collect::<String>().to_lowercase();
    if lowered_prefix.starts_with("http://") || lowered_prefix.starts_with("https://") {
        let url = Url::parse(value).map_err(|err| format!("invalid image URL: {err}"))?;
        if url.host_str().is_none() {
            return Err("image URL has no host".to_string());
        }
        return Ok(value.to_string());
    }

    let bytes = decode_base64(value)
        .ok_or_else(|| "expected a data URI, an http(s) URL or base64 image data".to_string())?;
    let mime_type = detect_mime_type(&bytes)
        .filter(|mime| mime.starts_with("image/"))
        .ok_or_else(|| "base64 payload is not a recognized image format".to_string())?;
    let encoded = general_purpose::STANDARD.encode(&bytes);
    Ok(format!("data:{};base64,{}", mime_type, encoded))
}

pub fn normalize_images(images: &[String]) -> Result<Vec<String>, InvalidImageError> {
    images
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize_image_reference(raw).map_err(|reason| InvalidImageError { index, reason })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG.
    const PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn keeps_valid_data_uri() {
        let uri = format!("data:image/png;base64,{PNG_BASE64}");
        assert_eq!(normalize_image_reference(&uri).unwrap(), uri);
    }

    #[test]
    fn keeps_https_url() {
        let url = "https://example.com/photo.jpg";
        assert_eq!(normalize_image_reference(url).unwrap(), url);
    }

    #[test]
    fn wraps_bare_base64_with_detected_mime() {
        let normalized = normalize_image_reference(PNG_BASE64).unwrap();
        assert_eq!(normalized, format!("data:image/png;base64,{PNG_BASE64}"));
    }

    #[test]
    fn rejects_non_image_data_uri() {
        let err = normalize_image_reference("data:text/plain;base64,aGVsbG8=").unwrap_err();
        assert!(err.contains("not an image"));
    }

    #[test]
    fn rejects_garbage_and_reports_index() {
        let images = vec![
            format!("data:image/png;base64,{PNG_BASE64}"),
            "definitely not an image!".to_string(),
        ];
        let err = normalize_images(&images).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn rejects_base64_that_is_not_an_image() {
        // "hello world"
        let err = normalize_image_reference("aGVsbG8gd29ybGQ=").unwrap_err();
        assert!(err.contains("not a recognized image"));
    }
}
