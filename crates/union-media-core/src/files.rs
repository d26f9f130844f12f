//! Helpers for turning local files into upload payloads and for recovering
//! media-host public ids from stored delivery URLs.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::error::MediaClientError;

/// Encode bytes as a `data:<mime>;base64,<payload>` URL.
pub fn encode_data_url(bytes: &[u8], content_type: &str) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

/// Read a local file and encode it as a data URL.
///
/// The content type is guessed from the file extension and falls back to
/// `application/octet-stream`.
pub async fn encode_file(path: impl AsRef<Path>) -> Result<String, MediaClientError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let content_type = mime_guess::from_path(path).first_or_octet_stream();
    Ok(encode_data_url(&bytes, content_type.essence_str()))
}

/// Split a base64 data URL into its media type and payload.
///
/// Returns `None` for anything that is not a base64 data URL.
pub fn split_data_url(value: &str) -> Option<(&str, &str)> {
    let rest = value.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    Some((media_type, payload))
}

/// Recover the public id from a media-host delivery URL.
///
/// `https://res.cloudinary.com/demo/image/upload/v1712345678/news-images/abc.jpg`
/// yields `news-images/abc`. Segments up to and including the version
/// (`v<digits>`) are skipped. Without a version, leading transformation
/// segments such as `c_fill,w_300` are skipped instead. Segments are
/// percent-decoded and the file extension is dropped.
pub fn public_id_from_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let segments = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::decode(segment).ok().map(|decoded| decoded.into_owned()))
        .collect::<Option<Vec<String>>>()?;
    let upload_index = segments.iter().position(|segment| segment == "upload")?;
    let rest = &segments[upload_index + 1..];
    let rest = match rest.iter().position(|segment| is_version_segment(segment)) {
        Some(index) => &rest[index + 1..],
        None => {
            let skipped = rest
                .iter()
                .take_while(|segment| is_transformation_segment(segment))
                .count();
            &rest[skipped..]
        }
    };

    let (last, folders) = rest.split_last()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => last.as_str(),
    };

    let mut parts: Vec<&str> = folders.iter().map(String::as_str).collect();
    parts.push(stem);
    Some(parts.join("/"))
}

fn is_version_segment(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// `c_fill,w_300`, `t_thumb`, `dpr_2.0`: every comma-separated component is a
/// short lowercase parameter key, an underscore, then a value.
fn is_transformation_segment(segment: &str) -> bool {
    segment.split(',').all(|component| {
        component.split_once('_').is_some_and(|(key, value)| {
            (1..=3).contains(&key.len())
                && key.bytes().all(|b| b.is_ascii_lowercase())
                && !value.is_empty()
        })
    })
}
