//! Signed upload and destroy calls against the media host.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use chrono::Utc;
use reqwest::multipart::Form;
use reqwest::Response;
use serde::Deserialize;
use union_media_core::files::split_data_url;
use union_media_core::util::{compact_text, sanitize};
use union_media_core::{SignableRequest, UploadResult};

use crate::config::{AppConfig, MediaHostConfig};
use crate::error::AppError;

const RESOURCE_TYPE: &str = "image";
const RAW_PAYLOAD_MEDIA_TYPE: &str = "application/octet-stream";

/// Accepts padded and unpadded input alike.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How the media host answered a destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Deleted,
    AlreadyAbsent,
}

impl DeletionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::AlreadyAbsent => "already_absent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaHostClient {
    client: reqwest::Client,
    credentials: MediaHostConfig,
    api_base_url: String,
}

impl MediaHostClient {
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config
            .media
            .clone()
            .map(|media| Self::new(media, &config.media_api_base_url))
    }

    pub fn new(credentials: MediaHostConfig, api_base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Uploads `file_data` (a data URL or raw base64) into `folder`.
    pub async fn upload(&self, file_data: &str, folder: &str) -> Result<UploadResult, AppError> {
        self.ensure_credentials()?;
        let folder = normalize_folder(folder)?;
        let file = normalize_file_payload(file_data)?;

        let timestamp = Utc::now().timestamp();
        let signature = SignableRequest::for_upload(timestamp, &folder)
            .sign(&self.credentials.api_secret)?;

        let form = Form::new()
            .text("file", file)
            .text("api_key", self.credentials.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("folder", folder)
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|error| {
                AppError::upload_failed(format!("Media host request failed: {}", sanitize(&error)))
            })?;

        if !response.status().is_success() {
            return Err(AppError::upload_failed(describe_rejection(response).await));
        }

        let payload = response.json::<UploadResponse>().await.map_err(|error| {
            AppError::upload_failed(format!(
                "Media host response parse failed: {}",
                sanitize(&error)
            ))
        })?;

        let public_url = payload
            .secure_url
            .or(payload.url)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::upload_failed("Media host returned no resource URL"))?;
        let public_id = payload
            .public_id
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::upload_failed("Media host returned no public id"))?;

        Ok(UploadResult {
            public_url,
            public_id,
        })
    }

    /// Destroys `public_id`. A resource the host no longer has is not an error.
    pub async fn destroy(&self, public_id: &str) -> Result<DeletionOutcome, AppError> {
        let public_id = public_id.trim();
        if public_id.is_empty() {
            return Err(AppError::invalid_request("Missing publicId for deletion."));
        }
        self.ensure_credentials()?;

        let timestamp = Utc::now().timestamp();
        let signature = SignableRequest::for_destroy(public_id, timestamp)
            .sign(&self.credentials.api_secret)?;
        let timestamp = timestamp.to_string();

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("api_key", self.credentials.api_key.as_str()),
                ("timestamp", timestamp.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|error| {
                AppError::deletion_failed(format!(
                    "Media host request failed: {}",
                    sanitize(&error)
                ))
            })?;

        if !response.status().is_success() {
            return Err(AppError::deletion_failed(describe_rejection(response).await));
        }

        let payload = response.json::<DestroyResponse>().await.map_err(|error| {
            AppError::deletion_failed(format!(
                "Media host response parse failed: {}",
                sanitize(&error)
            ))
        })?;

        match payload.result.as_deref() {
            Some("ok") => Ok(DeletionOutcome::Deleted),
            Some("not found") => Ok(DeletionOutcome::AlreadyAbsent),
            Some(other) => Err(AppError::deletion_failed(format!(
                "Media host reported `{other}`"
            ))),
            None => Err(AppError::deletion_failed(
                "Media host response did not include a result",
            )),
        }
    }

    fn ensure_credentials(&self) -> Result<(), AppError> {
        if self.credentials.cloud_name.trim().is_empty() {
            return Err(AppError::config("Media host cloud name is not configured"));
        }
        if self.credentials.api_key.trim().is_empty() {
            return Err(AppError::config("Media host API key is not configured"));
        }
        if self.credentials.api_secret.trim().is_empty() {
            return Err(AppError::config("Media host API secret is not configured"));
        }
        Ok(())
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/v1_1/{}/{RESOURCE_TYPE}/{operation}",
            self.api_base_url, self.credentials.cloud_name
        )
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: Option<String>,
}

async fn describe_rejection(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!(
        "HTTP {} {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status"),
        compact_text(&body)
    )
}

fn normalize_folder(raw: &str) -> Result<String, AppError> {
    let folder = raw.trim().trim_matches('/').to_string();
    if folder.is_empty() {
        return Err(AppError::invalid_request(
            "Missing base64Data or folder for upload.",
        ));
    }
    if folder.contains("..") {
        return Err(AppError::invalid_request(
            "folder must not contain path traversal segments",
        ));
    }
    Ok(folder)
}

/// Data URLs pass through untouched. Bare base64 may be line-wrapped or
/// unpadded; it is re-encoded in canonical form and wrapped.
fn normalize_file_payload(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_request(
            "Missing base64Data or folder for upload.",
        ));
    }
    if split_data_url(trimmed).is_some() {
        return Ok(trimmed.to_string());
    }
    let compact: String = trimmed
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = LENIENT_BASE64
        .decode(compact.as_bytes())
        .map_err(|_| AppError::invalid_request("base64Data is not valid base64"))?;
    Ok(format!(
        "data:{RAW_PAYLOAD_MEDIA_TYPE};base64,{}",
        STANDARD.encode(bytes)
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn credentials(secret: &str) -> MediaHostConfig {
        MediaHostConfig {
            cloud_name: "union".to_string(),
            api_key: "123456".to_string(),
            api_secret: secret.to_string(),
        }
    }

    #[test]
    fn endpoint_uses_cloud_name_and_resource_type() {
        let client = MediaHostClient::new(credentials("s"), "https://api.cloudinary.com/");
        assert_eq!(
            client.endpoint("upload"),
            "https://api.cloudinary.com/v1_1/union/image/upload"
        );
        assert_eq!(
            client.endpoint("destroy"),
            "https://api.cloudinary.com/v1_1/union/image/destroy"
        );
    }

    #[test]
    fn normalize_folder_trims_slashes_and_rejects_traversal() {
        assert_eq!(normalize_folder(" /news-images/ ").unwrap(), "news-images");
        assert!(normalize_folder("../secrets").is_err());
        assert!(normalize_folder("/").is_err());
    }

    #[test]
    fn normalize_file_payload_wraps_raw_base64() {
        assert_eq!(
            normalize_file_payload("aGVsbG8=").unwrap(),
            "data:application/octet-stream;base64,aGVsbG8="
        );
        assert_eq!(
            normalize_file_payload("data:image/jpeg;base64,/9j/4AAQ").unwrap(),
            "data:image/jpeg;base64,/9j/4AAQ"
        );
        assert!(normalize_file_payload("not base64!").is_err());
    }

    #[test]
    fn normalize_file_payload_accepts_wrapped_and_unpadded_base64() {
        assert_eq!(
            normalize_file_payload("aGVs\r\nbG8=\n").unwrap(),
            "data:application/octet-stream;base64,aGVsbG8="
        );
        assert_eq!(
            normalize_file_payload("aGVsbG8").unwrap(),
            "data:application/octet-stream;base64,aGVsbG8="
        );
    }

    #[tokio::test]
    async fn destroy_requires_public_id() {
        let client = MediaHostClient::new(credentials("s"), "http://127.0.0.1:9");
        let err = client.destroy("  ").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing publicId for deletion.");
    }
}
