//! Client for the media signing function.
//!
//! The admin dashboard never talks to the media host directly. It sends the
//! file (as a data URL) and a destination folder to the signing function with
//! the signed-in admin's bearer token, and stores the returned public URL and
//! public id on the content record.

use serde::de::DeserializeOwned;

use crate::error::MediaClientError;
use crate::types::{DeleteAck, ErrorBody, MediaAction, UploadResult};
use crate::util::{compact_text, is_http_url, sanitize};

/// HTTP client for the media signing function.
#[derive(Debug, Clone)]
pub struct MediaFunctionClient {
    endpoint_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl MediaFunctionClient {
    /// Builds a client for an explicit function endpoint URL.
    pub fn new(endpoint_url: impl Into<String>) -> Result<Self, MediaClientError> {
        let endpoint_url = normalize_endpoint_url(endpoint_url.into().as_str())?;
        let client = reqwest::Client::builder().build().map_err(|error| {
            MediaClientError::Config(format!("Failed to construct HTTP client: {error}"))
        })?;
        Ok(Self {
            endpoint_url,
            api_key: None,
            client,
        })
    }

    /// Sends `key` as the `apikey` header, as hosted function gateways expect.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Uploads a base64 payload (or data URL) into `folder`.
    pub async fn upload(
        &self,
        access_token: &str,
        base64_data: &str,
        folder: &str,
    ) -> Result<UploadResult, MediaClientError> {
        let action = MediaAction::upload(base64_data, folder)?;
        self.invoke(access_token, action).await
    }

    /// Deletes the resource `public_id`.
    ///
    /// Deleting a resource the media host no longer has also succeeds.
    pub async fn delete(&self, access_token: &str, public_id: &str) -> Result<(), MediaClientError> {
        let action = MediaAction::delete(public_id)?;
        let ack: DeleteAck = self.invoke(access_token, action).await?;
        if !ack.success {
            return Err(MediaClientError::Decode(
                "deletion response reported success=false".to_string(),
            ));
        }
        Ok(())
    }

    /// Replaces a stored resource: deletes `previous_public_id` first, then uploads.
    ///
    /// The two calls are independent. If the deletion succeeds and the upload
    /// then fails, the previous resource is already gone and the caller keeps
    /// only its stale reference.
    pub async fn replace(
        &self,
        access_token: &str,
        previous_public_id: Option<&str>,
        base64_data: &str,
        folder: &str,
    ) -> Result<UploadResult, MediaClientError> {
        let upload = MediaAction::upload(base64_data, folder)?;
        if let Some(previous) = previous_public_id.filter(|id| !id.trim().is_empty()) {
            self.delete(access_token, previous).await?;
            tracing::debug!(previous_len = previous.len(), "Removed previous media resource");
        }
        self.invoke(access_token, upload).await
    }

    async fn invoke<T: DeserializeOwned>(
        &self,
        access_token: &str,
        action: MediaAction,
    ) -> Result<T, MediaClientError> {
        let mut request = self
            .client
            .post(&self.endpoint_url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .json(&action.into_envelope());
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|error| MediaClientError::Transport(sanitize(&error)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map_or_else(|_| compact_text(&body), |payload| payload.error);
            return Err(MediaClientError::Rejected { status, message });
        }

        response
            .json::<T>()
            .await
            .map_err(|error| MediaClientError::Decode(sanitize(&error)))
    }
}

fn normalize_endpoint_url(raw: &str) -> Result<String, MediaClientError> {
    let endpoint = raw.trim().trim_end_matches('/').to_string();
    if endpoint.is_empty() {
        return Err(MediaClientError::Config(
            "Media function URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&endpoint) {
        return Err(MediaClientError::Config(
            "Media function URL must include http:// or https://".to_string(),
        ));
    }
    Ok(endpoint)
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::types::ActionError;

    #[test]
    fn normalize_endpoint_url_rejects_invalid_values() {
        assert!(normalize_endpoint_url("").is_err());
        assert!(normalize_endpoint_url("functions.example.com").is_err());
    }

    #[test]
    fn normalize_endpoint_url_trims_trailing_slash() {
        assert_eq!(
            normalize_endpoint_url("https://project.supabase.co/functions/v1/media/").unwrap(),
            "https://project.supabase.co/functions/v1/media"
        );
    }

    #[tokio::test]
    async fn upload_posts_envelope_and_returns_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", "Bearer admin-token")
            .match_header("apikey", "anon-key")
            .match_body(Matcher::Json(json!({
                "action": "upload",
                "data": { "base64Data": "data:image/png;base64,AAAA", "folder": "news-images" }
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicUrl":"https://host/x.png","publicId":"news-images/x"}"#)
            .create_async()
            .await;

        let client = MediaFunctionClient::new(server.url())
            .unwrap()
            .with_api_key("anon-key");
        let result = client
            .upload("admin-token", "data:image/png;base64,AAAA", "news-images")
            .await
            .unwrap();

        assert_eq!(
            result,
            UploadResult {
                public_url: "https://host/x.png".to_string(),
                public_id: "news-images/x".to_string(),
            }
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_request_surfaces_error_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Unauthorized: Missing Authorization header"}"#)
            .create_async()
            .await;

        let client = MediaFunctionClient::new(server.url()).unwrap();
        let err = client.delete("", "news-images/x").await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert!(err.to_string().contains("Missing Authorization header"));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let client = MediaFunctionClient::new(server.url()).unwrap();
        let err = client.upload("token", "", "news-images").await.unwrap_err();
        assert!(matches!(
            err,
            MediaClientError::InvalidInput(ActionError::MissingUploadFields)
        ));

        let err = client.delete("token", "").await.unwrap_err();
        assert!(matches!(
            err,
            MediaClientError::InvalidInput(ActionError::MissingPublicId)
        ));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn replace_deletes_previous_resource_before_uploading() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "action": "delete" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true}"#)
            .expect(1)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "action": "upload" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicUrl":"https://host/new.png","publicId":"executives/new"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = MediaFunctionClient::new(server.url()).unwrap();
        let result = client
            .replace("token", Some("executives/old"), "AAAA", "executives")
            .await
            .unwrap();

        assert_eq!(result.public_id, "executives/new");
        delete.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn replace_keeps_going_without_previous_resource() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "action": "delete" })))
            .expect(0)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "action": "upload" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"publicUrl":"https://host/a.pdf","publicId":"documents/a"}"#)
            .create_async()
            .await;

        let client = MediaFunctionClient::new(server.url()).unwrap();
        let result = client
            .replace("token", None, "AAAA", "documents")
            .await
            .unwrap();

        assert_eq!(result.public_url, "https://host/a.pdf");
        delete.assert_async().await;
        upload.assert_async().await;
    }

    #[tokio::test]
    async fn failed_deletion_aborts_replace() {
        let mut server = mockito::Server::new_async().await;
        let _delete = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "action": "delete" })))
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"Deletion failed: HTTP 502 Bad Gateway"}"#)
            .create_async()
            .await;
        let upload = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({ "action": "upload" })))
            .expect(0)
            .create_async()
            .await;

        let client = MediaFunctionClient::new(server.url()).unwrap();
        let err = client
            .replace("token", Some("news-images/old"), "AAAA", "news-images")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        upload.assert_async().await;
    }
}
