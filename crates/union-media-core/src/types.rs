//! Wire types for the media function endpoint.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ACTION_UPLOAD: &str = "upload";
pub const ACTION_DELETE: &str = "delete";

/// Result of a successful upload.
///
/// `public_id` is what a later deletion must reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub public_url: String,
    pub public_id: String,
}

/// Body returned for a successful deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    pub success: bool,
}

/// Body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Raw `{ "action": ..., "data": { ... } }` request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub data: Option<ActionData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
}

/// Validation failures for an action envelope.
///
/// The messages are part of the endpoint's public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Missing base64Data or folder for upload.")]
    MissingUploadFields,
    #[error("Missing publicId for deletion.")]
    MissingPublicId,
    #[error("Invalid action specified.")]
    UnknownAction,
}

/// A validated media action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAction {
    Upload { base64_data: String, folder: String },
    Delete { public_id: String },
}

impl MediaAction {
    pub fn upload(
        base64_data: impl Into<String>,
        folder: impl Into<String>,
    ) -> Result<Self, ActionError> {
        let base64_data = base64_data.into();
        let folder = folder.into();
        if base64_data.is_empty() || folder.is_empty() {
            return Err(ActionError::MissingUploadFields);
        }
        Ok(Self::Upload {
            base64_data,
            folder,
        })
    }

    pub fn delete(public_id: impl Into<String>) -> Result<Self, ActionError> {
        let public_id = public_id.into();
        if public_id.is_empty() {
            return Err(ActionError::MissingPublicId);
        }
        Ok(Self::Delete { public_id })
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Upload { .. } => ACTION_UPLOAD,
            Self::Delete { .. } => ACTION_DELETE,
        }
    }

    pub fn into_envelope(self) -> ActionEnvelope {
        let action = self.name().to_string();
        let data = match self {
            Self::Upload {
                base64_data,
                folder,
            } => ActionData {
                base64_data: Some(base64_data),
                folder: Some(folder),
                public_id: None,
            },
            Self::Delete { public_id } => ActionData {
                public_id: Some(public_id),
                ..ActionData::default()
            },
        };
        ActionEnvelope {
            action,
            data: Some(data),
        }
    }
}

impl TryFrom<ActionEnvelope> for MediaAction {
    type Error = ActionError;

    fn try_from(envelope: ActionEnvelope) -> Result<Self, Self::Error> {
        let data = envelope.data.unwrap_or_default();
        match envelope.action.as_str() {
            ACTION_UPLOAD => Self::upload(
                data.base64_data.unwrap_or_default(),
                data.folder.unwrap_or_default(),
            ),
            ACTION_DELETE => Self::delete(data.public_id.unwrap_or_default()),
            _ => Err(ActionError::UnknownAction),
        }
    }
}
