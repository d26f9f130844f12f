//! union-media-core - Core library for union-media
//!
//! This crate contains the media-host request signing, the wire types shared
//! by the media function and its callers, and the client helper the admin
//! dashboard uses to upload, delete, and replace stored images and documents.

pub mod client;
pub mod error;
pub mod files;
pub mod signing;
pub mod types;
pub mod util;

pub use client::MediaFunctionClient;
pub use error::MediaClientError;
pub use signing::{ParamValue, SignableRequest, SigningError};
pub use types::{ActionEnvelope, ActionError, MediaAction, UploadResult};
