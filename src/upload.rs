use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::{FileReference, ParsedSummary};

/// Extensions the upload handler accepts, lower-case and without the dot
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["csv", "txt", "log", "json", "zip"];

/// Size above which a "large file" advisory is shown
pub const LARGE_FILE_BYTES: u64 = 100 * 1024 * 1024;

/// Size above which a second, "very large file" advisory is shown
pub const VERY_LARGE_FILE_BYTES: u64 = 500 * 1024 * 1024;

pub const UNSUPPORTED_TYPE_MESSAGE: &str =
    "Please select a supported file type: CSV, TXT, LOG, JSON, or ZIP";

/// Where the bytes of a selected file come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBody {
    /// Streamed from disk when the upload is sent
    Path(PathBuf),

    /// Already in memory
    Bytes(Vec<u8>),
}

/// A file the user picked or dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// Name as chosen by the user, used for the extension check
    pub name: String,

    /// Size in bytes
    pub size: u64,

    pub body: FileBody,
}

impl SelectedFile {
    /// Describes a file on disk without reading it.
    ///
    /// # Arguments
    /// * `path` - Path of the file to upload
    ///
    /// # Returns
    /// * `std::io::Result<SelectedFile>` - The handle, or the metadata error
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(SelectedFile {
            name,
            size: metadata.len(),
            body: FileBody::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        SelectedFile {
            name: name.into(),
            size: bytes.len() as u64,
            body: FileBody::Bytes(bytes),
        }
    }

    /// Lower-cased text after the last dot, if the name has one
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }
}

pub fn file_extension(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Checks a file name against [`ALLOWED_EXTENSIONS`].
///
/// # Returns
/// * `Result<String, &'static str>` - The normalised extension, or the
///   message to show the user
pub fn check_extension(name: &str) -> Result<String, &'static str> {
    match file_extension(name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(UNSUPPORTED_TYPE_MESSAGE),
    }
}

/// Advisory messages for a file of `size` bytes, smallest threshold first.
///
/// No size is ever refused; the messages only warn about slow uploads.
pub fn size_advisories(size: u64) -> Vec<String> {
    let megabytes = size as f64 / (1024.0 * 1024.0);
    let mut advisories = Vec::new();

    if size > LARGE_FILE_BYTES {
        advisories.push(format!(
            "Large file detected ({:.1} MB). Upload may take longer than usual.",
            megabytes
        ));
    }
    if size > VERY_LARGE_FILE_BYTES {
        advisories.push(format!(
            "Very large file detected ({:.1} MB). Processing may take several minutes.",
            megabytes
        ));
    }

    advisories
}

/// JSON body returned by the upload endpoint.
///
/// Error responses may omit `success`, so every field has a default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_columns: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a settled upload means for the session
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// File accepted; summary present for tabular files
    Accepted {
        file: FileReference,
        summary: Option<ParsedSummary>,
        message: String,
    },

    /// Server refused the file
    Refused(String),
}

impl UploadResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        UploadResponse {
            success: false,
            error: Some(error.into()),
            ..UploadResponse::default()
        }
    }

    /// Interprets the response.
    ///
    /// # Arguments
    /// * `fallback_name` - Used when a successful response carries no filename
    pub fn into_outcome(self, fallback_name: &str) -> UploadOutcome {
        if !self.success {
            return UploadOutcome::Refused(self.error.unwrap_or_else(|| "Upload failed".into()));
        }

        let file_type = self
            .file_type
            .clone()
            .or_else(|| file_extension(fallback_name))
            .unwrap_or_default();
        let file = FileReference {
            filename: self.filename.unwrap_or_else(|| fallback_name.to_string()),
            file_type,
        };

        if file.is_tabular() {
            let columns = self.columns.unwrap_or_default();
            let numeric_columns = self.numeric_columns.unwrap_or_default();
            let row_count = self.row_count.unwrap_or(0);
            let message = format!(
                "{} file uploaded successfully! Found {} rows and {} columns.",
                file.file_type.to_uppercase(),
                row_count,
                columns.len()
            );
            UploadOutcome::Accepted {
                file,
                summary: Some(ParsedSummary {
                    columns,
                    numeric_columns,
                    row_count,
                }),
                message,
            }
        } else {
            let label = if file.file_type.is_empty() {
                "FILE".to_string()
            } else {
                file.file_type.to_uppercase()
            };
            UploadOutcome::Accepted {
                file,
                summary: None,
                message: format!("{} file uploaded successfully!", label),
            }
        }
    }
}
