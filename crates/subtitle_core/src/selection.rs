use std::path::PathBuf;

use thiserror::Error;

/// Video containers the submit form accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Upload limit enforced by the processing backend.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionLimits {
    pub max_files: usize,
    pub max_bytes: u64,
}

impl Default for SelectionLimits {
    fn default() -> Self {
        Self {
            max_files: 1,
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no file selected")]
    Empty,
    #[error("only {max} file(s) can be submitted at once, got {count}")]
    TooManyFiles { count: usize, max: usize },
    #[error("unsupported file type for {file_name}; allowed: mp4, avi, mov, mkv, wmv, flv, webm")]
    UnsupportedType { file_name: String },
    #[error("{file_name} is {size_bytes} bytes, the maximum is {max_bytes}")]
    TooLarge {
        file_name: String,
        size_bytes: u64,
        max_bytes: u64,
    },
}

pub fn is_supported_video(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Validates a drop/selection of files before anything touches the network.
pub fn validate_selection(
    mut files: Vec<SelectedFile>,
    limits: &SelectionLimits,
) -> Result<SelectedFile, SelectionError> {
    if files.is_empty() {
        return Err(SelectionError::Empty);
    }
    if files.len() > limits.max_files {
        return Err(SelectionError::TooManyFiles {
            count: files.len(),
            max: limits.max_files,
        });
    }
    let file = files.remove(0);
    if !is_supported_video(&file.file_name) {
        return Err(SelectionError::UnsupportedType {
            file_name: file.file_name,
        });
    }
    if file.size_bytes > limits.max_bytes {
        return Err(SelectionError::TooLarge {
            file_name: file.file_name,
            size_bytes: file.size_bytes,
            max_bytes: limits.max_bytes,
        });
    }
    Ok(file)
}

/// Local state of the submit form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionForm {
    selection: Option<SelectedFile>,
    last_error: Option<String>,
    submitting: bool,
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A rejected selection keeps whatever was selected before.
    pub fn select(
        &mut self,
        files: Vec<SelectedFile>,
        limits: &SelectionLimits,
    ) -> Result<&SelectedFile, SelectionError> {
        match validate_selection(files, limits) {
            Ok(file) => {
                self.last_error = None;
                Ok(self.selection.insert(file))
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Returns the file to upload, or `None` when nothing is selected or an
    /// upload is already running.
    pub fn begin_submit(&mut self) -> Option<SelectedFile> {
        if self.submitting {
            return None;
        }
        let file = self.selection.clone()?;
        self.submitting = true;
        self.last_error = None;
        Some(file)
    }

    pub fn submit_succeeded(&mut self) {
        self.submitting = false;
        self.selection = None;
    }

    pub fn submit_failed(&mut self, message: impl Into<String>) {
        self.submitting = false;
        self.last_error = Some(message.into());
    }

    pub fn selection(&self) -> Option<&SelectedFile> {
        self.selection.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }
}
