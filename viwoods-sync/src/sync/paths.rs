use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use viwoods_core::note_file_name;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("folder path is empty")]
    Empty,
    #[error("name {0:?} cannot be mirrored locally")]
    UnsupportedName(String),
    #[error("folder path contains unsupported component")]
    UnsupportedComponent,
}

/// Ledger key of a note: `appType/folderId/noteId/fileName`.
pub fn remote_identity(app_type: &str, folder_id: &str, note_id: &str, file_name: &str) -> String {
    format!(
        "{app_type}/{folder_id}/{note_id}/{}",
        note_file_name(file_name)
    )
}

/// Joins one remote name under `dir`, refusing names that would leave it.
pub fn mirror_child(dir: &Path, name: &str) -> Result<PathBuf, PathError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if !name.contains(['/', '\\']) => {
            Ok(dir.join(part))
        }
        _ => Err(PathError::UnsupportedName(name.to_string())),
    }
}

/// Local file for a note entry; always carries the `.note` extension.
pub fn mirror_file(dir: &Path, name: &str) -> Result<PathBuf, PathError> {
    mirror_child(dir, &note_file_name(name))
}

/// Splits a slash-delimited logical folder path ("Paper/Papers/Unclassified Notes")
/// into its segments, ignoring empty ones.
pub fn split_folder_path(folder_path: &str) -> Result<Vec<&str>, PathError> {
    let segments: Vec<&str> = folder_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return Err(PathError::Empty);
    }
    if segments.iter().any(|segment| matches!(*segment, "." | "..")) {
        return Err(PathError::UnsupportedComponent);
    }
    Ok(segments)
}

pub fn mirror_dir_for(output_root: &Path, segments: &[&str]) -> Result<PathBuf, PathError> {
    let mut out = output_root.to_path_buf();
    for segment in segments {
        out = mirror_child(&out, segment)?;
    }
    Ok(out)
}
