//! Fixed folder layout applied to every project.

use serde::{Deserialize, Serialize};

use projectdrive_common::FolderRef;

/// Subfolders created beneath every project root, in creation order.
///
/// Shared by both providers so projects look the same wherever they live.
pub const PROJECT_SUBFOLDERS: [&str; 10] = [
    "01_brief",
    "02_footage",
    "03_audio",
    "04_photos",
    "05_graphics",
    "06_music",
    "07_project_files",
    "08_renders",
    "09_review",
    EXPORT_FOLDER,
];

/// The client-facing delivery folder.
pub const EXPORT_FOLDER: &str = "10_export";

/// Handles returned by tree provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTree {
    /// Project root folder.
    pub root: FolderRef,
    /// Export subfolder.
    pub export: FolderRef,
}
