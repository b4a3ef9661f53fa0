// Local filesystem adapter - Folder scanning and output directories

use std::fs;
use std::path::Path;

use image::RgbImage;
use tracing::debug;
use walkdir::WalkDir;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::VideoExtensions;
use crate::ports::*;

/// Local filesystem adapter
pub struct LocalFsAdapter;

impl LocalFsAdapter {
    /// Create new local filesystem adapter
    pub fn new() -> Result<Self, DomainError> {
        Ok(Self)
    }
}

impl FsPort for LocalFsAdapter {
    fn scan_videos(&self, folder: &Path) -> Result<Vec<VideoFileRef>, DomainError> {
        if !folder.is_dir() {
            return Err(DomainError::FsFail(format!(
                "Input folder is not a readable directory: {}",
                folder.display()
            )));
        }

        let mut videos = Vec::new();
        for entry in WalkDir::new(folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                DomainError::FsFail(format!("Failed to read {}: {}", folder.display(), e))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if VideoExtensions::is_recognized(&name) {
                videos.push(VideoFileRef::new(entry.path())?);
            } else {
                debug!("Ignoring non-video entry: {}", name);
            }
        }

        Ok(videos)
    }

    fn create_directory(&self, dir: &Path) -> Result<(), DomainError> {
        fs::create_dir_all(dir).map_err(|e| {
            DomainError::FsFail(format!("Failed to create directory {}: {}", dir.display(), e))
        })
    }

    fn save_image(&self, image: &RgbImage, path: &Path) -> Result<(), DomainError> {
        image.save(path).map_err(|e| {
            DomainError::TaskFailed(format!("Failed to write image {}: {}", path.display(), e))
        })
    }
}
