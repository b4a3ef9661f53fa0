// Probe LibAV adapter - Cheap frame and header reads using libav

use std::path::Path;

use image::RgbImage;
use tracing::warn;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::engine;
use crate::ports::*;

/// LibAV-based frame probing adapter
pub struct LibavFrameProbe;

impl LibavFrameProbe {
    /// Create new LibAV probing adapter
    pub fn new() -> Result<Self, DomainError> {
        engine::init().map_err(DomainError::from)?;
        Ok(Self)
    }
}

impl FrameProbePort for LibavFrameProbe {
    fn first_frame(&self, path: &Path) -> Result<Option<RgbImage>, DomainError> {
        match engine::frames::first_frame(path) {
            Ok(None) => {
                warn!("No decodable frame in {}", path.display());
                Ok(None)
            }
            Ok(frame) => Ok(frame),
            // An unreadable file simply has no thumbnail
            Err(e) => {
                warn!("Cannot read {} for thumbnail: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn read_metadata(&self, path: &Path) -> Result<Metadata, DomainError> {
        engine::metadata::read_metadata(path).map_err(|e| {
            DomainError::MetadataFailed(format!("{}: {}", path.display(), e))
        })
    }
}
