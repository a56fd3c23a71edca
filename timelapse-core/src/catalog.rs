//! Video catalog
//!
//! Read-only index from published video filename to the capture group that
//! owns it. Built once from configuration; it indexes names only, so the
//! files behind it may be replaced at any time by the generator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::config::CaptureGroup;
use crate::error::{Result, TimelapseError};

/// True if `filename` is non-empty and made only of `[A-Za-z0-9_.-]`
pub fn is_valid_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

/// One published video
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Published filename, e.g. `yard_10_fps.mp4`
    pub filename: String,
    /// Frame rate this video is encoded at
    pub fps: u32,
    /// Owning capture group
    pub group: Arc<CaptureGroup>,
}

impl CatalogEntry {
    /// Where the video lives on disk
    pub fn path(&self) -> PathBuf {
        self.group.save_path.join(&self.filename)
    }
}

/// Filename to capture group index
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, CatalogEntry>,
    /// Filenames in configuration order, for listings
    order: Vec<String>,
}

impl Catalog {
    /// Build the catalog for every group and frame rate
    ///
    /// Two groups deriving the same filename is an error rather than
    /// letting the later group shadow the earlier one.
    pub fn build(groups: &[CaptureGroup]) -> Result<Self> {
        let mut catalog = Self::default();

        for group in groups {
            let group = Arc::new(group.clone());
            for &fps in &group.fps {
                let filename = group.video_name(fps);
                if let Some(existing) = catalog.entries.get(&filename) {
                    return Err(TimelapseError::DuplicateVideo(format!(
                        "{} is produced by both '{}' and '{}'",
                        filename, existing.group.name, group.name
                    )));
                }

                debug!("Catalog: {} -> {}", filename, group.name);
                catalog.order.push(filename.clone());
                catalog.entries.insert(
                    filename.clone(),
                    CatalogEntry {
                        filename,
                        fps,
                        group: Arc::clone(&group),
                    },
                );
            }
        }

        Ok(catalog)
    }

    /// Look up a video by filename
    pub fn get(&self, filename: &str) -> Option<&CatalogEntry> {
        self.entries.get(filename)
    }

    /// Entries in configuration order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// Number of videos
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no videos are configured
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_filenames() {
        assert!(is_valid_filename("yard_10_fps.mp4"));
        assert!(is_valid_filename("Front-Door.2.mp4"));
        assert!(!is_valid_filename(""));
        assert!(!is_valid_filename("../../etc/passwd"));
        assert!(!is_valid_filename("a/b.mp4"));
        assert!(!is_valid_filename("a\\b.mp4"));
        assert!(!is_valid_filename("yard 10.mp4"));
        assert!(!is_valid_filename("yärd.mp4"));
    }

    #[test]
    fn test_build_catalog() {
        let groups = vec![
            CaptureGroup::new("yard", "y/*.jpg", 10, "/out").with_fps(vec![10, 30]),
            CaptureGroup::new("gate", "g/*.jpg", 5, "/other"),
        ];
        let catalog = Catalog::build(&groups).unwrap();

        assert_eq!(catalog.len(), 3);
        assert!(catalog.get("yard_30_fps.mp4").is_some());
        assert!(catalog.get("yard_5_fps.mp4").is_none());

        let entry = catalog.get("gate_5_fps.mp4").unwrap();
        assert_eq!(entry.group.name, "gate");
        assert_eq!(entry.fps, 5);
        assert_eq!(entry.path(), PathBuf::from("/other/gate_5_fps.mp4"));

        let order: Vec<_> = catalog.entries().map(|e| e.filename.as_str()).collect();
        assert_eq!(order, ["yard_10_fps.mp4", "yard_30_fps.mp4", "gate_5_fps.mp4"]);
    }

    #[test]
    fn test_duplicate_video_names_rejected() {
        // Repeated rates within one group collide
        let groups = vec![CaptureGroup::new("yard", "y/*.jpg", 10, "/out").with_fps(vec![10, 10])];
        let err = Catalog::build(&groups).unwrap_err();
        assert!(matches!(err, TimelapseError::DuplicateVideo(_)));

        let groups = vec![
            CaptureGroup::new("yard", "y/*.jpg", 10, "/out"),
            CaptureGroup::new("yard", "z/*.jpg", 10, "/elsewhere"),
        ];
        assert!(Catalog::build(&groups).is_err());
    }
}
