//! Image acquisition
//!
//! A folder plays the photo library, a capture folder plays the camera
//! (its newest image is taken), and a single path can be given directly.
//! Permission means the location exists and is readable.

use crate::error::{AdvisorError, Result};
use image::ImageFormat;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;
use walkdir::WalkDir;

/// Upload ceiling, 8 MiB
pub const MAX_IMAGE_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Camera,
    Library,
}

/// A file the user picked, before any checks
#[derive(Debug, Clone, PartialEq)]
pub struct PickedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

/// A picked image that passed the size and format checks
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedImage {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    pub mime: String,
}

pub trait ImageSource {
    fn request_permission(&self) -> bool;

    /// None when the user backs out
    fn pick(&self) -> Result<Option<PickedImage>>;

    /// Human-readable location, used in messages
    fn location(&self) -> String;
}

/// Lets the user choose one of the listed images; None cancels
pub type Chooser = Box<dyn Fn(&[PickedImage]) -> Result<Option<usize>>>;

/// A folder of photos
pub struct DirectorySource {
    dir: PathBuf,
    kind: SourceKind,
    chooser: Option<Chooser>,
}

impl DirectorySource {
    /// Newest image in the folder
    pub fn camera(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            kind: SourceKind::Camera,
            chooser: None,
        }
    }

    /// Any image in the folder, chosen with `chooser`
    pub fn library(dir: &Path, chooser: Chooser) -> Self {
        Self {
            dir: dir.to_path_buf(),
            kind: SourceKind::Library,
            chooser: Some(chooser),
        }
    }
}

impl ImageSource for DirectorySource {
    fn request_permission(&self) -> bool {
        self.dir.is_dir() && std::fs::read_dir(&self.dir).is_ok()
    }

    fn pick(&self) -> Result<Option<PickedImage>> {
        let images = scan_images(&self.dir)?;
        if images.is_empty() {
            return Err(AdvisorError::NoImagesFound(self.dir.display().to_string()));
        }
        match (&self.kind, &self.chooser) {
            (SourceKind::Library, Some(chooser)) => {
                Ok(chooser(&images)?.and_then(|index| images.get(index).cloned()))
            }
            _ => Ok(newest(images)),
        }
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// One explicit file
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl ImageSource for FileSource {
    fn request_permission(&self) -> bool {
        self.path.is_file() && File::open(&self.path).is_ok()
    }

    fn pick(&self) -> Result<Option<PickedImage>> {
        Ok(Some(picked_from_path(&self.path)?))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

fn picked_from_path(path: &Path) -> Result<PickedImage> {
    let meta = std::fs::metadata(path)?;
    Ok(PickedImage {
        path: path.to_path_buf(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        size_bytes: meta.len(),
        modified: meta.modified().ok(),
    })
}

/// Images directly inside `dir`, sorted by file name
pub fn scan_images(dir: &Path) -> Result<Vec<PickedImage>> {
    if !dir.is_dir() {
        return Err(AdvisorError::PermissionDenied(dir.display().to_string()));
    }

    let mut images: Vec<PickedImage> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| mime_for(e.path()).is_some())
        .filter_map(|e| picked_from_path(e.path()).ok())
        .collect();

    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(images)
}

fn newest(images: Vec<PickedImage>) -> Option<PickedImage> {
    images.into_iter().max_by_key(|img| img.modified)
}

/// MIME type from the file extension; None for anything that is not an image
pub fn mime_for(path: &Path) -> Option<&'static str> {
    ImageFormat::from_path(path).ok().map(|f| f.to_mime_type())
}

/// Run a source: permission, pick, size check, format check
///
/// Ok(None) means the user backed out. Nothing is retried.
pub fn acquire(source: &dyn ImageSource) -> Result<Option<SelectedImage>> {
    if !source.request_permission() {
        return Err(AdvisorError::PermissionDenied(source.location()));
    }
    let Some(picked) = source.pick()? else {
        return Ok(None);
    };
    debug!(file = %picked.file_name, size = picked.size_bytes, "picked image");
    check_picked(picked).map(Some)
}

/// Size limit first, then format
pub fn check_picked(picked: PickedImage) -> Result<SelectedImage> {
    if picked.size_bytes > MAX_IMAGE_BYTES {
        return Err(AdvisorError::PayloadTooLarge {
            size: picked.size_bytes,
            limit: MAX_IMAGE_BYTES,
        });
    }
    let mime = mime_for(&picked.path).ok_or_else(|| AdvisorError::NotAnImage(picked.file_name.clone()))?;
    Ok(SelectedImage {
        path: picked.path,
        file_name: picked.file_name,
        size_bytes: picked.size_bytes,
        mime: mime.to_string(),
    })
}
