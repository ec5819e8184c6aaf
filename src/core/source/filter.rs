//! Decides which listed files are images worth fetching.

use std::collections::HashSet;
use std::path::Path;

/// MIME types the decoder can turn into pixels
const IMAGE_MIME_TYPES: [&str; 7] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

/// Filters files by extension (local folders) or MIME type (cloud storage)
pub struct ImageFilter {
    /// File extensions to include
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with the default raster extensions
    pub fn new() -> Self {
        Self {
            extensions: ["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif", "webp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Override the list of extensions to accept
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().map(|e| e.to_lowercase()).collect();
        self
    }

    /// Whether a name is hidden and hidden files are excluded
    pub fn is_excluded_hidden(&self, path: &Path) -> bool {
        !self.include_hidden
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with('.'))
    }

    /// Check if a file has a supported image extension
    pub fn has_image_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }

    /// Check if a MIME type is a supported raster image
    pub fn is_image_mime(mime_type: &str) -> bool {
        let mime = mime_type.trim().to_lowercase();
        IMAGE_MIME_TYPES.contains(&mime.as_str())
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}
