//! Local folder source using walkdir.

use super::{AssetListing, AssetLocator, AssetRef, AssetSource, ImageFilter, SkipReason, SourceKind};
use crate::error::{FetchError, SourceError};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Configuration for the local folder source
#[derive(Debug, Clone, Default)]
pub struct LocalFolderConfig {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Custom extensions to include (None = use defaults)
    pub extensions: Option<Vec<String>>,
}

/// Lists image files under one folder
pub struct LocalFolderSource {
    root: PathBuf,
    config: LocalFolderConfig,
    filter: ImageFilter,
}

impl LocalFolderSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>, config: LocalFolderConfig) -> Self {
        let mut filter = ImageFilter::new().with_hidden(config.include_hidden);

        if let Some(ref extensions) = config.extensions {
            filter = filter.with_extensions(extensions.clone());
        }

        Self {
            root: root.into(),
            config,
            filter,
        }
    }

    /// Identity is the path relative to the root, `/`-separated
    fn identity_for(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl AssetSource for LocalFolderSource {
    fn kind(&self) -> SourceKind {
        SourceKind::LocalFolder
    }

    fn locator(&self) -> String {
        self.root.display().to_string()
    }

    fn list_assets(&self) -> Result<AssetListing, SourceError> {
        if !self.root.exists() {
            return Err(SourceError::FolderNotFound {
                path: self.root.clone(),
            });
        }
        if !self.root.is_dir() {
            return Err(SourceError::NotADirectory {
                path: self.root.clone(),
            });
        }

        let mut listing = AssetListing::default();
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // Hidden directories are pruned, never the root itself
                entry.depth() == 0 || !self.filter.is_excluded_hidden(entry.path())
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    listing.skip(
                        self.identity_for(&path),
                        SkipReason::Unreadable {
                            reason: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let identity = self.identity_for(path);

            if !self.filter.has_image_extension(path) {
                let detail = path
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_else(|| "no extension".to_string());
                listing.skip(identity, SkipReason::NotAnImage { detail });
                continue;
            }

            match fs::metadata(path) {
                Ok(metadata) => {
                    let asset = AssetRef::new(identity, AssetLocator::File(path.to_path_buf()))
                        .with_meta("file_path", path.display().to_string())
                        .with_meta("file_size", metadata.len().to_string());
                    listing.assets.push(asset);
                }
                Err(e) => listing.skip(
                    identity,
                    SkipReason::Unreadable {
                        reason: e.to_string(),
                    },
                ),
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            assets = listing.assets.len(),
            skipped = listing.skipped.len(),
            "Listed local folder"
        );

        Ok(listing)
    }

    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError> {
        match &asset.locator {
            AssetLocator::File(path) => fs::read(path).map_err(|e| FetchError::Io {
                path: path.clone(),
                reason: e.to_string(),
            }),
            other => Err(FetchError::InvalidUrl {
                identity: asset.identity.clone(),
                url: format!("{:?}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, bytes: &[u8]) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn lists_images_and_skips_other_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "banner.png", b"png");
        write(dir.path(), "hero.JPG", b"jpg");
        write(dir.path(), "notes.txt", b"text");

        let source = LocalFolderSource::new(dir.path(), LocalFolderConfig::default());
        let listing = source.list_assets().unwrap();

        let identities: Vec<_> = listing.assets.iter().map(|a| a.identity.as_str()).collect();
        assert_eq!(identities, vec!["banner.png", "hero.JPG"]);
        assert_eq!(listing.skipped.len(), 1);
        assert_eq!(listing.skipped[0].identity, "notes.txt");
        assert_eq!(
            listing.assets[0].metadata.get("file_size").map(String::as_str),
            Some("3")
        );
    }

    #[test]
    fn non_recursive_by_default() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "top.png", b"png");
        write(dir.path(), "nested/inner.png", b"png");

        let flat = LocalFolderSource::new(dir.path(), LocalFolderConfig::default())
            .list_assets()
            .unwrap();
        assert_eq!(flat.assets.len(), 1);

        let deep = LocalFolderSource::new(
            dir.path(),
            LocalFolderConfig {
                recursive: true,
                ..Default::default()
            },
        )
        .list_assets()
        .unwrap();
        let identities: Vec<_> = deep.assets.iter().map(|a| a.identity.as_str()).collect();
        assert_eq!(identities, vec!["nested/inner.png", "top.png"]);
    }

    #[test]
    fn hidden_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".DS_Store", b"junk");
        write(dir.path(), ".secret.png", b"png");
        write(dir.path(), "visible.png", b"png");

        let listing = LocalFolderSource::new(dir.path(), LocalFolderConfig::default())
            .list_assets()
            .unwrap();

        assert_eq!(listing.assets.len(), 1);
        assert!(listing.skipped.is_empty());
    }

    #[test]
    fn include_hidden_lists_hidden_files_and_folders() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".secret.png", b"png");
        write(dir.path(), ".drafts/old.png", b"png");
        write(dir.path(), "visible.png", b"png");

        let listing = LocalFolderSource::new(
            dir.path(),
            LocalFolderConfig {
                recursive: true,
                include_hidden: true,
                ..Default::default()
            },
        )
        .list_assets()
        .unwrap();

        let identities: Vec<_> = listing.assets.iter().map(|a| a.identity.as_str()).collect();
        assert_eq!(identities, vec![".drafts/old.png", ".secret.png", "visible.png"]);
    }

    #[test]
    fn hidden_root_is_still_walked() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".creatives/banner.png", b"png");
        write(dir.path(), ".creatives/.hidden/skip.png", b"png");

        let listing = LocalFolderSource::new(
            dir.path().join(".creatives"),
            LocalFolderConfig {
                recursive: true,
                ..Default::default()
            },
        )
        .list_assets()
        .unwrap();

        let identities: Vec<_> = listing.assets.iter().map(|a| a.identity.as_str()).collect();
        assert_eq!(identities, vec!["banner.png"]);
    }

    #[test]
    fn missing_folder_is_fatal() {
        let source = LocalFolderSource::new("/definitely/not/here", LocalFolderConfig::default());
        assert!(matches!(
            source.list_assets(),
            Err(SourceError::FolderNotFound { .. })
        ));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.png", b"png");
        let source = LocalFolderSource::new(dir.path().join("a.png"), LocalFolderConfig::default());
        assert!(matches!(
            source.list_assets(),
            Err(SourceError::NotADirectory { .. })
        ));
    }

    #[test]
    fn fetch_reads_bytes_and_reports_missing_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.png", b"bytes");
        let source = LocalFolderSource::new(dir.path(), LocalFolderConfig::default());
        let listing = source.list_assets().unwrap();

        assert_eq!(source.fetch(&listing.assets[0]).unwrap(), b"bytes");

        fs::remove_file(dir.path().join("a.png")).unwrap();
        assert!(matches!(
            source.fetch(&listing.assets[0]),
            Err(FetchError::Io { .. })
        ));
    }
}
