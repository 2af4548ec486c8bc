//! Resource loading with per-id memoization.
//!
//! Bytes are fetched through a [`ResourceLoader`]; the engine never decodes
//! images or audio, it only keeps the payload for the host's draw and audio
//! backends. A second load under an id that is already cached returns the
//! cached entry without fetching. Failures are returned to the caller and
//! never retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Errors from loading resources.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource '{url}' not found")]
    NotFound { url: String },

    #[error("failed to read resource '{url}': {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("resource '{url}' is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("resource '{id}' is a {found}, not a {expected}")]
    KindMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Fetches raw bytes for a url.
pub trait ResourceLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Reads resources from a directory on disk. Urls are relative paths.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ResourceLoader for FsLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.root.join(url.trim_start_matches('/'));
        std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ResourceError::NotFound { url: url.to_owned() }
            } else {
                ResourceError::Io {
                    url: url.to_owned(),
                    source,
                }
            }
        })
    }
}

/// Serves resources from an in-memory table.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: &str, bytes: impl Into<Vec<u8>>) {
        self.files.insert(url.to_owned(), bytes.into());
    }
}

impl ResourceLoader for MemoryLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound { url: url.to_owned() })
    }
}

// ---------------------------------------------------------------------------
// ResourceManager
// ---------------------------------------------------------------------------

/// A loaded resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Image { url: String, bytes: Vec<u8> },
    Audio { url: String, bytes: Vec<u8> },
    Json { url: String, value: serde_json::Value },
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Image { .. } => "image",
            Resource::Audio { .. } => "audio",
            Resource::Json { .. } => "json",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Resource::Image { url, .. }
            | Resource::Audio { url, .. }
            | Resource::Json { url, .. } => url,
        }
    }
}

pub struct ResourceManager {
    loader: Box<dyn ResourceLoader>,
    resources: HashMap<String, Resource>,
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("loaded", &self.resources.len())
            .finish()
    }
}

impl ResourceManager {
    pub fn new(loader: Box<dyn ResourceLoader>) -> Self {
        Self {
            loader,
            resources: HashMap::new(),
        }
    }

    pub fn set_loader(&mut self, loader: Box<dyn ResourceLoader>) {
        self.loader = loader;
    }

    pub fn load_image(&mut self, id: &str, url: &str) -> Result<&Resource, ResourceError> {
        self.load(id, "image", |loader| {
            Ok(Resource::Image {
                url: url.to_owned(),
                bytes: loader.fetch(url)?,
            })
        })
    }

    pub fn load_audio(&mut self, id: &str, url: &str) -> Result<&Resource, ResourceError> {
        self.load(id, "audio", |loader| {
            Ok(Resource::Audio {
                url: url.to_owned(),
                bytes: loader.fetch(url)?,
            })
        })
    }

    pub fn load_json(&mut self, id: &str, url: &str) -> Result<&serde_json::Value, ResourceError> {
        let resource = self.load(id, "json", |loader| {
            let bytes = loader.fetch(url)?;
            let value = serde_json::from_slice(&bytes).map_err(|source| ResourceError::Parse {
                url: url.to_owned(),
                source,
            })?;
            Ok(Resource::Json {
                url: url.to_owned(),
                value,
            })
        })?;
        match resource {
            Resource::Json { value, .. } => Ok(value),
            other => Err(ResourceError::KindMismatch {
                id: id.to_owned(),
                expected: "json",
                found: other.kind(),
            }),
        }
    }

    fn load<F>(
        &mut self,
        id: &str,
        expected: &'static str,
        fetch: F,
    ) -> Result<&Resource, ResourceError>
    where
        F: FnOnce(&dyn ResourceLoader) -> Result<Resource, ResourceError>,
    {
        if !self.resources.contains_key(id) {
            let resource = fetch(&*self.loader)?;
            tracing::debug!(id, url = resource.url(), kind = resource.kind(), "resource loaded");
            self.resources.insert(id.to_owned(), resource);
        }
        let resource = &self.resources[id];
        if resource.kind() != expected {
            return Err(ResourceError::KindMismatch {
                id: id.to_owned(),
                expected,
                found: resource.kind(),
            });
        }
        Ok(resource)
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Drop every cached resource.
    pub fn clear(&mut self) {
        self.resources.clear();
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(Box::new(FsLoader::new(".")))
    }
}
