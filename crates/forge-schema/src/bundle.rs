//! Tenant schema bundles
//!
//! A bundle is the unit a tenant's schemas are shipped and cached in. It
//! holds every schema file, every `*.properties` map, and the loose endpoint
//! list read from `endpoints.properties`.

use crate::error::SchemaError;
use crate::registry::SchemaRegistry;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Properties file holding loose endpoints instead of key/value pairs
const ENDPOINTS_FILE: &str = "endpoints";

/// Metadata of one bundle source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Path relative to the bundle root
    pub key: String,
    /// File name
    pub name: String,
    /// Last modification time
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes
    pub size: u64,
}

/// Metadata of a bundle directory; its fingerprint keys the schema cache
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Schema and properties files, sorted by name
    pub files: Vec<FileMeta>,
    #[serde(skip)]
    root: PathBuf,
}

impl BundleMetadata {
    /// List schema (`*.json`, `*.yaml`, `*.yml`) and `*.properties` files of a directory
    ///
    /// # Errors
    /// Returns [`SchemaError::Io`] if the directory cannot be listed.
    pub async fn scan(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| SchemaError::io_error(dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SchemaError::io_error(dir, e))?
        {
            let path = entry.path();
            let is_bundle_file = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json" | "yaml" | "yml" | "properties")
            );
            if !is_bundle_file {
                continue;
            }
            let meta = entry
                .metadata()
                .await
                .map_err(|e| SchemaError::io_error(&path, e))?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(FileMeta {
                key: name.clone(),
                name,
                last_modified: meta.modified().ok().map(DateTime::<Utc>::from),
                size: meta.len(),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            files,
            root: dir.to_path_buf(),
        })
    }

    /// Create metadata from an explicit file list
    #[must_use]
    pub fn from_files(root: impl Into<PathBuf>, files: Vec<FileMeta>) -> Self {
        Self {
            files,
            root: root.into(),
        }
    }

    /// Directory the files were listed from
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SHA-256 hex digest of the serialised file list
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.files).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// All schemas and properties of one tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaBundle {
    /// Owning tenant
    pub tenant_id: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Raw schemas by type name
    pub schemas: IndexMap<String, Value>,
    /// Parsed `.properties` maps by file stem
    pub properties: IndexMap<String, IndexMap<String, String>>,
    /// Endpoints not attached to any schema
    pub loose_endpoints: Vec<String>,
}

impl SchemaBundle {
    /// Create an empty bundle
    #[must_use]
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            timestamp: Utc::now(),
            schemas: IndexMap::new(),
            properties: IndexMap::new(),
            loose_endpoints: Vec::new(),
        }
    }

    /// Add a schema
    #[must_use]
    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    /// Read every file listed in `metadata`
    ///
    /// A file that fails to read or parse is logged and skipped.
    pub async fn load(tenant_id: impl Into<String>, metadata: &BundleMetadata) -> Self {
        let mut bundle = Self::new(tenant_id);

        for file in &metadata.files {
            let path = metadata.root().join(&file.key);
            if let Err(e) = bundle.load_file(&path).await {
                tracing::error!(path = %path.display(), error = %e, "error loading schema file");
            }
        }

        tracing::info!(
            tenant = %bundle.tenant_id,
            schemas = bundle.schemas.len(),
            properties = bundle.properties.len(),
            endpoints = bundle.loose_endpoints.len(),
            "loaded schema bundle"
        );
        bundle
    }

    /// Scan a directory and load every bundle file in it
    ///
    /// # Errors
    /// Returns [`SchemaError::Io`] if the directory cannot be listed.
    pub async fn from_dir(
        tenant_id: impl Into<String>,
        dir: impl AsRef<Path>,
    ) -> Result<Self, SchemaError> {
        let metadata = BundleMetadata::scan(dir).await?;
        Ok(Self::load(tenant_id, &metadata).await)
    }

    async fn load_file(&mut self, path: &Path) -> Result<(), SchemaError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SchemaError::io_error(path, e))?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => {
                let value: Value = serde_json::from_str(&text)
                    .map_err(|e| SchemaError::syntax_error(path, e.to_string()))?;
                self.schemas.insert(stem, value);
            }
            Some("yaml" | "yml") => {
                let value: Value = serde_yaml::from_str(&text)
                    .map_err(|e| SchemaError::syntax_error(path, e.to_string()))?;
                self.schemas.insert(stem, value);
            }
            Some("properties") if stem == ENDPOINTS_FILE => {
                self.loose_endpoints.extend(parse_endpoints(&text));
            }
            Some("properties") => {
                self.properties.insert(stem, parse_properties(&text));
            }
            _ => {}
        }
        Ok(())
    }

    /// Build a registry holding every schema of the bundle
    #[must_use]
    pub fn registry(&self) -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        for (name, schema) in &self.schemas {
            registry.register(name, schema.clone());
        }
        registry
    }

    /// Look up a parsed properties map
    #[inline]
    #[must_use]
    pub fn property_map(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.properties.get(name)
    }
}

/// Parse `key=value` lines
///
/// Blank lines and `#` comments are skipped; keys and values are trimmed and
/// one layer of surrounding quotes is removed from values.
#[must_use]
pub fn parse_properties(text: &str) -> IndexMap<String, String> {
    let mut parsed = IndexMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(eq) = trimmed.find('=') else { continue };
        if eq == 0 {
            continue;
        }
        let key = trimmed[..eq].trim();
        let value = trimmed[eq + 1..].trim();
        let value = value.strip_prefix(&['\'', '"'][..]).unwrap_or(value);
        let value = value.strip_suffix(&['\'', '"'][..]).unwrap_or(value);
        parsed.insert(key.to_string(), value.to_string());
    }
    parsed
}

/// Parse an endpoint list: one endpoint per non-comment line
#[must_use]
pub fn parse_endpoints(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
