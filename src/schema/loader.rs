//! Schema registry backed by JSON files
//!
//! Each `*.json` file in the schema directory holds one collection schema:
//!
//! ```json
//! { "collection": "posts", "fields": { "title": { "type": "string" } } }
//! ```
//!
//! Non-JSON files are ignored. A malformed file or a second schema for the
//! same collection fails the whole load.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{SchemaError, SchemaResult};
use super::types::CollectionSchema;
use crate::translate::is_identifier;

/// In-memory registry of collection schemas
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, CollectionSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every schema file in `dir` into a new registry.
    pub fn load_dir(dir: &Path) -> SchemaResult<Self> {
        let mut registry = Self::new();

        let entries = fs::read_dir(dir).map_err(|e| SchemaError::Io {
            path: dir.display().to_string(),
            source: e,
        })?;

        // Sort so duplicate detection reports the same file every run
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SchemaError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            registry.load_file(&path)?;
        }

        Ok(registry)
    }

    /// Loads and registers a single schema file.
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<()> {
        let content = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let schema: CollectionSchema =
            serde_json::from_str(&content).map_err(|e| SchemaError::Malformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        self.register(schema)
    }

    /// Registers a schema directly.
    pub fn register(&mut self, schema: CollectionSchema) -> SchemaResult<()> {
        schema
            .validate_structure()
            .map_err(|reason| SchemaError::InvalidStructure {
                collection: schema.collection.clone(),
                reason,
            })?;

        if self.schemas.contains_key(&schema.collection) {
            return Err(SchemaError::Duplicate(schema.collection));
        }

        self.schemas.insert(schema.collection.clone(), schema);
        Ok(())
    }

    /// Gets the schema of a collection.
    pub fn get(&self, collection: &str) -> Option<&CollectionSchema> {
        self.schemas.get(collection)
    }

    /// Returns the number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schema is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Writes a schema to `<dir>/<collection>.json`.
    ///
    /// The collection name becomes the file name, so it must be a plain
    /// identifier.
    pub fn save(dir: &Path, schema: &CollectionSchema) -> SchemaResult<PathBuf> {
        if !is_identifier(&schema.collection) {
            return Err(SchemaError::InvalidStructure {
                collection: schema.collection.clone(),
                reason: "collection name must be a plain identifier".into(),
            });
        }

        let path = dir.join(format!("{}.json", schema.collection));

        let content =
            serde_json::to_string_pretty(schema).map_err(|e| SchemaError::Malformed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        fs::write(&path, content).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(path)
    }
}
