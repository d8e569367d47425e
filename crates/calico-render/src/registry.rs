//! The config-target registry

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use calico_context::Context;
use calico_context::checksum::{content_checksum, file_checksum_or_missing};
use calico_relation::RelationStore;

use crate::error::{Error, Result};

/// A named source of one context, resolved fresh on every pass
pub trait ContextGenerator {
    /// Stable name used in completeness reporting (e.g. `"etcd-proxy"`)
    fn name(&self) -> &str;

    fn generate(&self, store: &dyn RelationStore) -> Result<Context>;
}

/// A [`ContextGenerator`] wrapping an already-resolved context.
///
/// Used when a resolver has side effects (credential persistence) and must
/// run exactly once per pass: resolve first, then hand the result to the
/// registry through this wrapper.
pub struct StaticContext {
    name: String,
    context: Context,
}

impl StaticContext {
    pub fn new(name: impl Into<String>, context: Context) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }
}

impl ContextGenerator for StaticContext {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, _store: &dyn RelationStore) -> Result<Context> {
        Ok(self.context.clone())
    }
}

/// One managed config file: where it lives, which services consume it, and
/// which context generators feed it
pub struct ConfigTarget {
    pub path: PathBuf,
    pub services: Vec<String>,
    pub sources: Vec<Box<dyn ContextGenerator>>,
}

impl ConfigTarget {
    pub fn new(path: impl Into<PathBuf>, services: &[&str]) -> Self {
        Self {
            path: path.into(),
            services: services.iter().map(|s| s.to_string()).collect(),
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Box<dyn ContextGenerator>) -> Self {
        self.sources.push(source);
        self
    }
}

/// Result of one target write attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Content differed and the file was rewritten
    Changed,
    /// Content matched what is already on disk
    Unchanged,
    /// Every source produced an empty context; nothing to render yet
    Incomplete,
}

/// Registry of managed config targets.
///
/// A plain, re-creatable value: registration order is preserved and drives
/// write order.
#[derive(Default)]
pub struct Registry {
    targets: Vec<ConfigTarget>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: ConfigTarget) {
        self.targets.push(target);
    }

    pub fn is_registered(&self, path: &Path) -> bool {
        self.targets.iter().any(|t| t.path == path)
    }

    /// Target path to services map, used to decide restarts
    pub fn restart_map(&self) -> BTreeMap<PathBuf, Vec<String>> {
        self.targets
            .iter()
            .map(|t| (t.path.clone(), t.services.clone()))
            .collect()
    }

    /// Names of sources whose contexts resolved non-empty, in registration
    /// order without duplicates
    pub fn complete_contexts(&self, store: &dyn RelationStore) -> Result<Vec<String>> {
        let mut complete = Vec::new();
        for target in &self.targets {
            for source in &target.sources {
                if complete.iter().any(|n| n == source.name()) {
                    continue;
                }
                if !source.generate(store)?.is_empty() {
                    complete.push(source.name().to_string());
                }
            }
        }
        Ok(complete)
    }

    /// The merged context for one target; later sources win on collisions
    pub fn resolve(&self, path: &Path, store: &dyn RelationStore) -> Result<Context> {
        let target = self
            .targets
            .iter()
            .find(|t| t.path == path)
            .ok_or_else(|| Error::UnknownTarget {
                path: path.to_path_buf(),
            })?;

        let mut merged = Context::new();
        for source in &target.sources {
            merged.merge(source.generate(store)?);
        }
        Ok(merged)
    }

    /// Render one target, rewriting the file only when content changed.
    pub fn write(&self, path: &Path, store: &dyn RelationStore) -> Result<WriteOutcome> {
        let merged = self.resolve(path, store)?;
        if merged.is_empty() {
            tracing::debug!(path = %path.display(), "All contexts empty, skipping render");
            return Ok(WriteOutcome::Incomplete);
        }

        let mut content = serde_json::to_string_pretty(&merged)?;
        content.push('\n');

        if content_checksum(&content) == file_checksum_or_missing(path) {
            return Ok(WriteOutcome::Unchanged);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(path, &content).map_err(|e| Error::io(path, e))?;
        tracing::info!(path = %path.display(), "Rendered config target");
        Ok(WriteOutcome::Changed)
    }

    /// Render every registered target; returns the paths whose content
    /// actually changed.
    pub fn write_all(&self, store: &dyn RelationStore) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for target in &self.targets {
            if self.write(&target.path, store)? == WriteOutcome::Changed {
                changed.push(target.path.clone());
            }
        }
        Ok(changed)
    }

    /// Services owning the given changed paths, deduplicated in
    /// registration order
    pub fn services_to_restart(&self, changed: &[PathBuf]) -> Vec<String> {
        let mut services = Vec::new();
        for target in &self.targets {
            if !changed.contains(&target.path) {
                continue;
            }
            for service in &target.services {
                if !services.contains(service) {
                    services.push(service.clone());
                }
            }
        }
        services
    }
}
