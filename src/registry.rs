use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::core::{Action, CleanupType};
use crate::platform::Platform;

/// Name → cleanup type catalog. Written by the start-up providers, read-only
/// afterwards.
#[derive(Debug, Default)]
pub struct Registry {
    types: RwLock<BTreeMap<String, CleanupType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites `name`.
    pub fn register(&self, name: impl Into<String>, action: Action, requires_confirmation: bool) {
        let name = name.into();
        self.insert(CleanupType {
            name,
            action,
            requires_confirmation,
            requires_root: false,
        });
    }

    pub fn insert(&self, ty: CleanupType) {
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        types.insert(ty.name.clone(), ty);
    }

    pub fn lookup(&self, name: &str) -> Option<CleanupType> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.contains_key(name)
    }

    /// Every registered name in lexicographic order.
    pub fn list_all(&self) -> Vec<String> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.keys().cloned().collect()
    }

    /// Every registered type in lexicographic name order.
    pub fn types(&self) -> Vec<CleanupType> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Composes the registry for `platform`: the common table plus the platform
/// table, each loaded by its own initializer. Names matching `exclude` are
/// left out.
pub fn build_registry(platform: Platform, exclude: &[String]) -> Result<Registry> {
    let exclude = exclude_set(exclude)?;
    let registry = Registry::new();

    let providers: [fn() -> Vec<CleanupType>; 2] = [
        crate::cleaners::common::cleaners,
        match platform {
            Platform::Linux => crate::cleaners::linux::cleaners,
            Platform::MacOs => crate::cleaners::macos::cleaners,
        },
    ];

    std::thread::scope(|s| {
        for provider in providers {
            let registry = &registry;
            let exclude = &exclude;
            s.spawn(move || {
                for ty in provider() {
                    if exclude.is_match(&ty.name) {
                        continue;
                    }
                    registry.insert(ty);
                }
            });
        }
    });

    Ok(registry)
}

pub fn exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            continue;
        }
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("failed to compile exclude patterns")
}
