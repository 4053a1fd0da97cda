// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Class label loading

use std::collections::HashMap;
use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{ClassifyError, ClassifyResult};

/// Ordered class labels, index-aligned with model outputs. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet(Arc<[String]>);

impl LabelSet {
    /// Parse newline-delimited text; `\r` is stripped and a single trailing
    /// empty line is dropped
    pub fn parse(text: &str) -> Self {
        let mut lines: Vec<String> = text
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect();
        if lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }
        Self(lines.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

impl Deref for LabelSet {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect::<Vec<_>>().into())
    }
}

/// Source of label sets
#[async_trait]
pub trait LabelStore: Send + Sync {
    /// # Errors
    /// * `ClassifyError::Labels` - The label file could not be read
    async fn fetch(&self, label_url: &str) -> ClassifyResult<LabelSet>;
}

/// Reads label files relative to a root directory
#[derive(Debug, Clone)]
pub struct FileLabelStore {
    root: PathBuf,
}

impl FileLabelStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl LabelStore for FileLabelStore {
    async fn fetch(&self, label_url: &str) -> ClassifyResult<LabelSet> {
        let path = self.root.join(label_url);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ClassifyError::Labels {
                path: path.clone(),
                source,
            })?;
        let labels = LabelSet::parse(&text);
        debug!(target: "imageclass-session", "Loaded {} labels from {}", labels.len(), path.display());
        Ok(labels)
    }
}

/// Caches label sets from an inner store by URL
pub struct CachedLabelStore<S> {
    inner: S,
    cache: RwLock<HashMap<String, LabelSet>>,
}

impl<S: LabelStore> CachedLabelStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}

#[async_trait]
impl<S: LabelStore> LabelStore for CachedLabelStore<S> {
    async fn fetch(&self, label_url: &str) -> ClassifyResult<LabelSet> {
        let cached = self.cache.read().get(label_url).cloned();
        if let Some(labels) = cached {
            return Ok(labels);
        }
        let labels = self.inner.fetch(label_url).await?;
        self.cache.write().insert(label_url.to_string(), labels.clone());
        Ok(labels)
    }
}
