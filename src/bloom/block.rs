use std::sync::Arc;

use tracing::{debug, warn};

use crate::bloom::policy::FilterPolicy;
use crate::error::{Error, Result};

/// Collects the keys of one data file (flush or compaction output) into a
/// filter block.
///
/// Keys are projected through the policy's key transformer before they reach
/// the filter. Keys arrive sorted, so equal projections are adjacent and only
/// the first of each run is kept.
pub struct FilterBlockBuilder {
    policy: Arc<dyn FilterPolicy>,
    keys: Vec<Vec<u8>>,
    keys_added: usize,
}

impl FilterBlockBuilder {
    pub fn new(policy: Arc<dyn FilterPolicy>) -> Self {
        FilterBlockBuilder {
            policy,
            keys: Vec::new(),
            keys_added: 0,
        }
    }

    /// Add a key. Fails if the policy cannot project it.
    pub fn add_key(&mut self, key: &[u8]) -> Result<()> {
        let projected = match self.policy.key_transformer() {
            Some(transformer) => transformer.transform(key)?,
            None => key,
        };
        self.keys_added += 1;
        if self.keys.last().map(Vec::as_slice) != Some(projected) {
            self.keys.push(projected.to_vec());
        }
        Ok(())
    }

    /// Number of distinct projected keys so far.
    pub fn num_filter_keys(&self) -> usize {
        self.keys.len()
    }

    /// Build the filter block contents.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.keys.is_empty() {
            return Err(Error::InvalidInput(
                "filter block has no keys".into(),
            ));
        }
        let keys: Vec<&[u8]> = self.keys.iter().map(Vec::as_slice).collect();
        let contents = self.policy.create_filter(&keys)?;
        debug!(
            policy = self.policy.name(),
            keys_added = self.keys_added,
            filter_keys = keys.len(),
            bytes = contents.len(),
            "built filter block"
        );
        Ok(contents)
    }
}

/// Probes one filter block on the read path.
pub struct FilterBlockReader {
    policy: Arc<dyn FilterPolicy>,
    contents: Vec<u8>,
}

impl FilterBlockReader {
    /// Validate `contents` with the policy and wrap it for probing.
    pub fn new(policy: Arc<dyn FilterPolicy>, contents: Vec<u8>) -> Result<Self> {
        policy
            .validate_filter(&contents)
            .map_err(|e| e.context(format!("filter block of policy {}", policy.name())))?;
        Ok(FilterBlockReader { policy, contents })
    }

    /// Whether the file may contain `key`.
    ///
    /// Answers `true` whenever the key cannot be projected or probed: a filter
    /// may report false positives but never false negatives.
    pub fn key_may_match(&self, key: &[u8]) -> bool {
        let projected = match self.policy.key_transformer() {
            Some(transformer) => match transformer.transform(key) {
                Ok(projected) => projected,
                Err(e) => {
                    warn!(error = %e, "cannot project probe key, skipping filter");
                    return true;
                }
            },
            None => key,
        };
        match self.policy.key_may_match(projected, &self.contents) {
            Ok(may_match) => may_match,
            Err(e) => {
                warn!(error = %e, policy = self.policy.name(), "filter probe failed");
                true
            }
        }
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}
