use std::fmt;
use std::sync::Arc;

use crate::bloom::doc_db::DocDbAwareFilterPolicy;
use crate::bloom::policy::{BloomFilterPolicy, FilterPolicy};
use crate::error::{Error, Result};

/// Default target false positive rate of filter blocks.
pub const DEFAULT_BLOOM_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Storage engine settings relevant to document keys.
///
/// Settings hold no filter policy of their own: [`Options::open`] builds it
/// once from the settings, or takes the one passed to
/// [`Options::from_filter_policy`].
#[derive(Clone)]
pub struct Options {
    bloom_false_positive_rate: f64,
    use_doc_db_aware_filter: bool,
    custom_filter_policy: Option<Arc<dyn FilterPolicy>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with a caller-supplied filter policy, kept as is by
    /// [`Options::open`]. The bloom false positive rate does not apply to it.
    pub fn from_filter_policy(filter_policy: Arc<dyn FilterPolicy>) -> Self {
        Options {
            bloom_false_positive_rate: DEFAULT_BLOOM_FALSE_POSITIVE_RATE,
            use_doc_db_aware_filter: filter_policy.key_transformer().is_some(),
            custom_filter_policy: Some(filter_policy),
        }
    }

    pub fn with_bloom_false_positive_rate(mut self, rate: f64) -> Self {
        self.bloom_false_positive_rate = rate;
        self
    }

    pub fn with_doc_db_aware_filter(mut self, enabled: bool) -> Self {
        self.use_doc_db_aware_filter = enabled;
        self
    }

    pub fn bloom_false_positive_rate(&self) -> f64 {
        self.bloom_false_positive_rate
    }

    pub fn use_doc_db_aware_filter(&self) -> bool {
        self.use_doc_db_aware_filter
    }

    pub fn has_custom_filter_policy(&self) -> bool {
        self.custom_filter_policy.is_some()
    }

    /// Check the settings without building anything.
    ///
    /// A custom policy must agree with `use_doc_db_aware_filter`: a doc-aware
    /// setting needs a policy with a key transformer and vice versa.
    pub fn validate(&self) -> Result<()> {
        match &self.custom_filter_policy {
            Some(policy) => {
                let projects = policy.key_transformer().is_some();
                if projects != self.use_doc_db_aware_filter {
                    return Err(Error::InvalidInput(format!(
                        "filter policy {} {} a key transformer but use_doc_db_aware_filter is {}",
                        policy.name(),
                        if projects { "has" } else { "has no" },
                        self.use_doc_db_aware_filter
                    )));
                }
                Ok(())
            }
            None => BloomFilterPolicy::try_new(self.bloom_false_positive_rate).map(|_| ()),
        }
    }

    /// Validate the settings and create the filter policy shared by every
    /// reader, flush and compaction. Call once when the engine opens.
    pub fn open(self) -> Result<OpenedOptions> {
        self.validate()?;
        let filter_policy: Arc<dyn FilterPolicy> = match &self.custom_filter_policy {
            Some(policy) => Arc::clone(policy),
            None => {
                let builtin = BloomFilterPolicy::try_new(self.bloom_false_positive_rate)?;
                if self.use_doc_db_aware_filter {
                    Arc::new(DocDbAwareFilterPolicy::new(builtin))
                } else {
                    Arc::new(builtin)
                }
            }
        };
        Ok(OpenedOptions {
            options: self,
            filter_policy,
        })
    }
}

impl Default for Options {
    fn default() -> Self {
        Options {
            bloom_false_positive_rate: DEFAULT_BLOOM_FALSE_POSITIVE_RATE,
            use_doc_db_aware_filter: true,
            custom_filter_policy: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("bloom_false_positive_rate", &self.bloom_false_positive_rate)
            .field("use_doc_db_aware_filter", &self.use_doc_db_aware_filter)
            .field(
                "custom_filter_policy",
                &self.custom_filter_policy.as_ref().map(|p| p.name()),
            )
            .finish()
    }
}

/// Options after [`Options::open`]: the settings plus the filter policy built
/// from them. Clones share the same policy instance.
#[derive(Clone)]
pub struct OpenedOptions {
    options: Options,
    filter_policy: Arc<dyn FilterPolicy>,
}

impl OpenedOptions {
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn filter_policy(&self) -> &Arc<dyn FilterPolicy> {
        &self.filter_policy
    }
}

impl fmt::Debug for OpenedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedOptions")
            .field("options", &self.options)
            .field("filter_policy", &self.filter_policy.name())
            .finish()
    }
}
