//! PAC generation service.
//!
//! Ties the rule sources, the pipeline and the freshness cache together.
//! Every call to [`PacService::load_pac`] fingerprints the sources and only
//! re-runs the pipeline when a fingerprint changed.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{Fingerprint, FreshnessCache};
use crate::config::Config;
use crate::error::PipelineError;
use crate::pac::{Router, inject_custom, render};
use crate::rules::{
    Domain, EmbeddedSource, FallbackSource, FileSource, Lists, RuleSet, RuleSource, SourceError,
    decode_rule_list, extract, merge_tiers,
};

/// A rendered PAC script together with the routing tables it was built from.
#[derive(Debug)]
pub struct PacArtifact {
    script: String,
    router: Router,
    proxy: String,
    proxy_domains: usize,
    direct_domains: usize,
}

impl PacArtifact {
    /// The script text.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// The script as bytes, ready to be sent.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.script.as_bytes()
    }

    /// Router evaluating the same decisions as the script.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// What the script's `FindProxyForURL` returns for `host`.
    #[must_use]
    pub fn find_proxy_for_host(&self, host: &str) -> &str {
        self.router.find_proxy_for_host(host, &self.proxy)
    }

    /// Number of proxied domains in the script.
    #[must_use]
    pub const fn proxy_domains(&self) -> usize {
        self.proxy_domains
    }

    /// Number of direct domains in the script.
    #[must_use]
    pub const fn direct_domains(&self) -> usize {
        self.direct_domains
    }
}

/// Builds and caches the PAC script for a base rule list and an optional
/// custom list.
#[derive(Debug)]
pub struct PacService {
    base: Box<dyn RuleSource>,
    custom: Option<Box<dyn RuleSource>>,
    proxy: String,
    custom_snippet: Option<String>,
    cache: FreshnessCache<PacArtifact>,
}

impl PacService {
    /// Create a service for `base` answering proxied hosts with `proxy`.
    pub fn new(base: impl RuleSource + 'static, proxy: impl Into<String>) -> Self {
        Self {
            base: Box::new(base),
            custom: None,
            proxy: proxy.into(),
            custom_snippet: None,
            cache: FreshnessCache::new(),
        }
    }

    /// Add a custom rule list merged on top of the base list.
    #[must_use]
    pub fn with_custom(mut self, custom: impl RuleSource + 'static) -> Self {
        self.custom = Some(Box::new(custom));
        self
    }

    /// Splice `snippet` into `FindProxyForURL` ahead of the table lookups.
    #[must_use]
    pub fn with_custom_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.custom_snippet = Some(snippet.into());
        self
    }

    /// Create a service from configuration.
    ///
    /// When the gfwlist path is the default one, the bundled list is used
    /// for as long as that file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingAsset`] if the bundled list is needed
    /// but was not embedded.
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let mut service = if config.uses_default_gfwlist() {
            let source = FallbackSource::new(
                FileSource::new(&config.gfwlist),
                EmbeddedSource::bundled()?,
            );
            Self::new(source, config.proxy.clone())
        } else {
            Self::new(FileSource::new(&config.gfwlist), config.proxy.clone())
        };

        if let Some(custom) = &config.custom {
            service = service.with_custom(FileSource::new(custom));
        }
        if let Some(snippet) = &config.custom_snippet {
            service = service.with_custom_snippet(snippet.clone());
        }

        Ok(service)
    }

    /// Name of the base source as it is currently resolved.
    #[must_use]
    pub fn base_name(&self) -> String {
        self.base.name().into_owned()
    }

    /// Name of the custom source, if configured.
    #[must_use]
    pub fn custom_name(&self) -> Option<String> {
        self.custom.as_ref().map(|c| c.name().into_owned())
    }

    /// The cache holding the current artifact.
    #[must_use]
    pub fn cache(&self) -> &FreshnessCache<PacArtifact> {
        &self.cache
    }

    /// Combined fingerprint of all sources.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Source`] if a source cannot be inspected.
    pub fn fingerprint(&self) -> Result<Fingerprint, PipelineError> {
        let mut parts = vec![source_fingerprint(self.base.as_ref())?];
        if let Some(custom) = &self.custom {
            parts.push(source_fingerprint(custom.as_ref())?);
        }
        Ok(Fingerprint::from_parts(parts))
    }

    /// Read, decode and merge all sources into render-ready tables.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if a source cannot be read or decoded, or
    /// [`PipelineError::NoDomains`] if the merged tables are empty.
    pub fn load_lists(&self) -> Result<Lists, PipelineError> {
        let base = load_rules(self.base.as_ref())?;
        let custom = self
            .custom
            .as_deref()
            .map(load_rules)
            .transpose()?
            .unwrap_or_default();

        let lists = merge_tiers([&base.proxy, &custom.proxy], [&base.direct, &custom.direct]);
        if lists.is_empty() {
            return Err(PipelineError::NoDomains);
        }
        Ok(lists)
    }

    /// Run the whole pipeline without touching the cache.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if any stage fails.
    pub fn build(&self) -> Result<PacArtifact, PipelineError> {
        let lists = self.load_lists()?;

        let mut script = render(&lists, &self.proxy)?;
        if let Some(snippet) = &self.custom_snippet {
            script = inject_custom(&script, snippet)?;
        }

        info!(
            proxy_domains = lists.proxy.len(),
            direct_domains = lists.direct.len(),
            bytes = script.len(),
            "rendered PAC script"
        );

        Ok(PacArtifact {
            script,
            router: Router::new(&lists),
            proxy: self.proxy.clone(),
            proxy_domains: lists.proxy.len(),
            direct_domains: lists.direct.len(),
        })
    }

    /// Return the PAC artifact, rebuilding it only if a source changed.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if fingerprinting or a needed rebuild
    /// fails. A failed rebuild does not evict the previous artifact.
    pub fn load_pac(&self) -> Result<Arc<PacArtifact>, PipelineError> {
        let fingerprint = self.fingerprint().inspect_err(|_| {
            metrics::counter!("pac_build_failures_total").increment(1);
        })?;

        let mut rebuilt = false;
        let result = self.cache.get_or_build(&fingerprint, || {
            rebuilt = true;
            debug!(fingerprint = %fingerprint, "sources changed, rebuilding PAC");
            self.build()
        });

        match &result {
            Ok(_) if rebuilt => metrics::counter!("pac_cache_rebuilds_total").increment(1),
            Ok(_) => metrics::counter!("pac_cache_hits_total").increment(1),
            Err(err) => {
                warn!(error = %err, "failed to build PAC");
                metrics::counter!("pac_build_failures_total").increment(1);
            }
        }

        result
    }

    /// All merged hosts in rule-list form: proxied domains as-is, direct
    /// domains prefixed with `@@`.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if the lists cannot be loaded.
    pub fn hosts(&self) -> Result<Vec<String>, PipelineError> {
        let lists = self.load_lists()?;
        let proxy = lists.proxy.into_iter().map(Domain::into_string);
        let direct = lists.direct.into_iter().map(|d| format!("@@{d}"));
        Ok(proxy.chain(direct).collect())
    }
}

fn source_fingerprint(source: &dyn RuleSource) -> Result<String, PipelineError> {
    source
        .fingerprint()
        .map_err(|err| PipelineError::Source {
            name: source.name().into_owned(),
            source: err,
        })
}

fn load_rules(source: &dyn RuleSource) -> Result<RuleSet, PipelineError> {
    let name = source.name().into_owned();
    let raw = source.read().map_err(|err| PipelineError::Source {
        name: name.clone(),
        source: err,
    })?;
    let text = decode_rule_list(&raw).map_err(|err| PipelineError::Decode {
        name: name.clone(),
        source: err,
    })?;

    let rules = extract(&text);
    debug!(
        source = %name,
        proxy = rules.proxy.len(),
        direct = rules.direct.len(),
        "loaded rule source"
    );
    Ok(rules)
}
