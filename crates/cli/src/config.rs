//! `recall.toml` loading and validation.
//!
//! `${VAR}` references anywhere in the file are replaced with the environment value
//! (empty when unset) before parsing. The embedding API key falls back to
//! `RECALL_API_KEY`, then `OPENAI_API_KEY`.

use anyhow::{bail, Context, Result};
use recall_indexer::{IndexerConfig, WatcherConfig};
use recall_search::RetrievalConfig;
use recall_vector_store::{EmbedderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const API_KEY_VARS: [&str; 2] = ["RECALL_API_KEY", "OPENAI_API_KEY"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Folder that is indexed and watched
    pub folder: PathBuf,
    pub store_path: PathBuf,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("./docs"),
            store_path: PathBuf::from(".recall/vectors.redb"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub context: ContextConfig,
    pub indexer: IndexerConfig,
    pub embedding: EmbedderConfig,
    pub retrieval: RetrievalConfig,
    pub watcher: WatcherConfig,
}

impl RecallConfig {
    /// Load `path`, or defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let lookup = |name: &str| std::env::var(name).ok();

        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Self::parse(&raw, lookup)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            log::info!("{} not found, using defaults", path.display());
            Self::default()
        };
        config.fill_api_key(lookup);
        Ok(config)
    }

    pub fn parse(raw: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let expanded = expand_env_vars(raw, &lookup);
        Ok(toml::from_str(&expanded)?)
    }

    fn fill_api_key(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let provider = &mut self.embedding.provider;
        if provider
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
        {
            return;
        }
        provider.api_key = API_KEY_VARS
            .iter()
            .filter_map(|var| lookup(var))
            .find(|key| !key.trim().is_empty());
    }

    pub fn validate(&self) -> Result<()> {
        if self.context.folder.as_os_str().is_empty() {
            bail!("context.folder must be set");
        }
        if self.indexer.supported_extensions.is_empty() {
            bail!("indexer.supported_extensions must list at least one extension");
        }
        self.indexer
            .chunking
            .validate()
            .context("invalid indexer.chunking")?;
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be positive");
        }
        if self.embedding.timeout_secs == 0 {
            bail!("embedding.timeout_secs must be positive");
        }
        if self.embedding.provider.kind == ProviderKind::OpenAi
            && self.embedding.provider.api_key.is_none()
        {
            bail!(
                "embedding API key is not set (embedding.provider.api_key, {} or {})",
                API_KEY_VARS[0],
                API_KEY_VARS[1]
            );
        }
        self.retrieval
            .validate()
            .context("invalid retrieval settings")?;
        Ok(())
    }
}

/// Replace `${NAME}` with `lookup(NAME)`, or nothing when unset. Text without a closing
/// brace is kept verbatim.
fn expand_env_vars(raw: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                out.push_str(&lookup(&after[..end]).unwrap_or_default());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
