use std::path::{Path, PathBuf};

use anyhow::Context;
use billsieve_extract::{ExtractionConfig, PageExtractor, RuleSet};
use billsieve_ocr::PipelineConfig;
use serde::Deserialize;

/// Contents of the `--config` file. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extraction: ExtractionConfig,
    pub pipeline: PipelineConfig,
    /// Replacement rule table; relative paths resolve against the config file.
    pub rules: Option<PathBuf>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn rules_path(&self) -> Option<PathBuf> {
        let rules = self.rules.as_ref()?;
        Some(match &self.base_dir {
            Some(base) if rules.is_relative() => base.join(rules),
            _ => rules.clone(),
        })
    }

    pub fn rule_set(&self) -> anyhow::Result<RuleSet> {
        match self.rules_path() {
            Some(path) => {
                let rules = RuleSet::from_file(&path)
                    .with_context(|| format!("loading rules {}", path.display()))?;
                tracing::info!(path = %path.display(), version = rules.version(), rules = rules.len(), "loaded rule table");
                Ok(rules)
            }
            None => Ok(RuleSet::builtin()),
        }
    }

    pub fn page_extractor(&self) -> anyhow::Result<PageExtractor> {
        Ok(PageExtractor::new(self.rule_set()?, self.extraction.clone()))
    }
}
