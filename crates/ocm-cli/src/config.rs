use camino::Utf8PathBuf;
use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::Deserialize;

use ocm_construct::{ConflictPolicy, ExternalCopyPolicy};

/// Hierarchical configuration: `config/base.yml`, then `config/<profile>.yml`
/// (profile defaults to `dev`, overridden by `--profile`/`OCM_PROFILE`), then
/// `OCM_`-prefixed environment variables, each layer overriding the last.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root directory of the filesystem CTF target repository.
    pub target_root: Utf8PathBuf,
    /// `0` defers to the number of logical CPUs (§5).
    #[serde(default)]
    pub concurrency_limit: usize,
    #[serde(default)]
    pub conflict_policy: ConflictPolicyConfig,
    #[serde(default)]
    pub external_copy_policy: ExternalCopyPolicyConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicyConfig {
    #[default]
    AbortAndFail,
    Skip,
    Replace,
}

impl From<ConflictPolicyConfig> for ConflictPolicy {
    fn from(value: ConflictPolicyConfig) -> Self {
        match value {
            ConflictPolicyConfig::AbortAndFail => ConflictPolicy::AbortAndFail,
            ConflictPolicyConfig::Skip => ConflictPolicy::Skip,
            ConflictPolicyConfig::Replace => ConflictPolicy::Replace,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ExternalCopyPolicyConfig {
    #[default]
    Skip,
    CopyOrFail,
}

impl From<ExternalCopyPolicyConfig> for ExternalCopyPolicy {
    fn from(value: ExternalCopyPolicyConfig) -> Self {
        match value {
            ExternalCopyPolicyConfig::Skip => ExternalCopyPolicy::Skip,
            ExternalCopyPolicyConfig::CopyOrFail => ExternalCopyPolicy::CopyOrFail,
        }
    }
}

impl Config {
    /// Loads configuration from `<config_dir>/base.yml`, then
    /// `<config_dir>/<profile>.yml` if present, then `OCM_`-prefixed
    /// environment variables, in that order of increasing precedence.
    pub fn load(config_dir: &camino::Utf8Path, profile: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Yaml::file(config_dir.join("base.yml")))
            .merge(Yaml::file(config_dir.join(format!("{profile}.yml"))))
            .merge(Env::prefixed("OCM_"))
            .extract()
    }
}
