// aiops-config/src/config.rs
// ============================================================================
// Module: Pipeline Configuration
// Description: Configuration loading and validation for the incident
//              remediation pipeline.
// Purpose: Provide strict, fail-closed TOML config parsing covering every
//          option enumerated in §6.
// Dependencies: aiops-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file, with every numeric limit
//! validated at load time (non-zero where required, ranges checked).
//! Loading fails closed with a descriptive [`ConfigError`] rather than
//! silently substituting a default for an invalid explicit value (§10.3).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use aiops_core::policy::BlastRadiusWeights;
use aiops_core::policy::Environment;
use aiops_core::ActionType;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "aiops.toml";
/// Environment variable used to override the config path.
const CONFIG_ENV_VAR: &str = "AIOPS_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

/// The high-risk action set denied outside `dev` (§4.4), as config-level
/// defaults; `aiops-core::policy`'s `ActionType::is_high_risk` is the
/// authoritative check this list must agree with.
fn default_high_risk_actions() -> BTreeSet<ActionType> {
    BTreeSet::from_iter(ActionType::HIGH_RISK.iter().copied())
}

fn default_protected_namespaces() -> BTreeSet<String> {
    aiops_core::policy::PROTECTED_NAMESPACES.iter().map(|ns| (*ns).to_owned()).collect()
}

/// The snake_case key an [`Environment`] is stored under in `allowlists`,
/// matching `Environment`'s own `#[serde(rename_all = "snake_case")]`.
const fn environment_key(environment: Environment) -> &'static str {
    match environment {
        Environment::Dev => "dev",
        Environment::Staging => "staging",
        Environment::Prod => "prod",
    }
}

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Deadlines and timeouts governing the workflow's suspension points (§4.7,
/// §5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadlinesConfig {
    /// Overall budget for the parallel evidence-collection join, in
    /// milliseconds (§5: default 5 minutes).
    pub collection_deadline_total_ms: u64,
    /// Per-collector deadline, in milliseconds.
    pub collection_deadline_per_source_ms: u64,
    /// Delay after execution before the verifier re-queries metrics, in
    /// milliseconds (§4.6: default 120s).
    pub verification_delay_ms: u64,
    /// Approval wait deadline, in milliseconds (§4.7: default 4 hours).
    pub approval_timeout_ms: u64,
    /// Overall workflow soft deadline, in milliseconds (§5: default 8
    /// hours).
    pub workflow_soft_deadline_ms: u64,
    /// How far back deploy history is queried when detecting a recent
    /// deploy (§4.3's `has_recent_deploy` signal), in milliseconds.
    pub deploy_lookback_ms: u64,
    /// Per-attempt executor deadline, in milliseconds (§4.5: default 60s).
    pub execution_deadline_per_attempt_ms: u64,
    /// Overall executor deadline across all retries, in milliseconds (§4.5:
    /// default 5 minutes).
    pub execution_deadline_overall_ms: u64,
}

impl Default for DeadlinesConfig {
    fn default() -> Self {
        Self {
            collection_deadline_total_ms: 5 * 60 * 1_000,
            collection_deadline_per_source_ms: 30 * 1_000,
            verification_delay_ms: 120 * 1_000,
            approval_timeout_ms: 4 * 60 * 60 * 1_000,
            workflow_soft_deadline_ms: 8 * 60 * 60 * 1_000,
            deploy_lookback_ms: 60 * 60 * 1_000,
            execution_deadline_per_attempt_ms: 60 * 1_000,
            execution_deadline_overall_ms: 5 * 60 * 1_000,
        }
    }
}

impl DeadlinesConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.collection_deadline_total_ms == 0 {
            return Err(ConfigError::Invalid("collection_deadline_total_ms must be non-zero".to_owned()));
        }
        if self.collection_deadline_per_source_ms == 0 {
            return Err(ConfigError::Invalid(
                "collection_deadline_per_source_ms must be non-zero".to_owned(),
            ));
        }
        if self.collection_deadline_per_source_ms > self.collection_deadline_total_ms {
            return Err(ConfigError::Invalid(
                "collection_deadline_per_source_ms must not exceed collection_deadline_total_ms".to_owned(),
            ));
        }
        if self.verification_delay_ms == 0 {
            return Err(ConfigError::Invalid("verification_delay_ms must be non-zero".to_owned()));
        }
        if self.approval_timeout_ms == 0 {
            return Err(ConfigError::Invalid("approval_timeout_ms must be non-zero".to_owned()));
        }
        if self.workflow_soft_deadline_ms < self.approval_timeout_ms {
            return Err(ConfigError::Invalid(
                "workflow_soft_deadline_ms must be at least approval_timeout_ms".to_owned(),
            ));
        }
        if self.execution_deadline_per_attempt_ms == 0 {
            return Err(ConfigError::Invalid(
                "execution_deadline_per_attempt_ms must be non-zero".to_owned(),
            ));
        }
        if self.execution_deadline_overall_ms < self.execution_deadline_per_attempt_ms {
            return Err(ConfigError::Invalid(
                "execution_deadline_overall_ms must be at least execution_deadline_per_attempt_ms".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Verification and retry tuning (§4.6, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Fraction improvement in error rate over pre-action baseline counted
    /// as "verified" (§4.6's success predicate's `* 0.5` term).
    pub verification_error_improvement_ratio: f64,
    /// Number of `failed -> remediating` re-entries an incident gets before
    /// `failed` is permanently terminal (§4.7).
    pub retry_budget: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { verification_error_improvement_ratio: 0.5, retry_budget: 3 }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.verification_error_improvement_ratio) {
            return Err(ConfigError::Invalid(
                "verification_error_improvement_ratio must be in [0.0, 1.0)".to_owned(),
            ));
        }
        if self.retry_budget == 0 {
            return Err(ConfigError::Invalid("retry_budget must be non-zero".to_owned()));
        }
        Ok(())
    }
}

/// The freeze window and protected-namespace/high-risk-action policy
/// defaults (§4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyDefaultsConfig {
    /// Hour (`0..=23`) the nightly freeze window begins.
    pub freeze_hours_start: u8,
    /// Hour (`0..=23`) the nightly freeze window ends.
    pub freeze_hours_end: u8,
    /// Namespaces denied for non-high-risk actions outside `dev`.
    pub protected_namespaces: BTreeSet<String>,
    /// Action types denied outright outside `dev`.
    pub high_risk_actions: BTreeSet<ActionType>,
    /// Per-environment action allowlist overrides, keyed by the
    /// environment's snake_case name (`"dev"`, `"staging"`, `"prod"`) rather
    /// than the enum directly, since `toml` map keys must be strings.
    /// Environments absent from this map fall back to
    /// `Environment::default_allowlist`.
    pub allowlists: BTreeMap<String, BTreeSet<ActionType>>,
    /// Blast-radius formula weights (§4.4).
    pub blast_radius_weights: BlastRadiusWeightsConfig,
}

impl Default for PolicyDefaultsConfig {
    fn default() -> Self {
        Self {
            freeze_hours_start: 22,
            freeze_hours_end: 6,
            protected_namespaces: default_protected_namespaces(),
            high_risk_actions: default_high_risk_actions(),
            allowlists: BTreeMap::new(),
            blast_radius_weights: BlastRadiusWeightsConfig::default(),
        }
    }
}

impl PolicyDefaultsConfig {
    /// Resolves the effective allowlist for `environment`: the configured
    /// override if present, otherwise `Environment::default_allowlist`.
    #[must_use]
    pub fn allowlist_for(&self, environment: Environment) -> BTreeSet<ActionType> {
        self.allowlists
            .get(environment_key(environment))
            .cloned()
            .unwrap_or_else(|| environment.default_allowlist())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.freeze_hours_start > 23 || self.freeze_hours_end > 23 {
            return Err(ConfigError::Invalid("freeze hours must be in 0..=23".to_owned()));
        }
        self.blast_radius_weights.validate()
    }
}

/// A serializable mirror of [`BlastRadiusWeights`] (which itself carries no
/// `Serialize`/`Deserialize` derive since it is pure arithmetic input, not a
/// persisted record).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastRadiusWeightsConfig {
    /// `w₁`: replica-fraction-affected weight.
    pub replica_fraction: f64,
    /// `w₂`: namespace-criticality weight.
    pub namespace_criticality: f64,
    /// `w₃`: environment weight.
    pub environment: f64,
    /// `w₄`: action-risk weight.
    pub action_risk: f64,
}

impl Default for BlastRadiusWeightsConfig {
    fn default() -> Self {
        let defaults = BlastRadiusWeights::default();
        Self {
            replica_fraction: defaults.replica_fraction,
            namespace_criticality: defaults.namespace_criticality,
            environment: defaults.environment,
            action_risk: defaults.action_risk,
        }
    }
}

impl BlastRadiusWeightsConfig {
    /// Converts to the runtime [`BlastRadiusWeights`] the policy gate
    /// consumes.
    #[must_use]
    pub const fn to_weights(self) -> BlastRadiusWeights {
        BlastRadiusWeights {
            replica_fraction: self.replica_fraction,
            namespace_criticality: self.namespace_criticality,
            environment: self.environment,
            action_risk: self.action_risk,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("replica_fraction", self.replica_fraction),
            ("namespace_criticality", self.namespace_criticality),
            ("environment", self.environment),
            ("action_risk", self.action_risk),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Invalid(format!("blast_radius_weights.{name} must be >= 0")));
            }
        }
        Ok(())
    }
}

/// Backend endpoints and the local SQLite store path (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Cluster API endpoint (e.g. a kubeconfig context name or API server
    /// URL).
    pub cluster_api_endpoint: String,
    /// Log backend query endpoint.
    pub log_backend_endpoint: String,
    /// Metrics backend query endpoint.
    pub metrics_backend_endpoint: String,
    /// Path to the SQLite store file.
    pub store_path: PathBuf,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            cluster_api_endpoint: String::new(),
            log_backend_endpoint: String::new(),
            metrics_backend_endpoint: String::new(),
            store_path: PathBuf::from("aiops.sqlite3"),
        }
    }
}

impl BackendsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_path must be set".to_owned()));
        }
        Ok(())
    }
}

/// The full pipeline configuration (§6, §10.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Deployment environment this instance runs against.
    pub environment: Environment,
    /// Workflow suspension-point deadlines.
    pub deadlines: DeadlinesConfig,
    /// Retry and verification tuning.
    pub retry: RetryConfig,
    /// Policy gate defaults (freeze window, protected namespaces,
    /// high-risk actions, allowlists, blast-radius weights).
    pub policy: PolicyDefaultsConfig,
    /// Backend endpoints and the store path.
    pub backends: BackendsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            deadlines: DeadlinesConfig::default(),
            retry: RetryConfig::default(),
            policy: PolicyDefaultsConfig::default(),
            backends: BackendsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads configuration from `path`, or from the `AIOPS_CONFIG`
    /// environment variable, or [`DEFAULT_CONFIG_NAME`] in the current
    /// directory if neither is given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, exceeds the
    /// size limit, is not valid UTF-8 TOML, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_owned()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_owned()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any section fails its own validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.deadlines.validate()?;
        self.retry.validate()?;
        self.policy.validate()?;
        self.backends.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading/validation errors (§10.3).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    env::var(CONFIG_ENV_VAR).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME))
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "test setup only")]
mod tests {
    use super::ConfigError;
    use super::PipelineConfig;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_collection_deadline_is_rejected() {
        let mut config = PipelineConfig::default();
        config.deadlines.collection_deadline_total_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn per_source_deadline_exceeding_total_is_rejected() {
        let mut config = PipelineConfig::default();
        config.deadlines.collection_deadline_per_source_ms = config.deadlines.collection_deadline_total_ms + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_roundtrips_through_toml() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let toml_text = toml::to_string(&PipelineConfig::default()).expect("serialize");
        file.write_all(toml_text.as_bytes()).expect("write");
        let loaded = PipelineConfig::load(Some(file.path())).expect("load");
        assert_eq!(loaded.environment, PipelineConfig::default().environment);
    }

    #[test]
    fn oversized_ratio_is_rejected() {
        let mut config = PipelineConfig::default();
        config.retry.verification_error_improvement_ratio = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
