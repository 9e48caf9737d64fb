use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};
use thiserror::Error;

/// Invalid simulation configuration.
///
/// Values are rejected as given, never clamped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("population size must be at least 1, but is {0}")]
    PopulationSize(usize),

    #[error("cluster count must be at least 1, but is {0}")]
    ClusterCount(usize),

    #[error("{name} must be in the range [0, 1], but is {value}")]
    Rate { name: &'static str, value: f64 },
}

/// Epidemic model parameters.
///
/// Changing `population_size` or `cluster_count` requires regenerating the
/// contact graph; the three rates can change between ticks.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Initial number of agents.
    pub population_size: usize,
    /// Number of communities agents are split into.
    pub cluster_count: usize,

    /// Per-tick probability that an infected agent infects a same-cluster neighbor.
    pub infection_rate: f64,
    /// Per-tick probability that an infected agent recovers.
    pub recovery_rate: f64,
    /// Per-tick probability that an infected agent dies.
    pub fatality_rate: f64,
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 1 {
            return Err(ConfigError::PopulationSize(self.population_size));
        }
        if self.cluster_count < 1 {
            return Err(ConfigError::ClusterCount(self.cluster_count));
        }
        check_rate("infection rate", self.infection_rate)?;
        check_rate("recovery rate", self.recovery_rate)?;
        check_rate("fatality rate", self.fatality_rate)?;
        Ok(())
    }

    /// Whether switching to `other` invalidates the current contact graph.
    pub fn needs_regeneration(&self, other: &ModelConfig) -> bool {
        self.population_size != other.population_size || self.cluster_count != other.cluster_count
    }
}

/// Partial update of the transition rates.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RateUpdate {
    pub infection: Option<f64>,
    pub recovery: Option<f64>,
    pub fatality: Option<f64>,
}

impl RateUpdate {
    /// Return `cfg` with the supplied rates replaced, or an error if any of them is invalid.
    pub fn apply_to(&self, cfg: &ModelConfig) -> Result<ModelConfig, ConfigError> {
        let mut new_cfg = cfg.clone();
        if let Some(rate) = self.infection {
            new_cfg.infection_rate = check_rate("infection rate", rate)?;
        }
        if let Some(rate) = self.recovery {
            new_cfg.recovery_rate = check_rate("recovery rate", rate)?;
        }
        if let Some(rate) = self.fatality {
            new_cfg.fatality_rate = check_rate("fatality rate", rate)?;
        }
        Ok(new_cfg)
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    // NaN fails the range check as well.
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Rate { name, value });
    }
    Ok(value)
}

/// Initial condition parameters.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct InitConfig {
    /// Seed of the random number generator (drawn from the OS if absent).
    pub seed: Option<u64>,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of ticks performed per trajectory file.
    pub ticks_per_file: usize,
    /// Stop a segment early once no infected agent is left.
    #[serde(default = "default_stop_when_extinct")]
    pub stop_when_extinct: bool,
}

fn default_stop_when_extinct() -> bool {
    true
}

/// Simulation configuration file.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: ModelConfig,
    #[serde(default)]
    pub init: InitConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.model.validate().context("invalid model parameters")?;
        check_num(self.output.ticks_per_file, 1..=1_000_000)
            .context("invalid number of ticks per file")?;
        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ModelConfig {
        ModelConfig {
            population_size: 100,
            cluster_count: 4,
            infection_rate: 0.1,
            recovery_rate: 0.05,
            fatality_rate: 0.01,
        }
    }

    #[test]
    fn rejects_invalid_model() {
        let cfg = ModelConfig {
            population_size: 0,
            ..model()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::PopulationSize(0)));

        let cfg = ModelConfig {
            cluster_count: 0,
            ..model()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ClusterCount(0)));

        let cfg = ModelConfig {
            fatality_rate: 1.5,
            ..model()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Rate {
                name: "fatality rate",
                ..
            })
        ));

        let cfg = ModelConfig {
            infection_rate: f64::NAN,
            ..model()
        };
        assert!(cfg.validate().is_err());

        assert_eq!(model().validate(), Ok(()));
    }

    #[test]
    fn rate_update_is_all_or_nothing() {
        let update = RateUpdate {
            infection: Some(0.5),
            recovery: Some(-0.1),
            fatality: None,
        };
        assert!(update.apply_to(&model()).is_err());

        let update = RateUpdate {
            recovery: Some(1.0),
            ..Default::default()
        };
        let new_cfg = update.apply_to(&model()).unwrap();
        assert_eq!(new_cfg.recovery_rate, 1.0);
        assert_eq!(new_cfg.infection_rate, 0.1);
        assert!(!model().needs_regeneration(&new_cfg));
    }

    #[test]
    fn parses_config_file() {
        let contents = r#"
[model]
population_size = 50
cluster_count = 2
infection_rate = 0.2
recovery_rate = 0.1
fatality_rate = 0.0

[output]
ticks_per_file = 10
"#;
        let cfg = Config::from_toml(contents).unwrap();
        assert_eq!(cfg.model.population_size, 50);
        assert_eq!(cfg.init.seed, None);
        assert!(cfg.output.stop_when_extinct);

        let invalid = contents.replace("cluster_count = 2", "cluster_count = 0");
        assert!(Config::from_toml(&invalid).is_err());
    }
}
