use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model: Model,
    pub init: Init,
    pub output: Output,
}

/// Lattice and epidemic parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Lattice half width: walkers live on `[-half_width, half_width]^2`.
    pub half_width: i32,
    /// Maximum per-axis displacement per step.
    pub max_step: i32,

    /// Per-step, per-infectious-neighbor transmission probability.
    pub prob_trans: f64,

    /// Decay time of the degree of infection (steps from infection back to
    /// susceptibility).
    pub tau_inf: f64,
    /// Recovery calibration time; `tau_inf / tau_rec` is the infectious
    /// share of the degree range.
    pub tau_rec: f64,
}

/// Initial condition parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Init {
    /// Number of walkers.
    pub n_wlk: usize,
    /// Number of initially infected walkers.
    pub n_inf: usize,

    /// Random seed; drawn from the OS when absent.
    pub seed: Option<u64>,
}

/// Output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Output {
    /// Number of steps between frame saves.
    pub steps_per_save: usize,
    /// Number of saves written per trajectory file.
    pub saves_per_file: usize,

    /// Free-form parameter description carried into reports.
    pub label: Option<String>,
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to parse config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        check_num(self.model.half_width, 1..10_000).context("invalid lattice half width")?;
        // The single-bounce boundary reflection is only meaningful for steps
        // much smaller than the lattice.
        check_num(self.model.max_step, 0..=self.model.half_width / 10)
            .context("invalid maximum step")?;

        check_num(self.model.prob_trans, 0.0..=1.0)
            .context("invalid transmission probability")?;

        if self.model.tau_inf <= 0.0 {
            bail!(
                "infectious time must be positive, but is {}",
                self.model.tau_inf
            );
        }
        // An equal or smaller recovery time inverts the infectious window.
        if self.model.tau_rec <= self.model.tau_inf {
            bail!(
                "recovery time must exceed the infectious time {}, but is {}",
                self.model.tau_inf,
                self.model.tau_rec
            );
        }

        check_num(self.init.n_wlk, 1..100_000).context("invalid number of walkers")?;
        check_num(self.init.n_inf, 0..self.init.n_wlk)
            .context("invalid number of initially infected walkers")?;

        check_num(self.output.steps_per_save, 1..10_000)
            .context("invalid number of steps per save")?;
        check_num(self.output.saves_per_file, 1..10_000)
            .context("invalid number of saves per file")?;

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
