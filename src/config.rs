use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

use crate::error::Error;

/// Parameters of the XIRR root search.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Rate the bracket search starts from (0.1 is 10% a year).
    pub initial_guess: f64,
    /// Largest absolute net present value accepted as a root.
    pub tolerance: f64,
    /// Refinement steps allowed once a bracket has been found.
    pub max_iterations: u32,
    /// Growth applied to `1 + rate` on every bracket expansion.
    pub bracket_expansion_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.1,
            tolerance: 1e-6,
            max_iterations: 100,
            bracket_expansion_factor: 2.0,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("initial guess must be greater than -1, got {0}")]
    InitialGuess(f64),
    #[error("tolerance must be a positive number, got {0}")]
    Tolerance(f64),
    #[error("max iterations must be at least 1")]
    MaxIterations,
    #[error("bracket expansion factor must be greater than 1, got {0}")]
    ExpansionFactor(f64),
}

impl SolverConfig {
    /// Reads a config from a JSON file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SolverConfig, Error> {
        let file = File::open(path)?;
        let config: SolverConfig = serde_json::from_reader(&file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_guess <= -1.0 || !self.initial_guess.is_finite() {
            return Err(ConfigError::InitialGuess(self.initial_guess));
        }
        if self.tolerance <= 0.0 || !self.tolerance.is_finite() {
            return Err(ConfigError::Tolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::MaxIterations);
        }
        if self.bracket_expansion_factor <= 1.0 || !self.bracket_expansion_factor.is_finite() {
            return Err(ConfigError::ExpansionFactor(self.bracket_expansion_factor));
        }
        Ok(())
    }
}
