use serde::{Deserialize, Serialize};

use crate::deposition::{BallisticDeposition, DepositionStrategy, RandomDeposition};
use crate::growth::checkpoint_axis;
use crate::numeric::Height;
use crate::surface::Surface;
use crate::GrowthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositionModel {
    Random,
    Ballistic,
}

impl DepositionModel {
    pub fn name(self) -> &'static str {
        match self {
            DepositionModel::Random => "random",
            DepositionModel::Ballistic => "ballistic",
        }
    }

    pub fn strategy<H: Height>(self) -> Box<dyn DepositionStrategy<H> + Send + Sync> {
        match self {
            DepositionModel::Random => Box::new(RandomDeposition),
            DepositionModel::Ballistic => Box::new(BallisticDeposition),
        }
    }
}

impl std::str::FromStr for DepositionModel {
    type Err = GrowthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "random" => Ok(DepositionModel::Random),
            "ballistic" => Ok(DepositionModel::Ballistic),
            other => Err(GrowthError::InvalidConfig(format!(
                "unknown deposition model: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub size_x: usize,
    pub size_y: usize,
    pub systems: usize,
    /// Worker threads; zero runs the ensemble sequentially.
    pub threads: usize,
    /// Particles per growth step; one full layer when unset.
    pub deposition_per_iteration: Option<usize>,
    pub nl_total: f64,
    pub model: DepositionModel,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            size_x: 100,
            size_y: 1,
            systems: 100,
            threads: 0,
            deposition_per_iteration: None,
            nl_total: 1000.0,
            model: DepositionModel::Random,
        }
    }
}

impl GrowthConfig {
    pub fn validate(&self) -> Result<(), GrowthError> {
        if self.size_x == 0 || self.size_y == 0 {
            return Err(GrowthError::InvalidConfig(
                "size_x and size_y must be greater than zero".to_string(),
            ));
        }

        if self.systems == 0 {
            return Err(GrowthError::InvalidConfig(
                "systems must be greater than zero".to_string(),
            ));
        }

        if self.deposition_per_iteration == Some(0) {
            return Err(GrowthError::InvalidConfig(
                "deposition_per_iteration must be greater than zero".to_string(),
            ));
        }

        if !self.nl_total.is_finite() || self.nl_total <= 0.0 {
            return Err(GrowthError::InvalidConfig(
                "nl_total must be finite and greater than zero".to_string(),
            ));
        }

        let checkpoints = self.checkpoints();
        if checkpoints < 2 {
            return Err(GrowthError::InvalidConfig(format!(
                "nl_total {} yields {checkpoints} checkpoint(s); at least two are needed for the log-log fit",
                self.nl_total
            )));
        }

        Ok(())
    }

    pub fn size(&self) -> usize {
        self.size_x * self.size_y
    }

    pub fn deposition_per_iteration(&self) -> usize {
        self.deposition_per_iteration.unwrap_or_else(|| self.size())
    }

    /// Number of checkpoints every run of this configuration records.
    pub fn checkpoints(&self) -> usize {
        checkpoint_axis(self.deposition_per_iteration(), self.size(), self.nl_total).len()
    }

    pub fn seed_surface<H: Height>(&self) -> Surface<H> {
        Surface::with_shape(self.size_x, self.size_y)
    }
}
