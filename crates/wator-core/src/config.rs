//! Configuration types for the simulation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Option names accepted by [`WatorConfig::from_options`] and as JSON keys.
pub const OPTION_KEYS: [&str; 9] = [
    "width",
    "height",
    "numFish",
    "numSharks",
    "fishBreedTime",
    "sharkBreedTime",
    "starveEnergyThreshold",
    "energyGainPerFish",
    "numTiles",
];

/// Largest grid, in cells, whose row-major indices fit in an `i32`.
pub const MAX_CELLS: usize = i32::MAX as usize;

/// World and rule parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct WatorConfig {
    /// Width of the world grid (columns)
    pub width: i32,
    /// Height of the world grid (rows)
    pub height: i32,
    /// Fish placed at initialization
    pub num_fish: usize,
    /// Sharks placed at initialization
    pub num_sharks: usize,
    /// Chronons a fish lives before it breeds
    pub fish_breed_time: i32,
    /// Chronons a shark lives before it breeds
    pub shark_breed_time: i32,
    /// Starting shark energy; also the energy of a newborn shark
    pub starve_energy_threshold: i32,
    /// Energy a shark gains from eating one fish
    pub energy_gain_per_fish: i32,
    /// Number of column tiles updated in parallel
    pub num_tiles: usize,
}

impl Default for WatorConfig {
    fn default() -> Self {
        Self {
            width: 1800,
            height: 1000,
            num_fish: 200_000,
            num_sharks: 100,
            fish_breed_time: 5,
            shark_breed_time: 10,
            starve_energy_threshold: 4,
            energy_gain_per_fish: 2,
            num_tiles: 8,
        }
    }
}

impl WatorConfig {
    pub fn cell_count(&self) -> usize {
        self.width.max(0) as usize * self.height.max(0) as usize
    }

    /// Build a config from flat `(name, value)` pairs. Keys not given keep
    /// their default value.
    pub fn from_options<'a, I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut config = Self::default();
        for (key, value) in options {
            config.set_option(key, value)?;
        }
        Ok(config)
    }

    /// Parse a JSON object using the same option names.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set a single named option.
    pub fn set_option(&mut self, key: &str, value: f64) -> Result<()> {
        let invalid = || Error::InvalidOption {
            key: key.to_string(),
            value,
        };
        if !value.is_finite() || value.fract() != 0.0 || value < 0.0 {
            return Err(invalid());
        }

        let as_i32 = || -> Result<i32> {
            if value > i32::MAX as f64 {
                return Err(invalid());
            }
            Ok(value as i32)
        };
        let as_usize = || -> Result<usize> {
            if value > u32::MAX as f64 {
                return Err(invalid());
            }
            Ok(value as usize)
        };

        match key {
            "width" => self.width = as_i32()?,
            "height" => self.height = as_i32()?,
            "numFish" => self.num_fish = as_usize()?,
            "numSharks" => self.num_sharks = as_usize()?,
            "fishBreedTime" => self.fish_breed_time = as_i32()?,
            "sharkBreedTime" => self.shark_breed_time = as_i32()?,
            "starveEnergyThreshold" => self.starve_energy_threshold = as_i32()?,
            "energyGainPerFish" => self.energy_gain_per_fish = as_i32()?,
            "numTiles" => self.num_tiles = as_usize()?,
            other => return Err(Error::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    /// Check every precondition the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(Error::Validation(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.cell_count() > MAX_CELLS {
            return Err(Error::Validation(format!(
                "a {}x{} grid exceeds the limit of {} cells",
                self.width, self.height, MAX_CELLS
            )));
        }
        if self.num_tiles == 0 || self.num_tiles > self.width as usize {
            return Err(Error::Validation(format!(
                "numTiles must be between 1 and width ({}), got {}",
                self.width, self.num_tiles
            )));
        }
        if self.fish_breed_time <= 0 || self.shark_breed_time <= 0 {
            return Err(Error::Validation(
                "breed times must be positive".to_string(),
            ));
        }
        if self.starve_energy_threshold <= 0 {
            return Err(Error::Validation(
                "starveEnergyThreshold must be positive".to_string(),
            ));
        }

        let requested = self.num_fish.saturating_add(self.num_sharks);
        let cells = self.cell_count();
        if requested > cells {
            return Err(Error::Overpopulated { requested, cells });
        }
        Ok(())
    }
}
