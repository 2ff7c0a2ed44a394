//! Step orchestrator for the tiled engine.

use crate::buffer::{SharedBuffer, WriterStats};
use crate::grid::{Grid, Population};
use crate::rules::Rules;
use crate::tiles::TileTable;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use wator_core::{Error, Result, WatorConfig};

/// Outcome of one chronon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub chronon: u64,
    pub population: Population,
    pub writes: WriterStats,
}

/// Owns the authoritative grid and the next-state buffer. Callers only
/// ever see the grid through shared, read-only snapshots.
pub struct Wator {
    config: WatorConfig,
    rules: Rules,
    grid: Arc<Grid>,
    buffer: SharedBuffer,
    pool: rayon::ThreadPool,
    seed: u64,
    chronon: u64,
    log_interval: u64,
    last_writes: WriterStats,
    emptied_at: Option<u64>,
}

impl Wator {
    /// Validate `config` and scatter the initial population using `seed`.
    pub fn new(config: WatorConfig, seed: u64) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = Grid::populate(&config, &mut rng)?;
        Self::from_grid(config, grid, seed)
    }

    /// Start from a caller-provided grid. Its dimensions must match `config`.
    pub fn from_grid(config: WatorConfig, grid: Grid, seed: u64) -> Result<Self> {
        config.validate()?;
        if grid.width != config.width || grid.height != config.height {
            return Err(Error::Validation(format!(
                "grid is {}x{} but config expects {}x{}",
                grid.width, grid.height, config.width, config.height
            )));
        }

        let tiles = TileTable::new(config.width, config.num_tiles)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_tiles)
            .thread_name(|i| format!("wator-tile-{}", i))
            .build()
            .map_err(|e| Error::ThreadPool(e.to_string()))?;

        info!(
            width = config.width,
            height = config.height,
            tiles = config.num_tiles,
            boundaries = ?tiles.boundaries(),
            "Initialized Wa-Tor world"
        );

        Ok(Self {
            rules: Rules::from(&config),
            buffer: SharedBuffer::new(config.width, config.height, tiles),
            grid: Arc::new(grid),
            config,
            pool,
            seed,
            chronon: 0,
            log_interval: 1000,
            last_writes: WriterStats::default(),
            emptied_at: None,
        })
    }

    /// How often [`Wator::run`] logs population, in chronons.
    pub fn with_log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval.max(1);
        self
    }

    pub fn config(&self) -> &WatorConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileTable {
        self.buffer.tiles()
    }

    /// Chronons advanced so far.
    pub fn chronon(&self) -> u64 {
        self.chronon
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Shared handle on the current grid. It stays valid and unchanged
    /// after later steps.
    pub fn snapshot(&self) -> Arc<Grid> {
        Arc::clone(&self.grid)
    }

    pub fn population(&self) -> Population {
        self.grid.population()
    }

    /// Writer counters from the most recent step.
    pub fn last_writes(&self) -> WriterStats {
        self.last_writes
    }

    /// First chronon after which neither fish nor sharks were left.
    pub fn emptied_at(&self) -> Option<u64> {
        self.emptied_at
    }

    /// Advance the world by exactly one chronon.
    pub fn step(&mut self) -> StepReport {
        debug_assert!(self.buffer.is_clear(), "buffer must be empty between steps");

        let grid = &*self.grid;
        let buffer = &self.buffer;
        let rules = &self.rules;
        let (seed, chronon) = (self.seed, self.chronon);
        let ranges: Vec<_> = buffer.tiles().ranges().collect();

        // One task per tile; collecting is the barrier before promotion.
        let per_tile: Vec<WriterStats> = self.pool.install(|| {
            ranges
                .into_par_iter()
                .enumerate()
                .map(|(tile, columns)| {
                    let mut writer = buffer.writer(tile);
                    rules.walk_columns(grid, columns, &mut writer, seed, chronon);
                    writer.into_stats()
                })
                .collect()
        });

        let writes = per_tile
            .into_iter()
            .fold(WriterStats::default(), WriterStats::merge);

        self.grid = Arc::new(self.buffer.take_grid());
        self.chronon += 1;
        self.last_writes = writes;

        let population = self.grid.population();
        debug!(
            chronon = self.chronon,
            fish = population.fish,
            sharks = population.sharks,
            accepted = writes.accepted,
            rejected = writes.rejected,
            lock_acquisitions = writes.lock_acquisitions,
            "Chronon complete"
        );
        if self.emptied_at.is_none() && population.fish == 0 && population.sharks == 0 {
            self.emptied_at = Some(self.chronon);
            info!(chronon = self.chronon, "World is empty");
        }

        StepReport {
            chronon: self.chronon,
            population,
            writes,
        }
    }

    /// Advance `chronons` steps and return the last report.
    #[instrument(skip(self), fields(tiles = self.config.num_tiles))]
    pub fn run(&mut self, chronons: u64) -> StepReport {
        info!("Starting run for {} chronons", chronons);

        let mut report = StepReport {
            chronon: self.chronon,
            population: self.population(),
            writes: WriterStats::default(),
        };
        let mut total = WriterStats::default();

        for _ in 0..chronons {
            report = self.step();
            total = total.merge(report.writes);

            if report.chronon % self.log_interval == 0 {
                info!(
                    chronon = report.chronon,
                    fish = report.population.fish,
                    sharks = report.population.sharks,
                    "Population snapshot"
                );
            }
        }

        info!(
            event = "run_summary",
            final_chronon = report.chronon,
            fish = report.population.fish,
            sharks = report.population.sharks,
            accepted_writes = total.accepted,
            rejected_writes = total.rejected,
            lock_acquisitions = total.lock_acquisitions,
            "Run complete"
        );

        report
    }
}
