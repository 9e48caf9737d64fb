use crate::config::{ConfigError, ModelConfig, RateUpdate};
use crate::engine::{self, TransitionProbs};
use crate::generator;
use crate::model::{Agent, ContactEdge, Population, Status};
use crate::stats::StatsRecord;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Read-only view of the simulation after a completed tick.
///
/// Snapshots are never modified once published, so they can be kept or sent
/// to another thread while the controller keeps ticking.
#[derive(Debug, Clone)]
pub struct Snapshot {
    population: Arc<Population>,
    stats: StatsRecord,
}

impl Snapshot {
    pub fn time(&self) -> usize {
        self.stats.time
    }

    pub fn agents(&self) -> &[Agent] {
        self.population.agents()
    }

    pub fn edges(&self) -> &[ContactEdge] {
        self.population.edges()
    }

    pub fn stats(&self) -> &StatsRecord {
        &self.stats
    }
}

/// Serializable state of a [`Controller`], including its random stream.
#[derive(Serialize, Deserialize)]
pub struct Checkpoint {
    cfg: ModelConfig,
    population: Population,
    history: Vec<StatsRecord>,
    cum_deceased: usize,
    running: bool,
    rng: ChaCha12Rng,
}

impl Checkpoint {
    pub fn cfg(&self) -> &ModelConfig {
        &self.cfg
    }
}

/// Owner of the simulation state.
///
/// Generates the contact graph, advances it one tick at a time and records
/// the compartment counts after every tick. The controller holds no timer: a
/// driver calls [`Controller::tick`] while [`Controller::is_running`].
pub struct Controller {
    cfg: ModelConfig,
    probs: TransitionProbs,
    rng: ChaCha12Rng,
    population: Arc<Population>,
    history: Vec<StatsRecord>,
    cum_deceased: usize,
    running: bool,
    snapshot: Arc<Snapshot>,
}

impl Controller {
    /// Create a controller with a freshly generated population.
    pub fn initialize(cfg: ModelConfig, mut rng: ChaCha12Rng) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let probs = TransitionProbs::new(&cfg)?;
        let population = Arc::new(generator::generate(&cfg, &mut rng)?);
        let record = StatsRecord::tally(&population, 0, 0);
        log::info!(
            "generated {} agents in {} clusters with {} edges",
            population.len(),
            cfg.cluster_count,
            population.edges().len()
        );

        let snapshot = Arc::new(Snapshot {
            population: Arc::clone(&population),
            stats: record,
        });

        Ok(Self {
            cfg,
            probs,
            rng,
            population,
            history: vec![record],
            cum_deceased: 0,
            running: false,
            snapshot,
        })
    }

    /// Regenerate the population from `cfg` and restart the history at time 0.
    ///
    /// The random stream continues, so consecutive resets give different graphs.
    pub fn reset(&mut self, cfg: ModelConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        let probs = TransitionProbs::new(&cfg)?;
        let population = Arc::new(generator::generate(&cfg, &mut self.rng)?);
        log::info!(
            "regenerated {} agents in {} clusters with {} edges",
            population.len(),
            cfg.cluster_count,
            population.edges().len()
        );

        self.cfg = cfg;
        self.probs = probs;
        self.population = population;
        self.cum_deceased = 0;
        self.history.clear();
        self.running = false;
        self.publish(StatsRecord::tally(&self.population, 0, 0));

        Ok(())
    }

    /// Change some of the rates, effective from the next tick.
    ///
    /// Nothing changes if any supplied rate is invalid.
    pub fn update_rates(&mut self, update: RateUpdate) -> Result<(), ConfigError> {
        let cfg = update.apply_to(&self.cfg)?;
        self.probs = TransitionProbs::new(&cfg)?;
        self.cfg = cfg;
        log::info!(
            "updated rates: infection {}, recovery {}, fatality {}",
            self.cfg.infection_rate,
            self.cfg.recovery_rate,
            self.cfg.fatality_rate
        );
        Ok(())
    }

    /// Switch to `cfg`, regenerating only if the population size or cluster count changed.
    pub fn update_config(&mut self, cfg: ModelConfig) -> Result<(), ConfigError> {
        if self.cfg.needs_regeneration(&cfg) {
            return self.reset(cfg);
        }
        self.update_rates(RateUpdate {
            infection: Some(cfg.infection_rate),
            recovery: Some(cfg.recovery_rate),
            fatality: Some(cfg.fatality_rate),
        })
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advance the simulation by one tick.
    ///
    /// Does nothing and returns `false` when the controller is not running or
    /// the population is empty: time, history and population stay unchanged.
    pub fn tick(&mut self) -> bool {
        if !self.running || self.population.is_empty() {
            return false;
        }

        let outcome = engine::step(&self.population, &self.probs, &mut self.rng);
        self.cum_deceased += outcome.n_deceased;
        self.population = Arc::new(outcome.population);

        let record = StatsRecord::tally(&self.population, self.cum_deceased, self.time() + 1);
        log::debug!(
            "tick {}: {} infected, {} recovered, {} deceased",
            record.time,
            outcome.n_infected,
            outcome.n_recovered,
            outcome.n_deceased
        );
        self.publish(record);

        true
    }

    fn publish(&mut self, record: StatsRecord) {
        self.history.push(record);
        self.snapshot = Arc::new(Snapshot {
            population: Arc::clone(&self.population),
            stats: record,
        });
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn history(&self) -> &[StatsRecord] {
        &self.history
    }

    pub fn time(&self) -> usize {
        self.snapshot.time()
    }

    pub fn cfg(&self) -> &ModelConfig {
        &self.cfg
    }

    /// Whether no infected agent is left, so no further transition can happen.
    pub fn is_extinct(&self) -> bool {
        self.snapshot.stats().i == 0
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cfg: self.cfg.clone(),
            population: Population::clone(&self.population),
            history: self.history.clone(),
            cum_deceased: self.cum_deceased,
            running: self.running,
            rng: self.rng.clone(),
        }
    }

    /// Restore a controller from a [`Checkpoint`], continuing its random stream.
    pub fn from_checkpoint(ckpt: Checkpoint) -> Result<Self, ConfigError> {
        ckpt.cfg.validate()?;
        let probs = TransitionProbs::new(&ckpt.cfg)?;
        let population = Arc::new(ckpt.population);
        let stats = match ckpt.history.last() {
            Some(&record) => record,
            None => StatsRecord::tally(&population, ckpt.cum_deceased, 0),
        };
        let mut history = ckpt.history;
        if history.is_empty() {
            history.push(stats);
        }
        let snapshot = Arc::new(Snapshot {
            population: Arc::clone(&population),
            stats,
        });

        Ok(Self {
            cfg: ckpt.cfg,
            probs,
            rng: ckpt.rng,
            population,
            history,
            cum_deceased: ckpt.cum_deceased,
            running: ckpt.running,
            snapshot,
        })
    }

    /// Number of living agents with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.population.count(status)
    }
}
