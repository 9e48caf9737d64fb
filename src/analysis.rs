use crate::stats::{Accumulator, AccumulatorReport, StatsRecord};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Summary of a single epidemic trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Largest number of simultaneously infected agents.
    pub peak_infected: usize,
    /// First time at which the peak was reached.
    pub peak_time: usize,
    /// Agents ever infected that are no longer infected at the end.
    pub final_size: usize,
    /// Final size relative to the initial population.
    pub attack_rate: f64,
    /// Cumulative deaths at the end.
    pub deaths: usize,
    /// First time with no infected agent, or the last time if the epidemic never ended.
    pub duration: usize,
    /// Whether the epidemic ended within the trajectory.
    pub extinct: bool,
    /// Number of records in the trajectory.
    pub n_records: usize,
}

impl RunSummary {
    pub fn from_history(history: &[StatsRecord]) -> Result<Self> {
        let first = history.first().context("history is empty")?;
        let last = history.last().context("history is empty")?;

        let mut peak = first;
        for record in history {
            if record.i > peak.i {
                peak = record;
            }
        }

        let end = history.iter().find(|record| record.i == 0);

        let final_size = last.r + last.d;
        Ok(Self {
            peak_infected: peak.i,
            peak_time: peak.time,
            final_size,
            attack_rate: final_size as f64 / first.total() as f64,
            deaths: last.d,
            duration: end.unwrap_or(last).time,
            extinct: end.is_some(),
            n_records: history.len(),
        })
    }
}

/// Mean and standard deviation of the run summaries across runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct SimSummary {
    pub n_runs: usize,
    pub peak_infected: AccumulatorReport,
    pub peak_time: AccumulatorReport,
    pub final_size: AccumulatorReport,
    pub attack_rate: AccumulatorReport,
    pub deaths: AccumulatorReport,
    pub duration: AccumulatorReport,
    /// Fraction of runs in which the epidemic ended.
    pub extinct: AccumulatorReport,
}

pub struct Analyzer {
    n_runs: usize,
    peak_infected: Accumulator,
    peak_time: Accumulator,
    final_size: Accumulator,
    attack_rate: Accumulator,
    deaths: Accumulator,
    duration: Accumulator,
    extinct: Accumulator,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            n_runs: 0,
            peak_infected: Accumulator::new(),
            peak_time: Accumulator::new(),
            final_size: Accumulator::new(),
            attack_rate: Accumulator::new(),
            deaths: Accumulator::new(),
            duration: Accumulator::new(),
            extinct: Accumulator::new(),
        }
    }

    pub fn add_run(&mut self, summary: &RunSummary) {
        self.n_runs += 1;
        self.peak_infected.add(summary.peak_infected as f64);
        self.peak_time.add(summary.peak_time as f64);
        self.final_size.add(summary.final_size as f64);
        self.attack_rate.add(summary.attack_rate);
        self.deaths.add(summary.deaths as f64);
        self.duration.add(summary.duration as f64);
        self.extinct.add(if summary.extinct { 1.0 } else { 0.0 });
    }

    pub fn report(&self) -> SimSummary {
        SimSummary {
            n_runs: self.n_runs,
            peak_infected: self.peak_infected.report(),
            peak_time: self.peak_time.report(),
            final_size: self.final_size.report(),
            attack_rate: self.attack_rate.report(),
            deaths: self.deaths.report(),
            duration: self.duration.report(),
            extinct: self.extinct.report(),
        }
    }
}
