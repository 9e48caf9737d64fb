use crate::model::{Population, Status};
use serde::{Deserialize, Serialize};

/// Compartment counts at a given time.
///
/// `s`, `i` and `r` count living agents; `d` counts every death since time 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsRecord {
    pub time: usize,
    pub s: usize,
    pub i: usize,
    pub r: usize,
    pub d: usize,
}

impl StatsRecord {
    /// Count the compartments of `pop`.
    ///
    /// Deceased agents are pruned from populations, so the cumulative number of
    /// deaths has to be carried by the caller.
    pub fn tally(pop: &Population, cum_deceased: usize, time: usize) -> Self {
        let mut record = Self {
            time,
            s: 0,
            i: 0,
            r: 0,
            d: cum_deceased,
        };
        for agt in pop.agents() {
            match agt.status() {
                Status::Susceptible => record.s += 1,
                Status::Infected => record.i += 1,
                Status::Recovered => record.r += 1,
                Status::Deceased => record.d += 1,
            }
        }
        record
    }

    pub fn total(&self) -> usize {
        self.s + self.i + self.r + self.d
    }
}

pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Agent;

    #[test]
    fn tally_counts_living_agents_and_carries_deaths() {
        let pop = Population::new(
            vec![
                Agent::new(0, 0, Status::Recovered),
                Agent::new(2, 0, Status::Infected),
                Agent::new(3, 1, Status::Susceptible),
                Agent::new(5, 1, Status::Susceptible),
            ],
            Vec::new(),
        );
        let record = StatsRecord::tally(&pop, 2, 7);
        assert_eq!(
            record,
            StatsRecord {
                time: 7,
                s: 2,
                i: 1,
                r: 1,
                d: 2
            }
        );
        assert_eq!(record.total(), 6);
    }

    #[test]
    fn accumulator_matches_sample_statistics() {
        let mut acc = Accumulator::new();
        assert!(acc.report().mean.is_nan());
        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert!((report.mean - 5.0).abs() < 1e-12);
        assert!((report.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }
}
