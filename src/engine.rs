use crate::config::{ConfigError, ModelConfig};
use crate::model::{Agent, AgentId, Population, Status};
use rand::prelude::*;
use rand_distr::Bernoulli;
use std::collections::{HashMap, HashSet};

/// Factor applied to the infection rate across clusters.
pub const INTER_CLUSTER_DAMPENING: f64 = 0.1;

/// Per-tick event distributions derived from the model rates.
#[derive(Debug, Clone, Copy)]
pub struct TransitionProbs {
    infect_intra: Bernoulli,
    infect_inter: Bernoulli,
    recover: Bernoulli,
    decease: Bernoulli,
}

impl TransitionProbs {
    pub fn new(cfg: &ModelConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            infect_intra: bernoulli("infection rate", cfg.infection_rate)?,
            infect_inter: bernoulli(
                "infection rate",
                cfg.infection_rate * INTER_CLUSTER_DAMPENING,
            )?,
            recover: bernoulli("recovery rate", cfg.recovery_rate)?,
            decease: bernoulli("fatality rate", cfg.fatality_rate)?,
        })
    }
}

fn bernoulli(name: &'static str, value: f64) -> Result<Bernoulli, ConfigError> {
    Bernoulli::new(value).map_err(|_| ConfigError::Rate { name, value })
}

/// Result of advancing a population by one tick.
#[derive(Debug)]
pub struct StepOutcome {
    /// Population after pruning the deceased agents.
    pub population: Population,
    /// Agents newly infected this tick.
    pub n_infected: usize,
    /// Agents recovered this tick.
    pub n_recovered: usize,
    /// Agents that died this tick and were pruned.
    pub n_deceased: usize,
}

/// Neighbor positions of every agent, deduplicated and in population order.
struct Adjacency {
    nbr_vec: Vec<Vec<usize>>,
}

impl Adjacency {
    fn new(pop: &Population) -> Self {
        let pos: HashMap<AgentId, usize> = pop
            .agents()
            .iter()
            .enumerate()
            .map(|(i_agt, agt)| (agt.id(), i_agt))
            .collect();

        let mut nbr_vec = vec![Vec::new(); pop.len()];
        for edge in pop.edges() {
            let (Some(&i_src), Some(&i_tgt)) = (pos.get(&edge.source), pos.get(&edge.target))
            else {
                continue;
            };
            if i_src == i_tgt {
                continue;
            }
            nbr_vec[i_src].push(i_tgt);
            nbr_vec[i_tgt].push(i_src);
        }
        for nbrs in &mut nbr_vec {
            nbrs.sort_unstable();
            nbrs.dedup();
        }

        Self { nbr_vec }
    }

    fn neighbors(&self, i_agt: usize) -> &[usize] {
        &self.nbr_vec[i_agt]
    }
}

/// Advance `pop` by one tick without modifying it.
///
/// Only agents infected before the tick act, and neighbor statuses are read
/// from the pre-tick population. Each infected agent, in population order:
/// dies with the fatality probability (and then does nothing else), else
/// tries to infect each susceptible neighbor, then recovers with the recovery
/// probability. A target is infected by the first successful attempt; later
/// attackers skip it without drawing. Deceased agents and their edges are
/// removed at the end.
pub fn step<R: Rng + ?Sized>(
    pop: &Population,
    probs: &TransitionProbs,
    rng: &mut R,
) -> StepOutcome {
    let agt_vec = pop.agents();
    let adjacency = Adjacency::new(pop);

    let mut next_vec: Vec<Agent> = agt_vec.to_vec();
    let mut n_infected = 0;
    let mut n_recovered = 0;

    for (i_agt, agt) in agt_vec.iter().enumerate() {
        if agt.status() != Status::Infected {
            continue;
        }

        if probs.decease.sample(rng) {
            next_vec[i_agt].set_status(Status::Deceased);
            continue;
        }

        for &i_nbr in adjacency.neighbors(i_agt) {
            let nbr = &agt_vec[i_nbr];
            if nbr.status() != Status::Susceptible
                || next_vec[i_nbr].status() != Status::Susceptible
            {
                continue;
            }
            let dist = if nbr.cluster() == agt.cluster() {
                &probs.infect_intra
            } else {
                &probs.infect_inter
            };
            if dist.sample(rng) {
                next_vec[i_nbr].set_status(Status::Infected);
                n_infected += 1;
            }
        }

        if probs.recover.sample(rng) {
            next_vec[i_agt].set_status(Status::Recovered);
            n_recovered += 1;
        }
    }

    let dec_ids: HashSet<AgentId> = next_vec
        .iter()
        .filter(|agt| agt.status() == Status::Deceased)
        .map(|agt| agt.id())
        .collect();
    let n_deceased = dec_ids.len();

    next_vec.retain(|agt| agt.status() != Status::Deceased);
    let edge_vec = pop
        .edges()
        .iter()
        .filter(|edge| !dec_ids.contains(&edge.source) && !dec_ids.contains(&edge.target))
        .copied()
        .collect();

    StepOutcome {
        population: Population::new(next_vec, edge_vec),
        n_infected,
        n_recovered,
        n_deceased,
    }
}
