use crate::config::{ConfigError, ModelConfig};
use crate::model::{Agent, AgentId, ContactEdge, Population, Status};
use rand::{Rng, seq::index};

/// Maximum number of edges a new agent adds during generation.
pub const MAX_DEGREE: usize = 4;

/// Build a clustered random contact graph.
///
/// Agents are assigned to clusters round-robin and agent 0 is the only one
/// infected. Every new agent links back to earlier agents only: between one
/// and [`MAX_DEGREE`] of its own cluster and at most one of another cluster.
///
/// # Errors
/// Returns an error if the population size or cluster count is zero.
pub fn generate<R: Rng + ?Sized>(
    cfg: &ModelConfig,
    rng: &mut R,
) -> Result<Population, ConfigError> {
    if cfg.population_size < 1 {
        return Err(ConfigError::PopulationSize(cfg.population_size));
    }
    if cfg.cluster_count < 1 {
        return Err(ConfigError::ClusterCount(cfg.cluster_count));
    }

    let n_agt = cfg.population_size;
    let n_clu = cfg.cluster_count;

    let agents = (0..n_agt)
        .map(|id| {
            let status = if id == 0 {
                Status::Infected
            } else {
                Status::Susceptible
            };
            Agent::new(id, id % n_clu, status)
        })
        .collect();

    let mut edges = Vec::with_capacity(n_agt * (MAX_DEGREE + 1) / 2);
    for id in 1..n_agt {
        // Earlier agents of the same cluster are id % n_clu, id % n_clu + n_clu, ...
        let n_intra = id / n_clu;
        let n_inter = id - n_intra;

        let k_intra = rng.random_range(1..=MAX_DEGREE).min(n_intra);
        let k_inter = rng
            .random_range(0..=(MAX_DEGREE - k_intra).min(1))
            .min(n_inter);

        for i_cand in index::sample(rng, n_intra, k_intra) {
            edges.push(ContactEdge::new(id, intra_candidate(id, n_clu, i_cand)));
        }
        for i_cand in index::sample(rng, n_inter, k_inter) {
            edges.push(ContactEdge::new(id, inter_candidate(id, n_clu, i_cand)));
        }
    }

    Ok(Population::new(agents, edges))
}

/// The `i_cand`-th earlier agent sharing the cluster of `id`.
fn intra_candidate(id: AgentId, n_clu: usize, i_cand: usize) -> AgentId {
    id % n_clu + i_cand * n_clu
}

/// The `i_cand`-th earlier agent outside the cluster of `id`.
///
/// Every block of `n_clu` consecutive ids holds `n_clu - 1` such agents.
fn inter_candidate(id: AgentId, n_clu: usize, i_cand: usize) -> AgentId {
    let clu = id % n_clu;
    let blk = i_cand / (n_clu - 1);
    let off = i_cand % (n_clu - 1);
    blk * n_clu + if off < clu { off } else { off + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;
    use std::collections::HashMap;

    fn model(population_size: usize, cluster_count: usize) -> ModelConfig {
        ModelConfig {
            population_size,
            cluster_count,
            infection_rate: 0.1,
            recovery_rate: 0.1,
            fatality_rate: 0.1,
        }
    }

    #[test]
    fn candidate_mapping_covers_earlier_agents() {
        for n_clu in 1..6 {
            for id in 0..40 {
                let mut cands: Vec<_> = (0..id / n_clu)
                    .map(|i| intra_candidate(id, n_clu, i))
                    .collect();
                if n_clu > 1 {
                    cands.extend((0..id - id / n_clu).map(|i| inter_candidate(id, n_clu, i)));
                }
                cands.sort();
                assert_eq!(cands, (0..id).collect::<Vec<_>>(), "id {id}, n_clu {n_clu}");
            }
        }
    }

    #[test]
    fn generated_graph_is_well_formed() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let cfg = model(300, 5);
        let pop = generate(&cfg, &mut rng).unwrap();

        assert_eq!(pop.len(), 300);
        for (i_agt, agt) in pop.agents().iter().enumerate() {
            assert_eq!(agt.id(), i_agt);
            assert_eq!(agt.cluster(), i_agt % 5);
        }
        assert_eq!(pop.count(Status::Infected), 1);
        assert_eq!(pop.agents()[0].status(), Status::Infected);

        let mut n_new = HashMap::new();
        for edge in pop.edges() {
            assert!(edge.target < edge.source);
            assert!(edge.source < 300);
            let (k_intra, k_inter) = n_new.entry(edge.source).or_insert((0, 0));
            if edge.source % 5 == edge.target % 5 {
                *k_intra += 1;
            } else {
                *k_inter += 1;
            }
        }
        for (&id, &(k_intra, k_inter)) in &n_new {
            assert!(k_intra <= MAX_DEGREE);
            assert!(k_inter <= 1);
            assert!(k_intra + k_inter <= MAX_DEGREE);
            if id >= 5 {
                assert!(k_intra >= 1, "agent {id} has no intra-cluster link");
            }
        }
    }

    #[test]
    fn single_agent_has_no_edges() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        let pop = generate(&model(1, 1), &mut rng).unwrap();
        assert_eq!(pop.len(), 1);
        assert!(pop.edges().is_empty());
        assert_eq!(pop.agents()[0].status(), Status::Infected);
    }

    #[test]
    fn single_cluster_links_every_new_agent() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let pop = generate(&model(50, 1), &mut rng).unwrap();
        for agt in pop.agents() {
            assert_eq!(agt.cluster(), 0);
        }
        // Every agent but the first links to at least one earlier agent.
        let mut sources: Vec<_> = pop.edges().iter().map(|edge| edge.source).collect();
        sources.dedup();
        assert_eq!(sources, (1..50).collect::<Vec<_>>());
    }

    #[test]
    fn rejects_empty_config() {
        let mut rng = ChaCha12Rng::seed_from_u64(0);
        assert_eq!(
            generate(&model(0, 1), &mut rng),
            Err(ConfigError::PopulationSize(0))
        );
        assert_eq!(
            generate(&model(10, 0), &mut rng),
            Err(ConfigError::ClusterCount(0))
        );
    }
}
