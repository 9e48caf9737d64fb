use serde::{Deserialize, Serialize};

/// Identifier of an agent, stable for the agent's whole life.
pub type AgentId = usize;

/// Epidemic compartment of an agent.
///
/// Transitions only go forward: Susceptible to Infected, Infected to
/// Recovered or Deceased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Susceptible,
    Infected,
    Recovered,
    Deceased,
}

/// Individual of the simulated population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    cluster: usize,
    status: Status,
}

impl Agent {
    pub fn new(id: AgentId, cluster: usize, status: Status) -> Self {
        Self {
            id,
            cluster,
            status,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn cluster(&self) -> usize {
        self.cluster
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }
}

/// Undirected contact between two distinct agents.
///
/// Stored as (newer agent, older agent) when generated. Parallel edges are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEdge {
    pub source: AgentId,
    pub target: AgentId,
}

impl ContactEdge {
    pub fn new(source: AgentId, target: AgentId) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, id: AgentId) -> bool {
        self.source == id || self.target == id
    }
}

/// Agents in a stable order together with their contact edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    agents: Vec<Agent>,
    edges: Vec<ContactEdge>,
}

impl Population {
    pub fn new(agents: Vec<Agent>, edges: Vec<ContactEdge>) -> Self {
        Self { agents, edges }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn edges(&self) -> &[ContactEdge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn count(&self, status: Status) -> usize {
        self.agents
            .iter()
            .filter(|agt| agt.status() == status)
            .count()
    }
}
