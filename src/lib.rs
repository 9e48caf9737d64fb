//! Stochastic SIRD epidemic simulation on a clustered random contact graph.
//!
//! [`controller::Controller`] owns the simulation: it generates the population
//! with [`generator::generate`], advances it with [`engine::step`] and records
//! a [`stats::StatsRecord`] after every tick. Consumers read
//! [`controller::Controller::snapshot`] and [`controller::Controller::history`].

pub mod analysis;
pub mod config;
pub mod controller;
pub mod engine;
pub mod generator;
pub mod manager;
pub mod model;
pub mod stats;
