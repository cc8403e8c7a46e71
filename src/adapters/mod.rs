//! Adapters binding the domain ports to concrete backends.

pub mod runner;
