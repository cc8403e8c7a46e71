//! Simulation runner implementations.

pub mod mock;

pub use mock::MockRunner;
