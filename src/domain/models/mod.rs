//! Domain models for quantitative composition reconstruction.

pub mod composition;
pub mod element;
pub mod intensity;
pub mod material;
pub mod measurement;
pub mod options;
pub mod record;
pub mod rule;
pub mod transition;

pub use composition::Composition;
pub use intensity::{Intensity, KRatio};
pub use material::{Body, BodyId, Material, MaterialId, SampleGeometry};
pub use measurement::Measurement;
pub use options::{BeamConfig, DetectorConfig, SimulationOptions};
pub use record::{IterationRecord, QuantificationReport, QuantificationState, TerminalState};
pub use rule::CompositionRule;
pub use transition::{Transition, XRayLine};
