pub mod envelope;
pub mod executor;
pub mod populate;

pub use envelope::{ItemEnvelope, ResultEnvelope};
pub use executor::AdvancedResults;
pub use populate::{BoundPopulation, PopulationSpec};
