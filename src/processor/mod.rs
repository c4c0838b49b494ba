pub mod driver;
pub mod job;

pub use driver::{RecomputeDriver, RecomputeOutcome};
pub use job::RecomputeJob;
