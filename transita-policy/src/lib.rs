pub mod cancellation;
pub mod modification;

pub use cancellation::{CancellationAssessment, CancellationPolicy, CancellationTier};
pub use modification::{ModificationAssessment, ModificationPolicy, ModificationTier};
