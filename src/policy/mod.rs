pub mod groups;
pub mod patterns;
pub mod review;
pub mod rules;

pub use groups::GroupResolver;
pub use review::{ReviewAssessment, ReviewPolicy};
pub use rules::PolicyConfig;
