pub mod extract;
pub mod health;

pub use extract::{extract_text, method_not_allowed};
pub use health::{health_check, metrics_endpoint, readiness_check};
