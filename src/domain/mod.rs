pub mod aggregate;
pub mod metrics;
pub mod sample;
pub mod types;

pub use aggregate::*;
pub use metrics::*;
pub use sample::*;
pub use types::*;
