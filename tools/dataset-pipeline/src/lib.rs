pub mod batch;
pub mod csv;
pub mod preprocess;

pub use batch::{BatchConfig, BatchError, BatchPipeline};
