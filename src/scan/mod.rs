pub mod dto;
pub mod handlers;
pub mod interpret;
pub mod model;
pub mod orchestrator;

pub use model::{ErrorCategory, FoodAnalysis, Outcome};
pub use orchestrator::{ScanOrchestrator, Upload};
