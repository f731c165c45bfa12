pub mod api_executor;

pub use api_executor::{ApiExecutor, ApiResponse};
