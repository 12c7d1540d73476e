mod builder;
mod error;
mod formatting_layer;
mod storage;

pub use builder::LogBuilder;
pub use error::SetupError;
pub use formatting_layer::JsonLogLayer;
pub use storage::{FieldStorage, StorageLayer};
pub use tracing_appender::non_blocking::WorkerGuard;
