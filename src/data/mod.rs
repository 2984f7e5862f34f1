pub mod loader;
pub mod record;
pub mod schema;

pub use loader::DatasetLoader;
pub use record::{Edge, GraphRecord};
pub use schema::{DatasetSchema, SchemaAccumulator};
