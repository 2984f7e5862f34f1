pub mod resolve;
pub mod run_config;
pub mod run_context;

pub use resolve::{read_params, resolve_params, write_params};
pub use run_config::RunConfig;
pub use run_context::{new_run_id, RunContext, RunOptions};
