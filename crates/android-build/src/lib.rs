pub mod config;
pub mod context;
pub mod devices;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod runner;
pub mod workdir;

pub use context::ExecutionContext;
pub use devices::BuildParams;
pub use dispatcher::Build;
pub use error::{Error, Result};
