mod runner;
mod shutdown;

pub use runner::{run, DbOptions, RunOptions, ShutdownOptions};
pub use shutdown::wait_for_shutdown;
