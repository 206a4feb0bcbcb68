mod config;
mod daemon;
mod manager;
mod scheduled;
mod shutdown;

pub use config::*;
pub use daemon::DaemonContext;
pub(crate) use daemon::run_daemon;
pub(crate) use manager::*;
pub use scheduled::ScheduledContext;
pub(crate) use scheduled::{run_scheduled, Cancellation};
pub use shutdown::*;
