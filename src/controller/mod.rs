pub mod context;
pub mod error;
pub mod ownership;
pub mod queue;
pub mod reconciler;
pub mod watch;

pub use context::Context;
pub use error::{Error, Result};
pub use queue::WorkQueue;
pub use reconciler::{reconcile, run_worker, SourceKey};
