//! A fixed-size pool of persistent worker threads that executes short-lived,
//! non-owning per-track tasks in parallel and joins every task before
//! returning control to the caller.

mod pool;
mod task;

pub use pool::WorkerPool;
pub use task::{Task, TaskAction};
