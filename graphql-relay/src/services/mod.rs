//! Implementation of the executor seam.

mod executor;
pub(crate) mod upstream;

pub use self::executor::Executor;
pub use self::executor::ExecutorFn;
#[cfg(test)]
pub(crate) use self::executor::MockExecutor;
pub use self::executor::executor_fn;
pub use self::upstream::UpstreamExecutor;
