//! Post-run actions that receive a checkpoint result.
//!
//! A checkpoint owns an ordered list of [`ResultSink`]s. Each one gets the
//! finished [`CheckpointResult`]; a failing sink does not stop the ones after it.

use crate::core::CheckpointResult;
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt::Debug;

mod memory;
mod report;
mod store;

pub use memory::InMemoryResultStore;
pub use report::RenderReportAction;
pub use store::StoreResultAction;

/// A consumer of checkpoint results.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use dq_guard::actions::ResultSink;
/// use dq_guard::core::CheckpointResult;
///
/// #[derive(Debug)]
/// struct Announce;
///
/// #[async_trait]
/// impl ResultSink for Announce {
///     fn name(&self) -> &str {
///         "announce"
///     }
///
///     async fn submit(&self, result: &CheckpointResult) -> dq_guard::prelude::Result<()> {
///         println!("{} finished: {}", result.name(), result.success());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ResultSink: Debug + Send + Sync {
    /// Name used in logs and in [`GuardError::ActionsFailed`].
    fn name(&self) -> &str;

    /// Consumes one checkpoint result.
    async fn submit(&self, result: &CheckpointResult) -> Result<()>;
}
