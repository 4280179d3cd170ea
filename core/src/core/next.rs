// stepline/src/core/next.rs

//! The continuation handed to each step, and the per-execution bookkeeping behind it.

use crate::core::context_data::ContextData;
use crate::error::StepResult;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Boxed future returned by every link of the composed chain.
pub type StepFuture = Pin<Box<dyn Future<Output = StepResult> + Send>>;

/// One link of the composed chain: runs a step and everything after it.
pub(crate) type Continuation<T> =
  Arc<dyn Fn(ContextData<T>, CancellationToken, ExecutionTrace) -> StepFuture + Send + Sync>;

/// Per-execution record of where (if anywhere) the chain was short-circuited.
#[derive(Clone, Default)]
pub(crate) struct ExecutionTrace(Arc<Mutex<Option<(String, i32)>>>);

impl ExecutionTrace {
  pub(crate) fn record_short_circuit(&self, step_name: &str, step_order: i32) {
    self
      .0
      .lock()
      .get_or_insert_with(|| (step_name.to_string(), step_order));
  }

  pub(crate) fn take_short_circuit(&self) -> Option<(String, i32)> {
    self.0.lock().take()
  }
}

/// Continuation for the remainder of the pipeline.
///
/// Consumed by [`Next::run`], so a step can invoke the rest of the chain at most once.
/// Dropping it without calling `run` short-circuits the pipeline.
pub struct Next<T: Send + Sync + 'static> {
  continuation: Continuation<T>,
  trace: ExecutionTrace,
  invoked: Arc<AtomicBool>,
}

impl<T: Send + Sync + 'static> Next<T> {
  pub(crate) fn new(continuation: Continuation<T>, trace: ExecutionTrace) -> Self {
    Self {
      continuation,
      trace,
      invoked: Arc::new(AtomicBool::new(false)),
    }
  }

  /// Flag flipped as soon as `run` is called, whether or not the returned future is
  /// awaited before the step returns. Read by the engine after the step returns.
  pub(crate) fn invoked_flag(&self) -> Arc<AtomicBool> {
    self.invoked.clone()
  }

  /// Runs the remaining steps with the given context and cancellation signal.
  ///
  /// The call itself counts as continuing. The returned future may be awaited in place,
  /// spawned, or handed off.
  pub fn run(self, ctx: ContextData<T>, cancel: CancellationToken) -> StepFuture {
    self.invoked.store(true, Ordering::Release);
    (self.continuation)(ctx, cancel, self.trace)
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for Next<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Next")
      .field("invoked", &self.invoked.load(Ordering::Acquire))
      .finish()
  }
}
