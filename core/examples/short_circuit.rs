// stepline/examples/short_circuit.rs

use std::sync::Arc;
use std::time::Duration;
use stepline::{
  CancellationToken, ContextData, DelegateStep, LazyStep, Next, PipelineError, PipelineOutcome, PipelineRunner,
  PipelineStep, TracingDiagnostics,
};
use tracing::{error, info};

#[derive(Clone, Debug, Default)]
struct RequestContext {
  cached_response: Option<String>,
  log: Vec<String>,
}

fn steps() -> Vec<LazyStep<RequestContext>> {
  let cache = DelegateStep::new(
    "cache_lookup",
    |ctx: ContextData<RequestContext>, next: Next<RequestContext>, cancel: CancellationToken| async move {
      let hit = ctx.with_read(|c| c.cached_response.is_some());
      ctx.update(|c| c.log.push(format!("cache hit: {}", hit)));
      if hit {
        // Returning without calling `next` stops the pipeline here.
        return Ok(());
      }
      next.run(ctx, cancel).await
    },
  )
  .short_circuits_when("a cached response exists");

  let backend = DelegateStep::new(
    "backend_call",
    |ctx: ContextData<RequestContext>, next: Next<RequestContext>, cancel: CancellationToken| async move {
      tokio::select! {
        _ = cancel.cancelled() => return Err(PipelineError::Canceled),
        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
      }
      ctx.update(|c| c.log.push("backend called".to_string()));
      next.run(ctx, cancel).await
    },
  );

  let cache: Arc<dyn PipelineStep<RequestContext>> = Arc::new(cache);
  let backend: Arc<dyn PipelineStep<RequestContext>> = Arc::new(backend);
  vec![LazyStep::from_instance(0, cache), LazyStep::from_instance(1, backend)]
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Short-Circuit and Cancellation Example ---");

  let runner = PipelineRunner::with_diagnostics(steps(), Arc::new(TracingDiagnostics::new()));

  // Cache hit: the backend step never runs.
  let ctx = ContextData::new(RequestContext {
    cached_response: Some("cached".to_string()),
    ..Default::default()
  });
  match runner.execute(ctx.clone(), &CancellationToken::new()).await? {
    PipelineOutcome::ShortCircuited { step_name, step_order } => {
      info!(%step_name, step_order, "Pipeline short-circuited as expected.");
    }
    PipelineOutcome::Completed => error!("Pipeline completed, but was expected to short-circuit!"),
  }
  assert!(!ctx.read().log.iter().any(|entry| entry == "backend called"));

  // Cache miss with a deadline shorter than the backend call.
  let cancel = CancellationToken::new();
  let deadline = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(10)).await;
    deadline.cancel();
  });
  match runner.execute(ContextData::new(RequestContext::default()), &cancel).await {
    Err(PipelineError::Canceled) => info!("Pipeline canceled by deadline."),
    other => error!(?other, "Expected cancellation."),
  }

  Ok(())
}
