// stepline/examples/basic_pipeline.rs

use async_trait::async_trait;
use stepline::{
  CancellationToken, ContextData, DelegateStep, Next, PipelineBuilder, PipelineConfig, PipelineError, PipelineStep,
  StepDefinition, StepDescriptor, StepResult,
};
use tracing::info;

// 1. Define Context Data
#[derive(Clone, Debug, Default)]
struct OrderContext {
  order_id: String,
  amount_cents: u64,
  validated: bool,
  charged: bool,
  log: Vec<String>,
}

// 2. Define Steps
#[derive(Default)]
struct ValidateOrder;

#[async_trait]
impl PipelineStep<OrderContext> for ValidateOrder {
  fn name(&self) -> &str {
    "ValidateOrder"
  }

  fn description(&self) -> Option<&str> {
    Some("Rejects orders without an amount")
  }

  async fn execute(&self, ctx: ContextData<OrderContext>, next: Next<OrderContext>, cancel: CancellationToken) -> StepResult {
    let amount = ctx.with_read(|o| o.amount_cents);
    if amount == 0 {
      return Err(anyhow::anyhow!("order has no amount").into());
    }
    ctx.update(|o| {
      o.validated = true;
      o.log.push("validated".to_string());
    });
    next.run(ctx, cancel).await
  }
}

impl StepDefinition<OrderContext> for ValidateOrder {
  fn descriptor() -> Option<StepDescriptor> {
    Some(StepDescriptor::new(10))
  }
}

#[derive(Default)]
struct ChargeCard;

#[async_trait]
impl PipelineStep<OrderContext> for ChargeCard {
  fn name(&self) -> &str {
    "ChargeCard"
  }

  async fn execute(&self, ctx: ContextData<OrderContext>, next: Next<OrderContext>, cancel: CancellationToken) -> StepResult {
    // Simulate a call to a payment provider.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    ctx.update(|o| {
      o.charged = true;
      o.log.push(format!("charged {} cents", o.amount_cents));
    });
    next.run(ctx, cancel).await
  }
}

impl StepDefinition<OrderContext> for ChargeCard {
  fn descriptor() -> Option<StepDescriptor> {
    // Only active when the "production" filter is supplied.
    Some(StepDescriptor::new(20).with_filter("production"))
  }
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Basic Pipeline Example ---");

  // 3. Build the pipeline. Filters come from STEPLINE_FILTERS, plus "production" here.
  let receipt = DelegateStep::new(
    "Receipt",
    |ctx: ContextData<OrderContext>, next: Next<OrderContext>, cancel: CancellationToken| async move {
      ctx.update(|o| o.log.push(format!("receipt sent for {}", o.order_id)));
      next.run(ctx, cancel).await
    },
  )
  .with_description("Emails the customer a receipt");

  let runner = PipelineBuilder::<OrderContext>::new()
    .with_step::<ChargeCard>()?
    .with_step::<ValidateOrder>()?
    .with_delegate(StepDescriptor::new(30), receipt)
    .with_config(&PipelineConfig::from_env())
    .with_filter("production")
    .build()?;

  info!("Pipeline description: {}", runner.describe()?);

  // 4. Execute
  let ctx = ContextData::new(OrderContext {
    order_id: "A-1001".to_string(),
    amount_cents: 4_200,
    ..Default::default()
  });
  let outcome = runner.execute(ctx.clone(), &CancellationToken::new()).await?;
  info!(?outcome, "Pipeline finished.");

  // 5. Inspect Results
  let final_state = ctx.read();
  for entry in &final_state.log {
    info!("- {}", entry);
  }
  assert!(final_state.validated && final_state.charged);

  // 6. A failing run reports the step that failed.
  let empty = ContextData::new(OrderContext::default());
  match runner.execute(empty, &CancellationToken::new()).await {
    Err(err) => {
      let step = err.step_name().unwrap_or_default().to_string();
      let order = err.step_order();
      info!(%step, ?order, "Expected failure: {:#}", anyhow::Error::new(err));
    }
    Ok(outcome) => info!(?outcome, "Unexpected success."),
  }

  Ok(())
}
