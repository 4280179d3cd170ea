// tests/discovery_tests.rs
mod common;

use async_trait::async_trait;
use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use stepline::{
  discover, CancellationToken, ContextData, DelegateStep, Next, NoopDiagnostics, PipelineBuilder, PipelineError,
  PipelineRunner, PipelineStep, StepCandidate, StepCatalog, StepDefinition, StepDescriptor, StepLifetime, StepResult,
  StepSource,
};

// Step types that log their own name and continue.
macro_rules! logged_step {
  ($ty:ident, $descriptor:expr) => {
    #[derive(Default)]
    struct $ty;

    #[async_trait]
    impl PipelineStep<TestContext> for $ty {
      fn name(&self) -> &str {
        stringify!($ty)
      }

      async fn execute(&self, ctx: ContextData<TestContext>, next: Next<TestContext>, cancel: CancellationToken) -> StepResult {
        ctx.update(|c| c.log.push(stringify!($ty).to_string()));
        next.run(ctx, cancel).await
      }
    }

    impl StepDefinition<TestContext> for $ty {
      fn descriptor() -> Option<StepDescriptor> {
        $descriptor
      }
    }
  };
}

logged_step!(Validate, Some(StepDescriptor::new(10)));
logged_step!(Charge, Some(StepDescriptor::new(20).with_filter("production")));
logged_step!(Notify, Some(StepDescriptor::new(30)));
logged_step!(Undescribed, None);

fn candidate(name: &'static str, descriptor: StepDescriptor) -> StepCandidate<TestContext> {
  StepCandidate::new(name, Some(descriptor), move || RecordingStep::new(name))
}

fn filter_matrix_source() -> Vec<StepCandidate<TestContext>> {
  vec![
    candidate("Always", StepDescriptor::new(1)),
    candidate("ProdOnly", StepDescriptor::new(2).with_filter("production")),
    candidate("StagingOnly", StepDescriptor::new(3).with_filter("staging")),
    candidate("Both", StepDescriptor::new(4).with_filters(["production", "staging"])),
  ]
}

fn discovered_names(filters: &[&str]) -> Vec<String> {
  let source = filter_matrix_source();
  let sources: Vec<&dyn StepSource<TestContext>> = vec![&source];
  discover::<TestContext, &str>(&sources, filters)
    .unwrap()
    .iter()
    .map(|step| step.type_name().to_string())
    .collect()
}

#[test]
fn test_filtered_steps_are_excluded_without_active_filters() {
  setup_tracing();
  assert_eq!(discovered_names(&[]), vec!["Always"]);
}

#[test]
fn test_single_active_filter() {
  setup_tracing();
  assert_eq!(discovered_names(&["production"]), vec!["Always", "ProdOnly", "Both"]);
  assert_eq!(discovered_names(&["staging"]), vec!["Always", "StagingOnly", "Both"]);
}

#[test]
fn test_filters_match_case_insensitively() {
  setup_tracing();
  assert_eq!(discovered_names(&["PRODUCTION"]), vec!["Always", "ProdOnly", "Both"]);
  assert_eq!(discovered_names(&["Staging"]), vec!["Always", "StagingOnly", "Both"]);
}

#[test]
fn test_multiple_active_filters_and_unknown_filter() {
  setup_tracing();
  assert_eq!(
    discovered_names(&["staging", "production"]),
    vec!["Always", "ProdOnly", "StagingOnly", "Both"]
  );
  assert_eq!(discovered_names(&["dev"]), vec!["Always"]);
}

#[test]
fn test_descriptor_filters_are_deduplicated_ignoring_case() {
  let descriptor = StepDescriptor::new(5).with_filters(["Production", "production", "PRODUCTION", "eu"]);
  assert_eq!(descriptor.filters(), &["Production".to_string(), "eu".to_string()]);
  assert!(descriptor.matches(&["EU"]));
  assert!(!StepDescriptor::new(5).with_filter("eu").matches::<&str>(&[]));
  assert!(StepDescriptor::new(5).matches::<&str>(&[]));
}

#[test]
fn test_sort_is_ascending_and_stable_for_equal_orders() {
  setup_tracing();
  let source = vec![
    candidate("X", StepDescriptor::new(5)),
    candidate("Y", StepDescriptor::new(1)),
    candidate("Z", StepDescriptor::new(5)),
    candidate("W", StepDescriptor::new(-3)),
  ];
  let sources: Vec<&dyn StepSource<TestContext>> = vec![&source];
  let names: Vec<String> = discover::<TestContext, &str>(&sources, &[])
    .unwrap()
    .iter()
    .map(|s| s.type_name().to_string())
    .collect();
  assert_eq!(names, vec!["W", "Y", "X", "Z"]);
}

#[test]
fn test_missing_descriptor_is_an_error_not_a_skip() {
  setup_tracing();
  let result = PipelineBuilder::<TestContext>::new()
    .with_step::<Validate>()
    .and_then(|b| b.with_step::<Undescribed>())
    .and_then(|b| b.build());

  match result {
    Err(err @ PipelineError::MissingDescriptor { .. }) => {
      assert!(err.is_configuration());
      assert!(err.to_string().contains("Undescribed"));
    }
    other => panic!("Expected MissingDescriptor, got {:?}", other),
  }
}

#[test]
fn test_registering_a_step_type_twice_fails() {
  setup_tracing();
  let mut catalog = StepCatalog::<TestContext>::new();
  catalog.register::<Validate>().unwrap();
  let err = catalog.register::<Validate>().unwrap_err();
  assert!(matches!(err, PipelineError::DuplicateStep { ref type_name } if type_name.contains("Validate")));
  assert_eq!(catalog.len(), 1);
  assert!(format!("{:?}", catalog).starts_with("StepCatalog { entries: ["));
}

#[test]
fn test_same_step_type_from_two_sources_fails() {
  setup_tracing();
  let result = PipelineBuilder::<TestContext>::new()
    .with_step::<Validate>()
    .unwrap()
    .with_source(vec![StepCandidate::<TestContext>::of_default::<Validate>()])
    .build();
  assert!(matches!(result, Err(PipelineError::DuplicateStep { .. })));
}

#[test]
fn test_failing_loader_is_skipped() {
  setup_tracing();
  let mut catalog = StepCatalog::<TestContext>::new();
  catalog.register::<Validate>().unwrap();
  catalog.register_loader("payments-plugin", || Err(anyhow::anyhow!("assembly not found")));
  catalog.register_loader("audit-plugin", || {
    Ok(StepCandidate::new("Audit", Some(StepDescriptor::new(50)), || RecordingStep::new("Audit")))
  });

  let candidates = catalog.candidates();
  assert_eq!(candidates.len(), 3);
  let load_error = candidates[1].as_ref().unwrap_err();
  assert!(format!("{:#}", load_error).contains("payments-plugin"));

  let sources: Vec<&dyn StepSource<TestContext>> = vec![&catalog];
  let discovered = discover::<TestContext, &str>(&sources, &[]).unwrap();
  let names: Vec<&str> = discovered.iter().map(|s| s.type_name()).collect();
  assert_eq!(names.len(), 2);
  assert!(names[0].ends_with("Validate"));
  assert_eq!(names[1], "Audit");
}

#[tokio::test]
async fn test_builder_discovers_orders_and_filters() {
  setup_tracing();
  let audit = DelegateStep::new(
    "Audit",
    |ctx: ContextData<TestContext>, next: Next<TestContext>, cancel: CancellationToken| async move {
      ctx.update(|c| c.log.push("Audit".to_string()));
      next.run(ctx, cancel).await
    },
  );

  let build = |filters: &[&str]| {
    PipelineBuilder::<TestContext>::new()
      .with_step::<Notify>()
      .unwrap()
      .with_step::<Charge>()
      .unwrap()
      .with_step::<Validate>()
      .unwrap()
      .with_filters(filters.iter().copied())
      .build()
      .unwrap()
  };

  let ctx = ContextData::new(TestContext::default());
  build(&[]).execute(ctx.clone(), &CancellationToken::new()).await.unwrap();
  assert_eq!(log_of(&ctx), vec!["Validate", "Notify"]);

  let ctx = ContextData::new(TestContext::default());
  build(&["Production"]).execute(ctx.clone(), &CancellationToken::new()).await.unwrap();
  assert_eq!(log_of(&ctx), vec!["Validate", "Charge", "Notify"]);

  let runner = PipelineBuilder::<TestContext>::new()
    .with_step::<Validate>()
    .unwrap()
    .with_delegate(StepDescriptor::new(15), audit)
    .with_step_factory::<Notify>(|| Notify)
    .unwrap()
    .build()
    .unwrap();
  let ctx = ContextData::new(TestContext::default());
  runner.execute(ctx.clone(), &CancellationToken::new()).await.unwrap();
  assert_eq!(log_of(&ctx), vec!["Validate", "Audit", "Notify"]);
}

#[tokio::test]
async fn test_error_order_reports_descriptor_order() {
  setup_tracing();
  let runner = PipelineBuilder::<TestContext>::new()
    .with_step::<Validate>()
    .unwrap()
    .with_source(vec![StepCandidate::new("Explodes", Some(StepDescriptor::new(42)), || {
      RecordingStep::new("Explodes").behaving(Behavior::Fail("kaboom"))
    })])
    .build()
    .unwrap();

  let err = runner
    .execute(ContextData::new(TestContext::default()), &CancellationToken::new())
    .await
    .unwrap_err();
  assert_eq!(err.step_name(), Some("Explodes"));
  assert_eq!(err.step_order(), Some(42));
}

fn counted_source(constructed: &Arc<AtomicUsize>) -> Vec<StepCandidate<TestContext>> {
  vec![StepCandidate::new(
    "Counted",
    Some(StepDescriptor::new(1)),
    counting_factory(RecordingStep::new("Counted"), constructed.clone()),
  )]
}

#[tokio::test]
async fn test_singleton_lifetime_shares_instances_between_runners() {
  setup_tracing();
  let constructed = Arc::new(AtomicUsize::new(0));
  let registry = PipelineBuilder::<TestContext>::new()
    .with_source(counted_source(&constructed))
    .with_lifetime(StepLifetime::Singleton)
    .build_registry()
    .unwrap();

  let first = PipelineRunner::from_resolver(&registry, Arc::new(NoopDiagnostics));
  let second = PipelineRunner::from_resolver(&registry, Arc::new(NoopDiagnostics));
  for runner in [&first, &second] {
    runner
      .execute(ContextData::new(TestContext::default()), &CancellationToken::new())
      .await
      .unwrap();
  }

  assert_eq!(registry.lifetime(), StepLifetime::Singleton);
  assert_eq!(constructed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_transient_lifetime_constructs_per_runner() {
  setup_tracing();
  let constructed = Arc::new(AtomicUsize::new(0));
  let registry = PipelineBuilder::<TestContext>::new()
    .with_source(counted_source(&constructed))
    .build_registry()
    .unwrap();

  let first = PipelineRunner::from_resolver(&registry, Arc::new(NoopDiagnostics));
  let second = PipelineRunner::from_resolver(&registry, Arc::new(NoopDiagnostics));
  for _ in 0..2 {
    for runner in [&first, &second] {
      runner
        .execute(ContextData::new(TestContext::default()), &CancellationToken::new())
        .await
        .unwrap();
    }
  }

  assert_eq!(registry.lifetime(), StepLifetime::Transient);
  assert_eq!(constructed.load(Ordering::SeqCst), 2);
}
