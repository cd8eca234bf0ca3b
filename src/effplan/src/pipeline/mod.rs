//! A pipeline is a list of arithmetic stages described in toml. Every stage becomes a step calling a
//! method on the shared `Arithmetic` receiver with the previous stage's value as its first argument;
//! the steps are batched together and run with a tracing handler.

use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::eff::{
  batch_steps, call, call_method, map_step, run_step_with, step, DefaultHandler, Function, Object, Outcome,
  SharedHandler, Step, Traced,
};

/// The numeric receiver every stage is aimed at.
mod arithmetic;

/// Contains configuration structures.
mod configuration;

pub use arithmetic::Arithmetic;
pub use configuration::{Configuration, StageConfiguration};

fn operands(input: Value, extra: &[Value]) -> Vec<Value> {
  std::iter::once(input).chain(extra.iter().cloned()).collect()
}

/// Deferred stages are plain `call` effects on an async function; everything else is a method call
/// on `target`.
fn stage(config: &StageConfiguration, target: &Object) -> Step {
  let args = config.args.clone();
  let method = config.method.clone();

  let base = if config.deferred {
    let delay = Duration::from_millis(config.delay_ms.unwrap_or_default());
    let name = format!("{method} (deferred)");

    let func = Function::from_async(name, move |_, args: &[Value]| {
      let method = method.clone();
      let args = args.to_vec();

      async move {
        async_std::task::sleep(delay).await;
        Arithmetic.evaluate(&method, &args)
      }
    });

    step(move |input| call(func.clone(), operands(input, &args), None))
  } else {
    let target = target.clone();
    step(move |input| call_method(target.clone(), method.clone(), operands(input, &args)))
  };

  if config.keep_input {
    map_step(base, |output, input| json!([output, input]))
  } else {
    base
  }
}

/// Builds a single step running every configured stage in order.
pub fn build(config: &Configuration) -> Step {
  let target = Object::new(Arithmetic);
  batch_steps(config.stages.iter().map(|entry| stage(entry, &target)).collect())
}

/// Runs the configured pipeline against its configured input. The outcome is immediate unless one
/// of the stages is deferred.
pub fn execute(config: &Configuration) -> io::Result<Outcome> {
  tracing::info!("running pipeline of {} stage(s)", config.stages.len());

  let handler: SharedHandler = Arc::new(Traced::new(DefaultHandler));
  run_step_with(&build(config), config.input.clone(), handler)
}

#[cfg(test)]
mod tests {
  use super::{build, execute, Configuration};
  use crate::eff::run_step;
  use serde_json::json;
  use std::io;

  fn parse(contents: &str) -> Configuration {
    toml::from_str::<Configuration>(contents).expect("valid configuration")
  }

  #[test]
  fn synchronous_pipelines_finish_immediately() {
    let config = parse(
      r#"
      input = 3

      [[stages]]
      method = "add"
      args = [4]

      [[stages]]
      method = "max"
      args = [10]

      [[stages]]
      method = "sub"
      args = [1]
      "#,
    );

    let outcome = execute(&config).expect("runs");
    assert_eq!(outcome.immediate(), Some(json!(9)));
  }

  #[async_std::test]
  async fn deferred_stages_make_the_pipeline_deferred() {
    let config = parse(
      r#"
      input = 3

      [[stages]]
      method = "add"
      args = [4]

      [[stages]]
      method = "max"
      args = [10]
      deferred = true
      delay_ms = 5

      [[stages]]
      method = "mul"
      args = [2]
      keep_input = true
      "#,
    );

    let outcome = execute(&config).expect("runs");
    assert!(!outcome.is_immediate());
    assert_eq!(outcome.await.expect("settles"), json!([20, 10]));
  }

  #[test]
  fn configurations_describe_their_stages() {
    let config = parse(
      r#"
      input = 3

      [[stages]]
      method = "add"
      args = [4]

      [[stages]]
      method = "max"
      deferred = true
      "#,
    );
    assert_eq!(config.describe(), "3 -> add -> max (deferred)");
    assert_eq!(parse("input = [1, 2]").describe(), "[1,2]");
  }

  #[test]
  fn kept_inputs_flow_into_later_stages() {
    let config = parse(
      r#"
      input = 2

      [[stages]]
      method = "mul"
      args = [5]
      keep_input = true

      [[stages]]
      method = "add"
      "#,
    );

    assert_eq!(execute(&config).expect("runs").immediate(), Some(json!(12)));
  }

  #[test]
  fn empty_pipelines_return_their_input() {
    let config = parse("input = \"unchanged\"");
    assert_eq!(run_step(&build(&config), json!(1)).expect("runs").immediate(), Some(json!(1)));
    assert_eq!(execute(&config).expect("runs").immediate(), Some(json!("unchanged")));
  }

  #[test]
  fn unknown_methods_fail_when_run() {
    let config = parse(
      r#"
      input = 1

      [[stages]]
      method = "pow"
      "#,
    );

    let error = execute(&config).expect_err("fails");
    assert_eq!(error.kind(), io::ErrorKind::NotFound);
  }
}
