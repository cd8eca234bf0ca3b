use futures::future::BoxFuture;
use std::io;
use std::sync::Arc;

use super::effect::Effect;
use super::handler::{DefaultHandler, Handler, SharedHandler};
use super::outcome::Outcome;

/// The continuation of a plan segment: given the value its effect produced, build the next segment.
pub type Next<V = serde_json::Value> = Box<dyn FnOnce(V) -> io::Result<Plan<V>> + Send>;

/// A plan is an effect to run now, plus (optionally) what to do with its value. Later segments only
/// come into existence once the value they depend on is known.
pub struct Plan<V = serde_json::Value> {
  effect: Effect<V>,
  next: Option<Next<V>>,
}

impl<V> Plan<V> {
  pub fn new(effect: Effect<V>, next: Option<Next<V>>) -> Self {
    Self { effect, next }
  }

  /// A single segment plan; the value of `effect` is the value of the plan.
  pub fn terminal(effect: Effect<V>) -> Self {
    Self { effect, next: None }
  }

  pub fn then<F>(effect: Effect<V>, next: F) -> Self
  where
    F: FnOnce(V) -> io::Result<Plan<V>> + Send + 'static,
  {
    Self {
      effect,
      next: Some(Box::new(next)),
    }
  }

  pub fn effect(&self) -> &Effect<V> {
    &self.effect
  }

  pub fn is_terminal(&self) -> bool {
    self.next.is_none()
  }

  pub fn into_parts(self) -> (Effect<V>, Option<Next<V>>) {
    (self.effect, self.next)
  }
}

impl<V> From<Effect<V>> for Plan<V> {
  fn from(effect: Effect<V>) -> Self {
    Self::terminal(effect)
  }
}

impl<V> std::fmt::Debug for Plan<V>
where
  V: std::fmt::Debug,
{
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter
      .debug_struct("Plan")
      .field("effect", &self.effect)
      .field("terminal", &self.is_terminal())
      .finish()
  }
}

/// How far a plan got before it either finished or had to wait.
enum Progress<V> {
  Settled(V),
  Suspended(BoxFuture<'static, io::Result<V>>, Option<Next<V>>),
}

/// Runs segments for as long as their effects are handled immediately.
fn advance<V>(mut plan: Plan<V>, handler: &dyn Handler<V>) -> io::Result<Progress<V>> {
  loop {
    let Plan { effect, next } = plan;
    tracing::trace!("running {} segment", effect.kind());

    plan = match (handler.handle(&effect, handler)?, next) {
      (Outcome::Deferred(pending), next) => return Ok(Progress::Suspended(pending, next)),
      (Outcome::Immediate(value), None) => return Ok(Progress::Settled(value)),
      (Outcome::Immediate(value), Some(next)) => next(value)?,
    };
  }
}

/// Runs `plan` with the `DefaultHandler`.
pub fn run<V>(plan: Plan<V>) -> io::Result<Outcome<V>>
where
  V: Clone + From<Vec<V>> + Send + 'static,
{
  run_with(plan, Arc::new(DefaultHandler))
}

/// Runs `plan`, asking `handler` to perform each effect.
///
/// As long as every effect is handled with an immediate value the whole plan runs right here, and
/// the result (or error) is returned as `Outcome::Immediate` (or `Err`) without ever touching a
/// future. The first deferred value switches the remainder of the plan into the returned
/// `Outcome::Deferred`, whose errors come out of the future instead.
///
/// Neither path recurses per segment, so arbitrarily long plans are fine.
pub fn run_with<V>(plan: Plan<V>, handler: SharedHandler<V>) -> io::Result<Outcome<V>>
where
  V: Send + 'static,
{
  let (pending, next) = match advance(plan, handler.as_ref())? {
    Progress::Settled(value) => return Ok(Outcome::Immediate(value)),
    Progress::Suspended(pending, next) => (pending, next),
  };

  tracing::debug!("plan suspended on a deferred effect, continuing asynchronously");

  Ok(Outcome::deferred(async move {
    let (mut pending, mut next) = (pending, next);

    loop {
      let value = pending.await?;

      let continuation = match next {
        Some(continuation) => continuation,
        None => return Ok(value),
      };

      (pending, next) = match advance(continuation(value)?, handler.as_ref())? {
        Progress::Settled(value) => return Ok(value),
        Progress::Suspended(pending, next) => (pending, next),
      };
    }
  }))
}

#[cfg(test)]
mod tests {
  use super::{run, run_with, Plan};
  use crate::eff::{
    all, call, call_method, default_handle, itself, Effect, Function, Handler, MethodTable, Object, Outcome,
    SharedHandler,
  };
  use serde_json::{json, Value};
  use std::io;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  fn math() -> Object {
    let table = MethodTable::new("math");
    table
      .define(
        "min",
        Function::from_fn("min", |_, args: &[Value]| Ok(json!(args.iter().filter_map(Value::as_i64).min()))),
      )
      .expect("defined");
    table
      .define(
        "max",
        Function::from_fn("max", |_, args: &[Value]| Ok(json!(args.iter().filter_map(Value::as_i64).max()))),
      )
      .expect("defined");
    Object::new(table)
  }

  /// Always answers with a deferred copy of its first argument.
  fn resolve() -> Function {
    Function::from_async("resolve", |_, args: &[Value]| {
      futures::future::ready(Ok(args.first().cloned().unwrap_or_default()))
    })
  }

  #[test]
  fn pure_values_run_synchronously() {
    let outcome = run(Plan::from(itself(json!(4)))).expect("runs");
    assert!(matches!(outcome, Outcome::Immediate(value) if value == json!(4)));
  }

  #[test]
  fn synchronous_segments_stay_synchronous() {
    let plan = Plan::then(call_method(math(), "min", vec![json!(3), json!(4)]), |y| {
      Ok(Plan::terminal(call_method(math(), "max", vec![y, json!(2)])))
    });

    let outcome = run(plan).expect("runs");
    assert_eq!(outcome.immediate(), Some(json!(3)));
  }

  #[async_std::test]
  async fn deferred_effects_produce_deferred_outcomes() {
    let outcome = run(Plan::from(call(resolve(), vec![json!(1)], None))).expect("runs");
    assert!(!outcome.is_immediate());
    assert_eq!(outcome.await.expect("settles"), json!(1));
  }

  #[async_std::test]
  async fn continuations_wait_for_deferred_values() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let plan = Plan::then(call(resolve(), vec![json!(5)], None), move |value| {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(Plan::then(itself(json!([value, "sync"])), |pair| {
        Ok(Plan::terminal(all(vec![itself(pair), itself(json!("async"))])))
      }))
    });

    let outcome = run(plan).expect("runs");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(outcome.await.expect("settles"), json!([[5, "sync"], "async"]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn synchronous_failures_are_returned_directly() {
    let plan = Plan::then(itself(json!(1)), |_| {
      Err(io::Error::new(io::ErrorKind::Other, "continuation failed"))
    });
    let error = run(plan).expect_err("fails synchronously");
    assert_eq!(error.to_string(), "continuation failed");

    let fail = Function::from_fn("fail", |_, _: &[Value]| Err(io::Error::new(io::ErrorKind::Other, "call failed")));
    let plan = Plan::then(itself(json!(1)), move |_| Ok(Plan::terminal(call(fail, vec![], None))));
    assert_eq!(run(plan).expect_err("fails").to_string(), "call failed");
  }

  #[async_std::test]
  async fn failures_after_suspending_are_deferred() {
    let plan = Plan::then(call(resolve(), vec![json!(1)], None), |_| {
      Err(io::Error::new(io::ErrorKind::Other, "late failure"))
    });
    let outcome = run(plan).expect("suspends first");
    assert!(!outcome.is_immediate());
    assert_eq!(outcome.await.expect_err("rejects").to_string(), "late failure");
  }

  #[test]
  fn long_synchronous_plans_do_not_grow_the_stack() {
    fn countdown(remaining: i64) -> Plan {
      Plan::then(itself(json!(remaining)), |value| match value.as_i64() {
        Some(0) | None => Ok(Plan::terminal(itself(json!("done")))),
        Some(n) => Ok(countdown(n - 1)),
      })
    }

    assert_eq!(run(countdown(200_000)).expect("runs").immediate(), Some(json!("done")));
  }

  #[async_std::test]
  async fn long_deferred_plans_do_not_grow_the_stack() {
    fn countdown(remaining: i64) -> Plan {
      Plan::then(call(resolve(), vec![json!(remaining)], None), |value| match value.as_i64() {
        Some(0) | None => Ok(Plan::terminal(itself(json!("done")))),
        Some(n) => Ok(countdown(n - 1)),
      })
    }

    assert_eq!(run(countdown(50_000)).expect("runs").await.expect("settles"), json!("done"));
  }

  #[test]
  fn custom_handlers_see_every_segment() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let handler: SharedHandler = Arc::new(move |effect: &Effect, handle: &dyn Handler| {
      counter.fetch_add(1, Ordering::SeqCst);
      match effect {
        Effect::Itself { value } if value.is_number() => Ok(Outcome::Immediate(json!(value.as_i64().map(|n| n * 10)))),
        other => default_handle(other, handle),
      }
    });

    let plan = Plan::then(itself(json!(1)), |value| Ok(Plan::terminal(itself(json!([value])))));
    let outcome = run_with(plan, handler).expect("runs");
    assert_eq!(outcome.immediate(), Some(json!([10])));
    assert_eq!(seen.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn unsupported_effects_can_be_refused() {
    let handler: SharedHandler = Arc::new(|effect: &Effect, handle: &dyn Handler| match effect {
      Effect::Itself { .. } => default_handle(effect, handle),
      other => Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} effects are not allowed here", other.kind()),
      )),
    });

    let plan = Plan::then(itself(json!(1)), |_| Ok(Plan::terminal(call_method(math(), "min", vec![]))));
    let error = run_with(plan, handler).expect_err("refused");
    assert_eq!(error.kind(), io::ErrorKind::Unsupported);
    assert_eq!(error.to_string(), "call_method effects are not allowed here");
  }
}
