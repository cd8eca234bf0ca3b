use std::io;
use std::sync::Arc;

use super::effect::{itself, Effect};
use super::handler::SharedHandler;
use super::outcome::Outcome;
use super::plan::{run, run_with, Plan};

/// A reusable "input -> plan" function.
pub type Continuation<V = serde_json::Value> = Arc<dyn Fn(V) -> io::Result<Plan<V>> + Send + Sync>;

type Builder<V> = dyn Fn(Option<Continuation<V>>) -> Continuation<V> + Send + Sync;

/// A step knows how to turn an input into a plan once it is told what comes after it. Steps are
/// composed back to front: the last step in a pipeline is built first and handed to the one before
/// it as its continuation. Building never performs any effect.
pub struct Step<V = serde_json::Value> {
  build: Arc<Builder<V>>,
}

impl<V> Step<V> {
  pub fn new<F>(build: F) -> Self
  where
    F: Fn(Option<Continuation<V>>) -> Continuation<V> + Send + Sync + 'static,
  {
    Self { build: Arc::new(build) }
  }

  /// Produces the input -> plan function for this step followed by `next`. A `None` continuation
  /// makes this step the end of the pipeline.
  pub fn build(&self, next: Option<Continuation<V>>) -> Continuation<V> {
    (self.build)(next)
  }

  /// The plan for `input` with nothing after this step.
  pub fn plan(&self, input: V) -> io::Result<Plan<V>> {
    self.build(None)(input)
  }
}

impl<V> Clone for Step<V> {
  fn clone(&self) -> Self {
    Self {
      build: Arc::clone(&self.build),
    }
  }
}

impl<V> std::fmt::Debug for Step<V> {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter.write_str("Step(..)")
  }
}

/// Lifts an effect constructor into a step: `input` becomes a single segment running
/// `make_effect(input)` whose value is passed to whatever follows.
pub fn step<V, F>(make_effect: F) -> Step<V>
where
  V: 'static,
  F: Fn(V) -> Effect<V> + Send + Sync + 'static,
{
  let make_effect = Arc::new(make_effect);

  Step::new(move |next: Option<Continuation<V>>| {
    let make_effect = Arc::clone(&make_effect);
    let continuation: Continuation<V> = Arc::new(move |input: V| {
      let effect = make_effect(input);

      Ok(match &next {
        Some(next) => {
          let next = Arc::clone(next);
          Plan::then(effect, move |output| next(output))
        }
        None => Plan::terminal(effect),
      })
    });
    continuation
  })
}

/// Wraps `inner` so that its output is replaced by `transform(output, &input)` before anything
/// downstream sees it. When nothing is downstream the transformed value is the result.
pub fn map_step<V, T>(inner: Step<V>, transform: T) -> Step<V>
where
  V: Clone + Send + Sync + 'static,
  T: Fn(V, &V) -> V + Send + Sync + 'static,
{
  let transform = Arc::new(transform);

  Step::new(move |next: Option<Continuation<V>>| {
    let inner = inner.clone();
    let transform = Arc::clone(&transform);

    let continuation: Continuation<V> = Arc::new(move |input: V| {
      let original = input.clone();
      let transform = Arc::clone(&transform);
      let next = next.clone();

      let mapped: Continuation<V> = Arc::new(move |output: V| {
        let value = transform(output, &original);

        match &next {
          Some(next) => next(value),
          None => Ok(Plan::terminal(itself(value))),
        }
      });

      inner.build(Some(mapped))(input)
    });
    continuation
  })
}

/// Chains `steps` so that each one feeds the next: `batch_steps([a, b, c])` behaves exactly like
/// building `a` with `b` (built with `c`) as its continuation. An empty batch passes its input
/// through untouched.
pub fn batch_steps<V>(steps: Vec<Step<V>>) -> Step<V>
where
  V: Send + Sync + 'static,
{
  Step::new(move |next: Option<Continuation<V>>| {
    steps
      .iter()
      .rev()
      .fold(next, |last, previous| Some(previous.build(last)))
      .unwrap_or_else(passthrough)
  })
}

fn passthrough<V>() -> Continuation<V>
where
  V: 'static,
{
  Arc::new(|input: V| Ok(Plan::terminal(itself(input))))
}

/// Runs `step` on `input` with the default handler.
pub fn run_step<V>(step: &Step<V>, input: V) -> io::Result<Outcome<V>>
where
  V: Clone + From<Vec<V>> + Send + 'static,
{
  run(step.plan(input)?)
}

/// Runs `step` on `input`, asking `handler` to perform each effect.
pub fn run_step_with<V>(step: &Step<V>, input: V, handler: SharedHandler<V>) -> io::Result<Outcome<V>>
where
  V: Send + 'static,
{
  run_with(step.plan(input)?, handler)
}
