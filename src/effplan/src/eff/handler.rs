use futures::future;
use serde::Serialize;
use std::io;
use std::sync::Arc;

use super::effect::Effect;
use super::outcome::Outcome;

/// A `Handler` decides how effects are actually performed. It is given the effect along with the
/// handle that should be used for any nested effects (the children of `All` and `Race`), which is
/// usually - but not necessarily - the handler itself.
///
/// Handlers that decline an effect kind should fail with `io::ErrorKind::Unsupported` rather than
/// inventing a value.
pub trait Handler<V = serde_json::Value>: Send + Sync {
  fn handle(&self, effect: &Effect<V>, handle: &dyn Handler<V>) -> io::Result<Outcome<V>>;
}

/// The form handlers are passed to the runner in.
pub type SharedHandler<V = serde_json::Value> = Arc<dyn Handler<V>>;

impl<V, F> Handler<V> for F
where
  F: Fn(&Effect<V>, &dyn Handler<V>) -> io::Result<Outcome<V>> + Send + Sync,
{
  fn handle(&self, effect: &Effect<V>, handle: &dyn Handler<V>) -> io::Result<Outcome<V>> {
    self(effect, handle)
  }
}

/// The handler used when none is provided.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl<V> Handler<V> for DefaultHandler
where
  V: Clone + From<Vec<V>> + Send + 'static,
{
  fn handle(&self, effect: &Effect<V>, handle: &dyn Handler<V>) -> io::Result<Outcome<V>> {
    default_handle(effect, handle)
  }
}

/// Performs `effect`:
///
/// - calls and method calls are invoked right away; method names are resolved now.
/// - the children of `all` and `race` are dispatched through `handle`, in order, before this returns.
///   A child failing synchronously fails the whole effect synchronously. Deferred children are
///   spawned onto the executor as they are dispatched and always run to completion, even once the
///   composite has settled without them.
/// - `itself` hands back its value untouched.
pub fn default_handle<V>(effect: &Effect<V>, handle: &dyn Handler<V>) -> io::Result<Outcome<V>>
where
  V: Clone + From<Vec<V>> + Send + 'static,
{
  match effect {
    Effect::Call { func, args, context } => func.invoke(context.as_ref(), args),
    Effect::CallMethod { obj, method, args } => obj.invoke(method, args),
    Effect::All { effects } => {
      let pending = dispatch(effects, handle)?;
      Ok(Outcome::deferred(async move {
        future::try_join_all(pending).await.map(V::from)
      }))
    }
    Effect::Race { effects } => {
      if effects.is_empty() {
        return Err(io::Error::new(
          io::ErrorKind::InvalidInput,
          "race requires at least one effect",
        ));
      }

      let pending = dispatch(effects, handle)?;
      Ok(Outcome::deferred(async move {
        // Dropping the remaining handles detaches the losers; they keep running, unobserved.
        let (settled, _, _) = future::select_all(pending).await;
        settled
      }))
    }
    Effect::Itself { value } => Ok(Outcome::Immediate(value.clone())),
  }
}

fn dispatch<V>(effects: &[Effect<V>], handle: &dyn Handler<V>) -> io::Result<Vec<future::BoxFuture<'static, io::Result<V>>>>
where
  V: Send + 'static,
{
  effects
    .iter()
    .map(|child| handle.handle(child, handle).map(detach))
    .collect()
}

/// Starts a deferred child on the executor. An `async_std` join handle that is dropped leaves its
/// task running, so a composite that stops listening never stops the child itself.
fn detach<V>(outcome: Outcome<V>) -> future::BoxFuture<'static, io::Result<V>>
where
  V: Send + 'static,
{
  match outcome {
    Outcome::Immediate(value) => Box::pin(future::ready(Ok(value))),
    Outcome::Deferred(pending) => Box::pin(async_std::task::spawn(pending)),
  }
}

/// Wraps another handler, emitting a `tracing` event for every effect it sees and for the shape of
/// what came back.
#[derive(Debug, Default, Clone)]
pub struct Traced<H> {
  inner: H,
}

impl<H> Traced<H> {
  pub fn new(inner: H) -> Self {
    Self { inner }
  }
}

impl<V, H> Handler<V> for Traced<H>
where
  H: Handler<V>,
  V: Serialize,
{
  fn handle(&self, effect: &Effect<V>, handle: &dyn Handler<V>) -> io::Result<Outcome<V>> {
    let kind = effect.kind();

    if tracing::enabled!(tracing::Level::DEBUG) {
      match serde_json::to_string(effect) {
        Ok(descriptor) => tracing::debug!("handling {kind} effect - {descriptor}"),
        Err(error) => tracing::debug!("handling {kind} effect (unable to serialize - {error})"),
      }
    }

    let outcome = self.inner.handle(effect, handle);

    match &outcome {
      Ok(Outcome::Immediate(_)) => tracing::trace!("{kind} effect settled immediately"),
      Ok(Outcome::Deferred(_)) => tracing::trace!("{kind} effect deferred"),
      Err(error) => tracing::warn!("{kind} effect failed - {error}"),
    }

    outcome
  }
}
