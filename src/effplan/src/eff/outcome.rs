use futures::future::BoxFuture;
use std::future::{Future, IntoFuture};
use std::io;

/// The result of handling a single effect. Handlers that can answer right away return `Immediate`,
/// which keeps the runner on its synchronous path; anything else is `Deferred` and switches the rest
/// of the run over to a future.
pub enum Outcome<V = serde_json::Value> {
  Immediate(V),
  Deferred(BoxFuture<'static, io::Result<V>>),
}

impl<V> Outcome<V> {
  pub fn deferred<F>(future: F) -> Self
  where
    F: Future<Output = io::Result<V>> + Send + 'static,
  {
    Outcome::Deferred(Box::pin(future))
  }

  pub fn is_immediate(&self) -> bool {
    matches!(self, Outcome::Immediate(_))
  }

  /// Returns the value when it is already available, dropping any pending future otherwise.
  pub fn immediate(self) -> Option<V> {
    match self {
      Outcome::Immediate(value) => Some(value),
      Outcome::Deferred(_) => None,
    }
  }

  /// Blocks the current thread until the outcome settles.
  pub fn wait(self) -> io::Result<V> {
    match self {
      Outcome::Immediate(value) => Ok(value),
      Outcome::Deferred(pending) => async_std::task::block_on(pending),
    }
  }
}

impl<V> IntoFuture for Outcome<V>
where
  V: Send + 'static,
{
  type Output = io::Result<V>;
  type IntoFuture = BoxFuture<'static, io::Result<V>>;

  fn into_future(self) -> Self::IntoFuture {
    match self {
      Outcome::Immediate(value) => Box::pin(futures::future::ready(Ok(value))),
      Outcome::Deferred(pending) => pending,
    }
  }
}

impl<V> std::fmt::Debug for Outcome<V>
where
  V: std::fmt::Debug,
{
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    match self {
      Outcome::Immediate(value) => formatter.debug_tuple("Immediate").field(value).finish(),
      Outcome::Deferred(_) => formatter.write_str("Deferred(..)"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::Outcome;
  use serde_json::json;
  use std::io;

  #[test]
  fn immediate_values_are_available_without_waiting() {
    let outcome = Outcome::Immediate(json!(4));
    assert!(outcome.is_immediate());
    assert_eq!(outcome.immediate(), Some(json!(4)));
  }

  #[test]
  fn deferred_values_need_waiting() {
    let outcome: Outcome = Outcome::deferred(async { Ok(json!("later")) });
    assert!(!outcome.is_immediate());
    assert_eq!(format!("{outcome:?}"), "Deferred(..)");
    assert_eq!(outcome.wait().expect("settles"), json!("later"));
  }

  #[async_std::test]
  async fn both_shapes_can_be_awaited() {
    assert_eq!(Outcome::Immediate(json!(1)).await.expect("ready"), json!(1));

    let failed: Outcome = Outcome::deferred(async { Err(io::Error::new(io::ErrorKind::Other, "nope")) });
    let error = failed.await.expect_err("rejects");
    assert_eq!(error.to_string(), "nope");
  }
}
