use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::{Arc, RwLock};

use super::outcome::Outcome;

type Callable<V> = dyn Fn(Option<&V>, &[V]) -> io::Result<Outcome<V>> + Send + Sync;

/// A named, shareable callable that a `Call` effect will invoke. Two functions are only equal when
/// they are clones of the same handle; the name is used for diagnostics and serialization.
pub struct Function<V = serde_json::Value> {
  name: String,
  inner: Arc<Callable<V>>,
}

impl<V> Function<V> {
  /// Wraps a callable that produces an `Outcome` directly, which lets it choose between an immediate
  /// and a deferred result at call time.
  pub fn new<S, F>(name: S, callable: F) -> Self
  where
    S: Into<String>,
    F: Fn(Option<&V>, &[V]) -> io::Result<Outcome<V>> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      inner: Arc::new(callable),
    }
  }

  /// Wraps a synchronous callable; its results are always immediate.
  pub fn from_fn<S, F>(name: S, callable: F) -> Self
  where
    S: Into<String>,
    F: Fn(Option<&V>, &[V]) -> io::Result<V> + Send + Sync + 'static,
  {
    Self::new(name, move |context, args| callable(context, args).map(Outcome::Immediate))
  }

  /// Wraps a callable returning a future; its results are always deferred. The future must own
  /// whatever it needs from the arguments.
  pub fn from_async<S, F, R>(name: S, callable: F) -> Self
  where
    S: Into<String>,
    F: Fn(Option<&V>, &[V]) -> R + Send + Sync + 'static,
    R: Future<Output = io::Result<V>> + Send + 'static,
  {
    Self::new(name, move |context, args| Ok(Outcome::deferred(callable(context, args))))
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Invokes the underlying callable, bound to `context`.
  pub fn invoke(&self, context: Option<&V>, args: &[V]) -> io::Result<Outcome<V>> {
    (self.inner)(context, args)
  }
}

impl<V> Clone for Function<V> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<V> PartialEq for Function<V> {
  fn eq(&self, other: &Self) -> bool {
    Arc::as_ptr(&self.inner).cast::<()>() == Arc::as_ptr(&other.inner).cast::<()>()
  }
}

impl<V> std::fmt::Debug for Function<V> {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter.debug_tuple("Function").field(&self.name).finish()
  }
}

impl<V> Serialize for Function<V> {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&self.name)
  }
}

/// Anything that a `CallMethod` effect can be aimed at. Methods are resolved by name every time the
/// effect is handled, never when the effect is built.
pub trait Receiver<V = serde_json::Value>: Send + Sync {
  /// Resolves `method` and invokes it with `args`. Implementations should fail with
  /// `io::ErrorKind::NotFound` for names they do not know.
  fn invoke(&self, method: &str, args: &[V]) -> io::Result<Outcome<V>>;

  /// A human readable name, used when logging or serializing effects.
  fn name(&self) -> &str {
    std::any::type_name::<Self>()
  }
}

/// A shared handle to some `Receiver`.
pub struct Object<V = serde_json::Value> {
  inner: Arc<dyn Receiver<V>>,
}

impl<V> Object<V> {
  pub fn new<R>(receiver: R) -> Self
  where
    R: Receiver<V> + 'static,
  {
    Self {
      inner: Arc::new(receiver),
    }
  }

  /// Builds an object from a receiver that is already shared elsewhere, e.g. a `MethodTable` that
  /// will keep receiving new definitions.
  pub fn from_arc(inner: Arc<dyn Receiver<V>>) -> Self {
    Self { inner }
  }

  pub fn name(&self) -> &str {
    self.inner.name()
  }

  pub fn invoke(&self, method: &str, args: &[V]) -> io::Result<Outcome<V>> {
    self.inner.invoke(method, args)
  }
}

impl<V> Clone for Object<V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<V> PartialEq for Object<V> {
  fn eq(&self, other: &Self) -> bool {
    Arc::as_ptr(&self.inner).cast::<()>() == Arc::as_ptr(&other.inner).cast::<()>()
  }
}

impl<V> std::fmt::Debug for Object<V> {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter.debug_tuple("Object").field(&self.name()).finish()
  }
}

impl<V> Serialize for Object<V> {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(self.name())
  }
}

/// A receiver backed by a mutable name -> function map. Methods can be defined or replaced at any
/// point; effects aimed at the table see whatever is defined when they are handled.
pub struct MethodTable<V = serde_json::Value> {
  name: String,
  methods: RwLock<HashMap<String, Function<V>>>,
}

impl<V> MethodTable<V> {
  pub fn new<S>(name: S) -> Self
  where
    S: Into<String>,
  {
    Self {
      name: name.into(),
      methods: RwLock::new(HashMap::new()),
    }
  }

  /// Defines (or replaces) `method`.
  pub fn define<S>(&self, method: S, function: Function<V>) -> io::Result<()>
  where
    S: Into<String>,
  {
    let mut methods = self
      .methods
      .write()
      .map_err(|error| io::Error::new(io::ErrorKind::Other, format!("method table poisoned - {error}")))?;

    methods.insert(method.into(), function);
    Ok(())
  }

  fn lookup(&self, method: &str) -> io::Result<Option<Function<V>>> {
    let methods = self
      .methods
      .read()
      .map_err(|error| io::Error::new(io::ErrorKind::Other, format!("method table poisoned - {error}")))?;

    Ok(methods.get(method).cloned())
  }
}

impl<V> Receiver<V> for MethodTable<V> {
  fn invoke(&self, method: &str, args: &[V]) -> io::Result<Outcome<V>> {
    // The read guard is released before invoking so that methods may define other methods.
    match self.lookup(method)? {
      Some(function) => function.invoke(None, args),
      None => Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("'{}' has no method '{method}'", self.name),
      )),
    }
  }

  fn name(&self) -> &str {
    &self.name
  }
}

/// The discriminant of an `Effect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
  Call,
  CallMethod,
  All,
  Race,
  Itself,
}

impl std::fmt::Display for EffectKind {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    let label = match self {
      EffectKind::Call => "call",
      EffectKind::CallMethod => "call_method",
      EffectKind::All => "all",
      EffectKind::Race => "race",
      EffectKind::Itself => "itself",
    };

    write!(formatter, "{label}")
  }
}

/// An inert description of an operation. Nothing happens until a `Handler` interprets it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect<V = serde_json::Value> {
  /// Invoke `func` with `args`, bound to `context` when there is one.
  Call {
    func: Function<V>,
    args: Vec<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<V>,
  },

  /// Invoke the method named `method` on `obj`.
  CallMethod { obj: Object<V>, method: String, args: Vec<V> },

  /// Run every child concurrently, producing their results in order or the first failure.
  All { effects: Vec<Effect<V>> },

  /// Run every child concurrently, settling with whichever child settles first.
  Race { effects: Vec<Effect<V>> },

  /// A value that is already known. It is never interpreted or unwrapped.
  Itself { value: V },
}

impl<V> Effect<V> {
  pub fn kind(&self) -> EffectKind {
    match self {
      Effect::Call { .. } => EffectKind::Call,
      Effect::CallMethod { .. } => EffectKind::CallMethod,
      Effect::All { .. } => EffectKind::All,
      Effect::Race { .. } => EffectKind::Race,
      Effect::Itself { .. } => EffectKind::Itself,
    }
  }
}

pub fn call<V>(func: Function<V>, args: Vec<V>, context: Option<V>) -> Effect<V> {
  Effect::Call { func, args, context }
}

pub fn call_method<V, S>(obj: Object<V>, method: S, args: Vec<V>) -> Effect<V>
where
  S: Into<String>,
{
  Effect::CallMethod {
    obj,
    method: method.into(),
    args,
  }
}

pub fn all<V>(effects: Vec<Effect<V>>) -> Effect<V> {
  Effect::All { effects }
}

pub fn race<V>(effects: Vec<Effect<V>>) -> Effect<V> {
  Effect::Race { effects }
}

pub fn itself<V>(value: V) -> Effect<V> {
  Effect::Itself { value }
}
