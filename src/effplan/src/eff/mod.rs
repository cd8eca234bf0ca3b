//! The generic core. Everything in here is agnostic of the value type flowing through plans; the
//! default is `serde_json::Value`, but any `Clone + Send + Sync` type that can be built from a list of
//! itself works.

/// Effect descriptors and the callable/receiver types they carry.
mod effect;

/// The two-way (immediate or deferred) result of handling an effect.
mod outcome;

/// The `Handler` trait, the default interpretation of effects and a tracing decorator.
mod handler;

/// Plans and the runner that drives them.
mod plan;

/// Step combinators for building reusable plan pipelines.
mod step;

pub use effect::{all, call, call_method, itself, race, Effect, EffectKind, Function, MethodTable, Object, Receiver};
pub use handler::{default_handle, DefaultHandler, Handler, SharedHandler, Traced};
pub use outcome::Outcome;
pub use plan::{run, run_with, Next, Plan};
pub use step::{batch_steps, map_step, run_step, run_step_with, step, Continuation, Step};
