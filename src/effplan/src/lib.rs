#![forbid(unsafe_code)]

//! This library contains a small "effect runtime": side effects are described as plain data, chained
//! into plans, and handed to a swappable handler that decides how each one is actually performed.

/// This module is responsible for the generic core - effect descriptors, handlers, the plan runner
/// and the step combinators used to build plans.
pub mod eff;

/// The `pipeline` module is a concrete consumer of the `eff` module; it turns a toml-described list
/// of arithmetic stages into steps and runs them.
pub mod pipeline;

pub use eff::{
  all, batch_steps, call, call_method, default_handle, itself, map_step, race, run, run_step, run_step_with, run_with,
  step, Continuation, DefaultHandler, Effect, EffectKind, Function, Handler, MethodTable, Next, Object, Outcome, Plan,
  Receiver, SharedHandler, Step, Traced,
};
