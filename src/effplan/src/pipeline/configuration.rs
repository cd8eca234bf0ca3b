use serde::Deserialize;

/// A single arithmetic stage of the pipeline.
#[derive(Deserialize, Debug, Clone)]
pub struct StageConfiguration {
  /// The `Arithmetic` method to call; the stage input is always the first argument.
  pub(super) method: String,

  /// Any additional arguments, appended after the stage input.
  #[serde(default)]
  pub(super) args: Vec<serde_json::Value>,

  /// When set, the stage is performed by an async task instead of being answered right away.
  #[serde(default)]
  pub(super) deferred: bool,

  /// How long a deferred stage waits before answering.
  pub(super) delay_ms: Option<u64>,

  /// When set, the stage hands `[output, input]` downstream instead of just its output.
  #[serde(default)]
  pub(super) keep_input: bool,
}

/// The main configuration schema for a pipeline run.
#[derive(Deserialize, Debug, Clone)]
pub struct Configuration {
  /// The value fed into the first stage.
  pub(super) input: serde_json::Value,

  /// The stages, in the order they should run.
  #[serde(default)]
  pub(super) stages: Vec<StageConfiguration>,
}

impl Configuration {
  /// A one line rendition of the stages, e.g. `3 -> add -> max (deferred) -> mul`.
  pub fn describe(&self) -> String {
    self
      .stages
      .iter()
      .fold(self.input.to_string(), |line, stage| match stage.deferred {
        true => format!("{line} -> {} (deferred)", stage.method),
        false => format!("{line} -> {}", stage.method),
      })
  }
}
