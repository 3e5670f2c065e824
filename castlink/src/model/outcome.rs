/// Result of a `send` or `control` call: success flag plus a diagnostic
/// message. Every failure at the command boundary ends up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
  pub success: bool,
  pub message: String,
}

impl CommandOutcome {
  pub fn ok(message: impl Into<String>) -> Self {
    Self { success: true, message: message.into() }
  }

  pub fn failed(message: impl Into<String>) -> Self {
    Self { success: false, message: message.into() }
  }

  pub fn is_success(&self) -> bool {
    self.success
  }
}

impl From<CommandOutcome> for (bool, String) {
  fn from(outcome: CommandOutcome) -> Self {
    (outcome.success, outcome.message)
  }
}

impl std::fmt::Display for CommandOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = if self.success { "ok" } else { "failed" };
    write!(f, "{}: {}", label, self.message)
  }
}
