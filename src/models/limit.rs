//! Limit directives: which traffic a limit applies to and the rates involved.

use crate::models::rate::LimitValue;
use crate::{AppError, Result};

/// Ordered, non-empty list of candidate process names identifying a program.
///
/// Only [`MatchRule::primary`] reaches the agent today; the remaining names
/// are carried so the configuration round-trips, but they are not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    names: Vec<String>,
}

impl MatchRule {
    /// Build a rule from candidate names.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `names` is empty or any name is blank.
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(AppError::Config(
                "match rule needs at least one process name".into(),
            ));
        }
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(AppError::Config(
                "match rule process names must not be empty".into(),
            ));
        }
        Ok(Self { names })
    }

    /// The name sent to the agent.
    #[must_use]
    pub fn primary(&self) -> &str {
        // `new` guarantees at least one entry.
        self.names.first().map_or("", String::as_str)
    }

    /// All candidate names in declared order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Scope of a [`LimitSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitTarget {
    /// Applies to the whole interface.
    Global,
    /// Applies to the process matched by the rule.
    Named(MatchRule),
}

/// A limit directive. Absent rates mean "no limit" / "no minimum".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitSpec {
    /// What the limits apply to.
    pub target: LimitTarget,
    /// Download ceiling.
    pub download: Option<LimitValue>,
    /// Upload ceiling.
    pub upload: Option<LimitValue>,
    /// Guaranteed download rate.
    pub download_minimum: Option<LimitValue>,
    /// Guaranteed upload rate.
    pub upload_minimum: Option<LimitValue>,
}

impl LimitSpec {
    /// A global spec with every rate absent.
    #[must_use]
    pub fn global() -> Self {
        Self::unbounded(LimitTarget::Global)
    }

    /// A per-process spec with every rate absent.
    #[must_use]
    pub fn named(rule: MatchRule) -> Self {
        Self::unbounded(LimitTarget::Named(rule))
    }

    fn unbounded(target: LimitTarget) -> Self {
        Self {
            target,
            download: None,
            upload: None,
            download_minimum: None,
            upload_minimum: None,
        }
    }

    /// Set the download ceiling.
    #[must_use]
    pub fn with_download(mut self, value: LimitValue) -> Self {
        self.download = Some(value);
        self
    }

    /// Set the upload ceiling.
    #[must_use]
    pub fn with_upload(mut self, value: LimitValue) -> Self {
        self.upload = Some(value);
        self
    }

    /// Set the guaranteed download rate.
    #[must_use]
    pub fn with_download_minimum(mut self, value: LimitValue) -> Self {
        self.download_minimum = Some(value);
        self
    }

    /// Set the guaranteed upload rate.
    #[must_use]
    pub fn with_upload_minimum(mut self, value: LimitValue) -> Self {
        self.upload_minimum = Some(value);
        self
    }

    /// Process name the agent will match on, or `None` for a global spec.
    #[must_use]
    pub fn process_name(&self) -> Option<&str> {
        match &self.target {
            LimitTarget::Global => None,
            LimitTarget::Named(rule) => Some(rule.primary()),
        }
    }

    /// Returns `true` when every rate is absent.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.download.is_none()
            && self.upload.is_none()
            && self.download_minimum.is_none()
            && self.upload_minimum.is_none()
    }
}
