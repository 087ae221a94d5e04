//! Per-target results of one bridge operation.

use {lightning_common::OriginKey, serde::Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeAction {
    Create,
    Edit,
    Delete,
}

impl BridgeAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

/// Why a target was not called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The target already holds a copy of the message.
    AlreadyBridged,
    /// No plugin is registered for the target platform.
    NotRegistered,
    /// The platform is in the entry but no longer bridged with the origin channel.
    NotConfigured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetResult {
    Delivered { remote_id: String },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetOutcome {
    pub platform: String,
    pub channel: String,
    pub result: TargetResult,
}

impl TargetOutcome {
    pub(crate) fn new(
        platform: impl Into<String>,
        channel: impl Into<String>,
        result: TargetResult,
    ) -> Self {
        Self {
            platform: platform.into(),
            channel: channel.into(),
            result,
        }
    }
}

/// Partial-result summary of a create, edit or delete fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeReport {
    pub origin: OriginKey,
    pub action: BridgeAction,
    pub outcomes: Vec<TargetOutcome>,
}

impl BridgeReport {
    pub fn new(origin: OriginKey, action: BridgeAction) -> Self {
        Self {
            origin,
            action,
            outcomes: Vec::new(),
        }
    }

    /// `(platform, remote id)` for every target that succeeded.
    pub fn delivered(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            TargetResult::Delivered { remote_id } => Some((o.platform.as_str(), remote_id.as_str())),
            _ => None,
        })
    }

    /// `(platform, error)` for every target that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.result {
            TargetResult::Failed { error } => Some((o.platform.as_str(), error.as_str())),
            _ => None,
        })
    }

    pub fn outcome(&self, platform: &str) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| o.platform == platform)
    }

    /// True when no target was attempted.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}
