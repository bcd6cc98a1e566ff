use std::time::Duration;

/// Failures surfaced by the fusion engine.
///
/// Collaborators report errors as `anyhow::Error`; the engine wraps them here
/// so callers can tell their own mistakes apart from upstream trouble.
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    /// Caller error: empty query, zero count/depth/limit, negative constant.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator was unreachable or answered with an error status.
    #[error("{collaborator} unavailable: {source:#}")]
    UpstreamUnavailable {
        collaborator: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A collaborator call exceeded the configured timeout.
    #[error("{collaborator} timed out after {after:?}")]
    Timeout {
        collaborator: &'static str,
        after: Duration,
    },

    /// Generation output held nothing usable. Never fatal to a fusion call.
    #[error("malformed upstream output: {0}")]
    MalformedUpstreamOutput(String),
}

impl FusionError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn upstream(collaborator: &'static str, source: anyhow::Error) -> Self {
        Self::UpstreamUnavailable {
            collaborator,
            source,
        }
    }

    /// True when the caller, not a collaborator, is at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// Timeouts count as upstream unavailability for policy purposes.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::Timeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FusionError>;

/// Await a collaborator call, bounded by `timeout` when one is set, and lift
/// its error into [`FusionError`].
pub(crate) async fn call_upstream<T, F>(
    collaborator: &'static str,
    timeout: Option<Duration>,
    fut: F,
) -> Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    let outcome = match timeout {
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| FusionError::Timeout {
                collaborator,
                after,
            })?,
        None => fut.await,
    };
    outcome.map_err(|e| FusionError::upstream(collaborator, e))
}
