//! Downstream collaborator clients and the shared fan-out outcome type.

pub mod clio;
pub mod graph;
pub mod mailchimp;
pub mod motion;

use std::time::Duration;

use crate::error::DispatchError;

/// Per-call timeout for collaborator APIs (the LLM has its own, longer one).
pub(crate) const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one fan-out step. Never returned to the HTTP caller — the
/// pipeline logs these and always responds with a success envelope.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Collaborator unconfigured or precondition unmet.
    Skipped { reason: &'static str },
    Ok,
    Failed { message: String },
}

impl StepOutcome {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "skipped",
            Self::Ok => "ok",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn from_result(result: Result<(), DispatchError>) -> Self {
        match result {
            Result::Ok(()) => Self::Ok,
            Err(e) => Self::Failed {
                message: e.to_string(),
            },
        }
    }
}

/// Map a non-2xx response into a `DispatchError::Status`, reading as much
/// of the body as the collaborator returned.
pub(crate) async fn status_error(
    service: &'static str,
    response: reqwest::Response,
) -> DispatchError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DispatchError::Status {
        service,
        status,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels() {
        assert_eq!(StepOutcome::Ok.label(), "ok");
        assert_eq!(
            StepOutcome::Skipped { reason: "no key" }.label(),
            "skipped"
        );
        assert_eq!(
            StepOutcome::Failed {
                message: "timeout".into()
            }
            .label(),
            "failed"
        );
    }

    #[test]
    fn from_result_maps_errors() {
        let ok = StepOutcome::from_result(Ok(()));
        assert!(matches!(ok, StepOutcome::Ok));

        let failed = StepOutcome::from_result(Err(DispatchError::Request {
            service: "motion",
            reason: "connection refused".into(),
        }));
        match failed {
            StepOutcome::Failed { message } => assert!(message.contains("motion")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
