// SPDX-License-Identifier: GPL-3.0-only

//! Camera and microphone authorization
//!
//! Capture setup must not begin until both kinds are granted. Denial is
//! reported as a [`PermissionError`], which [`crate::errors::AppError`]
//! classifies as fatal; the binary terminates on it.

use crate::errors::PermissionError;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// What access is being asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizationKind {
    Camera,
    Microphone,
}

impl std::fmt::Display for AuthorizationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorizationKind::Camera => write!(f, "Camera"),
            AuthorizationKind::Microphone => write!(f, "Microphone"),
        }
    }
}

/// Platform answer to "may this app use the device?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    Restricted,
    /// The user has never been asked
    NotDetermined,
}

/// Platform permission service
pub trait AuthorizationProvider: Send + Sync {
    /// Current status without prompting
    fn status(&self, kind: AuthorizationKind) -> AuthorizationStatus;

    /// Show the system prompt; the user's answer arrives on `reply`
    fn request_access(&self, kind: AuthorizationKind, reply: oneshot::Sender<bool>);
}

/// Gate in front of capture setup
#[derive(Debug)]
pub struct PermissionGate<P> {
    provider: P,
}

impl<P: AuthorizationProvider> PermissionGate<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Return once `kind` is granted, prompting if the user was never asked
    pub async fn ensure_authorized(&self, kind: AuthorizationKind) -> Result<(), PermissionError> {
        match self.provider.status(kind) {
            AuthorizationStatus::Authorized => Ok(()),
            AuthorizationStatus::Denied => {
                warn!(%kind, "Access previously denied");
                Err(PermissionError::Denied(kind))
            }
            AuthorizationStatus::Restricted => {
                warn!(%kind, "Access restricted");
                Err(PermissionError::Restricted(kind))
            }
            AuthorizationStatus::NotDetermined => {
                info!(%kind, "Requesting access");
                let (tx, rx) = oneshot::channel();
                self.provider.request_access(kind, tx);
                // A prompt that never answers counts as a refusal
                if rx.await.unwrap_or(false) {
                    info!(%kind, "Access granted");
                    Ok(())
                } else {
                    warn!(%kind, "Access denied at prompt");
                    Err(PermissionError::Denied(kind))
                }
            }
        }
    }

    /// Camera first, then microphone
    pub async fn ensure_capture_authorized(&self) -> Result<(), PermissionError> {
        self.ensure_authorized(AuthorizationKind::Camera).await?;
        self.ensure_authorized(AuthorizationKind::Microphone).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::SimulatedAuthorization;

    #[tokio::test]
    async fn test_prior_grant_does_not_prompt() {
        let provider = SimulatedAuthorization::granted();
        let gate = PermissionGate::new(provider.clone());

        assert!(gate.ensure_capture_authorized().await.is_ok());
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_prior_denial_is_fatal() {
        let provider = SimulatedAuthorization::granted()
            .set_status(AuthorizationKind::Camera, AuthorizationStatus::Denied);
        let gate = PermissionGate::new(provider);

        let err = gate.ensure_capture_authorized().await.unwrap_err();
        assert!(matches!(err, PermissionError::Denied(AuthorizationKind::Camera)));
    }

    #[tokio::test]
    async fn test_restricted_microphone() {
        let provider = SimulatedAuthorization::granted()
            .set_status(AuthorizationKind::Microphone, AuthorizationStatus::Restricted);
        let gate = PermissionGate::new(provider);

        let err = gate.ensure_capture_authorized().await.unwrap_err();
        assert!(matches!(
            err,
            PermissionError::Restricted(AuthorizationKind::Microphone)
        ));
    }

    #[tokio::test]
    async fn test_prompt_once_then_remembered() {
        let provider = SimulatedAuthorization::with_status(AuthorizationStatus::NotDetermined);
        let gate = PermissionGate::new(provider.clone());

        gate.ensure_capture_authorized().await.unwrap();
        gate.ensure_capture_authorized().await.unwrap();
        assert_eq!(
            provider.prompts(),
            vec![AuthorizationKind::Camera, AuthorizationKind::Microphone]
        );
    }

    #[tokio::test]
    async fn test_prompt_refused() {
        let provider = SimulatedAuthorization::with_status(AuthorizationStatus::NotDetermined)
            .answer_prompt(AuthorizationKind::Microphone, false);
        let gate = PermissionGate::new(provider);

        let err = gate.ensure_capture_authorized().await.unwrap_err();
        assert!(matches!(
            err,
            PermissionError::Denied(AuthorizationKind::Microphone)
        ));
    }
}
