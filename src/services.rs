use crate::repositories::api::ApiError;

pub mod app;
pub mod countdown;
pub mod gating;
pub mod onboarding;
pub mod session;
pub mod status;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Account setup incomplete: {0}")]
    NotReady(gating::Route),
    #[error("Onboarding error: {0}")]
    Onboarding(#[from] onboarding::OnboardingError),
}
