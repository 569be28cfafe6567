use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Onboarding requirement reported by `check_status`.
///
/// Variant order matters: email verification sorts first, which is what
/// makes verification win over onboarding when both are missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    EmailVerification,
    UserDescription,
}

impl Requirement {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "email_verification" => Some(Self::EmailVerification),
            "user_description" => Some(Self::UserDescription),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserStatus {
    pub is_verified: bool,
    pub has_description: bool,
    pub missing: BTreeSet<Requirement>,
    pub guidance: Option<String>,
}

impl UserStatus {
    /// Fallback used when the status endpoint cannot be reached: everything
    /// is treated as missing so routing can still make a decision.
    pub fn pessimistic() -> Self {
        Self {
            is_verified: false,
            has_description: false,
            missing: BTreeSet::from([Requirement::EmailVerification, Requirement::UserDescription]),
            guidance: None,
        }
    }

    pub fn all_requirements_met(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn is_missing(&self, requirement: Requirement) -> bool {
        self.missing.contains(&requirement)
    }
}

/// Wire shape of `GET /api/auth/check_status` data.
#[derive(Clone, Debug, Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub has_description: bool,
    #[serde(default)]
    pub all_requirements_met: bool,
    #[serde(default)]
    pub missing_requirements: Vec<String>,
    #[serde(default)]
    pub guidance: Option<String>,
}

impl From<StatusPayload> for UserStatus {
    fn from(payload: StatusPayload) -> Self {
        let mut missing = BTreeSet::new();
        for name in &payload.missing_requirements {
            match Requirement::from_wire(name) {
                Some(requirement) => {
                    missing.insert(requirement);
                }
                None => log::warn!("Ignoring unknown requirement in status: {}", name),
            }
        }

        if payload.all_requirements_met != missing.is_empty() {
            log::warn!(
                "Status flags disagree: all_requirements_met={} but missing={:?}",
                payload.all_requirements_met,
                missing
            );
        }

        Self {
            is_verified: payload.is_verified,
            has_description: payload.has_description,
            missing,
            guidance: payload.guidance,
        }
    }
}
