use std::fmt;

use crate::models::status::{Requirement, UserStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Unauthenticated,
    CheckingStatus,
    NeedsVerification,
    NeedsOnboarding,
    Ready,
}

/// What the user is shown for a given route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    MarketingHome,
    Loading,
    EmailVerification,
    OnboardingQuestionnaire,
    Assistant,
}

impl Route {
    pub fn screen(&self) -> Screen {
        match self {
            Route::Unauthenticated => Screen::MarketingHome,
            Route::CheckingStatus => Screen::Loading,
            Route::NeedsVerification => Screen::EmailVerification,
            Route::NeedsOnboarding => Screen::OnboardingQuestionnaire,
            Route::Ready => Screen::Assistant,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Route::Unauthenticated => "unauthenticated",
            Route::CheckingStatus => "checking-status",
            Route::NeedsVerification => "needs-verification",
            Route::NeedsOnboarding => "needs-onboarding",
            Route::Ready => "ready",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug)]
pub enum GateEvent {
    LoggedIn,
    LoggedOut,
    StatusResolved(UserStatus),
    Verified,
    DescriptionSaved,
}

/// Verification is decided before onboarding when both are missing.
pub fn decide(status: &UserStatus) -> Route {
    if status.is_missing(Requirement::EmailVerification) {
        Route::NeedsVerification
    } else if status.is_missing(Requirement::UserDescription) {
        Route::NeedsOnboarding
    } else {
        Route::Ready
    }
}

/// Picks the screen from authentication and onboarding status.
#[derive(Debug)]
pub struct GatingRouter {
    route: Route,
}

impl Default for GatingRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl GatingRouter {
    pub fn new() -> Self {
        Self {
            route: Route::Unauthenticated,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Applies one event and returns the resulting route. Events that have no
    /// transition from the current route leave it unchanged.
    pub fn apply(&mut self, event: GateEvent) -> Route {
        let next = match (self.route, event) {
            (_, GateEvent::LoggedOut) => Route::Unauthenticated,
            (_, GateEvent::LoggedIn) => Route::CheckingStatus,
            // A late answer for a session that is already gone.
            (Route::Unauthenticated, GateEvent::StatusResolved(_)) => Route::Unauthenticated,
            (_, GateEvent::StatusResolved(status)) => decide(&status),
            (Route::NeedsVerification, GateEvent::Verified) => Route::CheckingStatus,
            (Route::NeedsOnboarding, GateEvent::DescriptionSaved) => Route::CheckingStatus,
            (current, event) => {
                log::debug!("Ignoring {:?} while {}", event, current);
                current
            }
        };

        if next != self.route {
            log::info!("Route {} -> {}", self.route, next);
        }
        self.route = next;
        next
    }

    /// Reconciles the route with externally held state, e.g. a session
    /// restored from storage. An authenticated user without a known status
    /// is always in `checking-status`.
    pub fn sync(&mut self, authenticated: bool, status: Option<&UserStatus>) -> Route {
        self.route = match (authenticated, status) {
            (false, _) => Route::Unauthenticated,
            (true, None) => Route::CheckingStatus,
            (true, Some(status))
                if matches!(self.route, Route::Unauthenticated | Route::CheckingStatus) =>
            {
                decide(status)
            }
            (true, Some(_)) => self.route,
        };
        self.route
    }

    /// A status query should be started: status is unknown and none is
    /// already running.
    pub fn needs_status_check(&self, loading: bool) -> bool {
        self.route == Route::CheckingStatus && !loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn status(missing: &[Requirement]) -> UserStatus {
        let missing: BTreeSet<_> = missing.iter().copied().collect();
        UserStatus {
            is_verified: !missing.contains(&Requirement::EmailVerification),
            has_description: !missing.contains(&Requirement::UserDescription),
            missing,
            guidance: None,
        }
    }

    #[test]
    fn verification_wins_over_onboarding() {
        let both = status(&[Requirement::EmailVerification, Requirement::UserDescription]);
        assert_eq!(decide(&both), Route::NeedsVerification);
        assert_eq!(decide(&UserStatus::pessimistic()), Route::NeedsVerification);
    }

    #[test]
    fn unverified_with_description_needs_verification() {
        let mut router = GatingRouter::new();
        router.apply(GateEvent::LoggedIn);
        let route =
            router.apply(GateEvent::StatusResolved(status(&[Requirement::EmailVerification])));
        assert_eq!(route, Route::NeedsVerification);
        assert_eq!(route.screen(), Screen::EmailVerification);
    }

    #[test]
    fn full_onboarding_walk() {
        let mut router = GatingRouter::new();
        assert_eq!(router.apply(GateEvent::LoggedIn), Route::CheckingStatus);
        assert_eq!(
            router.apply(GateEvent::StatusResolved(status(&[
                Requirement::EmailVerification,
                Requirement::UserDescription
            ]))),
            Route::NeedsVerification
        );
        assert_eq!(router.apply(GateEvent::Verified), Route::CheckingStatus);
        assert_eq!(
            router.apply(GateEvent::StatusResolved(status(&[Requirement::UserDescription]))),
            Route::NeedsOnboarding
        );
        assert_eq!(router.apply(GateEvent::DescriptionSaved), Route::CheckingStatus);
        assert_eq!(router.apply(GateEvent::StatusResolved(status(&[]))), Route::Ready);
        assert_eq!(router.apply(GateEvent::LoggedOut), Route::Unauthenticated);
    }

    #[test]
    fn events_without_transition_are_ignored() {
        let mut router = GatingRouter::new();
        assert_eq!(router.apply(GateEvent::Verified), Route::Unauthenticated);
        assert_eq!(
            router.apply(GateEvent::StatusResolved(status(&[]))),
            Route::Unauthenticated
        );

        router.apply(GateEvent::LoggedIn);
        router.apply(GateEvent::StatusResolved(status(&[Requirement::EmailVerification])));
        assert_eq!(router.apply(GateEvent::DescriptionSaved), Route::NeedsVerification);
    }

    #[test]
    fn refreshed_status_reroutes_from_any_signed_in_route() {
        let mut router = GatingRouter::new();
        router.apply(GateEvent::LoggedIn);
        assert_eq!(router.apply(GateEvent::StatusResolved(status(&[]))), Route::Ready);
        assert_eq!(
            router.apply(GateEvent::StatusResolved(status(&[Requirement::UserDescription]))),
            Route::NeedsOnboarding
        );
        assert_eq!(
            router.apply(GateEvent::StatusResolved(status(&[Requirement::EmailVerification]))),
            Route::NeedsVerification
        );
    }

    #[test]
    fn unknown_status_reenters_checking_unless_loading() {
        let mut router = GatingRouter::new();
        assert_eq!(router.sync(true, None), Route::CheckingStatus);
        assert!(router.needs_status_check(false));
        assert!(!router.needs_status_check(true));

        let ready = status(&[]);
        let mut restored = GatingRouter::new();
        assert_eq!(restored.sync(true, Some(&ready)), Route::Ready);
        assert!(!restored.needs_status_check(false));
        assert_eq!(restored.sync(false, Some(&ready)), Route::Unauthenticated);
    }
}
