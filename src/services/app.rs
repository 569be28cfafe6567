use std::sync::Arc;
use std::time::Duration;

use super::countdown::{CountdownState, CountdownTimer};
use super::gating::{GateEvent, GatingRouter, Route};
use super::onboarding::OnboardingSequencer;
use super::session::{LanguagePreference, SessionStore};
use super::status::StatusResolver;
use super::ServiceError;
use crate::models::content::{
    Article, Bank, ChatReply, DailySummaryPayload, DescriptionUpdate, PreferenceTags,
};
use crate::models::language::Language;
use crate::models::session::{AuthData, CurrentUser, Session};
use crate::models::status::UserStatus;
use crate::repositories::api::ApiClient;
use crate::repositories::auth::AuthApi;
use crate::repositories::content::ContentApi;
use crate::repositories::storage::KeyValueStore;
use crate::settings::Settings;
use crate::utils;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent(CountdownState),
    /// The current code has not expired yet; the countdown follows the
    /// server's remaining time.
    StillValid {
        message: String,
        countdown: CountdownState,
    },
}

/// Everything a signed-in client needs, constructed once at start-up and
/// passed around explicitly. Dropping it cancels the countdown timer.
pub struct AppContext {
    auth: AuthApi,
    content: ContentApi,
    session: SessionStore,
    language: LanguagePreference,
    status: StatusResolver,
    router: GatingRouter,
    countdown: CountdownTimer,
    resend_minutes: u32,
}

impl AppContext {
    pub fn new(
        api: ApiClient,
        store: Arc<dyn KeyValueStore>,
        refresh_cooldown: Duration,
        resend_minutes: u32,
    ) -> Self {
        let auth = AuthApi::new(api.clone());
        let status = StatusResolver::new(Arc::new(auth.clone()), refresh_cooldown);

        Self {
            content: ContentApi::new(api),
            session: SessionStore::init(store.clone()),
            language: LanguagePreference::init(store),
            status,
            router: GatingRouter::new(),
            countdown: CountdownTimer::new(resend_minutes),
            resend_minutes,
            auth,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, ServiceError> {
        let api = ApiClient::new(&settings.api.base_url, settings.api.timeout())?;

        Ok(Self::new(
            api,
            store,
            settings.status.refresh_cooldown(),
            settings.verification.resend_cooldown_minutes,
        ))
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.session()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub fn route(&self) -> Route {
        self.router.route()
    }

    pub fn language(&self) -> Language {
        self.language.get()
    }

    pub fn set_language(&mut self, language: Language) {
        self.language.set(language);
    }

    pub fn countdown(&self) -> &CountdownTimer {
        &self.countdown
    }

    pub async fn cached_status(&self) -> Option<UserStatus> {
        self.status.cached().await
    }

    /// A fresh questionnaire; each onboarding attempt needs its own.
    pub fn start_onboarding(&self) -> OnboardingSequencer {
        OnboardingSequencer::new()
    }

    fn token(&self) -> Result<String, ServiceError> {
        self.session
            .token()
            .map(str::to_string)
            .ok_or(ServiceError::NotAuthenticated)
    }

    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Route, ServiceError> {
        utils::validate_password(password).map_err(ServiceError::InvalidInput)?;

        let data = self.auth.register(username.trim(), email.trim(), password).await?;
        log::info!("Registered {}", data.username);
        self.start_session(data).await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<Route, ServiceError> {
        let data = self.auth.login(username.trim(), password).await?;
        log::info!("Logged in as {}", data.username);
        self.start_session(data).await
    }

    async fn start_session(&mut self, data: AuthData) -> Result<Route, ServiceError> {
        self.session.login(data);
        self.status.clear().await;
        self.router.apply(GateEvent::LoggedIn);
        self.resolve_status().await
    }

    /// Unthrottled status query, used right after the server state is known
    /// to have changed.
    async fn resolve_status(&mut self) -> Result<Route, ServiceError> {
        let token = self.token()?;
        let status = self.status.check_status(&token).await;
        Ok(self.enter(status))
    }

    fn enter(&mut self, status: UserStatus) -> Route {
        let previous = self.router.route();
        let route = self.router.apply(GateEvent::StatusResolved(status));
        if route == Route::NeedsVerification
            && previous != Route::NeedsVerification
            && self.countdown.state().can_resend()
        {
            self.countdown.start(self.resend_minutes);
        }
        route
    }

    /// Current route, querying status first when it is unknown.
    pub async fn current_route(&mut self) -> Result<Route, ServiceError> {
        let cached = self.status.cached().await;
        self.router.sync(self.session.is_authenticated(), cached.as_ref());

        if self.router.needs_status_check(self.status.is_loading().await) {
            return self.refresh().await;
        }
        Ok(self.router.route())
    }

    /// Throttled status refresh.
    pub async fn refresh(&mut self) -> Result<Route, ServiceError> {
        let token = self.token()?;
        let status = self.status.refresh_status(&token).await;
        Ok(self.enter(status))
    }

    pub async fn verify(&mut self, code: &str) -> Result<Route, ServiceError> {
        let code = utils::validate_verification_code(code).map_err(ServiceError::InvalidInput)?;
        let token = self.token()?;

        self.auth.verify_email(&token, &code).await?;
        log::info!("Email verified");
        self.countdown.cancel();
        self.router.apply(GateEvent::Verified);
        self.resolve_status().await
    }

    pub async fn resend_code(&mut self) -> Result<ResendOutcome, ServiceError> {
        let current = self.countdown.state();
        if !current.can_resend() {
            return Err(ServiceError::InvalidInput(format!(
                "Please wait {} before requesting a new code",
                current.display()
            )));
        }

        let token = self.token()?;
        match self.auth.regenerate_verification_code(&token).await {
            Ok(()) => {
                log::info!("Verification code re-sent");
                Ok(ResendOutcome::Sent(self.countdown.on_resend_success()))
            }
            Err(e) => match e.retry_after_minutes() {
                Some(minutes) => {
                    log::info!("Verification code still valid for {} minutes", minutes);
                    Ok(ResendOutcome::StillValid {
                        message: e.to_string(),
                        countdown: self.countdown.on_resend_rejected(minutes),
                    })
                }
                None => Err(e.into()),
            },
        }
    }

    pub async fn submit_onboarding(&mut self, description: &str) -> Result<Route, ServiceError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ServiceError::InvalidInput("Description is required".to_string()));
        }
        let token = self.token()?;

        self.auth.create_desc(&token, description).await?;
        log::info!("Onboarding description saved");
        self.router.apply(GateEvent::DescriptionSaved);
        self.resolve_status().await
    }

    pub async fn logout(&mut self) {
        self.session.logout();
        self.status.clear().await;
        self.countdown.cancel();
        self.router.apply(GateEvent::LoggedOut);
        log::info!("Logged out");
    }

    pub async fn delete_account(&mut self) -> Result<(), ServiceError> {
        let token = self.token()?;
        self.auth.delete_account(&token).await?;
        log::info!("Account deleted");
        self.logout().await;
        Ok(())
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), ServiceError> {
        utils::validate_password(new).map_err(ServiceError::InvalidInput)?;
        let token = self.token()?;
        self.auth.change_password(&token, current, new).await?;
        Ok(())
    }

    pub async fn me(&self) -> Result<CurrentUser, ServiceError> {
        let token = self.token()?;
        Ok(self.auth.me(&token).await?)
    }

    pub async fn banks(&self, limit: Option<u32>) -> Result<Vec<Bank>, ServiceError> {
        Ok(self.content.banks(self.session.token(), limit).await?)
    }

    pub async fn articles(&self, limit: Option<u32>) -> Result<Vec<Article>, ServiceError> {
        Ok(self.content.articles(self.session.token(), limit).await?)
    }

    pub async fn article(&self, id: &str) -> Result<Article, ServiceError> {
        Ok(self.content.article(self.session.token(), id).await?)
    }

    /// Assistant features are only available once onboarding is done.
    pub async fn require_ready(&mut self) -> Result<String, ServiceError> {
        let route = self.current_route().await?;
        if route != Route::Ready {
            return Err(ServiceError::NotReady(route));
        }
        self.token()
    }

    pub async fn daily_summary(&mut self) -> Result<DailySummaryPayload, ServiceError> {
        let token = self.require_ready().await?;
        Ok(self.content.daily_summary(&token).await?)
    }

    pub async fn chat(&mut self, message: Option<&str>) -> Result<ChatReply, ServiceError> {
        let token = self.require_ready().await?;
        let message = message.map(str::trim).filter(|m| !m.is_empty());
        Ok(self.content.send_message(&token, message, self.language()).await?)
    }

    pub async fn update_description(
        &mut self,
        message: &str,
    ) -> Result<DescriptionUpdate, ServiceError> {
        let token = self.require_ready().await?;
        Ok(self.content.update_desc(&token, message).await?)
    }

    pub async fn preference_tags(&mut self) -> Result<PreferenceTags, ServiceError> {
        let token = self.require_ready().await?;
        Ok(self.content.preference_tags(&token).await?)
    }
}
