use serde_json::json;

use super::api::{decode, ApiClient, ApiError};
use crate::models::session::{AuthData, CurrentUser};
use crate::models::status::{StatusPayload, UserStatus};

/// `/api/auth/*` endpoints.
#[derive(Clone, Debug)]
pub struct AuthApi {
    api: ApiClient,
}

impl AuthApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthData, ApiError> {
        let payload = json!({
            "username": username,
            "email": email,
            "password": password
        });

        let envelope = self
            .api
            .post("/api/auth/register", None, &payload)
            .await?
            .into_success()?;
        decode(&envelope, "register")
    }

    /// `username` may also be the account's email address.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthData, ApiError> {
        let payload = json!({
            "username": username,
            "password": password
        });

        let envelope = self
            .api
            .post("/api/auth/login", None, &payload)
            .await?
            .into_success()?;
        decode(&envelope, "login")
    }

    pub async fn verify_email(&self, token: &str, code: &str) -> Result<(), ApiError> {
        self.api
            .post("/api/auth/verify_email", Some(token), &json!({ "code": code }))
            .await?
            .into_success()?;
        Ok(())
    }

    pub async fn regenerate_verification_code(&self, token: &str) -> Result<(), ApiError> {
        self.api
            .post("/api/auth/regenerate_verification_code", Some(token), &json!({}))
            .await?
            .into_success()?;
        Ok(())
    }

    /// The server reports `success: false` whenever a requirement is missing,
    /// so the payload is read regardless of the flag.
    pub async fn check_status(&self, token: &str) -> Result<UserStatus, ApiError> {
        let response = self.api.get("/api/auth/check_status", Some(token), &[]).await?;
        if response.envelope.data.is_none() {
            return Err(response.into_success().err().unwrap_or_else(|| {
                ApiError::Decode("check_status: missing data".to_string())
            }));
        }

        let payload: StatusPayload = decode(&response.envelope, "check_status")?;
        Ok(payload.into())
    }

    pub async fn me(&self, token: &str) -> Result<CurrentUser, ApiError> {
        let envelope = self
            .api
            .get("/api/auth/me", Some(token), &[])
            .await?
            .into_success()?;
        decode(&envelope, "me")
    }

    pub async fn create_desc(&self, token: &str, desc: &str) -> Result<(), ApiError> {
        self.api
            .post("/api/auth/create_desc", Some(token), &json!({ "desc": desc }))
            .await?
            .into_success()?;
        Ok(())
    }

    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let payload = json!({
            "current_password": current_password,
            "new_password": new_password
        });

        self.api
            .post("/api/auth/change_password", Some(token), &payload)
            .await?
            .into_success()?;
        Ok(())
    }

    pub async fn delete_account(&self, token: &str) -> Result<(), ApiError> {
        self.api
            .delete("/api/auth/delete_account", Some(token))
            .await?
            .into_success()?;
        Ok(())
    }
}
