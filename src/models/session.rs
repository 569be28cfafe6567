use serde::{Deserialize, Serialize};

/// Identity and bearer token of the signed-in user. This is the record that
/// gets persisted under the `session` storage key.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
}

/// `data` payload of a successful register or login call.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthData {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub desc: Option<String>,
}

impl From<AuthData> for Session {
    fn from(data: AuthData) -> Self {
        Self {
            user_id: data.user_id,
            username: data.username,
            email: data.email,
            token: data.token,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CurrentUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub verification_attempts: u32,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}
