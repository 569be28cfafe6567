use serde_json::json;

use super::api::{decode, decode_list, ApiClient, ApiError};
use crate::models::content::{
    Article, Bank, ChatReply, DailySummaryPayload, DescriptionUpdate, PreferenceTags,
};
use crate::models::language::Language;

/// Bank, article, summary and assistant endpoints. List payloads are
/// normalized here so callers always get plain vectors.
#[derive(Clone, Debug)]
pub struct ContentApi {
    api: ApiClient,
}

/// Articles are addressed by their 24 hex digit document id.
fn is_object_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

fn limit_query(limit: Option<u32>) -> Vec<(&'static str, String)> {
    limit
        .map(|l| vec![("limit", l.to_string())])
        .unwrap_or_default()
}

impl ContentApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn banks(
        &self,
        token: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Bank>, ApiError> {
        let envelope = self
            .api
            .get("/api/banks", token, &limit_query(limit))
            .await?
            .into_success()?;
        decode_list(&envelope, "banks")
    }

    pub async fn articles(
        &self,
        token: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Article>, ApiError> {
        let envelope = self
            .api
            .get("/api/articles", token, &limit_query(limit))
            .await?
            .into_success()?;
        decode_list(&envelope, "articles")
    }

    pub async fn article(&self, token: Option<&str>, id: &str) -> Result<Article, ApiError> {
        if !is_object_id(id) {
            return Err(ApiError::InvalidRequest(format!("Invalid article id: {}", id)));
        }
        let envelope = self
            .api
            .get(&format!("/api/articles/{}", id), token, &[])
            .await?
            .into_success()?;
        decode(&envelope, "article")
    }

    pub async fn daily_summary(&self, token: &str) -> Result<DailySummaryPayload, ApiError> {
        let envelope = self
            .api
            .get("/api/daily-summary", Some(token), &[])
            .await?
            .into_success()?;
        decode(&envelope, "daily_summary")
    }

    /// Without a message the server answers with an introduction (first
    /// contact) or a daily intro.
    pub async fn send_message(
        &self,
        token: &str,
        message: Option<&str>,
        language: Language,
    ) -> Result<ChatReply, ApiError> {
        let payload = json!({
            "message": message.unwrap_or_default(),
            "language": language.code()
        });

        let envelope = self
            .api
            .post("/api/message", Some(token), &payload)
            .await?
            .into_success()?;
        decode(&envelope, "message")
    }

    pub async fn update_desc(
        &self,
        token: &str,
        message: &str,
    ) -> Result<DescriptionUpdate, ApiError> {
        let envelope = self
            .api
            .post("/api/update_desc", Some(token), &json!({ "message": message }))
            .await?
            .into_success()?;

        let new_desc = envelope
            .data
            .as_ref()
            .and_then(|d| d["new_desc"].as_str())
            .ok_or_else(|| ApiError::Decode("update_desc: missing new_desc".to_string()))?
            .to_string();

        Ok(DescriptionUpdate {
            new_desc,
            desc_updated: envelope.extra_bool("desc_updated").unwrap_or(false),
            reply: envelope.message.clone(),
        })
    }

    pub async fn preference_tags(&self, token: &str) -> Result<PreferenceTags, ApiError> {
        let envelope = self
            .api
            .get("/api/auth/preference_tags", Some(token), &[])
            .await?
            .into_success()?;
        decode(&envelope, "preference_tags")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn content_api(url: String) -> ContentApi {
        ContentApi::new(ApiClient::new(&url, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn banks_are_unwrapped_from_nested_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/banks")
            .match_query(Matcher::UrlEncoded("limit".into(), "2".into()))
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "data": {
                        "banks": [
                            {"_id": "b1", "name": "Bank Jago", "savings_rate": "2.5%"},
                            {"_id": "b2", "name": "Bank Mega"}
                        ],
                        "count": 2,
                        "limit": 2
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let banks = content_api(server.url()).banks(None, Some(2)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(banks.len(), 2);
        assert_eq!(banks[0].name, "Bank Jago");
        assert_eq!(banks[0].details["savings_rate"], "2.5%");
    }

    #[tokio::test]
    async fn missing_article_surfaces_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/articles/64b7f0c2a1e4d5f6a7b8c9d0")
            .with_status(404)
            .with_body(r#"{"success": false, "error": "Article not found"}"#)
            .create_async()
            .await;

        let err = content_api(server.url())
            .article(None, "64b7f0c2a1e4d5f6a7b8c9d0")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Article not found");
    }

    #[tokio::test]
    async fn malformed_article_id_is_not_sent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let api = content_api(server.url());
        for id in ["../auth/me", "64b7f0c2a1e4d5f6a7b8c9d0?x=1", "abc"] {
            let err = api.article(None, id).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidRequest(_)));
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn message_sends_language() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/message")
            .match_body(Matcher::Json(json!({"message": "", "language": "id"})))
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "data": {
                        "message": "Halo!",
                        "type": "introduction",
                        "timestamp": "2025-01-01T00:00:00"
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let reply = content_api(server.url())
            .send_message("t1", None, Language::Id)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply.kind, "introduction");
    }

    #[tokio::test]
    async fn update_desc_reads_top_level_flag() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/update_desc")
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "message": "Preferences updated",
                    "type": "desc_updated",
                    "desc_updated": true,
                    "data": {"new_desc": "likes bonds", "daily_summary_reset": true}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let update = content_api(server.url())
            .update_desc("t1", "I like bonds now")
            .await
            .unwrap();

        assert!(update.desc_updated);
        assert_eq!(update.new_desc, "likes bonds");
        assert_eq!(update.reply.as_deref(), Some("Preferences updated"));
    }
}
