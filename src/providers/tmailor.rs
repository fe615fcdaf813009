//! TMailor: REST API with a real creation endpoint.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::http::{HttpClient, HttpRequest};
use crate::model::{Address, Message};
use crate::providers::api::{CreatedMailbox, MessageList};

pub const NAME: &str = "tmailor";
pub const DOMAIN: &str = "tmailor.com";
pub const DOMAIN_MATCHERS: &[&str] = &["tmailor.com"];

const BASE_URL: &str = "https://tmailor.com";

pub struct TMailor {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl TMailor {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self::with_base_url(http, BASE_URL)
    }

    pub fn with_base_url(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn create_address(&self) -> Result<Address, ProviderError> {
        let request =
            HttpRequest::post(format!("{}/api/v1/email/new", self.base_url)).json_body(None);
        let created: CreatedMailbox = self
            .http
            .send(request)
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        created.into_address(NAME)
    }

    pub async fn list_messages(&self, address: &Address) -> Result<Vec<Message>, ProviderError> {
        let url = format!("{}/api/v1/email/{}/messages", self.base_url, address);
        let list: MessageList = self
            .http
            .send(HttpRequest::get(url))
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        Ok(list.into_messages(NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::http::testing::StubHttp;

    #[tokio::test]
    async fn creates_issued_address() {
        let http = Arc::new(StubHttp::new().route("/api/v1/email/new", 200, r#"{"email":"zed42@tmailor.com"}"#));
        let provider = TMailor::new(http.clone());

        let address = provider.create_address().await.unwrap();
        assert_eq!(address.to_string(), "zed42@tmailor.com");

        let requests = http.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, "https://tmailor.com/api/v1/email/new");
    }

    #[tokio::test]
    async fn rejected_creation_is_status_error() {
        let http = Arc::new(StubHttp::new().route("/api/v1/email/new", 429, "slow down"));
        let err = TMailor::new(http).create_address().await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn lists_by_full_address() {
        let http = Arc::new(StubHttp::new().route(
            "/messages",
            200,
            r#"{"messages":[{"id":"m1","from":"bot@x.io","subject":"Code","body":"Your code: 4821","date":"2024-03-01T08:00:00Z"}]}"#,
        ));
        let provider = TMailor::new(http.clone());
        let address = Address::parse("zed42@tmailor.com").unwrap();

        let messages = provider.list_messages(&address).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "tmailor_m1");
        assert_eq!(messages[0].body, "Your code: 4821");
        assert!(!messages[0].read);
        assert_eq!(
            http.urls(),
            vec!["https://tmailor.com/api/v1/email/zed42@tmailor.com/messages".to_string()]
        );
    }
}
