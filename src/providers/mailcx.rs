//! Mail.cx: mailboxes are addressed by local part only.

use std::sync::Arc;

use crate::error::ProviderError;
use crate::http::{HttpClient, HttpRequest};
use crate::model::{Address, Message};
use crate::providers::api::{CreatedMailbox, MessageList};

pub const NAME: &str = "mailcx";
pub const DOMAIN: &str = "mail.cx";
pub const DOMAIN_MATCHERS: &[&str] = &["mail.cx"];

const BASE_URL: &str = "https://api.mail.cx";

pub struct MailCx {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl MailCx {
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
            HttpRequest::post(format!("{}/api/v1/mailbox/create", self.base_url)).json_body(None);
        let created: CreatedMailbox = self
            .http
            .send(request)
            .await?
            .error_for_status(NAME)?
            .json(NAME)?;
        created.into_address(NAME)
    }

    pub async fn list_messages(&self, address: &Address) -> Result<Vec<Message>, ProviderError> {
        let url = format!(
            "{}/api/v1/mailbox/{}/messages",
            self.base_url,
            address.local_part()
        );
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
    use crate::http::testing::StubHttp;

    #[tokio::test]
    async fn lists_by_local_part() {
        let http = Arc::new(StubHttp::new().route(
            "/api/v1/mailbox/",
            200,
            r#"{"messages":[{"id":5,"from":"a@b.co","subject":"Hi","text":"plain","created_at":1700000000}]}"#,
        ));
        let provider = MailCx::with_base_url(http.clone(), "http://local");
        let address = Address::parse("qwerty12@mail.cx").unwrap();

        let messages = provider.list_messages(&address).await.unwrap();
        assert_eq!(messages[0].id, "mailcx_5");
        assert_eq!(messages[0].body, "plain");
        assert_eq!(messages[0].received_at.timestamp(), 1_700_000_000);
        assert_eq!(
            http.urls(),
            vec!["http://local/api/v1/mailbox/qwerty12/messages".to_string()]
        );
    }

    #[tokio::test]
    async fn html_reply_is_malformed() {
        let http = Arc::new(StubHttp::new().route("/create", 200, "<html>maintenance</html>"));
        let err = MailCx::new(http).create_address().await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
    }
}
