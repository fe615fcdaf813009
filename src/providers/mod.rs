//! Mailbox provider adapters.
//!
//! Every provider is a variant of the closed [`Provider`] enum. Each variant
//! knows how to create an address and list messages for one service, and
//! normalizes whatever that service returns into [`Message`].
//!
//! The `try_*` methods report failures as [`ProviderError`]. The plain
//! methods fold those failures into the soft outcomes callers rely on:
//! a synthetic address for creation, an empty list for listing.

pub mod api;
pub mod guerrilla;
pub mod harakiri;
pub mod mailcx;
pub mod markup;
pub mod tempmail_io;
pub mod tmailor;

pub use guerrilla::GuerrillaMail;
pub use harakiri::HarakiriMail;
pub use mailcx::MailCx;
pub use tempmail_io::TempMailIo;
pub use tmailor::TMailor;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::http::{HttpClient, RelayEndpoint};
use crate::model::{Address, Message};

/// A registered mailbox provider.
pub enum Provider {
    Harakiri(HarakiriMail),
    TMailor(TMailor),
    MailCx(MailCx),
    TempMailIo(TempMailIo),
    Guerrilla(GuerrillaMail),
}

impl Provider {
    /// All built-in providers in creation priority order.
    pub fn defaults(http: Arc<dyn HttpClient>, relays: Vec<RelayEndpoint>) -> Vec<Provider> {
        vec![
            Provider::Harakiri(HarakiriMail::new(Arc::clone(&http), relays)),
            Provider::TMailor(TMailor::new(Arc::clone(&http))),
            Provider::MailCx(MailCx::new(Arc::clone(&http))),
            Provider::TempMailIo(TempMailIo::new(Arc::clone(&http))),
            Provider::Guerrilla(GuerrillaMail::new(http)),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::Harakiri(_) => harakiri::NAME,
            Provider::TMailor(_) => tmailor::NAME,
            Provider::MailCx(_) => mailcx::NAME,
            Provider::TempMailIo(_) => tempmail_io::NAME,
            Provider::Guerrilla(_) => guerrilla::NAME,
        }
    }

    /// The domain synthetic addresses for this provider are built on.
    pub fn domain(&self) -> &'static str {
        match self {
            Provider::Harakiri(_) => harakiri::DOMAIN,
            Provider::TMailor(_) => tmailor::DOMAIN,
            Provider::MailCx(_) => mailcx::DOMAIN,
            Provider::TempMailIo(_) => tempmail_io::DOMAIN,
            Provider::Guerrilla(_) => guerrilla::DOMAIN,
        }
    }

    fn domain_matchers(&self) -> &'static [&'static str] {
        match self {
            Provider::Harakiri(_) => harakiri::DOMAIN_MATCHERS,
            Provider::TMailor(_) => tmailor::DOMAIN_MATCHERS,
            Provider::MailCx(_) => mailcx::DOMAIN_MATCHERS,
            Provider::TempMailIo(_) => tempmail_io::DOMAIN_MATCHERS,
            Provider::Guerrilla(_) => guerrilla::DOMAIN_MATCHERS,
        }
    }

    /// Whether mailboxes on `domain` live at this provider.
    pub fn matches_domain(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        self.domain_matchers().iter().any(|m| domain.contains(m))
    }

    /// The scraping adapter, if this provider is one.
    pub fn as_scraper(&self) -> Option<&HarakiriMail> {
        match self {
            Provider::Harakiri(h) => Some(h),
            _ => None,
        }
    }

    /// Ask the provider for a fresh address.
    pub async fn try_create_address(&self) -> Result<Address, ProviderError> {
        match self {
            Provider::Harakiri(p) => p.create_address(),
            Provider::TMailor(p) => p.create_address().await,
            Provider::MailCx(p) => p.create_address().await,
            Provider::TempMailIo(p) => p.create_address().await,
            Provider::Guerrilla(p) => p.create_address().await,
        }
    }

    /// Like [`Self::try_create_address`], degrading to a synthetic address.
    pub async fn create_address(&self) -> Address {
        match self.try_create_address().await {
            Ok(address) => address,
            Err(e) => {
                warn!(provider = self.name(), error = %e, "Address creation failed, using synthetic address");
                self.synthetic_address()
            }
        }
    }

    /// A random address on this provider's domain.
    pub fn synthetic_address(&self) -> Address {
        Address::synthetic(self.domain())
    }

    /// Fetch the current inbox for `address`.
    ///
    /// Ids are unique in the returned list; later duplicates are dropped.
    pub async fn try_list_messages(&self, address: &Address) -> Result<Vec<Message>, ProviderError> {
        let messages = match self {
            Provider::Harakiri(p) => p.list_messages(address).await?,
            Provider::TMailor(p) => p.list_messages(address).await?,
            Provider::MailCx(p) => p.list_messages(address).await?,
            Provider::TempMailIo(p) => p.list_messages(address).await?,
            Provider::Guerrilla(p) => p.list_messages(address).await?,
        };
        Ok(dedupe_by_id(messages))
    }

    /// Like [`Self::try_list_messages`], degrading to an empty inbox.
    pub async fn list_messages(&self, address: &Address) -> Vec<Message> {
        match self.try_list_messages(address).await {
            Ok(messages) => {
                debug!(provider = self.name(), address = %address, count = messages.len(), "Listed messages");
                messages
            }
            Err(e) => {
                warn!(provider = self.name(), address = %address, error = %e, "Listing failed, treating inbox as empty");
                Vec::new()
            }
        }
    }
}

fn dedupe_by_id(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}
