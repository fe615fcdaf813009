//! dispo-mail: disposable mailboxes with verification-code extraction.

pub mod acquisition;
pub mod config;
pub mod display;
pub mod error;
pub mod extract;
pub mod http;
pub mod model;
pub mod providers;
pub mod session;

pub use acquisition::Orchestrator;
pub use config::MailConfig;
pub use error::{Error, Result};
pub use extract::{CodeExtractor, VerificationCode, extract_codes};
pub use model::{Address, EnrichedMessage, Message, PollReport};
pub use session::{MailboxObserver, MailboxSession};
