//! Mailbox session: the bound address, its history and the polling loop.
//!
//! Flow per poll:
//! 1. Fetch the inbox through the orchestrator
//! 2. Diff against the previous poll and replace history
//! 3. Extract codes from subject and body
//! 4. Hand the enriched set to the observer

pub mod history;

pub use history::MailboxHistory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::acquisition::Orchestrator;
use crate::error::ValidationError;
use crate::extract::{CodeExtractor, VerificationCode};
use crate::model::{Address, EnrichedMessage, Message, PollReport};

const SCAN_SENDER: &str = "Auto-detected";
const SCAN_SUBJECT: &str = "Verification Codes Found";

/// Shortest timer period; zero would spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Receives everything the session produces.
pub trait MailboxObserver: Send + Sync {
    /// A new address was bound; previous messages no longer apply.
    fn address_bound(&self, _address: &Address) {}

    /// A poll finished.
    fn messages_received(&self, _report: &PollReport) {}
}

struct State {
    address: Option<Address>,
    history: MailboxHistory,
}

struct Poller {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

struct Inner {
    orchestrator: Orchestrator,
    extractor: CodeExtractor,
    observer: Arc<dyn MailboxObserver>,
    poll_interval: Duration,
    state: Mutex<State>,
    poller: Mutex<Option<Poller>>,
    in_flight: AtomicBool,
}

/// A single user's view of one disposable mailbox at a time.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MailboxSession {
    inner: Arc<Inner>,
}

impl MailboxSession {
    pub fn new(
        orchestrator: Orchestrator,
        extractor: CodeExtractor,
        observer: Arc<dyn MailboxObserver>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                orchestrator,
                extractor,
                observer,
                poll_interval,
                state: Mutex::new(State {
                    address: None,
                    history: MailboxHistory::new(),
                }),
                poller: Mutex::new(None),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    pub async fn current_address(&self) -> Option<Address> {
        self.inner.state.lock().await.address.clone()
    }

    /// Messages stored for the bound address, oldest first.
    pub async fn history(&self) -> Vec<Message> {
        let state = self.inner.state.lock().await;
        match &state.address {
            Some(address) => state.history.messages(address).to_vec(),
            None => Vec::new(),
        }
    }

    pub async fn history_len(&self) -> usize {
        self.history().await.len()
    }

    /// Switch to `address`, dropping all history.
    pub async fn bind(&self, address: Address) {
        {
            let mut state = self.inner.state.lock().await;
            state.address = Some(address.clone());
            state.history.clear();
        }
        info!(address = %address, "Mailbox bound");
        self.inner.observer.address_bound(&address);
    }

    /// Acquire an address, bind it and start polling.
    pub async fn generate(&self, preferred_domain: Option<&str>) -> Address {
        let address = self
            .inner
            .orchestrator
            .acquire_address(preferred_domain)
            .await;
        self.bind(address.clone()).await;
        self.set_polling(true, self.inner.poll_interval).await;
        address
    }

    /// Open an existing mailbox typed in by the user.
    ///
    /// Input is validated before anything else happens; on success the
    /// address is bound, polled once, and polling starts.
    pub async fn access(&self, input: &str) -> Result<Address, ValidationError> {
        let address = Address::parse(input)?;
        self.bind(address.clone()).await;
        self.poll().await;
        self.set_polling(true, self.inner.poll_interval).await;
        Ok(address)
    }

    /// Flag a message of the bound address as read.
    pub async fn mark_read(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().await;
        let State { address, history } = &mut *state;
        match address {
            Some(address) => history.mark_read(address, id),
            None => false,
        }
    }

    /// Fetch, diff, extract and emit once.
    ///
    /// Returns `None` when nothing is bound, or when the address changed
    /// while the fetch was running; a late result is never applied to a
    /// different mailbox.
    pub async fn poll(&self) -> Option<PollReport> {
        let address = self.current_address().await?;
        let orchestrator = &self.inner.orchestrator;

        let fetched = orchestrator.fetch_messages(&address).await;
        let scanned = orchestrator
            .scan_codes(&address, &self.inner.extractor)
            .await;

        let merged = {
            let mut state = self.inner.state.lock().await;
            if state.address.as_ref() != Some(&address) {
                debug!(address = %address, "Mailbox changed during poll, discarding result");
                return None;
            }
            state.history.replace(&address, fetched)
        };

        let mut messages = Vec::with_capacity(merged.len() + 1);
        if !scanned.is_empty() {
            messages.push(scan_message(scanned));
        }
        messages.extend(merged.into_iter().map(|(message, is_new)| EnrichedMessage {
            codes: self.inner.extractor.extract(&message.searchable_text()),
            message,
            is_new,
            ephemeral: false,
        }));

        let report = PollReport { address, messages };
        info!(
            address = %report.address,
            total = report.messages.len(),
            new = report.new_count(),
            "Poll complete"
        );
        self.inner.observer.messages_received(&report);
        Some(report)
    }

    /// Start or stop periodic polling.
    ///
    /// Starting replaces any running timer. Stopping only prevents future
    /// polls; a poll already running finishes and its result is applied.
    /// Intervals below [`MIN_POLL_INTERVAL`] are raised to it.
    pub async fn set_polling(&self, enabled: bool, interval: Duration) {
        let mut slot = self.inner.poller.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop.store(true, Ordering::Relaxed);
            debug!("Polling stopped");
        }
        if !enabled {
            return;
        }

        let interval = if interval < MIN_POLL_INTERVAL {
            warn!(requested = ?interval, "Poll interval too short, using minimum");
            MIN_POLL_INTERVAL
        } else {
            interval
        };
        let stop = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(poll_loop(
            Arc::downgrade(&self.inner),
            Arc::clone(&stop),
            interval,
        ));
        info!(interval_secs = interval.as_secs_f64(), "Polling started");
        *slot = Some(Poller { handle, stop });
    }

    pub async fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .await
            .as_ref()
            .is_some_and(|p| !p.handle.is_finished())
    }
}

/// Timer loop. Holds only a weak reference so a dropped session ends it.
async fn poll_loop(inner: Weak<Inner>, stop: Arc<AtomicBool>, interval: Duration) {
    let mut tick = tokio::time::interval_at(Instant::now() + interval, interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tick.tick().await;

        if stop.load(Ordering::Relaxed) {
            return;
        }
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let session = MailboxSession { inner };

        if session.inner.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Previous poll still running, skipping tick");
            continue;
        }
        session.poll().await;
        session.inner.in_flight.store(false, Ordering::Release);
    }
}

/// Ephemeral message carrying codes found by scanning inbox pages.
fn scan_message(codes: Vec<VerificationCode>) -> EnrichedMessage {
    let now = Utc::now();
    let listed = codes
        .iter()
        .map(VerificationCode::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    EnrichedMessage {
        message: Message {
            id: format!("harakiri_codes_{}", now.timestamp_millis()),
            sender: SCAN_SENDER.to_string(),
            subject: SCAN_SUBJECT.to_string(),
            body: format!("Codes detected: {listed}"),
            received_at: now,
            read: false,
        },
        codes,
        is_new: true,
        ephemeral: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MailConfig;
    use crate::http::testing::StubHttp;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        bound: StdMutex<Vec<Address>>,
        reports: StdMutex<Vec<PollReport>>,
    }

    impl MailboxObserver for Recorder {
        fn address_bound(&self, address: &Address) {
            self.bound.lock().unwrap().push(address.clone());
        }

        fn messages_received(&self, report: &PollReport) {
            self.reports.lock().unwrap().push(report.clone());
        }
    }

    const MAILCX_INBOX: &str = r#"{"messages":[
        {"id":1,"from":"noreply@shop.example","subject":"Your code: 4821","body":"Enter it soon","date":"2024-05-01T10:00:00Z"},
        {"id":2,"from":"news@shop.example","subject":"Weekly deals","text":"Nothing to see","date":"2024-05-01T09:00:00Z"}
    ]}"#;

    fn session(http: StubHttp) -> (MailboxSession, Arc<Recorder>) {
        let orchestrator = Orchestrator::from_config(Arc::new(http), &MailConfig::default()).unwrap();
        let recorder = Arc::new(Recorder::default());
        let session = MailboxSession::new(
            orchestrator,
            CodeExtractor::default_rules(),
            recorder.clone(),
            Duration::from_secs(3600),
        );
        (session, recorder)
    }

    #[tokio::test]
    async fn unbound_poll_does_nothing() {
        let (session, recorder) = session(StubHttp::new());
        assert!(session.poll().await.is_none());
        assert!(recorder.reports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn poll_enriches_and_orders() {
        let (session, recorder) = session(StubHttp::new().route("/mailbox/abc/messages", 200, MAILCX_INBOX));
        session.bind(Address::parse("abc@mail.cx").unwrap()).await;

        let report = session.poll().await.unwrap();
        assert_eq!(report.messages.len(), 2);
        assert_eq!(report.new_count(), 2);
        // Oldest first.
        assert_eq!(report.messages[0].message.id, "mailcx_2");
        assert!(report.messages[0].codes.is_empty());
        let codes: Vec<&str> = report.messages[1].codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["4821"]);
        assert_eq!(recorder.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_identical_poll_has_nothing_new() {
        let (session, _) = session(StubHttp::new().route("/mailbox/abc/messages", 200, MAILCX_INBOX));
        session.bind(Address::parse("abc@mail.cx").unwrap()).await;

        session.poll().await.unwrap();
        let second = session.poll().await.unwrap();
        assert_eq!(second.new_count(), 0);
        assert_eq!(session.history_len().await, 2);
    }

    #[tokio::test]
    async fn rebinding_hides_old_history() {
        let other_inbox = r#"{"messages":[
            {"id":2,"from":"news@shop.example","subject":"Weekly deals","date":"2024-05-01T09:00:00Z"},
            {"id":3,"from":"hello@other.example","subject":"Hi","date":"2024-05-01T11:00:00Z"}
        ]}"#;
        let (session, recorder) = session(
            StubHttp::new()
                .route("/mailbox/abc/messages", 200, MAILCX_INBOX)
                .route("/mailbox/other/messages", 200, other_inbox),
        );
        session.bind(Address::parse("abc@mail.cx").unwrap()).await;
        session.poll().await.unwrap();

        session.bind(Address::parse("other@mail.cx").unwrap()).await;
        assert_eq!(session.history_len().await, 0);
        assert_eq!(recorder.bound.lock().unwrap().len(), 2);

        // mailcx_2 was seen on the old address but is new here.
        let report = session.poll().await.unwrap();
        let ids: Vec<&str> = report.messages.iter().map(|m| m.message.id.as_str()).collect();
        assert_eq!(ids, vec!["mailcx_2", "mailcx_3"]);
        assert!(report.messages.iter().all(|m| m.is_new));
        assert_eq!(report.address.to_string(), "other@mail.cx");
    }

    #[tokio::test]
    async fn zero_interval_keeps_timer_alive() {
        let (session, _) = session(StubHttp::new());
        session.bind(Address::parse("abc@mail.cx").unwrap()).await;
        session.set_polling(true, Duration::ZERO).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.is_polling().await);
        session.set_polling(false, Duration::ZERO).await;
    }

    #[tokio::test]
    async fn read_flags_survive_polls() {
        let (session, _) = session(StubHttp::new().route("/mailbox/abc/messages", 200, MAILCX_INBOX));
        session.bind(Address::parse("abc@mail.cx").unwrap()).await;
        session.poll().await.unwrap();

        assert!(session.mark_read("mailcx_1").await);
        let report = session.poll().await.unwrap();
        let read = report
            .messages
            .iter()
            .find(|m| m.message.id == "mailcx_1")
            .unwrap();
        assert!(read.message.read);
    }

    #[tokio::test]
    async fn access_rejects_bad_input_without_binding() {
        let (session, recorder) = session(StubHttp::new());
        let err = session.access("not an address").await.unwrap_err();
        assert!(matches!(err, ValidationError::InvalidAddress(_)));
        assert!(session.current_address().await.is_none());
        assert!(recorder.bound.lock().unwrap().is_empty());
        assert!(!session.is_polling().await);
    }

    #[tokio::test]
    async fn access_binds_polls_and_starts_timer() {
        let (session, recorder) = session(StubHttp::new().route("/mailbox/abc/messages", 200, MAILCX_INBOX));
        let address = session.access(" abc@mail.cx ").await.unwrap();
        assert_eq!(address.to_string(), "abc@mail.cx");
        assert_eq!(recorder.reports.lock().unwrap().len(), 1);
        assert!(session.is_polling().await);

        session.set_polling(false, Duration::from_secs(1)).await;
        session.set_polling(false, Duration::from_secs(1)).await;
        assert!(!session.is_polling().await);
    }

    #[tokio::test]
    async fn scraper_codes_arrive_as_ephemeral_message() {
        let page = "<p>Your verification code: 662211</p>";
        let (session, _) = session(StubHttp::new().route("harakirimail.com", 200, page));
        session.bind(Address::parse("zz11yy22@harakirimail.com").unwrap()).await;

        let report = session.poll().await.unwrap();
        assert_eq!(report.messages.len(), 1);
        let scan = &report.messages[0];
        assert!(scan.ephemeral);
        assert_eq!(scan.message.sender, SCAN_SENDER);
        assert_eq!(scan.message.body, "Codes detected: 662211");
        assert!(scan.message.id.starts_with("harakiri_codes_"));
        assert_eq!(session.history_len().await, 0);
    }
}
