//! Shared snapshot state for pollers, the feed client, and the dashboard
//!
//! Each panel owns its collection independently, mirroring the view it
//! feeds; there is no merging between panels. All updates go through a
//! single apply entry point per panel, guarded by a liveness generation so
//! a fetch completing after its panel was deactivated is discarded instead
//! of mutating state.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

use crate::feed::FeedState;
use crate::models::{FeedFrame, Session, SosAlert};

/// What happened to an applied fetch result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Snapshot replaced verbatim
    Replaced,
    /// Fetch failed; previous snapshot kept
    Kept,
    /// Result belonged to a previous activation cycle and was discarded
    Stale,
}

/// One polled collection plus its display flags
#[derive(Debug, Clone)]
pub struct PanelState<T> {
    items: Vec<T>,
    loaded: bool,
    generation: u64,
    last_refresh_epoch_ms: Option<u64>,
}

impl<T> Default for PanelState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loaded: false,
            generation: 0,
            last_refresh_epoch_ms: None,
        }
    }
}

impl<T> PanelState<T> {
    /// The displayed snapshot: the most recent successful response, verbatim
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// True once the first fetch of the current cycle has completed,
    /// success or failure. The loading indicator shows only while false.
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn last_refresh_epoch_ms(&self) -> Option<u64> {
        self.last_refresh_epoch_ms
    }

    /// Begin a new activation cycle: the panel starts uninitialized and any
    /// fetch still in flight from an earlier cycle becomes stale.
    pub fn begin_cycle(&mut self) -> u64 {
        self.generation += 1;
        self.items.clear();
        self.loaded = false;
        self.last_refresh_epoch_ms = None;
        self.generation
    }

    /// End the current cycle. In-flight fetches are not aborted; bumping the
    /// generation makes their eventual results fall on the floor.
    pub fn end_cycle(&mut self) {
        self.generation += 1;
    }

    /// Apply one completed fetch. `Some` replaces the snapshot verbatim,
    /// `None` (a failed fetch) keeps the previous snapshot untouched.
    pub fn apply(&mut self, generation: u64, snapshot: Option<Vec<T>>, now_ms: u64) -> Applied {
        if generation != self.generation {
            return Applied::Stale;
        }
        self.loaded = true;
        match snapshot {
            Some(items) => {
                self.items = items;
                self.last_refresh_epoch_ms = Some(now_ms);
                Applied::Replaced
            }
            None => Applied::Kept,
        }
    }
}

/// The admin view: both collections refreshed together, with a blocking
/// error banner on failure instead of a silent stale display
#[derive(Debug, Clone, Default)]
pub struct AdminPanel {
    alerts: Vec<SosAlert>,
    sessions: Vec<Session>,
    loaded: bool,
    generation: u64,
    error: Option<String>,
}

impl AdminPanel {
    pub fn alerts(&self) -> &[SosAlert] {
        &self.alerts
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// The banner persists until the next successful refresh
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_cycle(&mut self) -> u64 {
        self.generation += 1;
        self.alerts.clear();
        self.sessions.clear();
        self.loaded = false;
        self.error = None;
        self.generation
    }

    pub fn end_cycle(&mut self) {
        self.generation += 1;
    }

    pub fn apply(
        &mut self,
        generation: u64,
        outcome: Result<(Vec<SosAlert>, Vec<Session>), String>,
    ) -> Applied {
        if generation != self.generation {
            return Applied::Stale;
        }
        self.loaded = true;
        match outcome {
            Ok((alerts, sessions)) => {
                self.alerts = alerts;
                self.sessions = sessions;
                self.error = None;
                Applied::Replaced
            }
            Err(message) => {
                self.error = Some(message);
                Applied::Kept
            }
        }
    }
}

/// The latest decoded feed frame. Each message fully replaces this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub jpeg: Vec<u8>,
    pub status: String,
    pub received_epoch_ms: u64,
}

/// Live feed display state: connection state plus a single frame slot
#[derive(Debug, Clone)]
pub struct FeedView {
    pub conn: FeedState,
    frame: Option<DecodedFrame>,
}

impl Default for FeedView {
    fn default() -> Self {
        Self {
            conn: FeedState::Connecting,
            frame: None,
        }
    }
}

impl FeedView {
    pub fn frame(&self) -> Option<&DecodedFrame> {
        self.frame.as_ref()
    }

    /// Apply one inbound feed message. Last write wins; there is no queue,
    /// so a burst of messages leaves only the final frame visible. Messages
    /// that fail to parse or decode are skipped, keeping the previous frame.
    pub fn apply_message(&mut self, text: &str, now_ms: u64) -> bool {
        let parsed: FeedFrame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("Skipping unparseable feed message: {}", e);
                return false;
            }
        };

        use base64::Engine as _;
        let jpeg = match base64::engine::general_purpose::STANDARD.decode(&parsed.frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Skipping feed frame with invalid base64: {}", e);
                return false;
            }
        };

        tracing::debug!("Detection status: {}", parsed.status);
        self.frame = Some(DecodedFrame {
            jpeg,
            status: parsed.status,
            received_epoch_ms: now_ms,
        });
        true
    }
}

/// Shared state accessible by pollers, the feed client, and the dashboard
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    pub alerts: PanelState<SosAlert>,
    pub sessions: PanelState<Session>,
    pub admin: AdminPanel,
    pub feed: FeedView,
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle() -> StateHandle {
    Arc::new(RwLock::new(SharedState::default()))
}

pub(crate) fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: &str) -> SosAlert {
        SosAlert {
            id: id.to_string(),
            driver_id: "D1".to_string(),
            taxi_id: "T1".to_string(),
            details: "drowsy".to_string(),
            status: "open".to_string(),
            created_time: "2024-01-01T00:00:00Z".to_string(),
            actioned_time: None,
        }
    }

    fn session(id: &str) -> Session {
        Session {
            id: id.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Jones".to_string(),
            taxi_number: "T1".to_string(),
            start_time: "2024-01-01T08:00:00Z".to_string(),
            end_time: None,
            status: "Active".to_string(),
        }
    }

    #[test]
    fn new_panel_is_unloaded_and_empty() {
        let panel: PanelState<SosAlert> = PanelState::default();
        assert!(!panel.loaded());
        assert!(panel.items().is_empty());
    }

    #[test]
    fn successful_apply_replaces_snapshot_verbatim() {
        let mut panel = PanelState::default();
        let generation = panel.begin_cycle();

        let applied = panel.apply(generation, Some(vec![alert("a1"), alert("a2")]), 1000);
        assert_eq!(applied, Applied::Replaced);
        assert!(panel.loaded());
        assert_eq!(panel.items().len(), 2);
        assert_eq!(panel.items()[0].id, "a1");

        // next snapshot fully replaces, no merging
        let applied = panel.apply(generation, Some(vec![alert("a3")]), 2000);
        assert_eq!(applied, Applied::Replaced);
        assert_eq!(panel.items().len(), 1);
        assert_eq!(panel.items()[0].id, "a3");
    }

    #[test]
    fn failed_apply_keeps_previous_snapshot() {
        let mut panel = PanelState::default();
        let generation = panel.begin_cycle();
        panel.apply(generation, Some(vec![alert("a1")]), 1000);

        let applied = panel.apply(generation, None, 2000);
        assert_eq!(applied, Applied::Kept);
        assert_eq!(panel.items().len(), 1);
        assert_eq!(panel.items()[0].id, "a1");
        assert_eq!(panel.last_refresh_epoch_ms(), Some(1000));
    }

    #[test]
    fn failed_initial_apply_leaves_panel_uninitialized_but_loaded() {
        let mut panel: PanelState<SosAlert> = PanelState::default();
        let generation = panel.begin_cycle();

        let applied = panel.apply(generation, None, 1000);
        assert_eq!(applied, Applied::Kept);
        assert!(panel.loaded());
        assert!(panel.items().is_empty());
    }

    #[test]
    fn stale_apply_is_discarded() {
        let mut panel = PanelState::default();
        let generation = panel.begin_cycle();
        panel.apply(generation, Some(vec![alert("a1")]), 1000);
        panel.end_cycle();

        let applied = panel.apply(generation, Some(vec![alert("a2")]), 2000);
        assert_eq!(applied, Applied::Stale);
        assert_eq!(panel.items()[0].id, "a1");
    }

    #[test]
    fn begin_cycle_resets_panel_and_invalidates_inflight() {
        let mut panel = PanelState::default();
        let old_generation = panel.begin_cycle();
        panel.apply(old_generation, Some(vec![alert("a1")]), 1000);

        let new_generation = panel.begin_cycle();
        assert!(!panel.loaded());
        assert!(panel.items().is_empty());

        // result from the previous cycle arrives late
        assert_eq!(
            panel.apply(old_generation, Some(vec![alert("a2")]), 2000),
            Applied::Stale
        );
        assert!(panel.items().is_empty());

        // the new cycle applies normally
        assert_eq!(
            panel.apply(new_generation, Some(vec![alert("a3")]), 3000),
            Applied::Replaced
        );
    }

    #[test]
    fn admin_failure_raises_banner_until_next_success() {
        let mut admin = AdminPanel::default();
        let generation = admin.begin_cycle();

        admin.apply(generation, Ok((vec![alert("a1")], vec![session("s1")])));
        assert!(admin.error().is_none());

        admin.apply(generation, Err("Failed to fetch data".to_string()));
        assert_eq!(admin.error(), Some("Failed to fetch data"));
        // stale display retained behind the banner
        assert_eq!(admin.alerts().len(), 1);
        assert_eq!(admin.sessions().len(), 1);

        // banner persists across further failures
        admin.apply(generation, Err("Failed to fetch data".to_string()));
        assert!(admin.error().is_some());

        // cleared by the next successful refresh
        admin.apply(generation, Ok((vec![], vec![])));
        assert!(admin.error().is_none());
        assert!(admin.alerts().is_empty());
    }

    #[test]
    fn admin_stale_apply_is_discarded() {
        let mut admin = AdminPanel::default();
        let generation = admin.begin_cycle();
        admin.end_cycle();

        let applied = admin.apply(generation, Err("late failure".to_string()));
        assert_eq!(applied, Applied::Stale);
        assert!(admin.error().is_none());
        assert!(!admin.loaded());
    }

    #[test]
    fn feed_apply_message_last_write_wins() {
        use base64::Engine as _;
        let mut feed = FeedView::default();

        let m1 = format!(
            r#"{{"frame": "{}", "status": "Active :)"}}"#,
            base64::engine::general_purpose::STANDARD.encode(b"frame-1")
        );
        let m2 = format!(
            r#"{{"frame": "{}", "status": "Drowsy !"}}"#,
            base64::engine::general_purpose::STANDARD.encode(b"frame-2")
        );

        assert!(feed.apply_message(&m1, 1000));
        assert!(feed.apply_message(&m2, 1001));

        let frame = feed.frame().unwrap();
        assert_eq!(frame.jpeg, b"frame-2");
        assert_eq!(frame.status, "Drowsy !");
    }

    #[test]
    fn feed_skips_unparseable_message_keeping_frame() {
        use base64::Engine as _;
        let mut feed = FeedView::default();
        let m1 = format!(
            r#"{{"frame": "{}", "status": "Active :)"}}"#,
            base64::engine::general_purpose::STANDARD.encode(b"frame-1")
        );
        assert!(feed.apply_message(&m1, 1000));

        assert!(!feed.apply_message("not json", 1001));
        assert!(!feed.apply_message(r#"{"frame": "%%%", "status": "x"}"#, 1002));

        let frame = feed.frame().unwrap();
        assert_eq!(frame.jpeg, b"frame-1");
        assert_eq!(frame.status, "Active :)");
    }

    #[test]
    fn feed_starts_connecting_with_no_frame() {
        let feed = FeedView::default();
        assert_eq!(feed.conn, FeedState::Connecting);
        assert!(feed.frame().is_none());
    }
}
