//! The delay session: `idle -> delaying -> free -> idle`.
//!
//! [`SessionState`] is the plain state machine. [`Session`] drives it: it
//! records the urge and runs the countdown as tasks tied to the session, and
//! publishes every change on a watch channel for the UI to render.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

use still_types::api::{DelayUrgeRequest, UpdateUrgeStatusRequest};
use still_types::models::{Urge, UrgeStatus};

use crate::api::ApiClient;
use crate::countdown::{Countdown, DEFAULT_DELAY_SECS};
use crate::error::ClientError;

/// Type recorded for urges started from the delay button.
pub const URGE_TYPE: &str = "urge";

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Delaying,
    Free,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Delaying => "delaying",
            Self::Free => "free",
        }
    }
}

/// What the user reports once the countdown is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Peaceful,
    StillPresent,
    TookOver,
}

impl Outcome {
    pub fn status(self) -> UrgeStatus {
        match self {
            Self::Peaceful => UrgeStatus::Peaceful,
            Self::StillPresent => UrgeStatus::Present,
            Self::TookOver => UrgeStatus::Overcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    phase: Phase,
    urge_id: Option<i64>,
    countdown: Countdown,
    // Bumped on every delay so late results from an earlier cycle are dropped.
    cycle: u64,
}

impl SessionState {
    pub fn new(delay_secs: u64) -> Self {
        Self {
            phase: Phase::Idle,
            urge_id: None,
            countdown: Countdown::new(delay_secs),
            cycle: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn urge_id(&self) -> Option<i64> {
        self.urge_id
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn countdown_text(&self) -> String {
        self.countdown.text()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// idle -> delaying. Returns the new cycle number.
    pub fn begin_delay(&mut self) -> Result<u64, ClientError> {
        if self.phase != Phase::Idle {
            return Err(self.invalid("start a delay"));
        }
        self.phase = Phase::Delaying;
        self.urge_id = None;
        self.countdown.reset();
        self.cycle += 1;
        Ok(self.cycle)
    }

    /// The backend accepted the urge for `cycle`.
    pub fn urge_created(&mut self, cycle: u64, urge_id: i64) -> bool {
        if cycle != self.cycle || self.phase == Phase::Idle {
            return false;
        }
        self.urge_id = Some(urge_id);
        true
    }

    /// One second of the `cycle` countdown; delaying -> free at zero.
    pub fn tick(&mut self, cycle: u64) -> bool {
        if cycle != self.cycle || self.phase != Phase::Delaying {
            return false;
        }
        if self.countdown.tick() {
            self.phase = Phase::Free;
        }
        true
    }

    /// free -> idle. Returns the urge whose status should be reported.
    pub fn choose(&mut self) -> Result<i64, ClientError> {
        if self.phase != Phase::Free {
            return Err(self.invalid("choose an outcome"));
        }
        let urge_id = self.urge_id.ok_or(ClientError::InvalidTransition {
            action: "choose an outcome",
            phase: "the urge is still being recorded",
        })?;
        self.reset();
        Ok(urge_id)
    }

    /// Drop `cycle` and return to idle, if it is still the current one.
    pub fn abandon(&mut self, cycle: u64) -> bool {
        if cycle != self.cycle || self.phase == Phase::Idle {
            return false;
        }
        self.reset();
        true
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.urge_id = None;
        self.countdown.reset();
    }

    fn invalid(&self, action: &'static str) -> ClientError {
        ClientError::InvalidTransition {
            action,
            phase: self.phase.as_str(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY_SECS)
    }
}

/// Backend calls a session makes.
pub trait UrgeBackend: Send + Sync + 'static {
    fn record_urge(&self, user_id: Uuid) -> impl Future<Output = Result<Urge, ClientError>> + Send;

    fn report_outcome(
        &self,
        urge_id: i64,
        user_id: Uuid,
        status: UrgeStatus,
    ) -> impl Future<Output = Result<Urge, ClientError>> + Send;
}

impl UrgeBackend for ApiClient {
    async fn record_urge(&self, user_id: Uuid) -> Result<Urge, ClientError> {
        let req = DelayUrgeRequest {
            urge_type: URGE_TYPE.to_string(),
            user_id: Some(user_id),
            status: None,
        };
        self.delay_urge(&req).await
    }

    async fn report_outcome(
        &self,
        urge_id: i64,
        user_id: Uuid,
        status: UrgeStatus,
    ) -> Result<Urge, ClientError> {
        let req = UpdateUrgeStatusRequest {
            id: urge_id,
            status,
            user_id: Some(user_id),
        };
        self.update_urge_status(&req).await
    }
}

/// A running session for one user. Dropping it cancels its tasks.
pub struct Session<B: UrgeBackend> {
    backend: Arc<B>,
    user_id: Uuid,
    state: Arc<watch::Sender<SessionState>>,
    tick: Duration,
    shutdown: CancellationToken,
    current_cycle: Mutex<CancellationToken>,
    tracker: TaskTracker,
}

impl<B: UrgeBackend> Session<B> {
    pub fn new(backend: Arc<B>, user_id: Uuid) -> Self {
        Self::with_delay(backend, user_id, DEFAULT_DELAY_SECS)
    }

    pub fn with_delay(backend: Arc<B>, user_id: Uuid, delay_secs: u64) -> Self {
        let (state, _) = watch::channel(SessionState::new(delay_secs));
        let shutdown = CancellationToken::new();
        Self {
            backend,
            user_id,
            state: Arc::new(state),
            tick: TICK,
            current_cycle: Mutex::new(shutdown.child_token()),
            shutdown,
            tracker: TaskTracker::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// idle -> delaying: record the urge and start the countdown.
    ///
    /// If the urge cannot be recorded the session falls back to idle and the
    /// countdown is stopped. A closed session refuses to start.
    pub fn start_delay(&self) -> Result<(), ClientError> {
        if self.shutdown.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        let mut started = Err(ClientError::Cancelled);
        self.state.send_if_modified(|s| {
            started = s.begin_delay();
            started.is_ok()
        });
        let cycle = started?;

        let token = self.shutdown.child_token();
        *self
            .current_cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token.clone();
        info!("Delay {} started", cycle);

        let backend = self.backend.clone();
        let state = self.state.clone();
        let user_id = self.user_id;
        let record_token = token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = record_token.cancelled() => {}
                result = backend.record_urge(user_id) => match result {
                    Ok(urge) => {
                        debug!("Delay {} recorded as urge {}", cycle, urge.id);
                        state.send_if_modified(|s| s.urge_created(cycle, urge.id));
                    }
                    Err(e) => {
                        warn!("Could not record urge, abandoning delay {}: {}", cycle, e);
                        state.send_if_modified(|s| s.abandon(cycle));
                        record_token.cancel();
                    }
                }
            }
        });

        let state = self.state.clone();
        let tick = self.tick;
        self.tracker.spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(tick) => {
                        let mut running = true;
                        state.send_if_modified(|s| {
                            let changed = s.tick(cycle);
                            running = changed && s.phase() == Phase::Delaying;
                            changed
                        });
                        if !running {
                            break;
                        }
                    }
                }
            }
        });

        Ok(())
    }

    /// free -> idle, reporting `outcome` for the recorded urge.
    pub async fn choose(&self, outcome: Outcome) -> Result<Urge, ClientError> {
        let mut chosen = Err(ClientError::Cancelled);
        self.state.send_if_modified(|s| {
            chosen = s.choose();
            chosen.is_ok()
        });
        let urge_id = chosen?;
        self.current_cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();

        let status = outcome.status();
        info!("Urge {} finished as {}", urge_id, status);
        let report = self
            .tracker
            .track_future(self.backend.report_outcome(urge_id, self.user_id, status));
        tokio::select! {
            _ = self.shutdown.cancelled() => Err(ClientError::Cancelled),
            result = report => result,
        }
    }

    /// Cancel outstanding work and wait for it to stop.
    pub async fn close(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl<B: UrgeBackend> Drop for Session<B> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn full_cycle_on_plain_state() {
        let mut state = SessionState::new(2);
        let cycle = state.begin_delay().unwrap();
        assert_eq!(state.phase(), Phase::Delaying);

        assert!(state.urge_created(cycle, 7));
        assert!(state.tick(cycle));
        assert_eq!(state.countdown_text(), "00:01");
        assert!(state.tick(cycle));
        assert_eq!(state.phase(), Phase::Free);

        assert_eq!(state.choose().unwrap(), 7);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.urge_id(), None);
        assert_eq!(state.countdown_text(), "00:02");
    }

    #[test]
    fn transitions_out_of_order_are_rejected() {
        let mut state = SessionState::new(1);
        assert!(matches!(
            state.choose(),
            Err(ClientError::InvalidTransition { phase: "idle", .. })
        ));

        let cycle = state.begin_delay().unwrap();
        assert!(matches!(
            state.begin_delay(),
            Err(ClientError::InvalidTransition { phase: "delaying", .. })
        ));

        // Free without a recorded urge cannot report anything yet.
        state.tick(cycle);
        assert_eq!(state.phase(), Phase::Free);
        assert!(state.choose().is_err());
        assert_eq!(state.phase(), Phase::Free);
    }

    #[test]
    fn stale_cycle_results_are_ignored() {
        let mut state = SessionState::new(3);
        let first = state.begin_delay().unwrap();
        assert!(state.abandon(first));

        let second = state.begin_delay().unwrap();
        assert!(!state.urge_created(first, 1));
        assert!(!state.tick(first));
        assert!(!state.abandon(first));
        assert_eq!(state.urge_id(), None);
        assert_eq!(state.countdown().remaining(), 3);
        assert_eq!(state.cycle(), second);
    }

    #[test]
    fn outcomes_map_to_statuses() {
        assert_eq!(Outcome::Peaceful.status(), UrgeStatus::Peaceful);
        assert_eq!(Outcome::StillPresent.status(), UrgeStatus::Present);
        assert_eq!(Outcome::TookOver.status(), UrgeStatus::Overcome);
    }

    struct FakeBackend {
        fail_record: bool,
        reports: Mutex<Vec<(i64, UrgeStatus)>>,
    }

    impl FakeBackend {
        fn new(fail_record: bool) -> Arc<Self> {
            Arc::new(Self {
                fail_record,
                reports: Mutex::new(Vec::new()),
            })
        }
    }

    fn urge(id: i64, user_id: Uuid, status: UrgeStatus) -> Urge {
        Urge {
            id,
            urge_type: URGE_TYPE.to_string(),
            count: 1,
            status,
            user_id: Some(user_id),
            create_time: Utc::now(),
            update_time: Utc::now(),
        }
    }

    impl UrgeBackend for FakeBackend {
        async fn record_urge(&self, user_id: Uuid) -> Result<Urge, ClientError> {
            if self.fail_record {
                return Err(ClientError::Api {
                    status: 500,
                    message: "Something went wrong".into(),
                });
            }
            Ok(urge(42, user_id, UrgeStatus::Pending))
        }

        async fn report_outcome(
            &self,
            urge_id: i64,
            user_id: Uuid,
            status: UrgeStatus,
        ) -> Result<Urge, ClientError> {
            self.reports.lock().unwrap().push((urge_id, status));
            Ok(urge(urge_id, user_id, status))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_runs_a_full_delay() {
        let backend = FakeBackend::new(false);
        let session = Session::with_delay(backend.clone(), Uuid::new_v4(), 3);
        let mut rx = session.subscribe();

        session.start_delay().unwrap();
        assert_eq!(session.state().phase(), Phase::Delaying);

        let free = rx.wait_for(|s| s.phase() == Phase::Free).await.unwrap().clone();
        assert_eq!(free.urge_id(), Some(42));
        assert_eq!(free.countdown_text(), "00:00");

        let updated = session.choose(Outcome::StillPresent).await.unwrap();
        assert_eq!(updated.status, UrgeStatus::Present);
        assert_eq!(session.state().phase(), Phase::Idle);
        assert_eq!(*backend.reports.lock().unwrap(), vec![(42, UrgeStatus::Present)]);

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_record_returns_to_idle() {
        let backend = FakeBackend::new(true);
        let session = Session::with_delay(backend.clone(), Uuid::new_v4(), 120);
        let mut rx = session.subscribe();

        session.start_delay().unwrap();
        rx.wait_for(|s| s.phase() == Phase::Idle).await.unwrap();

        // The countdown was stopped along with the delay.
        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = session.state();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.countdown().remaining(), 120);
        assert!(backend.reports.lock().unwrap().is_empty());

        session.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_a_running_countdown() {
        let session = Session::with_delay(FakeBackend::new(false), Uuid::new_v4(), 120);
        session.start_delay().unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;
        session.close().await;
        let remaining = session.state().countdown().remaining();
        assert!(remaining < 120);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(session.state().countdown().remaining(), remaining);
        assert_eq!(session.state().phase(), Phase::Delaying);
        assert!(session.choose(Outcome::Peaceful).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_session_refuses_to_start() {
        let backend = FakeBackend::new(false);
        let session = Session::with_delay(backend.clone(), Uuid::new_v4(), 5);
        session.close().await;

        assert!(matches!(session.start_delay(), Err(ClientError::Cancelled)));
        assert_eq!(session.state().phase(), Phase::Idle);
        assert_eq!(session.state().countdown().remaining(), 5);
        assert!(backend.reports.lock().unwrap().is_empty());
    }
}
