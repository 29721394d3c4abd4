use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::proximity::{AccidentPoint, GeoPoint, is_near};

/// Driver state. A session that has delivered its last step counts as
/// `Idle`: a fresh `start` is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy)]
pub struct PlaybackConfig {
    /// Delay between consecutive route points. One second default.
    pub step_interval: Duration,
    /// Alert radius around a predicted accident point, statute miles.
    pub alert_threshold_miles: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            step_interval: Duration::from_millis(1000),
            alert_threshold_miles: 0.1,
        }
    }
}

/// One visited route point, handed to the caller's `on_step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepEvent {
    pub index: usize,
    pub point: GeoPoint,
    pub is_alert: bool,
}

/// Simulates driving a route: visits each point in order on a fixed
/// interval, evaluates proximity to the accident points at every step,
/// and reports `(point, alert)` via the callback.
///
/// At most one session is live at a time. `start` tears down any
/// previous session before scheduling the new one, so two rapid starts
/// never interleave their steps.
pub struct RoutePlayback {
    config: PlaybackConfig,
    session: Option<PlaybackSession>,
}

/// The pending schedule for one simulation run. Aborting the task
/// cancels every step that has not fired yet; steps already delivered
/// are unaffected.
struct PlaybackSession {
    task: JoinHandle<()>,
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl RoutePlayback {
    pub fn new(config: PlaybackConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        match &self.session {
            Some(session) if !session.task.is_finished() => PlaybackState::Running,
            _ => PlaybackState::Idle,
        }
    }

    /// Begins playback of `route`, cancelling any in-flight session
    /// first. Step `i` fires `i * step_interval` after the session
    /// begins; each step checks `accident_points` and invokes
    /// `on_step`. An empty route is a no-op and the driver stays idle.
    pub fn start(
        &mut self,
        route: Vec<GeoPoint>,
        accident_points: Arc<[AccidentPoint]>,
        mut on_step: impl FnMut(StepEvent) + Send + 'static,
    ) {
        self.stop();

        if route.is_empty() {
            debug!("playback start with empty route, nothing to do");
            return;
        }

        let config = self.config;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.step_interval);
            for (index, point) in route.into_iter().enumerate() {
                ticker.tick().await;
                let is_alert = is_near(point, &accident_points, config.alert_threshold_miles);
                on_step(StepEvent {
                    index,
                    point,
                    is_alert,
                });
            }
        });

        self.session = Some(PlaybackSession { task });
    }

    /// Cancels the active session, if any. All steps still pending at
    /// this instant are dropped; safe to call when already idle.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.task.abort();
        }
    }
}
