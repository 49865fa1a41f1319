//! Process-wide routing manager.
//!
//! Owns an arena of active sessions keyed by session id and applies each
//! session's platform side effects on start/resume, restoring them on
//! pause/stop. Bluetooth route interest is reference-counted across
//! sessions; the route listener unregisters when the last interested
//! session stops. The manager observes transitions only — it never drives
//! them, except for reacting to focus changes through the session's
//! control handle.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::config::{InterruptionPolicy, RecordConfig};
use crate::routing::{AudioPolicyBackend, FocusChange, NullAudioPolicy, SessionControl};

#[derive(Clone)]
struct SessionEntry {
    policy: InterruptionPolicy,
    wants_sco: bool,
    mute: bool,
    speakerphone: bool,
    control: Weak<dyn SessionControl>,
    paused: bool,
}

#[derive(Default)]
struct RoutingState {
    sessions: HashMap<Uuid, SessionEntry>,
    sco_sessions: usize,
}

pub struct RoutingManager {
    backend: Arc<dyn AudioPolicyBackend>,
    state: Mutex<RoutingState>,
}

impl RoutingManager {
    pub fn new(backend: Arc<dyn AudioPolicyBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(RoutingState::default()),
        }
    }

    /// Register a session and apply its side effects.
    pub fn on_session_start(
        &self,
        id: Uuid,
        config: &RecordConfig,
        control: Weak<dyn SessionControl>,
    ) {
        let entry = SessionEntry {
            policy: config.platform.interruption_policy,
            wants_sco: config.platform.manage_bluetooth,
            mute: config.platform.mute_audio,
            speakerphone: config.platform.speakerphone,
            control,
            paused: false,
        };

        let first_sco = {
            let mut state = self.state.lock();
            let first = entry.wants_sco && state.sco_sessions == 0;
            if entry.wants_sco {
                state.sco_sessions += 1;
            }
            state.sessions.insert(id, entry.clone());
            first
        };
        // backend calls happen outside the state lock; focus callbacks can
        // re-enter through session controls
        if first_sco {
            self.backend.register_route_listener();
            if !self.backend.start_bluetooth_sco() {
                log::debug!("bluetooth route unavailable; keeping the current input route");
            }
        }
        self.apply(&entry);
    }

    /// Release the session's side effects while it is paused.
    pub fn on_session_pause(&self, id: Uuid) {
        let entry = {
            let mut state = self.state.lock();
            match state.sessions.get_mut(&id) {
                Some(entry) if !entry.paused => {
                    entry.paused = true;
                    entry.clone()
                }
                _ => return,
            }
        };
        self.restore(&entry);
    }

    /// Re-apply side effects when the session resumes.
    pub fn on_session_resume(&self, id: Uuid) {
        let entry = {
            let mut state = self.state.lock();
            match state.sessions.get_mut(&id) {
                Some(entry) if entry.paused => {
                    entry.paused = false;
                    entry.clone()
                }
                _ => return,
            }
        };
        self.apply(&entry);
    }

    /// Unregister the session, restoring side effects and dropping route
    /// interest.
    pub fn on_session_stop(&self, id: Uuid) {
        let (entry, last_sco) = {
            let mut state = self.state.lock();
            let Some(entry) = state.sessions.remove(&id) else {
                return;
            };
            let mut last = false;
            if entry.wants_sco {
                state.sco_sessions -= 1;
                last = state.sco_sessions == 0;
            }
            (entry, last)
        };
        if !entry.paused {
            self.restore(&entry);
        }
        if last_sco {
            self.backend.stop_bluetooth_sco();
            self.backend.unregister_route_listener();
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.state.lock().sessions.len()
    }

    fn apply(&self, entry: &SessionEntry) {
        let control = entry.control.clone();
        let policy = entry.policy;
        self.backend
            .request_focus(Arc::new(move |change| match change {
                FocusChange::Lost => {
                    if let Some(control) = control.upgrade() {
                        control.pause();
                    }
                }
                FocusChange::Gained => {
                    if policy == InterruptionPolicy::PauseResume {
                        if let Some(control) = control.upgrade() {
                            control.resume();
                        }
                    }
                }
            }));
        if entry.mute {
            self.backend.mute_outputs();
        }
        if entry.speakerphone {
            self.backend.set_speakerphone(true);
        }
    }

    fn restore(&self, entry: &SessionEntry) {
        self.backend.abandon_focus();
        if entry.mute {
            self.backend.restore_outputs();
        }
        if entry.speakerphone {
            self.backend.set_speakerphone(false);
        }
    }
}

impl Default for RoutingManager {
    fn default() -> Self {
        Self::new(Arc::new(NullAudioPolicy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::PlatformConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockBackend {
        focus_requests: AtomicUsize,
        focus_abandons: AtomicUsize,
        mutes: AtomicUsize,
        restores: AtomicUsize,
        listener_registrations: AtomicUsize,
        listener_removals: AtomicUsize,
        sco_starts: AtomicUsize,
        sco_stops: AtomicUsize,
        focus_callback: Mutex<Option<Arc<dyn Fn(FocusChange) + Send + Sync>>>,
    }

    impl AudioPolicyBackend for MockBackend {
        fn mute_outputs(&self) {
            self.mutes.fetch_add(1, Ordering::SeqCst);
        }
        fn restore_outputs(&self) {
            self.restores.fetch_add(1, Ordering::SeqCst);
        }
        fn request_focus(&self, on_change: Arc<dyn Fn(FocusChange) + Send + Sync>) {
            self.focus_requests.fetch_add(1, Ordering::SeqCst);
            *self.focus_callback.lock() = Some(on_change);
        }
        fn abandon_focus(&self) {
            self.focus_abandons.fetch_add(1, Ordering::SeqCst);
        }
        fn set_speakerphone(&self, _enabled: bool) {}
        fn start_bluetooth_sco(&self) -> bool {
            self.sco_starts.fetch_add(1, Ordering::SeqCst);
            true
        }
        fn stop_bluetooth_sco(&self) {
            self.sco_stops.fetch_add(1, Ordering::SeqCst);
        }
        fn register_route_listener(&self) {
            self.listener_registrations.fetch_add(1, Ordering::SeqCst);
        }
        fn unregister_route_listener(&self) {
            self.listener_removals.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct MockControl {
        pauses: AtomicUsize,
        resumes: AtomicUsize,
    }

    impl SessionControl for MockControl {
        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
        fn resume(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config(policy: InterruptionPolicy, bluetooth: bool, mute: bool) -> RecordConfig {
        RecordConfig {
            platform: PlatformConfig {
                interruption_policy: policy,
                manage_bluetooth: bluetooth,
                mute_audio: mute,
                ..PlatformConfig::default()
            },
            ..RecordConfig::default()
        }
    }

    #[test]
    fn test_focus_loss_pauses_resume_per_policy() {
        for (policy, expect_resumes) in [
            (InterruptionPolicy::Pause, 0),
            (InterruptionPolicy::PauseResume, 1),
        ] {
            let backend = Arc::new(MockBackend::default());
            let manager = RoutingManager::new(Arc::clone(&backend) as Arc<dyn AudioPolicyBackend>);
            let control = Arc::new(MockControl::default());
            // keep a strong ref alive for the weak to upgrade
            let strong: Arc<dyn SessionControl> = Arc::clone(&control) as Arc<dyn SessionControl>;

            let id = Uuid::new_v4();
            manager.on_session_start(id, &config(policy, false, false), Arc::downgrade(&strong));

            let callback = backend.focus_callback.lock().clone().unwrap();
            callback(FocusChange::Lost);
            assert_eq!(control.pauses.load(Ordering::SeqCst), 1);
            callback(FocusChange::Gained);
            assert_eq!(control.resumes.load(Ordering::SeqCst), expect_resumes);
        }
    }

    #[test]
    fn test_mute_applied_and_restored() {
        let backend = Arc::new(MockBackend::default());
        let manager = RoutingManager::new(Arc::clone(&backend) as Arc<dyn AudioPolicyBackend>);
        let control = Arc::new(MockControl::default());
        let strong: Arc<dyn SessionControl> = Arc::clone(&control) as Arc<dyn SessionControl>;

        let id = Uuid::new_v4();
        let cfg = config(InterruptionPolicy::Pause, false, true);
        manager.on_session_start(id, &cfg, Arc::downgrade(&strong));
        assert_eq!(backend.mutes.load(Ordering::SeqCst), 1);

        manager.on_session_pause(id);
        assert_eq!(backend.restores.load(Ordering::SeqCst), 1);
        assert_eq!(backend.focus_abandons.load(Ordering::SeqCst), 1);

        // double pause is a no-op
        manager.on_session_pause(id);
        assert_eq!(backend.restores.load(Ordering::SeqCst), 1);

        manager.on_session_resume(id);
        assert_eq!(backend.mutes.load(Ordering::SeqCst), 2);

        manager.on_session_stop(id);
        assert_eq!(backend.restores.load(Ordering::SeqCst), 2);
        assert_eq!(manager.active_sessions(), 0);
    }

    #[test]
    fn test_bluetooth_interest_is_refcounted() {
        let backend = Arc::new(MockBackend::default());
        let manager = RoutingManager::new(Arc::clone(&backend) as Arc<dyn AudioPolicyBackend>);
        let control = Arc::new(MockControl::default());
        let strong: Arc<dyn SessionControl> = Arc::clone(&control) as Arc<dyn SessionControl>;

        let cfg = config(InterruptionPolicy::Pause, true, false);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        manager.on_session_start(first, &cfg, Arc::downgrade(&strong));
        manager.on_session_start(second, &cfg, Arc::downgrade(&strong));

        assert_eq!(backend.listener_registrations.load(Ordering::SeqCst), 1);
        assert_eq!(backend.sco_starts.load(Ordering::SeqCst), 1);

        manager.on_session_stop(first);
        assert_eq!(backend.listener_removals.load(Ordering::SeqCst), 0);
        manager.on_session_stop(second);
        assert_eq!(backend.listener_removals.load(Ordering::SeqCst), 1);
        assert_eq!(backend.sco_stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_unknown_session_is_noop() {
        let backend = Arc::new(MockBackend::default());
        let manager = RoutingManager::new(Arc::clone(&backend) as Arc<dyn AudioPolicyBackend>);
        manager.on_session_stop(Uuid::new_v4());
        assert_eq!(backend.focus_abandons.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_control_is_harmless() {
        let backend = Arc::new(MockBackend::default());
        let manager = RoutingManager::new(Arc::clone(&backend) as Arc<dyn AudioPolicyBackend>);
        let id = Uuid::new_v4();
        {
            let control = Arc::new(MockControl::default());
            let strong: Arc<dyn SessionControl> = control as Arc<dyn SessionControl>;
            manager.on_session_start(
                id,
                &config(InterruptionPolicy::Pause, false, false),
                Arc::downgrade(&strong),
            );
        }
        let callback = backend.focus_callback.lock().clone().unwrap();
        callback(FocusChange::Lost); // control gone; nothing to pause
        manager.on_session_stop(id);
    }
}
