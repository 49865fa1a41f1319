//! Device routing and audio-policy side effects.

pub mod manager;

use std::sync::Arc;

/// Audio-focus transitions delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    Lost,
    Gained,
}

/// Platform side effects applied around a recording session.
///
/// Backends save the prior output levels, mode, and route themselves and
/// restore them symmetrically; the manager only sequences the calls.
pub trait AudioPolicyBackend: Send + Sync {
    fn mute_outputs(&self);
    fn restore_outputs(&self);
    fn request_focus(&self, on_change: Arc<dyn Fn(FocusChange) + Send + Sync>);
    fn abandon_focus(&self);
    fn set_speakerphone(&self, enabled: bool);
    /// Request the telephony-grade Bluetooth route. Returns false when it is
    /// unavailable, which is not an error.
    fn start_bluetooth_sco(&self) -> bool;
    fn stop_bluetooth_sco(&self);
    fn register_route_listener(&self);
    fn unregister_route_listener(&self);
}

/// Pause/resume handle the manager drives in reaction to focus changes.
pub trait SessionControl: Send + Sync {
    fn pause(&self);
    fn resume(&self);
}

/// No-op backend for platforms without routing control.
#[derive(Debug, Default)]
pub struct NullAudioPolicy;

impl AudioPolicyBackend for NullAudioPolicy {
    fn mute_outputs(&self) {}
    fn restore_outputs(&self) {}
    fn request_focus(&self, _on_change: Arc<dyn Fn(FocusChange) + Send + Sync>) {}
    fn abandon_focus(&self) {}
    fn set_speakerphone(&self, _enabled: bool) {}
    fn start_bluetooth_sco(&self) -> bool {
        false
    }
    fn stop_bluetooth_sco(&self) {}
    fn register_route_listener(&self) {}
    fn unregister_route_listener(&self) {}
}
