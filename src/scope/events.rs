//! Callback interface for observers at the core's boundary.

use crate::scope::core::CoreState;

/// Event sink injected at construction. The UI layer implements this to
/// refresh labels and indicators; every method has a no-op default.
pub trait ScopeEvents: Send {
    /// Run state changed via start/stop.
    fn on_state_changed(&mut self, _state: CoreState) {}

    /// A fresh snapshot was ingested into the captured waveform.
    fn on_capture(&mut self, _num_points: usize) {}
}

/// Default sink that ignores every event.
pub struct NullEvents;

impl ScopeEvents for NullEvents {}
