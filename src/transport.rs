use crate::types::{Transport, DEBOUNCE_MS};
use log::debug;

/// Rejects button edges that arrive too soon after the last accepted one.
#[derive(Debug, Clone)]
pub struct DebounceGuard {
    last_accepted_ms: Option<u64>,
    min_interval_ms: u64,
}

impl DebounceGuard {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_accepted_ms: None,
            min_interval_ms,
        }
    }

    /// Accept or reject an edge at `now_ms`. Accepting records the time.
    pub fn accept(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_accepted_ms {
            if now_ms.saturating_sub(last) < self.min_interval_ms {
                return false;
            }
        }
        self.last_accepted_ms = Some(now_ms);
        true
    }
}

impl Default for DebounceGuard {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

/// Playing/stopped state plus the debounced local toggle.
/// External start/stop bypass the debounce.
#[derive(Debug, Default)]
pub struct TransportControl {
    state: Transport,
    guard: DebounceGuard,
}

impl TransportControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Transport {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Button edge. Returns the new state if the edge was accepted.
    pub fn request_toggle(&mut self, now_ms: u64) -> Option<Transport> {
        if !self.guard.accept(now_ms) {
            debug!("Transport edge at {}ms ignored (debounce)", now_ms);
            return None;
        }
        self.state = self.state.toggled();
        Some(self.state)
    }

    pub fn force(&mut self, state: Transport) {
        self.state = state;
    }
}
