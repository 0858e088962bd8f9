//! Window teardown

use crate::background::Background;

/// Owns the one-way transition to shut down
#[derive(Debug, Default)]
pub struct LifecycleManager {
    shut_down: bool,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Release everything the background owns.
    ///
    /// Safe to call repeatedly and after a failed or partial initialization.
    /// Returns `true` only for the call that actually shut down.
    pub fn shutdown(&mut self, background: &mut Background) -> bool {
        background.release();

        if self.shut_down {
            log::debug!("Shutdown already complete");
            return false;
        }

        self.shut_down = true;
        log::info!("Window resources released");
        true
    }
}
