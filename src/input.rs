//! Press edge detection for the input adapter.
//!
//! A held key must count as one slap, not a stream of auto-repeat slaps. The gate
//! tracks which keys are down and only lets the first press through.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct PressGate {
    held: HashSet<String>,
}

impl PressGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` on the down edge, `false` while the key is still held.
    pub fn press(&mut self, key: &str) -> bool {
        self.held.insert(key.to_owned())
    }

    pub fn release(&mut self, key: &str) {
        self.held.remove(key);
    }

    /// Forget everything, e.g. when the page loses focus and key-ups go missing.
    pub fn release_all(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains(key)
    }
}
