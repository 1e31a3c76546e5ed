//! Elements Configuration

use std::time::Duration;

/// Grace period between `disconnect` and component destruction.
///
/// Long enough to absorb an element being moved within the same task.
pub const DESTROY_DELAY: Duration = Duration::from_millis(10);

/// Stand-in for the next paint when animation frames are unavailable
pub const FRAME_FALLBACK_DELAY: Duration = Duration::from_millis(16);

/// Timing options shared by the strategies of one element class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementsConfig {
    /// Delay before a disconnected component is destroyed
    pub destroy_delay: Duration,

    /// Change detection delay used when the window cannot request frames
    pub frame_fallback_delay: Duration,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            destroy_delay: DESTROY_DELAY,
            frame_fallback_delay: FRAME_FALLBACK_DELAY,
        }
    }
}
