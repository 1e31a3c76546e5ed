//! Timer APIs
//!
//! Single-threaded event loop backing `setTimeout` and `requestAnimationFrame`.
//! Time is virtual: the embedder moves the clock with [`EventLoop::advance`]
//! and paints with [`EventLoop::render_frame`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Deferred unit of work
pub type Task = Box<dyn FnOnce()>;

/// Upper bound on tasks run by a single `run_until_idle`
const MAX_IDLE_TASKS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u32);

/// Timer entry
struct Timer {
    id: u32,
    due: Duration,
    task: Task,
}

/// Timer manager
struct TimerManager {
    now: Duration,
    next_id: u32,
    timers: Vec<Timer>,
    frames: Vec<(u32, Task)>,
    has_window: bool,
    animation_frames: bool,
}

impl TimerManager {
    fn new(has_window: bool, animation_frames: bool) -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            timers: Vec::new(),
            frames: Vec::new(),
            has_window,
            animation_frames,
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Remove and return the earliest timer due at or before `deadline`
    fn pop_due(&mut self, deadline: Duration) -> Option<Timer> {
        let (idx, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(_, t)| (t.due, t.id))?;
        Some(self.timers.remove(idx))
    }
}

/// Handle to the window's event loop
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<RefCell<TimerManager>>,
}

impl EventLoop {
    /// Browser window with animation frame support
    pub fn new() -> Self {
        Self::with_capabilities(true, true)
    }

    /// Window whose environment lacks `requestAnimationFrame`
    pub fn without_animation_frames() -> Self {
        Self::with_capabilities(true, false)
    }

    /// No window at all (server-side rendering)
    pub fn headless() -> Self {
        Self::with_capabilities(false, false)
    }

    fn with_capabilities(has_window: bool, animation_frames: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimerManager::new(has_window, animation_frames))),
        }
    }

    pub fn has_window(&self) -> bool {
        self.inner.borrow().has_window
    }

    pub fn supports_animation_frames(&self) -> bool {
        self.inner.borrow().animation_frames
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Add a timeout
    pub fn set_timeout(&self, task: impl FnOnce() + 'static, delay: Duration) -> TimerId {
        let mut tm = self.inner.borrow_mut();
        let id = tm.next_id();
        let due = tm.now + delay;
        tm.timers.push(Timer {
            id,
            due,
            task: Box::new(task),
        });
        TimerId(id)
    }

    /// Clear a timer; unknown or already fired ids are ignored
    pub fn clear_timeout(&self, id: TimerId) {
        self.inner.borrow_mut().timers.retain(|t| t.id != id.0);
    }

    /// Queue a callback for the next rendered frame
    pub fn request_animation_frame(&self, task: impl FnOnce() + 'static) -> FrameId {
        let mut tm = self.inner.borrow_mut();
        let id = tm.next_id();
        tm.frames.push((id, Box::new(task)));
        FrameId(id)
    }

    pub fn cancel_animation_frame(&self, id: FrameId) {
        self.inner.borrow_mut().frames.retain(|(fid, _)| *fid != id.0);
    }

    /// Move the clock forward, running every timer that falls due.
    ///
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let deadline = self.now() + by;
        let mut ran = 0;
        loop {
            let timer = {
                let mut tm = self.inner.borrow_mut();
                match tm.pop_due(deadline) {
                    Some(timer) => {
                        tm.now = tm.now.max(timer.due);
                        timer
                    }
                    None => break,
                }
            };
            (timer.task)();
            ran += 1;
        }
        let mut tm = self.inner.borrow_mut();
        tm.now = tm.now.max(deadline);
        ran
    }

    /// Run the callbacks queued before this frame started.
    ///
    /// Callbacks requested while the frame runs wait for the next one.
    pub fn render_frame(&self) -> usize {
        let frames = std::mem::take(&mut self.inner.borrow_mut().frames);
        let ran = frames.len();
        for (_, task) in frames {
            task();
        }
        ran
    }

    /// Fire timers in due order until none remain
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(wait) = self.time_until_next() {
            if ran >= MAX_IDLE_TASKS {
                tracing::warn!("Event loop still busy after {} tasks, giving up", ran);
                break;
            }
            ran += self.advance(wait);
        }
        ran
    }

    /// Check if there are pending timers
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    pub fn pending_frames(&self) -> usize {
        self.inner.borrow().frames.len()
    }

    /// Get time until next timer fires
    pub fn time_until_next(&self) -> Option<Duration> {
        let tm = self.inner.borrow();
        tm.timers
            .iter()
            .map(|t| t.due.saturating_sub(tm.now))
            .min()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn log() -> Rc<RefCell<Vec<&'static str>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_timer_order() {
        let el = EventLoop::new();
        let seen = log();

        let s = seen.clone();
        el.set_timeout(move || s.borrow_mut().push("late"), Duration::from_millis(20));
        let s = seen.clone();
        el.set_timeout(move || s.borrow_mut().push("early"), Duration::from_millis(5));
        let s = seen.clone();
        el.set_timeout(move || s.borrow_mut().push("early-2"), Duration::from_millis(5));

        assert_eq!(el.advance(Duration::from_millis(10)), 2);
        assert_eq!(*seen.borrow(), vec!["early", "early-2"]);
        assert_eq!(el.now(), Duration::from_millis(10));

        el.advance(Duration::from_millis(10));
        assert_eq!(*seen.borrow(), vec!["early", "early-2", "late"]);
        assert_eq!(el.pending_timers(), 0);
    }

    #[test]
    fn test_clear_timeout() {
        let el = EventLoop::new();
        let seen = log();
        let s = seen.clone();
        let id = el.set_timeout(move || s.borrow_mut().push("x"), Duration::from_millis(1));
        el.clear_timeout(id);
        el.advance(Duration::from_millis(5));
        assert!(seen.borrow().is_empty());

        // Clearing again is harmless
        el.clear_timeout(id);
    }

    #[test]
    fn test_reentrant_timers() {
        let el = EventLoop::new();
        let seen = log();
        let (s, inner_el) = (seen.clone(), el.clone());
        el.set_timeout(
            move || {
                s.borrow_mut().push("outer");
                let s = s.clone();
                inner_el.set_timeout(move || s.borrow_mut().push("inner"), Duration::from_millis(2));
            },
            Duration::from_millis(1),
        );
        el.advance(Duration::from_millis(5));
        assert_eq!(*seen.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_animation_frames() {
        let el = EventLoop::new();
        let seen = log();
        let s = seen.clone();
        el.request_animation_frame(move || s.borrow_mut().push("a"));
        let s = seen.clone();
        let id = el.request_animation_frame(move || s.borrow_mut().push("b"));
        el.cancel_animation_frame(id);

        assert_eq!(el.pending_frames(), 1);
        assert_eq!(el.render_frame(), 1);
        assert_eq!(*seen.borrow(), vec!["a"]);
        assert_eq!(el.render_frame(), 0);
    }

    #[test]
    fn test_run_until_idle() {
        let el = EventLoop::headless();
        assert!(!el.has_window());
        el.set_timeout(|| {}, Duration::from_millis(100));
        el.set_timeout(|| {}, Duration::from_millis(50));
        assert_eq!(el.run_until_idle(), 2);
        assert_eq!(el.now(), Duration::from_millis(100));
    }
}
