//! Deferred work
//!
//! Timer and pre-paint scheduling on top of the window's [`EventLoop`], each
//! returning a [`Cancel`] handle. Tasks are not guarded: a panic inside a task
//! unwinds into whoever drives the event loop.

use std::fmt;
use std::time::Duration;

use fos_dom::EventLoop;

use crate::config::FRAME_FALLBACK_DELAY;

/// One-shot cancellation handle.
///
/// Cancelling after the task ran is a no-op. Dropping the handle does not
/// cancel the task.
#[must_use = "dropping a Cancel handle leaves the task scheduled"]
pub struct Cancel(Option<Box<dyn FnOnce()>>);

impl Cancel {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(cancel)))
    }

    /// Handle for work that already ran
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.0.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cancel").field(&self.0.is_some()).finish()
    }
}

/// Schedules strategy work on a window event loop
#[derive(Clone)]
pub struct Scheduler {
    event_loop: EventLoop,
    frame_fallback: Duration,
}

impl Scheduler {
    pub fn new(event_loop: EventLoop) -> Self {
        Self {
            event_loop,
            frame_fallback: FRAME_FALLBACK_DELAY,
        }
    }

    /// Override the delay used when animation frames are unavailable
    pub fn with_frame_fallback(mut self, delay: Duration) -> Self {
        self.frame_fallback = delay;
        self
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Run `task` after `delay`
    pub fn schedule(&self, task: impl FnOnce() + 'static, delay: Duration) -> Cancel {
        let id = self.event_loop.set_timeout(task, delay);
        let event_loop = self.event_loop.clone();
        Cancel::new(move || event_loop.clear_timeout(id))
    }

    /// Run `task` once, right before the next paint.
    ///
    /// Without a window (server-side rendering) the task runs synchronously.
    pub fn schedule_before_next_paint(&self, task: impl FnOnce() + 'static) -> Cancel {
        if !self.event_loop.has_window() {
            task();
            return Cancel::noop();
        }

        if !self.event_loop.supports_animation_frames() {
            return self.schedule(task, self.frame_fallback);
        }

        let id = self.event_loop.request_animation_frame(task);
        let event_loop = self.event_loop.clone();
        Cancel::new(move || event_loop.cancel_animation_frame(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce() + 'static) {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        (count, move || c.set(c.get() + 1))
    }

    #[test]
    fn test_schedule_runs_after_delay() {
        let scheduler = Scheduler::new(EventLoop::new());
        let (count, task) = counter();
        let _cancel = scheduler.schedule(task, Duration::from_millis(10));

        scheduler.event_loop().advance(Duration::from_millis(9));
        assert_eq!(count.get(), 0);
        scheduler.event_loop().advance(Duration::from_millis(1));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_cancel_before_and_after_run() {
        let scheduler = Scheduler::new(EventLoop::new());
        let (count, task) = counter();
        scheduler.schedule(task, Duration::from_millis(10)).cancel();
        scheduler.event_loop().advance(Duration::from_millis(20));
        assert_eq!(count.get(), 0);

        let (count, task) = counter();
        let cancel = scheduler.schedule(task, Duration::from_millis(1));
        scheduler.event_loop().advance(Duration::from_millis(1));
        cancel.cancel();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_before_paint_uses_frames() {
        let scheduler = Scheduler::new(EventLoop::new());
        let (count, task) = counter();
        let _cancel = scheduler.schedule_before_next_paint(task);

        scheduler.event_loop().advance(Duration::from_millis(100));
        assert_eq!(count.get(), 0);
        scheduler.event_loop().render_frame();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_before_paint_cancel() {
        let scheduler = Scheduler::new(EventLoop::new());
        let (count, task) = counter();
        scheduler.schedule_before_next_paint(task).cancel();
        scheduler.event_loop().render_frame();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_before_paint_falls_back_to_timer() {
        let scheduler = Scheduler::new(EventLoop::without_animation_frames());
        let (count, task) = counter();
        let _cancel = scheduler.schedule_before_next_paint(task);

        scheduler.event_loop().advance(Duration::from_millis(15));
        assert_eq!(count.get(), 0);
        scheduler.event_loop().advance(Duration::from_millis(1));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_before_paint_without_window_is_synchronous() {
        let scheduler = Scheduler::new(EventLoop::headless());
        let (count, task) = counter();
        scheduler.schedule_before_next_paint(task).cancel();
        assert_eq!(count.get(), 1);
    }
}
