use foundation::time::Time;

use crate::frame::Frame;

/// Largest step handed to a frame, so a backgrounded tab doesn't fling the
/// camera when it resumes.
pub const MAX_FRAME_DT_S: f64 = 0.1;

/// Host handle for a scheduled tick (a `requestAnimationFrame` id in the browser).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TickHandle(pub i32);

/// Port to the host's frame scheduler.
pub trait TickScheduler {
    /// Request one future tick. `None` means the host could not schedule it.
    fn request_tick(&mut self) -> Option<TickHandle>;

    /// Cancel a previously requested tick. After this returns the tick must not fire.
    fn cancel_tick(&mut self, handle: TickHandle);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Render/update loop state machine.
///
/// `Stopped -> Running` on `start`, `Running -> Stopped` on `stop`; there is
/// no paused state. At most one tick is outstanding at a time, and `stop`
/// cancels it before dropping the handle.
#[derive(Debug)]
pub struct FrameLoop {
    state: LoopState,
    pending: Option<TickHandle>,
    next_index: u64,
    last_time: Option<Time>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
            pending: None,
            next_index: 0,
            last_time: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn pending(&self) -> Option<TickHandle> {
        self.pending
    }

    /// Returns `false` if the loop was already running.
    pub fn start(&mut self, scheduler: &mut dyn TickScheduler) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = LoopState::Running;
        self.last_time = None;
        self.pending = scheduler.request_tick();
        if self.pending.is_none() {
            tracing::warn!("frame loop started but the host refused to schedule a tick");
        }
        true
    }

    /// Returns `false` if the loop was already stopped.
    pub fn stop(&mut self, scheduler: &mut dyn TickScheduler) -> bool {
        if !self.is_running() {
            return false;
        }
        if let Some(handle) = self.pending.take() {
            scheduler.cancel_tick(handle);
        }
        self.state = LoopState::Stopped;
        true
    }

    /// Called when a scheduled tick fires.
    ///
    /// Returns the frame to run, or `None` if the loop is stopped or no tick
    /// was outstanding.
    pub fn begin_tick(&mut self, now: Time) -> Option<Frame> {
        if !self.is_running() {
            return None;
        }
        self.pending.take()?;

        let dt_s = match self.last_time {
            Some(last) => now.seconds_since(last).min(MAX_FRAME_DT_S),
            None => 0.0,
        };
        self.last_time = Some(now);

        let frame = Frame::at(self.next_index, now, dt_s);
        self.next_index = self.next_index.wrapping_add(1);
        Some(frame)
    }

    /// Schedule the next tick once a frame has run. No-op when stopped.
    pub fn end_tick(&mut self, scheduler: &mut dyn TickScheduler) {
        if !self.is_running() || self.pending.is_some() {
            return;
        }
        self.pending = scheduler.request_tick();
    }
}
