//! The simulation-time controller.
//!
//! Every tick the [`TimeManager`] decides between four outcomes, in priority
//! order:
//!
//! 1. a pending [`set_time_next_frame`](TimeManager::set_time_next_frame)
//!    override is applied and the timeline is left untouched;
//! 2. the transition between the last past keyframe and the first future
//!    keyframe is sampled (unless the future keyframe is a jump);
//! 3. the last past keyframe is applied if it has not been consumed yet;
//! 4. time free-runs at the current rate.
//!
//! A jump keyframe crossed since the previous tick is applied first, before
//! any of the above, and fires the time-jump callbacks.
//!
//! ```text
//! frames     |    1                    2          |
//!            |------------------------------------|
//! keyframes  | a     b             c       d   e  |
//!
//! previous tick: 1, now: 2
//! last past keyframe: c, first future keyframe: d
//! watermark: a.timestamp
//! ```

use astrolabe_core::clock::ApplicationClock;
use astrolabe_core::errors::{AstrolabeError, Result};
use astrolabe_core::sync::{Syncable, TimeSnapshot};

use crate::callbacks::{CallbackHandle, CallbackRegistry};
use crate::interpolation::{TimeKeyframeData, interpolate};
use crate::keyframe::{Keyframe, Timeline};
use crate::settings::TimeSettings;

/// Authoritative simulation time and rate of one process.
pub struct TimeManager {
    clock: Box<dyn ApplicationClock>,
    timeline: Timeline<TimeKeyframeData>,

    time: f64,
    rate: f64,
    paused: bool,
    effective_rate: f64,

    latest_consumed_timestamp: f64,
    time_next_frame: Option<f64>,
    default_interpolation_duration: f64,

    last_time: f64,
    last_rate: f64,

    next_callback_handle: u64,
    time_change_callbacks: CallbackRegistry,
    rate_change_callbacks: CallbackRegistry,
    time_jump_callbacks: CallbackRegistry,
}

/// State produced by one pass over the timeline, committed only on success.
#[derive(Debug, Clone, Copy)]
struct Progress {
    time: f64,
    rate: f64,
    paused: bool,
    effective_rate: f64,
}

impl Progress {
    fn apply(&mut self, data: &TimeKeyframeData) {
        self.time = data.time;
        self.rate = data.rate;
        self.paused = data.pause;
        self.effective_rate = data.effective_rate();
    }
}

impl TimeManager {
    #[must_use]
    pub fn new(settings: &TimeSettings, clock: Box<dyn ApplicationClock>) -> Self {
        let effective_rate = if settings.start_paused {
            0.0
        } else {
            settings.initial_rate
        };
        Self {
            clock,
            timeline: Timeline::new(),
            time: settings.initial_time,
            rate: settings.initial_rate,
            paused: settings.start_paused,
            effective_rate,
            latest_consumed_timestamp: f64::NEG_INFINITY,
            time_next_frame: None,
            default_interpolation_duration: settings.default_interpolation_duration,
            last_time: settings.initial_time,
            last_rate: settings.initial_rate,
            next_callback_handle: 0,
            time_change_callbacks: CallbackRegistry::new(),
            rate_change_callbacks: CallbackRegistry::new(),
            time_jump_callbacks: CallbackRegistry::new(),
        }
    }

    // ========================================================================
    // Per-tick update
    // ========================================================================

    /// Advances or holds simulation time for the frame sampled at `now`.
    ///
    /// On error the previous time, rate and watermark are kept, nothing is
    /// pruned and no callback fires.
    pub fn tick(&mut self, now: f64, dt: f64) -> Result<()> {
        if let Some(time) = self.time_next_frame.take() {
            self.time = time;
            self.effective_rate = if self.paused { 0.0 } else { self.rate };
            self.notify_changes();
            return Ok(());
        }

        match self.progress_time(now, dt) {
            Ok(jumped_to) => {
                if let Some(time) = jumped_to {
                    log::debug!("Consumed time jump to {time}");
                    self.time_jump_callbacks.fire(time);
                }
                self.notify_changes();
                Ok(())
            }
            Err(err) => {
                log::error!("Time update aborted at application time {now}: {err}");
                Err(err)
            }
        }
    }

    /// Returns the simulation time of a consumed jump, if any.
    fn progress_time(&mut self, now: f64, dt: f64) -> Result<Option<f64>> {
        if !now.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("application time"));
        }
        if !dt.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("frame delta"));
        }

        let watermark = self.latest_consumed_timestamp;
        let keyframes = self.timeline.keyframes();
        let (past, future) = keyframes.split_at(self.timeline.first_future_index(now));

        // Most recent unconsumed jump wins when several were crossed.
        let jump: Option<Keyframe<TimeKeyframeData>> = past
            .iter()
            .rev()
            .take_while(|k| k.timestamp > watermark)
            .find(|k| k.data.jump)
            .copied();
        let last_past = past.last().copied();
        let first_future = future.first().copied();

        let mut progress = Progress {
            time: self.time,
            rate: self.rate,
            paused: self.paused,
            effective_rate: self.effective_rate,
        };

        if let Some(jump) = &jump {
            progress.apply(&jump.data);
        }

        match (&last_past, &first_future) {
            (Some(past), Some(future)) if !future.data.jump => {
                let sample = interpolate(past, future, now)?;
                progress.time = sample.time;
                progress.effective_rate = sample.rate;
            }
            _ => match last_past.filter(|k| k.timestamp > watermark) {
                Some(unconsumed) => progress.apply(&unconsumed.data),
                None if !progress.paused => {
                    progress.time += dt * progress.rate;
                    progress.effective_rate = progress.rate;
                }
                None => progress.effective_rate = 0.0,
            },
        }

        if !progress.time.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("simulation time"));
        }

        self.time = progress.time;
        self.rate = progress.rate;
        self.paused = progress.paused;
        self.effective_rate = progress.effective_rate;

        if let Some(last) = last_past {
            self.latest_consumed_timestamp = self.latest_consumed_timestamp.max(last.timestamp);
            // The watermark keyframe stays as the anchor of the next transition
            self.timeline
                .remove_keyframes_before(self.latest_consumed_timestamp, false);
        }

        Ok(jump.map(|k| k.data.time))
    }

    fn notify_changes(&mut self) {
        let time = self.time;
        let rate = self.rate;
        if time != self.last_time {
            self.time_change_callbacks.fire(time);
        }
        if rate != self.last_rate {
            self.rate_change_callbacks.fire(rate);
        }
        self.last_time = time;
        self.last_rate = rate;
    }

    // ========================================================================
    // Timeline access
    // ========================================================================

    pub fn add_keyframe(&mut self, timestamp: f64, data: TimeKeyframeData) -> Result<()> {
        if !data.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("keyframe payload"));
        }
        self.timeline.add_keyframe(timestamp, data)
    }

    pub fn remove_keyframes_before(&mut self, timestamp: f64, inclusive: bool) {
        self.timeline.remove_keyframes_before(timestamp, inclusive);
    }

    pub fn remove_keyframes_after(&mut self, timestamp: f64, inclusive: bool) {
        self.timeline.remove_keyframes_after(timestamp, inclusive);
    }

    pub fn clear_keyframes(&mut self) {
        self.timeline.clear_keyframes();
    }

    #[must_use]
    pub fn n_keyframes(&self) -> usize {
        self.timeline.n_keyframes()
    }

    #[must_use]
    pub fn timeline(&self) -> &Timeline<TimeKeyframeData> {
        &self.timeline
    }

    /// Timestamp of the newest keyframe consumed so far.
    ///
    /// Starts at negative infinity and never decreases.
    #[must_use]
    pub fn latest_consumed_timestamp(&self) -> f64 {
        self.latest_consumed_timestamp
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Sets the simulation time at the next tick, bypassing the timeline.
    pub fn set_time_next_frame(&mut self, time: f64) -> Result<()> {
        if !time.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("requested simulation time"));
        }
        self.time_next_frame = Some(time);
        Ok(())
    }

    /// Schedules a discontinuous jump to `time` at application `timestamp`.
    ///
    /// Pending keyframes at or after `timestamp` are discarded.
    pub fn schedule_time_jump(&mut self, time: f64, timestamp: f64) -> Result<()> {
        let data = TimeKeyframeData::new(time, self.rate, self.paused, true);
        if !data.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("jump target"));
        }
        if !timestamp.is_finite() {
            return Err(AstrolabeError::NonFiniteKeyframe(timestamp));
        }
        self.timeline.remove_keyframes_after(timestamp, true);
        self.timeline.add_keyframe(timestamp, data)?;
        log::debug!("Scheduled time jump to {time} at {timestamp}");
        Ok(())
    }

    /// Changes the rate over `duration` application seconds (the configured
    /// default when `None`).
    ///
    /// The transition target is `time + (old + new) / 2 * duration`, the
    /// trapezoidal estimate of the time covered while the rate ramps. While
    /// paused the rate is replaced directly.
    pub fn set_rate(&mut self, rate: f64, duration: Option<f64>) -> Result<()> {
        if !rate.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("rate"));
        }
        if rate == self.rate {
            return Ok(());
        }
        if self.paused {
            self.rate = rate;
            return Ok(());
        }

        let duration = self.resolve_duration(duration)?;
        let target = self.time + (self.rate + rate) * duration / 2.0;
        let current = TimeKeyframeData::new(self.time, self.rate, false, false);
        let future = TimeKeyframeData::new(target, rate, false, false);
        self.schedule_transition(current, future, duration)?;
        self.rate = rate;
        Ok(())
    }

    /// Pauses or resumes over `duration` application seconds (the configured
    /// default when `None`).
    pub fn set_pause(&mut self, pause: bool, duration: Option<f64>) -> Result<()> {
        if pause == self.paused {
            return Ok(());
        }

        let duration = self.resolve_duration(duration)?;
        let target = self.time + self.rate * duration;
        let current = TimeKeyframeData::new(self.time, self.rate, self.paused, false);
        let future = TimeKeyframeData::new(target, self.rate, pause, false);
        self.schedule_transition(current, future, duration)?;
        self.paused = pause;
        Ok(())
    }

    /// Flips the pause state; returns the new state.
    pub fn toggle_pause(&mut self, duration: Option<f64>) -> Result<bool> {
        self.set_pause(!self.paused, duration)?;
        Ok(self.paused)
    }

    fn resolve_duration(&self, duration: Option<f64>) -> Result<f64> {
        let duration = duration.unwrap_or(self.default_interpolation_duration);
        if !duration.is_finite() || duration < 0.0 {
            return Err(AstrolabeError::InvalidDuration(duration));
        }
        Ok(duration)
    }

    /// Replaces the schedule with a transition from `current` (now) to
    /// `future` (now + `duration`). A zero duration applies `future` at once.
    ///
    /// The replacement is built aside and swapped in only once both
    /// keyframes are accepted, so a rejected request keeps the old schedule.
    fn schedule_transition(
        &mut self,
        current: TimeKeyframeData,
        future: TimeKeyframeData,
        duration: f64,
    ) -> Result<()> {
        if duration == 0.0 {
            self.timeline.clear_keyframes();
            self.effective_rate = future.effective_rate();
            return Ok(());
        }

        let now = self.clock.application_time();
        if !now.is_finite() {
            return Err(AstrolabeError::NonFiniteTime("application time"));
        }
        let mut schedule = Timeline::new();
        schedule.add_keyframe(now, current)?;
        schedule.add_keyframe(now + duration, future)?;
        self.timeline = schedule;
        log::debug!(
            "Scheduled time transition {} -> {} over {duration}s starting at {now}",
            current.time,
            future.time
        );
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The requested rate; unaffected by pausing.
    #[inline]
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[inline]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// The derivative of simulation time produced by the last tick.
    #[inline]
    #[must_use]
    pub fn effective_rate(&self) -> f64 {
        self.effective_rate
    }

    #[must_use]
    pub fn application_time(&self) -> f64 {
        self.clock.application_time()
    }

    // ========================================================================
    // Callbacks
    // ========================================================================

    fn next_handle(&mut self) -> CallbackHandle {
        let handle = CallbackHandle(self.next_callback_handle);
        self.next_callback_handle += 1;
        handle
    }

    /// Registers a callback invoked with the new time whenever it changes.
    pub fn add_time_change_callback(
        &mut self,
        callback: impl FnMut(f64) + 'static,
    ) -> CallbackHandle {
        let handle = self.next_handle();
        self.time_change_callbacks.insert(handle, Box::new(callback));
        handle
    }

    /// Registers a callback invoked with the new rate whenever it changes.
    pub fn add_rate_change_callback(
        &mut self,
        callback: impl FnMut(f64) + 'static,
    ) -> CallbackHandle {
        let handle = self.next_handle();
        self.rate_change_callbacks.insert(handle, Box::new(callback));
        handle
    }

    /// Registers a callback invoked with the target time of every consumed jump.
    pub fn add_time_jump_callback(
        &mut self,
        callback: impl FnMut(f64) + 'static,
    ) -> CallbackHandle {
        let handle = self.next_handle();
        self.time_jump_callbacks.insert(handle, Box::new(callback));
        handle
    }

    pub fn remove_time_change_callback(&mut self, handle: CallbackHandle) -> Result<()> {
        self.time_change_callbacks.remove(handle)
    }

    pub fn remove_rate_change_callback(&mut self, handle: CallbackHandle) -> Result<()> {
        self.rate_change_callbacks.remove(handle)
    }

    pub fn remove_time_jump_callback(&mut self, handle: CallbackHandle) -> Result<()> {
        self.time_jump_callbacks.remove(handle)
    }
}

impl Syncable for TimeManager {
    type Snapshot = TimeSnapshot;

    fn snapshot(&self) -> TimeSnapshot {
        TimeSnapshot::new(self.time, self.rate, self.paused)
    }

    fn apply_snapshot(&mut self, snapshot: &TimeSnapshot) {
        self.time = snapshot.simulation_time;
        self.rate = snapshot.rate;
        self.paused = snapshot.is_paused();
        self.effective_rate = if self.paused { 0.0 } else { self.rate };
        self.notify_changes();
    }
}

impl std::fmt::Debug for TimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeManager")
            .field("time", &self.time)
            .field("rate", &self.rate)
            .field("paused", &self.paused)
            .field("effective_rate", &self.effective_rate)
            .field("latest_consumed_timestamp", &self.latest_consumed_timestamp)
            .field("n_keyframes", &self.timeline.n_keyframes())
            .finish_non_exhaustive()
    }
}
