//! Smooth transitions of displayed numbers towards new values.
use chrono::{NaiveDateTime, TimeDelta};
use float_cmp::approx_eq;

/// Default time taken to reach a new target
pub const DEFAULT_ANIMATION_DURATION: TimeDelta = TimeDelta::milliseconds(1000);

/// Cubic ease-out: fast at first, decelerating towards the end.
///
/// Maps `[0, 1]` onto `[0, 1]` monotonically.
pub fn ease_out_cubic(progress: f64) -> f64 {
    1.0 - (1.0 - progress).powi(3)
}

/// Callback run with each newly displayed value
pub type ValueObserver = Box<dyn FnMut(f64)>;

/// Identifies an observer registered with [`AnimatedNumber::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Whether an [`AnimatedNumber`] wants another frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The value is still moving and another frame is needed
    Animating,
    /// The target was reached on this frame
    Finished,
    /// Nothing to do
    Idle,
}

/// An in-flight transition
#[derive(Debug, Clone, Copy, PartialEq)]
struct AnimationState {
    start_value: f64,
    target: f64,
    start_time: NaiveDateTime,
}

/// A number which eases towards whatever target it is bound to.
///
/// Nothing happens on its own: the owner calls [`AnimatedNumber::frame`] once per display frame
/// for as long as it returns [`FrameStatus::Animating`].
pub struct AnimatedNumber {
    duration: TimeDelta,
    value: f64,
    target: f64,
    animation: Option<AnimationState>,
    observers: Vec<(SubscriptionId, ValueObserver)>,
    next_subscription: u64,
    detached: bool,
}

impl AnimatedNumber {
    /// Create a number which is already displaying `initial`
    pub fn new(initial: f64, duration: TimeDelta) -> Self {
        Self {
            duration,
            value: initial,
            target: initial,
            animation: None,
            observers: Vec::new(),
            next_subscription: 0,
            detached: false,
        }
    }

    /// The currently displayed value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The value being moved towards
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Whether frames are still needed
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Start moving towards `target`.
    ///
    /// If a transition is already in flight, the new one starts from the value it has reached at
    /// `now`. Binding the current target again does nothing.
    pub fn bind(&mut self, target: f64, now: NaiveDateTime) {
        if self.detached || approx_eq!(f64, target, self.target) {
            return;
        }

        let start_value = match self.animation {
            Some(animation) => self.interpolate(animation, now).0,
            None => self.value,
        };
        self.value = start_value;
        self.target = target;
        self.animation = Some(AnimationState {
            start_value,
            target,
            start_time: now,
        });
    }

    /// Advance the transition to `now` and notify observers of the new value
    pub fn frame(&mut self, now: NaiveDateTime) -> FrameStatus {
        let Some(animation) = self.animation else {
            return FrameStatus::Idle;
        };

        let (value, finished) = self.interpolate(animation, now);
        self.value = value;
        for (_, observer) in &mut self.observers {
            observer(value);
        }

        if finished {
            self.animation = None;
            FrameStatus::Finished
        } else {
            FrameStatus::Animating
        }
    }

    /// Register a callback for each displayed value
    pub fn subscribe(&mut self, observer: impl FnMut(f64) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(other, _)| *other != id);
        self.observers.len() != before
    }

    /// Stop animating and drop all observers, for when the display goes away.
    ///
    /// A detached number ignores any further targets.
    pub fn detach(&mut self) {
        self.animation = None;
        self.observers.clear();
        self.detached = true;
    }

    /// The value at `now` and whether the transition is complete
    fn interpolate(&self, animation: AnimationState, now: NaiveDateTime) -> (f64, bool) {
        let elapsed = now - animation.start_time;
        if elapsed >= self.duration {
            return (animation.target, true);
        }

        let progress = (elapsed.num_microseconds().unwrap_or(0) as f64
            / self.duration.num_microseconds().unwrap_or(1) as f64)
            .clamp(0.0, 1.0);
        let value = animation.start_value
            + (animation.target - animation.start_value) * ease_out_cubic(progress);

        (value, false)
    }
}
