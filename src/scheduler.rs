//! Periodically refreshes a result to simulate live market movement.
//!
//! The scheduler is driven from outside: it arms timers in a [`TimerQueue`] owned by the caller,
//! and the caller hands each tick back to it when the timer fires. A tick is split into
//! [`RefreshScheduler::begin_tick`], which computes the new result, and
//! [`RefreshScheduler::complete_tick`], which applies it. Anything happening in between (notably a
//! manual run) can make the tick stale, in which case it is discarded.
use crate::market::{Cadence, MarketHours};
use crate::model::DerivedResult;
use crate::perturb::{InvalidWindowError, PerturbationConfig, perturb};
use crate::timer::{TimerId, TimerQueue};
use chrono::NaiveDateTime;
use log::{debug, warn};
use rand::Rng;
use std::cell::Cell;
use std::rc::Rc;
use thiserror::Error;

/// Default number of most recent periods moved by each tick
pub const DEFAULT_TAIL_WINDOW: usize = 2;

/// Callback run with each result produced by a tick
pub type TickObserver = Box<dyn FnMut(&DerivedResult)>;

/// Callback run with each failed tick
pub type ErrorObserver = Box<dyn FnMut(&TickComputationError)>;

/// The event carried by refresh timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTick;

/// A tick could not produce a valid result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TickComputationError {
    /// The scheduler is configured with a window longer than the time series
    #[error(transparent)]
    Window(#[from] InvalidWindowError),
    /// Perturbation produced a negative or non-finite value
    #[error("Perturbed {metric} for {label} has invalid value {value}")]
    InvalidValue {
        /// The name of the metric
        metric: &'static str,
        /// The period or metric group the value belongs to
        label: &'static str,
        /// The offending value
        value: f64,
    },
}

/// The lifecycle state of a [`RefreshScheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not yet started
    Idle,
    /// Waiting for the refresh timer
    Scheduled,
    /// A tick has begun but not completed
    Running,
    /// Stopped for good
    Cancelled,
}

/// Settings controlling the refresh cadence and the size of each tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshConfig {
    /// When the market is open
    pub market_hours: MarketHours,
    /// Refresh intervals for an open and closed market
    pub cadence: Cadence,
    /// Number of most recent periods moved by each tick
    pub tail_window: usize,
    /// Bands for the perturbation factors
    pub perturbation: PerturbationConfig,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            market_hours: MarketHours::default(),
            cadence: Cadence::default(),
            tail_window: DEFAULT_TAIL_WINDOW,
            perturbation: PerturbationConfig::default(),
        }
    }
}

/// The state mutated by ticks and manual runs
#[derive(Debug, Default)]
pub struct RefreshState {
    /// The most recently applied result
    result: Option<DerivedResult>,
    /// Incremented by every manual run
    run_counter: u64,
    /// Shared with callers; holds the armed refresh timer
    handle: RefreshHandle,
}

#[derive(Debug, Default)]
struct HandleState {
    cancelled: Cell<bool>,
    timer: Cell<Option<TimerId>>,
}

/// A handle through which a running scheduler can be stopped.
///
/// Clones refer to the same scheduler.
#[derive(Debug, Clone, Default)]
pub struct RefreshHandle(Rc<HandleState>);

impl RefreshHandle {
    /// Stop the scheduler and release its armed timer from `timers`. No further ticks are applied.
    pub fn cancel<E>(&self, timers: &mut TimerQueue<E>) {
        self.0.cancelled.set(true);
        if let Some(timer) = self.0.timer.take() {
            timers.cancel(timer);
        }
    }

    /// Whether the scheduler has been stopped
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.get()
    }

    /// The currently armed refresh timer
    pub fn timer(&self) -> Option<TimerId> {
        self.0.timer.get()
    }
}

/// A tick which has been computed but not yet applied
#[derive(Debug)]
#[must_use]
pub struct PendingTick {
    /// The run counter when the tick began
    run: u64,
    /// `None` if there was nothing to perturb
    outcome: Option<Result<DerivedResult, TickComputationError>>,
}

/// What happened when a tick completed
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A new result was applied
    Applied,
    /// There was no result to perturb or a manual run was outstanding
    Skipped,
    /// A manual run began after the tick, so its result was thrown away
    Superseded,
    /// The tick failed and the previous result was kept
    Failed(TickComputationError),
    /// The scheduler has been cancelled
    Cancelled,
}

/// Refreshes a result on a cadence which depends on market hours
pub struct RefreshScheduler {
    config: RefreshConfig,
    state: SchedulerState,
    refresh: RefreshState,
    /// The manual run which has been requested but not completed
    outstanding_run: Option<u64>,
    tick_observers: Vec<TickObserver>,
    error_observers: Vec<ErrorObserver>,
}

impl RefreshScheduler {
    /// Create a new idle scheduler
    pub fn new(config: RefreshConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
            refresh: RefreshState::default(),
            outstanding_run: None,
            tick_observers: Vec::new(),
            error_observers: Vec::new(),
        }
    }

    /// The current lifecycle state
    pub fn state(&self) -> SchedulerState {
        if self.refresh.handle.is_cancelled() {
            SchedulerState::Cancelled
        } else {
            self.state
        }
    }

    /// The most recently applied result
    pub fn result(&self) -> Option<&DerivedResult> {
        self.refresh.result.as_ref()
    }

    /// The current value of the run counter
    pub fn run_counter(&self) -> u64 {
        self.refresh.run_counter
    }

    /// The manual run which has been requested but not yet completed
    pub fn outstanding_run(&self) -> Option<u64> {
        self.outstanding_run
    }

    /// The currently armed refresh timer
    pub fn timer(&self) -> Option<TimerId> {
        self.refresh.handle.timer()
    }

    /// Register a callback for each result produced by a tick
    pub fn on_tick(&mut self, observer: impl FnMut(&DerivedResult) + 'static) {
        self.tick_observers.push(Box::new(observer));
    }

    /// Register a callback for each failed tick
    pub fn on_error(&mut self, observer: impl FnMut(&TickComputationError) + 'static) {
        self.error_observers.push(Box::new(observer));
    }

    /// Start refreshing, arming the first timer with the cadence appropriate for `now`.
    ///
    /// Starting a scheduler which is already running has no effect.
    pub fn start<E: From<RefreshTick>>(
        &mut self,
        now: NaiveDateTime,
        timers: &mut TimerQueue<E>,
    ) -> RefreshHandle {
        if self.state() == SchedulerState::Idle {
            self.arm(now, timers);
        }

        self.refresh.handle.clone()
    }

    /// Begin a tick after the refresh timer has fired.
    ///
    /// Returns `None` if the scheduler is not waiting for a tick (e.g. it has been cancelled).
    pub fn begin_tick<R: Rng + ?Sized>(
        &mut self,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> Option<PendingTick> {
        if self.state() != SchedulerState::Scheduled {
            return None;
        }

        self.state = SchedulerState::Running;

        let outcome = match (&self.refresh.result, self.outstanding_run) {
            (Some(previous), None) => Some(self.compute_tick(previous, now, rng)),
            _ => None,
        };

        Some(PendingTick {
            run: self.refresh.run_counter,
            outcome,
        })
    }

    /// Complete a tick begun with [`RefreshScheduler::begin_tick`] and re-arm the timer.
    ///
    /// The tick's result is only applied if no manual run has been requested since it began.
    pub fn complete_tick<E: From<RefreshTick>>(
        &mut self,
        pending: PendingTick,
        now: NaiveDateTime,
        timers: &mut TimerQueue<E>,
    ) -> TickOutcome {
        if self.state() == SchedulerState::Cancelled {
            self.state = SchedulerState::Cancelled;
            return TickOutcome::Cancelled;
        }

        let outcome = match pending.outcome {
            None => TickOutcome::Skipped,
            Some(_) if pending.run != self.refresh.run_counter => {
                debug!(
                    "Discarding refresh tick from run {} superseded by run {}",
                    pending.run, self.refresh.run_counter
                );
                TickOutcome::Superseded
            }
            Some(Ok(result)) => {
                for observer in &mut self.tick_observers {
                    observer(&result);
                }
                self.refresh.result = Some(result);
                TickOutcome::Applied
            }
            Some(Err(err)) => {
                warn!("Refresh tick failed: {err}");
                for observer in &mut self.error_observers {
                    observer(&err);
                }
                TickOutcome::Failed(err)
            }
        };

        self.arm(now, timers);
        outcome
    }

    /// Request a full re-evaluation, superseding any tick already in progress.
    ///
    /// Returns the run number to pass to [`RefreshScheduler::complete_run`].
    pub fn request_run(&mut self) -> u64 {
        self.refresh.run_counter += 1;
        self.outstanding_run = Some(self.refresh.run_counter);
        self.refresh.run_counter
    }

    /// Apply the result of a manual run.
    ///
    /// Returns `false` (and discards the result) if a later run has been requested since or the
    /// scheduler has been cancelled.
    pub fn complete_run(&mut self, run: u64, result: DerivedResult) -> bool {
        if self.state() == SchedulerState::Cancelled || run != self.refresh.run_counter {
            return false;
        }

        self.outstanding_run = None;
        self.refresh.result = Some(result);
        true
    }

    /// Abandon a manual run which could not produce a result, allowing ticks to resume
    pub fn abandon_run(&mut self, run: u64) {
        if self.outstanding_run == Some(run) {
            self.outstanding_run = None;
        }
    }

    /// Stop the scheduler and release its timer
    pub fn cancel<E>(&mut self, timers: &mut TimerQueue<E>) {
        self.refresh.handle.cancel(timers);
        self.state = SchedulerState::Cancelled;
    }

    fn arm<E: From<RefreshTick>>(&mut self, now: NaiveDateTime, timers: &mut TimerQueue<E>) {
        let open = self.config.market_hours.is_open(now);
        let interval = self.config.cadence.interval(open);
        debug!(
            "Market {}; next refresh in {}s",
            if open { "open" } else { "closed" },
            interval.num_seconds()
        );

        let timer = &self.refresh.handle.0.timer;
        if let Some(stale) = timer.take() {
            timers.cancel(stale);
        }
        timer.set(Some(timers.schedule(now + interval, RefreshTick.into())));
        self.state = SchedulerState::Scheduled;
    }

    fn compute_tick<R: Rng + ?Sized>(
        &self,
        previous: &DerivedResult,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> Result<DerivedResult, TickComputationError> {
        let result = perturb(
            previous,
            self.config.tail_window,
            &self.config.perturbation,
            rng,
            now,
        )?;

        let headline_cost = result.metrics.headline_cost();
        if !headline_cost.is_finite() || headline_cost < 0.0 {
            return Err(TickComputationError::InvalidValue {
                metric: "cost",
                label: "headline",
                value: headline_cost,
            });
        }
        if let Some(entry) = result.timeline.first_invalid() {
            let (metric, value) = if entry.output.is_finite() && entry.output >= 0.0 {
                ("cost", entry.cost)
            } else {
                ("output", entry.output)
            };
            return Err(TickComputationError::InvalidValue {
                metric,
                label: entry.label,
                value,
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::mining_result;
    use crate::rng::create_rng;
    use chrono::{NaiveDate, TimeDelta};
    use rand::rngs::StdRng;
    use rstest::{fixture, rstest};
    use std::cell::RefCell;

    /// A Wednesday during market hours
    #[fixture]
    fn open_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[fixture]
    fn rng() -> StdRng {
        create_rng(Some(17))
    }

    /// A started scheduler holding `result`
    fn started(
        result: DerivedResult,
        now: NaiveDateTime,
        timers: &mut TimerQueue<RefreshTick>,
    ) -> RefreshScheduler {
        let mut scheduler = RefreshScheduler::new(RefreshConfig::default());
        let run = scheduler.request_run();
        assert!(scheduler.complete_run(run, result));
        scheduler.start(now, timers);
        scheduler
    }

    #[rstest]
    #[case(open_time(), 60)]
    #[case(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap().and_hms_opt(10, 0, 0).unwrap(), 3600)]
    fn test_start_cadence(#[case] now: NaiveDateTime, #[case] expected_secs: i64) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = RefreshScheduler::new(RefreshConfig::default());
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        scheduler.start(now, &mut timers);
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        assert_eq!(
            timers.next_due(),
            Some(now + TimeDelta::seconds(expected_secs))
        );
    }

    #[rstest]
    fn test_tick_without_result_is_noop(open_time: NaiveDateTime, mut rng: StdRng) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = RefreshScheduler::new(RefreshConfig::default());
        scheduler.start(open_time, &mut timers);

        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Running);
        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        assert_eq!(outcome, TickOutcome::Skipped);
        assert!(scheduler.result().is_none());
        assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        assert_eq!(timers.len(), 1);
    }

    #[rstest]
    fn test_tick_applies_and_notifies(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result.clone(), open_time, &mut timers);
        let ticks = Rc::new(Cell::new(0));
        let observed = Rc::clone(&ticks);
        scheduler.on_tick(move |_| observed.set(observed.get() + 1));

        let later = open_time + TimeDelta::seconds(60);
        let pending = scheduler.begin_tick(later, &mut rng).unwrap();
        let outcome = scheduler.complete_tick(pending, later, &mut timers);
        assert_eq!(outcome, TickOutcome::Applied);
        assert_eq!(ticks.get(), 1);
        assert_eq!(scheduler.result().unwrap().timestamp, later);
        assert_ne!(scheduler.result().unwrap(), &mining_result);
    }

    #[rstest]
    fn test_cadence_changes_at_close(mining_result: DerivedResult, mut rng: StdRng) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let before_close = NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_hms_opt(17, 59, 30)
            .unwrap();
        let mut scheduler = started(mining_result, before_close, &mut timers);
        assert_eq!(timers.next_due(), Some(before_close + TimeDelta::seconds(60)));

        let (_, _) = timers.pop_due(before_close + TimeDelta::seconds(60)).unwrap();
        let after_close = before_close + TimeDelta::seconds(60);
        let pending = scheduler.begin_tick(after_close, &mut rng).unwrap();
        scheduler.complete_tick(pending, after_close, &mut timers);
        assert_eq!(
            timers.next_due(),
            Some(after_close + TimeDelta::seconds(3600))
        );
    }

    #[rstest]
    fn test_manual_run_then_tick_completes(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result.clone(), open_time, &mut timers);

        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        let run = scheduler.request_run();
        let mut manual = mining_result.clone();
        manual.timestamp += TimeDelta::seconds(1);
        assert!(scheduler.complete_run(run, manual.clone()));

        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        assert_eq!(outcome, TickOutcome::Superseded);
        assert_eq!(scheduler.result(), Some(&manual));
    }

    #[rstest]
    fn test_tick_completes_then_manual_run(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result.clone(), open_time, &mut timers);

        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        let run = scheduler.request_run();
        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        assert_eq!(outcome, TickOutcome::Superseded);

        let mut manual = mining_result.clone();
        manual.timestamp += TimeDelta::seconds(1);
        assert!(scheduler.complete_run(run, manual.clone()));
        assert_eq!(scheduler.result(), Some(&manual));
    }

    #[rstest]
    fn test_tick_while_run_outstanding_skipped(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result, open_time, &mut timers);
        let run = scheduler.request_run();

        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        assert_eq!(outcome, TickOutcome::Skipped);

        // Once the run is abandoned, ticks resume
        scheduler.abandon_run(run);
        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        assert_eq!(outcome, TickOutcome::Applied);
    }

    #[rstest]
    fn test_stale_manual_run_discarded(mining_result: DerivedResult) {
        let mut scheduler = RefreshScheduler::new(RefreshConfig::default());
        let first = scheduler.request_run();
        let second = scheduler.request_run();
        assert!(!scheduler.complete_run(first, mining_result.clone()));
        assert!(scheduler.result().is_none());
        assert!(scheduler.complete_run(second, mining_result));
    }

    #[rstest]
    fn test_failed_tick_reported_and_rearmed(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let config = RefreshConfig {
            tail_window: 20,
            ..RefreshConfig::default()
        };
        let mut scheduler = RefreshScheduler::new(config);
        let run = scheduler.request_run();
        scheduler.complete_run(run, mining_result.clone());
        scheduler.start(open_time, &mut timers);

        let errors = Rc::new(RefCell::new(Vec::new()));
        let observed = Rc::clone(&errors);
        scheduler.on_error(move |err| observed.borrow_mut().push(err.clone()));

        for _ in 0..2 {
            let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
            let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
            assert!(matches!(outcome, TickOutcome::Failed(_)));
            assert_eq!(scheduler.state(), SchedulerState::Scheduled);
        }
        assert_eq!(errors.borrow().len(), 2);
        assert_eq!(
            errors.borrow()[0],
            TickComputationError::Window(InvalidWindowError { window: 20, len: 12 })
        );
        assert_eq!(scheduler.result(), Some(&mining_result));
    }

    #[rstest]
    fn test_invalid_value_reported(
        mut mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        mining_result.metrics.scale_headline_cost(f64::NAN);
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result, open_time, &mut timers);

        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        let TickOutcome::Failed(TickComputationError::InvalidValue { label, .. }) = outcome else {
            panic!("Expected invalid value, got {outcome:?}");
        };
        assert_eq!(label, "headline");
    }

    #[rstest]
    fn test_cancel_releases_timer(mining_result: DerivedResult, open_time: NaiveDateTime) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result, open_time, &mut timers);
        assert_eq!(timers.len(), 1);

        scheduler.cancel(&mut timers);
        assert!(timers.is_empty());
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);
        assert!(scheduler.timer().is_none());

        // Cancelled is terminal
        scheduler.start(open_time, &mut timers);
        assert!(timers.is_empty());
    }

    #[rstest]
    fn test_handle_cancel_stops_ticks(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = RefreshScheduler::new(RefreshConfig::default());
        let run = scheduler.request_run();
        scheduler.complete_run(run, mining_result);
        let handle = scheduler.start(open_time, &mut timers);
        assert_eq!(handle.timer(), scheduler.timer());

        handle.cancel(&mut timers);
        assert!(timers.is_empty());
        assert!(scheduler.timer().is_none());
        assert!(scheduler.begin_tick(open_time, &mut rng).is_none());
        assert_eq!(scheduler.state(), SchedulerState::Cancelled);

        // A cancelled scheduler cannot be restarted
        scheduler.start(open_time, &mut timers);
        assert!(timers.is_empty());
    }

    #[rstest]
    fn test_cancel_during_tick(
        mining_result: DerivedResult,
        open_time: NaiveDateTime,
        mut rng: StdRng,
    ) {
        let mut timers = TimerQueue::<RefreshTick>::new();
        let mut scheduler = started(mining_result.clone(), open_time, &mut timers);

        let pending = scheduler.begin_tick(open_time, &mut rng).unwrap();
        scheduler.cancel(&mut timers);
        let outcome = scheduler.complete_tick(pending, open_time, &mut timers);
        assert_eq!(outcome, TickOutcome::Cancelled);
        assert!(timers.is_empty());
        assert_eq!(scheduler.result(), Some(&mining_result));
    }
}
