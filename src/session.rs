//! A live simulator session, as shown by a dashboard view.
//!
//! A session owns everything with a lifetime tied to the view: the delayed initial evaluation,
//! manual re-runs, the refresh scheduler and the animated display values. The host drives it by
//! calling [`SimulatorSession::advance`] from its frame callback, and must call
//! [`SimulatorSession::teardown`] when the view goes away.
use crate::animation::{AnimatedNumber, SubscriptionId};
use crate::input::ReferenceData;
use crate::model::parameters::InvalidParameterError;
use crate::model::{DerivedResult, ModelEvaluator, ParameterSet};
use crate::output::export_records;
use crate::scheduler::{
    RefreshScheduler, RefreshTick, SchedulerState, TickComputationError, TickOutcome,
};
use crate::settings::Settings;
use crate::timer::TimerQueue;
use anyhow::Result;
use chrono::{NaiveDateTime, TimeDelta};
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::Rng;
use std::rc::Rc;

/// The events carried by a session's timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTimer {
    /// Time to refresh the current result
    Refresh,
    /// A delayed full evaluation for the given run
    Evaluate(u64),
}

impl From<RefreshTick> for SessionTimer {
    fn from(_: RefreshTick) -> Self {
        Self::Refresh
    }
}

/// Something that happened while the session was advanced
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A full evaluation produced a new result
    Evaluated(DerivedResult),
    /// A full evaluation was rejected and the previous result kept
    EvaluationFailed(InvalidParameterError),
    /// A refresh moved the current result
    Ticked(DerivedResult),
    /// A refresh failed and the previous result was kept
    TickFailed(TickComputationError),
    /// A refresh was thrown away because a manual run started after it
    TickSuperseded,
}

/// A mounted simulator view
pub struct SimulatorSession<R: Rng> {
    evaluator: ModelEvaluator,
    params: ParameterSet,
    scheduler: RefreshScheduler,
    timers: TimerQueue<SessionTimer>,
    rng: R,
    load_latency: TimeDelta,
    animation_duration: TimeDelta,
    /// Displayed headline metrics, by label
    display: IndexMap<String, AnimatedNumber>,
    events: Vec<SessionEvent>,
    torn_down: bool,
}

impl<R: Rng> SimulatorSession<R> {
    /// Mount a new session.
    ///
    /// The first evaluation is scheduled after the initial load latency and the refresh scheduler
    /// is started straight away. Nothing is displayed until the first evaluation completes.
    pub fn mount(
        params: ParameterSet,
        reference: Rc<ReferenceData>,
        settings: &Settings,
        rng: R,
        now: NaiveDateTime,
    ) -> Result<Self> {
        settings.validate()?;

        let mut session = Self {
            evaluator: ModelEvaluator::new(reference, settings.series_band),
            params,
            scheduler: RefreshScheduler::new(settings.refresh_config()),
            timers: TimerQueue::new(),
            rng,
            load_latency: settings.initial_load_latency(),
            animation_duration: settings.animation_duration(),
            display: IndexMap::new(),
            events: Vec::new(),
            torn_down: false,
        };
        info!("Mounted {} simulator", session.params.model_name());
        session.run_simulation(now);
        session.scheduler.start(now, &mut session.timers);

        Ok(session)
    }

    /// The parameters used by the next evaluation
    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    /// Replace the parameters. They take effect on the next call to
    /// [`SimulatorSession::run_simulation`].
    pub fn set_parameters(&mut self, params: ParameterSet) {
        self.params = params;
    }

    /// Request a full re-evaluation with the current parameters.
    ///
    /// Any refresh tick already in progress is superseded, as is any earlier run which has not yet
    /// completed. Returns the run number, or `None` if the session has been torn down.
    pub fn run_simulation(&mut self, now: NaiveDateTime) -> Option<u64> {
        if self.torn_down {
            return None;
        }

        let run = self.scheduler.request_run();
        debug!("Scheduling evaluation for run {run}");
        self.timers
            .schedule(now + self.load_latency, SessionTimer::Evaluate(run));

        Some(run)
    }

    /// Fire every timer due at `now`, in deadline order, then run one display frame.
    ///
    /// Does nothing once the session has been torn down.
    pub fn advance(&mut self, now: NaiveDateTime) {
        if self.torn_down {
            return;
        }

        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                SessionTimer::Evaluate(run) => self.complete_evaluation(run, now),
                SessionTimer::Refresh => self.refresh(now),
            }
        }

        for number in self.display.values_mut() {
            number.frame(now);
        }
    }

    /// Stop every timer and animation. The session has no further side effects.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        self.scheduler.cancel(&mut self.timers);
        self.timers.clear();
        for number in self.display.values_mut() {
            number.detach();
        }
        self.torn_down = true;
        info!("Simulator torn down");
    }

    /// Take the events which have happened since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// The current result, if any evaluation has completed
    pub fn result(&self) -> Option<&DerivedResult> {
        self.scheduler.result()
    }

    /// Whether an evaluation has been requested and not yet completed
    pub fn is_loading(&self) -> bool {
        !self.torn_down && self.scheduler.outstanding_run().is_some()
    }

    /// Whether any displayed value is still moving
    pub fn is_animating(&self) -> bool {
        self.display.values().any(AnimatedNumber::is_animating)
    }

    /// Whether the session has been torn down
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// The state of the refresh scheduler
    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// The number of timers waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// When the next timer is due
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.timers.next_due()
    }

    /// The displayed value of each headline metric
    pub fn displayed(&self) -> impl Iterator<Item = (&str, f64)> {
        self.display
            .iter()
            .map(|(label, number)| (label.as_str(), number.value()))
    }

    /// The displayed value of the named headline metric
    pub fn displayed_value(&self, label: &str) -> Option<f64> {
        self.display.get(label).map(AnimatedNumber::value)
    }

    /// Register a callback for each displayed value of the named metric.
    ///
    /// Returns `None` if no such metric is being displayed.
    pub fn subscribe(
        &mut self,
        label: &str,
        observer: impl FnMut(f64) + 'static,
    ) -> Option<SubscriptionId> {
        self.display
            .get_mut(label)
            .map(|number| number.subscribe(observer))
    }

    /// Remove a callback registered with [`SimulatorSession::subscribe`]
    pub fn unsubscribe(&mut self, label: &str, id: SubscriptionId) -> bool {
        self.display
            .get_mut(label)
            .is_some_and(|number| number.unsubscribe(id))
    }

    fn complete_evaluation(&mut self, run: u64, now: NaiveDateTime) {
        if run != self.scheduler.run_counter() {
            debug!("Skipping evaluation for superseded run {run}");
            return;
        }

        match self.evaluator.evaluate(&self.params, &mut self.rng, now) {
            Ok(result) => {
                if self.scheduler.complete_run(run, result.clone()) {
                    info!(
                        "Evaluated {} model: headline cost {:.2}",
                        self.params.model_name(),
                        result.metrics.headline_cost()
                    );
                    self.show(&result, now);
                    self.events.push(SessionEvent::Evaluated(result));
                }
            }
            Err(err) => {
                warn!("Evaluation failed: {err}");
                self.scheduler.abandon_run(run);
                self.events.push(SessionEvent::EvaluationFailed(err));
            }
        }
    }

    fn refresh(&mut self, now: NaiveDateTime) {
        let Some(pending) = self.scheduler.begin_tick(now, &mut self.rng) else {
            return;
        };

        match self.scheduler.complete_tick(pending, now, &mut self.timers) {
            TickOutcome::Applied => {
                if let Some(result) = self.scheduler.result().cloned() {
                    self.show(&result, now);
                    self.events.push(SessionEvent::Ticked(result));
                }
            }
            TickOutcome::Failed(err) => self.events.push(SessionEvent::TickFailed(err)),
            TickOutcome::Superseded => self.events.push(SessionEvent::TickSuperseded),
            TickOutcome::Skipped | TickOutcome::Cancelled => {}
        }
    }

    /// Point the displayed values at the headline metrics of `result`
    fn show(&mut self, result: &DerivedResult, now: NaiveDateTime) {
        let records = export_records(result);
        self.display
            .retain(|label, _| records.iter().any(|record| record.label == *label));

        let duration = self.animation_duration;
        for record in records {
            self.display
                .entry(record.label)
                .or_insert_with(|| AnimatedNumber::new(0.0, duration))
                .bind(record.value, now);
        }
    }
}
