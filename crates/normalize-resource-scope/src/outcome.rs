//! Exit outcomes and the suppression rule.
//!
//! This is the contract every lowering must reproduce, written as a pure
//! interpreter so it can be checked without executing generated code.
//! Release handlers run newest first. Each one observes whether an exception
//! is propagating; a handler that reports "handled" discards that exception,
//! and one that raises replaces whatever was propagating.

use crate::plan::AcquisitionPlan;
use serde::Serialize;

/// Description of a propagating exception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    pub kind: String,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

/// Non-exceptional ways of leaving a body early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EarlyExitKind {
    Return,
    Break,
    Continue,
}

/// How control is leaving the guarded region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExitOutcome {
    Normal,
    Exception(ExceptionInfo),
    EarlyExit(EarlyExitKind),
}

impl ExitOutcome {
    /// The exception a release handler is shown, if any. Early exits look
    /// like normal completion to release handlers.
    pub fn propagating(&self) -> Option<&ExceptionInfo> {
        match self {
            ExitOutcome::Exception(info) => Some(info),
            ExitOutcome::Normal | ExitOutcome::EarlyExit(_) => None,
        }
    }
}

/// What a release handler does when invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReleaseSignal {
    /// Returns a truthy value: suppresses a propagating exception.
    Handled,
    /// Returns a falsy value (or nothing): the outcome is unchanged.
    Propagate,
    /// Raises: the new exception replaces the current outcome.
    Replace(ExceptionInfo),
}

/// Apply one release handler's signal to the current outcome.
pub fn apply_release(current: ExitOutcome, signal: &ReleaseSignal) -> ExitOutcome {
    match (signal, current) {
        (ReleaseSignal::Replace(new), _) => ExitOutcome::Exception(new.clone()),
        (ReleaseSignal::Handled, ExitOutcome::Exception(_)) => ExitOutcome::Normal,
        (_, current) => current,
    }
}

/// Thread `initial` through release handlers given in release order.
///
/// Returns what each handler observed and the final outcome.
pub fn thread_releases<'a, I>(
    initial: ExitOutcome,
    signals: I,
) -> (Vec<Option<ExceptionInfo>>, ExitOutcome)
where
    I: IntoIterator<Item = &'a ReleaseSignal>,
{
    let mut observed = Vec::new();
    let mut current = initial;
    for signal in signals {
        observed.push(current.propagating().cloned());
        current = apply_release(current, signal);
    }
    (observed, current)
}

/// Behaviour of one resource in [`run_scoped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedResource {
    /// Acquisition raises this exception instead of succeeding.
    pub acquire_fails: Option<ExceptionInfo>,
    pub on_release: ReleaseSignal,
}

impl SimulatedResource {
    pub fn ok() -> Self {
        Self {
            acquire_fails: None,
            on_release: ReleaseSignal::Propagate,
        }
    }

    pub fn failing(kind: &str) -> Self {
        Self {
            acquire_fails: Some(ExceptionInfo::new(kind)),
            on_release: ReleaseSignal::Propagate,
        }
    }

    pub fn releasing(signal: ReleaseSignal) -> Self {
        Self {
            acquire_fails: None,
            on_release: signal,
        }
    }
}

/// One observable step of a scoped statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Event {
    Acquire(usize),
    Body,
    Release {
        index: usize,
        observed: Option<ExceptionInfo>,
    },
}

/// Events in execution order plus the outcome seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub events: Vec<Event>,
    pub outcome: ExitOutcome,
}

impl Trace {
    pub fn acquired(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Acquire(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    pub fn released(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Release { index, .. } => Some(*index),
                _ => None,
            })
            .collect()
    }
}

/// Run a scoped statement over simulated resources.
///
/// A failed acquisition is not followed by its own release, only by the
/// releases of the items acquired before it. `body` is the outcome of the
/// body when every item was acquired.
pub fn run_scoped(resources: &[SimulatedResource], body: ExitOutcome) -> Trace {
    let plan = AcquisitionPlan::for_len(resources.len());
    let mut events = Vec::new();
    let mut held = resources.len();
    let mut current = body;

    for &index in plan.acquire_order() {
        events.push(Event::Acquire(index));
        if let Some(err) = &resources[index].acquire_fails {
            held = index;
            current = ExitOutcome::Exception(err.clone());
            break;
        }
    }

    if held == resources.len() {
        events.push(Event::Body);
    }

    for index in plan.releases_after_failure(held) {
        events.push(Event::Release {
            index,
            observed: current.propagating().cloned(),
        });
        current = apply_release(current, &resources[index].on_release);
    }

    Trace {
        events,
        outcome: current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exc(kind: &str) -> ExitOutcome {
        ExitOutcome::Exception(ExceptionInfo::new(kind))
    }

    #[test]
    fn test_normal_releases_in_reverse() {
        let trace = run_scoped(&vec![SimulatedResource::ok(); 3], ExitOutcome::Normal);
        assert_eq!(trace.acquired(), vec![0, 1, 2]);
        assert_eq!(trace.released(), vec![2, 1, 0]);
        assert_eq!(trace.outcome, ExitOutcome::Normal);
    }

    #[test]
    fn test_reverse_order_for_any_count() {
        for n in 1..=8 {
            let trace = run_scoped(&vec![SimulatedResource::ok(); n], ExitOutcome::Normal);
            let mut expected = trace.acquired();
            expected.reverse();
            assert_eq!(trace.released(), expected);
        }
    }

    #[test]
    fn test_failed_acquisition_releases_only_earlier_items() {
        let resources = vec![
            SimulatedResource::ok(),
            SimulatedResource::ok(),
            SimulatedResource::failing("OSError"),
            SimulatedResource::ok(),
        ];
        let trace = run_scoped(&resources, ExitOutcome::Normal);
        assert_eq!(trace.acquired(), vec![0, 1, 2]);
        assert!(!trace.events.contains(&Event::Body));
        assert_eq!(trace.released(), vec![1, 0]);
        assert_eq!(trace.outcome, exc("OSError"));
    }

    #[test]
    fn test_suppression_hides_exception_from_later_releases() {
        let resources = vec![
            SimulatedResource::ok(),
            SimulatedResource::releasing(ReleaseSignal::Handled),
            SimulatedResource::ok(),
        ];
        let trace = run_scoped(&resources, exc("ValueError"));
        assert_eq!(
            &trace.events[4..],
            &[
                Event::Release {
                    index: 2,
                    observed: Some(ExceptionInfo::new("ValueError")),
                },
                Event::Release {
                    index: 1,
                    observed: Some(ExceptionInfo::new("ValueError")),
                },
                Event::Release {
                    index: 0,
                    observed: None,
                },
            ]
        );
        assert_eq!(trace.outcome, ExitOutcome::Normal);
    }

    #[test]
    fn test_not_handled_keeps_original() {
        let (observed, outcome) = thread_releases(
            exc("KeyError"),
            &[ReleaseSignal::Propagate, ReleaseSignal::Propagate],
        );
        assert_eq!(observed, vec![Some(ExceptionInfo::new("KeyError")); 2]);
        assert_eq!(outcome, exc("KeyError"));
    }

    #[test]
    fn test_raising_release_replaces_outcome_and_others_still_run() {
        let (observed, outcome) = thread_releases(
            ExitOutcome::Normal,
            &[
                ReleaseSignal::Replace(ExceptionInfo::new("CloseError")),
                ReleaseSignal::Propagate,
            ],
        );
        assert_eq!(observed, vec![None, Some(ExceptionInfo::new("CloseError"))]);
        assert_eq!(outcome, exc("CloseError"));

        let (_, outcome) = thread_releases(
            exc("ValueError"),
            &[ReleaseSignal::Replace(ExceptionInfo::new("CloseError"))],
        );
        assert_eq!(outcome, exc("CloseError"));
    }

    #[test]
    fn test_early_exit_releases_everything_and_is_kept() {
        let trace = run_scoped(
            &vec![SimulatedResource::ok(); 2],
            ExitOutcome::EarlyExit(EarlyExitKind::Return),
        );
        assert_eq!(trace.released(), vec![1, 0]);
        assert!(trace.events.iter().all(|e| !matches!(
            e,
            Event::Release {
                observed: Some(_),
                ..
            }
        )));
        assert_eq!(trace.outcome, ExitOutcome::EarlyExit(EarlyExitKind::Return));
    }

    #[test]
    fn test_handled_without_exception_is_noop() {
        let outcome = apply_release(
            ExitOutcome::EarlyExit(EarlyExitKind::Break),
            &ReleaseSignal::Handled,
        );
        assert_eq!(outcome, ExitOutcome::EarlyExit(EarlyExitKind::Break));
    }
}
