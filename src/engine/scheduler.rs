// src/engine/scheduler.rs

//! Debounce and dispatch bookkeeping for pipeline runs.
//!
//! The scheduler never touches a clock. It hands out *tickets* for armed
//! timers and *sequence numbers* for dispatched queries; the IO shell owns
//! the actual sleeps and reports back with the ticket it was given. A ticket
//! that no longer matches the armed one belongs to a cancelled or replaced
//! timer and is ignored.

use std::collections::BTreeSet;

use serde::Serialize;

/// The two timers a graph edit can arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimerKind {
    /// Trailing debounce after a query-affecting edit.
    Debounce,
    /// Short follow-up check after a new connection.
    ConnectCheck,
}

/// Coarse state of the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    /// A timer is armed and no newer dispatch has happened since.
    Scheduled,
    /// The most recently dispatched query has not settled yet.
    Executing,
}

/// Result of [`Scheduler::begin_dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub sequence: u64,
    /// A pending debounce was cancelled because this dispatch supersedes it.
    pub absorbed_debounce: bool,
}

/// How a settling query relates to the latest dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The response belongs to the most recent dispatch and may be applied.
    Current,
    /// A newer query has been dispatched since; drop the response.
    Stale { latest: u64 },
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_ticket: u64,
    debounce: Option<u64>,
    connect_check: Option<u64>,
    /// Highest sequence number handed out so far (0 = nothing dispatched).
    latest: u64,
    in_flight: BTreeSet<u64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the trailing debounce. Any previously armed debounce
    /// ticket becomes stale.
    pub fn schedule(&mut self) -> u64 {
        let ticket = self.issue_ticket();
        self.debounce = Some(ticket);
        ticket
    }

    /// Arm (or re-arm) the post-connect check.
    pub fn schedule_connect_check(&mut self) -> u64 {
        let ticket = self.issue_ticket();
        self.connect_check = Some(ticket);
        ticket
    }

    /// Drop every armed timer. Returns whether anything was pending.
    pub fn cancel_pending(&mut self) -> bool {
        let had_pending = self.debounce.is_some() || self.connect_check.is_some();
        self.debounce = None;
        self.connect_check = None;
        had_pending
    }

    pub fn is_armed(&self, timer: TimerKind) -> bool {
        self.slot(timer).is_some()
    }

    /// Consume an elapsed timer. Returns `false` when `ticket` is not the one
    /// currently armed for `timer`.
    pub fn fire(&mut self, timer: TimerKind, ticket: u64) -> bool {
        let slot = match timer {
            TimerKind::Debounce => &mut self.debounce,
            TimerKind::ConnectCheck => &mut self.connect_check,
        };
        if *slot == Some(ticket) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Hand out the next sequence number and mark it in flight.
    ///
    /// A pending debounce is absorbed: the query it would run is the one
    /// being dispatched now.
    pub fn begin_dispatch(&mut self) -> Dispatch {
        self.latest += 1;
        self.in_flight.insert(self.latest);
        let absorbed_debounce = self.debounce.take().is_some();
        Dispatch {
            sequence: self.latest,
            absorbed_debounce,
        }
    }

    /// Record that `sequence` has settled.
    pub fn settle(&mut self, sequence: u64) -> Settlement {
        let was_in_flight = self.in_flight.remove(&sequence);
        if was_in_flight && sequence == self.latest {
            Settlement::Current
        } else {
            Settlement::Stale {
                latest: self.latest,
            }
        }
    }

    /// Sequence number of the most recent dispatch (0 before the first).
    pub fn current_sequence(&self) -> u64 {
        self.latest
    }

    /// Whether the most recent dispatch is still awaiting its response.
    pub fn is_loading(&self) -> bool {
        self.in_flight.contains(&self.latest)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn phase(&self) -> Phase {
        if self.debounce.is_some() || self.connect_check.is_some() {
            Phase::Scheduled
        } else if self.is_loading() {
            Phase::Executing
        } else {
            Phase::Idle
        }
    }

    /// Forget all timers and in-flight work.
    ///
    /// The sequence counter keeps counting so that responses to queries
    /// dispatched before the reset are recognised as stale.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.in_flight.clear();
        self.latest += 1;
    }

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn slot(&self, timer: TimerKind) -> Option<u64> {
        match timer {
            TimerKind::Debounce => self.debounce,
            TimerKind::ConnectCheck => self.connect_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearming_invalidates_the_previous_ticket() {
        let mut s = Scheduler::new();
        let first = s.schedule();
        let second = s.schedule();
        assert_ne!(first, second);
        assert_eq!(s.phase(), Phase::Scheduled);

        assert!(!s.fire(TimerKind::Debounce, first));
        assert!(s.fire(TimerKind::Debounce, second));
        assert!(!s.fire(TimerKind::Debounce, second), "a ticket fires once");
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn timers_are_independent() {
        let mut s = Scheduler::new();
        let debounce = s.schedule();
        let check = s.schedule_connect_check();

        assert!(!s.fire(TimerKind::ConnectCheck, debounce));
        assert!(s.fire(TimerKind::ConnectCheck, check));
        assert!(s.is_armed(TimerKind::Debounce));
    }

    #[test]
    fn dispatch_absorbs_pending_debounce() {
        let mut s = Scheduler::new();
        let ticket = s.schedule();

        let dispatch = s.begin_dispatch();
        assert_eq!(dispatch.sequence, 1);
        assert!(dispatch.absorbed_debounce);
        assert!(!s.fire(TimerKind::Debounce, ticket));
        assert_eq!(s.phase(), Phase::Executing);

        assert!(!s.begin_dispatch().absorbed_debounce);
    }

    #[test]
    fn only_the_latest_dispatch_settles_as_current() {
        let mut s = Scheduler::new();
        let one = s.begin_dispatch().sequence;
        let two = s.begin_dispatch().sequence;
        assert_eq!(s.current_sequence(), two);

        assert_eq!(s.settle(two), Settlement::Current);
        assert!(!s.is_loading());
        assert_eq!(s.settle(one), Settlement::Stale { latest: two });
        assert_eq!(s.in_flight(), 0);
    }

    #[test]
    fn older_response_arriving_first_is_still_stale() {
        let mut s = Scheduler::new();
        let one = s.begin_dispatch().sequence;
        let two = s.begin_dispatch().sequence;

        assert_eq!(s.settle(one), Settlement::Stale { latest: two });
        assert!(s.is_loading(), "latest run is still in flight");
        assert_eq!(s.settle(two), Settlement::Current);
    }

    #[test]
    fn reset_makes_in_flight_responses_stale() {
        let mut s = Scheduler::new();
        s.schedule();
        let one = s.begin_dispatch().sequence;

        s.reset();
        assert_eq!(s.phase(), Phase::Idle);
        assert!(matches!(s.settle(one), Settlement::Stale { .. }));

        let next = s.begin_dispatch().sequence;
        assert!(next > one);
    }

    #[test]
    fn cancel_reports_whether_anything_was_pending() {
        let mut s = Scheduler::new();
        assert!(!s.cancel_pending());
        s.schedule_connect_check();
        assert!(s.cancel_pending());
        assert_eq!(s.phase(), Phase::Idle);
    }
}
