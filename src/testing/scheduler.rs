use crate::runtime::emit;
use crate::testing::{ActorInfo, ExplorationStrategy, Turn};
use crate::{Configuration, Error, Result};
use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A strategy shared by the scheduler of every iteration.
pub type SharedStrategy = Arc<Mutex<dyn ExplorationStrategy>>;

/// Why an iteration ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StopReason {
    /// No enabled actor was left to run.
    FullyExplored,
    /// An assertion failed.
    BugFound,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Status {
    NotStarted,
    Running,
    Stopped(StopReason),
}

struct SchedulerState {
    status: Status,
    /// Ordered by id so that strategies see the same choices in the same order on every replay.
    actors: BTreeMap<u64, ActorInfo>,
    /// The participant holding the turn.
    scheduled: Option<u64>,
    /// Every decision, in order.
    trace: Vec<u64>,
    bug: Option<String>,
}

impl SchedulerState {
    fn is_stopped(&self) -> bool {
        matches!(self.status, Status::Stopped(_))
    }
}

/// Serializes the participants of one bug-finding iteration. Exactly one of them holds the turn
/// at a time; at each scheduling point the holder asks the strategy who goes next, passes the
/// turn through that participant's channel, and parks on its own channel until the turn comes
/// back.
///
/// Parking points return [`Error::Canceled`] once the iteration is over, which every task
/// propagates out and discards at its thread boundary.
pub struct BugFindingScheduler {
    configuration: Configuration,
    strategy: SharedStrategy,
    state: Mutex<SchedulerState>,
    started: Condvar,
    stopped: Condvar,
}

impl BugFindingScheduler {
    pub fn new(configuration: &Configuration, strategy: SharedStrategy) -> Self {
        BugFindingScheduler {
            configuration: configuration.clone(),
            strategy,
            state: Mutex::new(SchedulerState {
                status: Status::NotStarted,
                actors: BTreeMap::new(),
                scheduled: None,
                trace: Vec::new(),
                bug: None,
            }),
            started: Condvar::new(),
            stopped: Condvar::new(),
        }
    }

    /// Registers the calling thread as a participant that already holds the turn.
    pub(crate) fn attach(&self, id: u64, name: &str) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut info = ActorInfo::new(id, name);
        info.started = true;
        info.active = true;
        state.actors.insert(id, info);
        state.scheduled = Some(id);
        if state.status == Status::NotStarted {
            state.status = Status::Running;
        }
    }

    /// Registers a new handler run for `id`, re-enabling the actor if it ran before. The very first
    /// participant is handed the turn.
    pub fn notify_process_created(&self, id: u64, name: &str) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let stopped = state.is_stopped();
        let info = state
            .actors
            .entry(id)
            .and_modify(ActorInfo::reenable)
            .or_insert_with(|| ActorInfo::new(id, name));
        log::trace!("Process created. id={}, name={}", id, info.name());
        if stopped {
            info.cancel();
        } else if state.scheduled.is_none() {
            info.active = true;
            info.grant();
            state.scheduled = Some(id);
            state.status = Status::Running;
        }
    }

    /// Called by a new handler thread. Announces that it is alive, then parks until it is given
    /// the turn.
    pub fn notify_process_started(&self, id: u64) -> Result<()> {
        let receiver = {
            let mut guard = self.state.lock();
            let info = guard.actors.get_mut(&id).ok_or(Error::Canceled)?;
            info.started = true;
            let receiver = info.receiver();
            self.started.notify_all();
            receiver
        };
        self.wait_for_turn(id, &receiver)
    }

    /// Called by the creator right after spawning the thread for `id`. Returns once that thread
    /// has announced itself, so that no thread is left half started when the creator moves on.
    pub fn wait_for_process_to_start(&self, id: u64) {
        let mut guard = self.state.lock();
        while !guard.is_stopped() && guard.actors.get(&id).map_or(false, |info| !info.started) {
            self.started.wait(&mut guard);
        }
    }

    /// A scheduling point for the participant holding the turn.
    pub fn schedule(&self) -> Result<()> {
        let (current, receiver) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.actors.is_empty() {
                return Ok(());
            }
            if state.is_stopped() {
                return Err(Error::Canceled);
            }
            let Some(current) = state.scheduled else {
                return Ok(());
            };
            let Some(next) = self.choose(state, current) else {
                self.stop_locked(state, StopReason::FullyExplored);
                return Err(Error::Canceled);
            };
            state.trace.push(next);
            if next == current {
                return Ok(());
            }
            log::trace!("Switching. from={}, to={}", current, next);
            let receiver = match state.actors.get_mut(&current) {
                Some(info) => {
                    info.active = false;
                    info.receiver()
                }
                None => return Err(Error::Canceled),
            };
            self.hand_over(state, next);
            (current, receiver)
        };
        self.wait_for_turn(current, &receiver)
    }

    /// Called by a handler thread whose run is over. Passes the turn on without parking.
    pub fn notify_process_halted(&self, id: u64) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if let Some(info) = state.actors.get_mut(&id) {
            info.enabled = false;
            info.active = false;
            info.halted = true;
        }
        if state.is_stopped() || state.scheduled != Some(id) {
            return;
        }
        match self.choose(state, id) {
            Some(next) => {
                state.trace.push(next);
                log::trace!("Halted, switching. from={}, to={}", id, next);
                self.hand_over(state, next);
            }
            None => self.stop_locked(state, StopReason::FullyExplored),
        }
    }

    /// A nondeterministic choice made by the strategy.
    pub fn next_boolean_choice(&self) -> Result<bool> {
        if self.state.lock().is_stopped() {
            return Err(Error::Canceled);
        }
        let choice = self.strategy.lock().get_next_boolean_choice(2);
        match choice {
            Some(choice) => Ok(choice),
            None => {
                self.stop(StopReason::FullyExplored);
                Err(Error::Canceled)
            }
        }
    }

    /// Records the first bug of the iteration and stops it. Later failures are ignored.
    pub fn notify_assertion_failure(&self, message: &str) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.is_stopped() {
            return;
        }
        state.bug = Some(message.to_owned());
        self.stop_locked(state, StopReason::BugFound);
    }

    /// Ends the iteration. Every parked participant wakes up canceled.
    pub fn stop(&self, reason: StopReason) {
        let mut guard = self.state.lock();
        self.stop_locked(&mut guard, reason);
    }

    /// Blocks until the iteration has stopped.
    pub fn wait(&self) {
        let mut guard = self.state.lock();
        while !guard.is_stopped() {
            self.stopped.wait(&mut guard);
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self.state.lock().status {
            Status::Stopped(reason) => Some(reason),
            _ => None,
        }
    }

    /// The message of the bug that stopped the iteration, if one did.
    pub fn bug(&self) -> Option<String> {
        self.state.lock().bug.clone()
    }

    /// The ids chosen at every scheduling decision so far.
    pub fn trace(&self) -> Vec<u64> {
        self.state.lock().trace.clone()
    }

    /// How many participants hold the turn. Never more than one.
    pub fn active_count(&self) -> usize {
        self.state.lock().actors.values().filter(|info| info.is_active()).count()
    }

    fn choose(&self, state: &SchedulerState, current: u64) -> Option<u64> {
        let current = state.actors.get(&current)?;
        let choices: Vec<&ActorInfo> = state.actors.values().collect();
        let mut strategy = self.strategy.lock();
        strategy.try_get_next(&choices, current).map(ActorInfo::id)
    }

    fn hand_over(&self, state: &mut SchedulerState, next: u64) {
        state.scheduled = Some(next);
        if let Some(info) = state.actors.get_mut(&next) {
            info.active = true;
            info.grant();
        }
    }

    fn stop_locked(&self, state: &mut SchedulerState, reason: StopReason) {
        if state.is_stopped() {
            return;
        }
        if reason == StopReason::FullyExplored {
            emit(&self.configuration, format_args!("<ScheduleLog> Schedule explored."));
        }
        state.status = Status::Stopped(reason);
        for info in state.actors.values_mut() {
            info.enabled = false;
            info.active = false;
            info.halted = true;
            info.cancel();
        }
        self.started.notify_all();
        self.stopped.notify_all();
    }

    fn wait_for_turn(&self, id: u64, receiver: &Receiver<Turn>) -> Result<()> {
        match receiver.recv() {
            Ok(Turn::Run) => {
                let guard = self.state.lock();
                let enabled = guard.actors.get(&id).map_or(false, ActorInfo::is_enabled);
                if guard.is_stopped() || !enabled {
                    Err(Error::Canceled)
                } else {
                    Ok(())
                }
            }
            Ok(Turn::Cancel) | Err(_) => Err(Error::Canceled),
        }
    }
}
