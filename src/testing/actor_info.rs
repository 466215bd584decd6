use crossbeam_channel::{Receiver, Sender};
use std::fmt::{self, Debug, Formatter};

/// What a parked thread receives from the scheduler.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Turn {
    Run,
    Cancel,
}

/// Scheduling bookkeeping for one actor during a bug-finding iteration. An actor whose handler
/// run ended is disabled; a later delivery re-enables the same record for the next run.
pub struct ActorInfo {
    id: u64,
    name: String,
    pub(crate) enabled: bool,
    pub(crate) active: bool,
    pub(crate) started: bool,
    pub(crate) halted: bool,
    turn_tx: Sender<Turn>,
    turn_rx: Receiver<Turn>,
}

impl ActorInfo {
    pub(crate) fn new(id: u64, name: &str) -> Self {
        let (turn_tx, turn_rx) = crossbeam_channel::unbounded();
        ActorInfo {
            id,
            name: name.to_owned(),
            enabled: true,
            active: false,
            started: false,
            halted: false,
            turn_tx,
            turn_rx,
        }
    }

    /// Readies the record for a new handler run. Tokens left for the previous run are discarded
    /// with its channel.
    pub(crate) fn reenable(&mut self) {
        let (turn_tx, turn_rx) = crossbeam_channel::unbounded();
        self.turn_tx = turn_tx;
        self.turn_rx = turn_rx;
        self.enabled = true;
        self.active = false;
        self.started = false;
        self.halted = false;
    }

    pub(crate) fn grant(&self) {
        // The record holds a receiver, so the channel is never disconnected.
        let _ = self.turn_tx.send(Turn::Run);
    }

    pub(crate) fn cancel(&self) {
        let _ = self.turn_tx.send(Turn::Cancel);
    }

    pub(crate) fn receiver(&self) -> Receiver<Turn> {
        self.turn_rx.clone()
    }

    /// The [`ActorId`](crate::ActorId) value of the actor.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Eligible to be given the turn.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Holds the turn right now. At most one actor is active at a time.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Its handler thread is up and waiting for, or holding, the turn.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

impl Debug for ActorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("active", &self.active)
            .field("started", &self.started)
            .field("halted", &self.halted)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reenabling_discards_pending_tokens() {
        let mut info = ActorInfo::new(3, "Client(3)");
        info.cancel();
        info.enabled = false;
        info.halted = true;
        info.reenable();
        assert!(info.is_enabled());
        assert!(!info.is_halted());
        assert!(info.receiver().try_recv().is_err());
        info.grant();
        assert_eq!(info.receiver().try_recv(), Ok(Turn::Run));
    }
}
