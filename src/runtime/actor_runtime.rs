use crate::actor::{ActorBlueprint, ActorId, Launch, Schedulable};
use crate::error::panic_message;
use crate::monitor::MonitorBlueprint;
use crate::runtime::{check_send, emit, next_instance, Runtime};
use crate::{Configuration, Error, Event, Result};
use dashmap::DashMap;
use nohash_hasher::BuildNoHashHasher;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

/// Runs every handler on its own OS thread with no artificial ordering. Monitors are not run.
pub struct ActorRuntime {
    this: Weak<ActorRuntime>,
    instance: u64,
    configuration: Configuration,
    next_id: AtomicU64,
    actors: DashMap<u64, Arc<dyn Schedulable>, BuildNoHashHasher<u64>>,
    handles: Mutex<Vec<JoinHandle<Result<()>>>>,
    rng: Mutex<StdRng>,
}

impl ActorRuntime {
    pub fn new(configuration: Configuration) -> Arc<Self> {
        let rng = match configuration.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Arc::new_cyclic(|this| ActorRuntime {
            this: Weak::clone(this),
            instance: next_instance(),
            configuration,
            next_id: AtomicU64::new(0),
            actors: DashMap::default(),
            handles: Mutex::new(Vec::new()),
            rng: Mutex::new(rng),
        })
    }

    fn spawn(&self, cell: Arc<dyn Schedulable>, launch: Launch) -> Result<()> {
        let runtime = self.this.upgrade().ok_or(Error::Canceled)?;
        let handle = thread::Builder::new()
            .name(format!("actor-{}", cell.id()))
            .spawn(move || {
                let result = cell.run(&*runtime, launch);
                if let Err(Error::AssertionFailure(message)) = &result {
                    log::debug!("Actor task failed. id={}, error={}", cell.id(), message);
                }
                result
            })
            .map_err(|e| Error::Spawn(e.to_string()))?;
        self.handles.lock().push(handle);
        Ok(())
    }
}

impl Runtime for ActorRuntime {
    fn instance(&self) -> u64 {
        self.instance
    }

    fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn create(&self, name: &str, blueprint: ActorBlueprint, init: Option<Event>) -> Result<ActorId> {
        let id = ActorId::new(self.next_id.fetch_add(1, Ordering::SeqCst), name, self.instance);
        let kind = blueprint.kind();
        let cell = blueprint.build(id.clone(), self)?;
        self.log(format_args!("<CreateLog> {} '{}' is created.", kind, id));
        self.actors.insert(id.value(), Arc::clone(&cell));
        self.spawn(cell, Launch::Start(init))?;
        Ok(id)
    }

    fn register_monitor_blueprint(&self, _name: &str, _blueprint: MonitorBlueprint) -> Result<()> {
        Ok(())
    }

    fn send_event(&self, sender: Option<&ActorId>, target: &ActorId, event: Event) -> Result<()> {
        check_send(self, sender, target, &event)?;
        let cell = match self.actors.get(&target.value()) {
            Some(cell) => Arc::clone(cell.value()),
            None => return Ok(()),
        };
        if cell.enqueue(event, self) {
            self.spawn(cell, Launch::Resume)?;
        }
        Ok(())
    }

    fn invoke_monitor(&self, _name: &str, _event: Event) -> Result<()> {
        Ok(())
    }

    fn assert(&self, predicate: bool, message: &str) -> Result<()> {
        if predicate {
            return Ok(());
        }
        log::error!("<ErrorLog> {}", message);
        Err(Error::AssertionFailure(message.to_owned()))
    }

    fn random_boolean(&self) -> Result<bool> {
        Ok(self.rng.lock().gen())
    }

    fn log(&self, args: fmt::Arguments<'_>) {
        emit(&self.configuration, args)
    }

    /// Joins handler threads until none remain, including threads spawned while waiting.
    fn wait(&self) -> Result<()> {
        let mut outcome = Ok(());
        loop {
            let handles = std::mem::take(&mut *self.handles.lock());
            if handles.is_empty() {
                return outcome;
            }
            for handle in handles {
                let result = handle
                    .join()
                    .unwrap_or_else(|panic| Err(Error::AssertionFailure(panic_message(&*panic))));
                if let Err(error) = result {
                    if outcome.is_ok() {
                        outcome = Err(error);
                    }
                }
            }
        }
    }

    fn current_state(&self, id: &ActorId) -> Option<String> {
        if !id.is_owned_by(self) {
            return None;
        }
        let cell = self.actors.get(&id.value()).map(|cell| Arc::clone(cell.value()))?;
        cell.current_state()
    }

    fn monitor_state(&self, _name: &str) -> Option<String> {
        None
    }
}
