//! A ring of processes kept in lockstep by a scheduler machine. Each process tells both
//! neighbors its round count, and each neighbor checks that it is at most one round ahead.

use crate::*;

pub const MAX_PROCESSES: usize = 10;
pub const ROUNDS: u32 = 10;

#[derive(Debug)]
pub struct Config(pub usize);
#[derive(Debug)]
struct ProcessConfig(ActorId);
#[derive(Debug)]
struct Initialise {
    left: ActorId,
    right: ActorId,
}
#[derive(Debug)]
struct Req;
#[derive(Debug)]
struct Resp;
#[derive(Debug)]
struct Unit;
#[derive(Debug)]
struct MyCount(u32);

#[derive(Default)]
pub struct Scheduler {
    processes: Vec<ActorId>,
    count: usize,
}

impl Machine for Scheduler {
    fn declare(&self, states: &mut StateDeclarations<Self>) {
        states
            .start_state("Init")
            .on_event_do::<Config, _>(|scheduler, ctx, event| {
                let size = event.payload::<Config>().map_or(0, |c| c.0);
                ctx.assert(
                    (3..=MAX_PROCESSES).contains(&size),
                    &format!("Expected between 3 and {} processes.", MAX_PROCESSES),
                )?;
                let me = ctx.id().clone();
                for _ in 0..size {
                    let process = ctx.create_machine(
                        "Process",
                        Process::default(),
                        Some(Event::new(ProcessConfig(me.clone()))),
                    )?;
                    scheduler.processes.push(process);
                }
                for i in 0..size {
                    let left = scheduler.processes[(i + size - 1) % size].clone();
                    let right = scheduler.processes[(i + 1) % size].clone();
                    ctx.send(&scheduler.processes[i], Event::new(Initialise { left, right }))?;
                }
                scheduler.count = 0;
                ctx.jump("Sync")
            })
            .defer::<Req>();
        states
            .state("Sync")
            .on_exit(|scheduler, ctx| {
                for process in &scheduler.processes {
                    ctx.send(process, Event::new(Resp))?;
                }
                Ok(())
            })
            .on_event_do::<Req, _>(|scheduler, ctx, _| {
                scheduler.count += 1;
                if scheduler.count == scheduler.processes.len() {
                    scheduler.count = 0;
                    ctx.raise(Event::new(Unit))?;
                }
                Ok(())
            })
            .on_event_goto::<Unit>("Sync");
    }
}

#[derive(Default)]
pub struct Process {
    scheduler: Option<ActorId>,
    left: Option<ActorId>,
    right: Option<ActorId>,
    count: u32,
}

impl Process {
    fn neighbors(&self) -> impl Iterator<Item = &ActorId> {
        self.left.iter().chain(self.right.iter())
    }
}

impl Machine for Process {
    fn declare(&self, states: &mut StateDeclarations<Self>) {
        states
            .start_state("Init")
            .on_entry(|process, ctx, init| {
                process.scheduler = init.and_then(|e| e.into_payload::<ProcessConfig>().ok()).map(|c| c.0);
                ctx.assert(process.scheduler.is_some(), "Process started without a scheduler.")
            })
            .on_event_do::<Initialise, _>(|process, ctx, event| {
                if let Ok(Initialise { left, right }) = event.into_payload::<Initialise>() {
                    process.left = Some(left);
                    process.right = Some(right);
                }
                if let Some(scheduler) = &process.scheduler {
                    ctx.send(scheduler, Event::new(Req))?;
                }
                ctx.jump("Syncing")
            })
            .defer::<Resp>()
            .defer::<MyCount>();
        states
            .state("Syncing")
            .on_event_do::<Resp, _>(|process, ctx, _| {
                process.count += 1;
                for neighbor in process.neighbors() {
                    ctx.send(neighbor, Event::new(MyCount(process.count)))?;
                }
                if let Some(scheduler) = &process.scheduler {
                    ctx.send(scheduler, Event::new(Req))?;
                }
                if process.count == ROUNDS {
                    ctx.halt();
                }
                Ok(())
            })
            .on_event_do::<MyCount, _>(|process, ctx, event| {
                let count = event.payload::<MyCount>().map_or(0, |c| c.0);
                ctx.assert(
                    process.count == count || process.count + 1 == count,
                    "Received wrong count!",
                )
            });
    }
}

pub fn launch(runtime: &dyn Runtime, processes: usize) -> Result<()> {
    let scheduler = runtime.create_machine("Scheduler", Scheduler::default(), None)?;
    runtime.send(&scheduler, Event::new(Config(processes)))
}
