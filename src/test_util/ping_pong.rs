//! A client machine that pings a server actor five times, watched by a safety monitor.

use crate::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counters shared with the test once the actors are moved into the runtime.
#[derive(Clone, Default)]
pub struct Summary {
    pongs_received: Arc<AtomicUsize>,
    pings_answered: Arc<AtomicUsize>,
}

impl Summary {
    pub fn pongs_received(&self) -> usize {
        self.pongs_received.load(Ordering::SeqCst)
    }

    pub fn pings_answered(&self) -> usize {
        self.pings_answered.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Config(pub ActorId);
#[derive(Debug)]
pub struct Ping {
    pub reply_to: ActorId,
}
#[derive(Debug)]
pub struct Pong;
#[derive(Debug)]
pub struct PingSent;
#[derive(Debug)]
struct Local;

pub const ROUNDS: u32 = 5;

pub struct Server {
    summary: Summary,
}

impl Server {
    pub fn new(summary: &Summary) -> Self {
        Server { summary: summary.clone() }
    }
}

impl Actor for Server {
    fn handle_event(&mut self, ctx: &mut Context<'_>, event: Event) -> Result<()> {
        if let Some(Ping { reply_to }) = event.payload::<Ping>() {
            self.summary.pings_answered.fetch_add(1, Ordering::SeqCst);
            ctx.send(reply_to, Event::new(Pong))?;
        }
        Ok(())
    }
}

pub struct Client {
    server: Option<ActorId>,
    counter: u32,
    summary: Summary,
}

impl Client {
    pub fn new(summary: &Summary) -> Self {
        Client {
            server: None,
            counter: 0,
            summary: summary.clone(),
        }
    }

    fn send_ping(&mut self, ctx: &mut MachineContext<'_, '_>) -> Result<()> {
        if self.counter >= ROUNDS {
            return Ok(());
        }
        let Some(server) = &self.server else {
            return ctx.assert(false, "Client has no server.");
        };
        ctx.invoke_monitor("Safety", Event::new(PingSent))?;
        let reply_to = ctx.id().clone();
        ctx.send(server, Event::new(Ping { reply_to }))?;
        self.counter += 1;
        Ok(())
    }
}

impl Machine for Client {
    fn declare(&self, states: &mut StateDeclarations<Self>) {
        states
            .start_state("Init")
            .on_entry(|client, ctx, init| {
                client.server = init.and_then(|e| e.into_payload::<Config>().ok()).map(|c| c.0);
                client.counter = 0;
                ctx.raise(Event::new(Local))
            })
            .on_event_goto::<Local>("Active");
        states
            .state("Active")
            .on_entry(|client, ctx, _| client.send_ping(ctx))
            .on_event_do::<Pong, _>(|client, ctx, _| {
                client.summary.pongs_received.fetch_add(1, Ordering::SeqCst);
                ctx.invoke_monitor("Safety", Event::new(Pong))?;
                client.send_ping(ctx)
            });
    }
}

/// Never more pongs than pings.
#[derive(Default)]
pub struct Safety {
    pings: u32,
    pongs: u32,
}

impl Monitor for Safety {
    fn declare(&self, states: &mut MonitorDeclarations<Self>) {
        states
            .start_state("Init")
            .on_event_do::<PingSent, _>(|safety, _, _| {
                safety.pings += 1;
                Ok(())
            })
            .on_event_do::<Pong, _>(|safety, ctx, _| {
                safety.pongs += 1;
                ctx.assert(safety.pongs <= safety.pings, "Received more pongs than pings sent.")
            });
    }
}

pub fn launch(runtime: &dyn Runtime, summary: &Summary) -> Result<()> {
    runtime.register_monitor("Safety", Safety::default())?;
    let server = runtime.create_actor("Server", Server::new(summary), None)?;
    runtime.create_machine("Client", Client::new(summary), Some(Event::new(Config(server))))?;
    Ok(())
}
