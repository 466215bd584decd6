use crate::actor::Context;
use crate::{Event, Result};
use std::ops::{Deref, DerefMut};

/// The [`Context`] of a state machine handler, extended with the operations that act on the
/// machine's own state stack. Dereferences to [`Context`] for sending, creating, and asserting.
pub struct MachineContext<'a, 'b> {
    pub(crate) ctx: &'a mut Context<'b>,
    pub(crate) current: &'a str,
    pub(crate) depth: usize,
    pub(crate) is_declared: &'a dyn Fn(&str) -> bool,
    pub(crate) raised: &'a mut Option<Event>,
    pub(crate) pop_requested: &'a mut bool,
}

impl<'a, 'b> MachineContext<'a, 'b> {
    /// The state whose handler is running.
    pub fn current_state(&self) -> &str {
        self.current
    }

    /// Makes `event` the next event this machine handles, ahead of its mailbox.
    pub fn raise(&mut self, event: Event) -> Result<()> {
        let id = self.ctx.id().clone();
        self.ctx
            .assert(!event.is_empty(), &format!("Machine '{}' cannot raise a null event.", id))?;
        self.ctx
            .log(format_args!("<RaiseLog> Machine '{}' raised event '{}'.", id, event.name()));
        *self.raised = Some(event);
        Ok(())
    }

    /// Moves to `state` once the running handler returns, exiting the current state first.
    pub fn jump(&mut self, state: &str) -> Result<()> {
        let declared = (self.is_declared)(state);
        let id = self.ctx.id().clone();
        self.ctx.assert(
            declared,
            &format!("Machine '{}' cannot jump to undeclared state '{}'.", id, state),
        )?;
        *self.raised = Some(Event::jump(state));
        Ok(())
    }

    /// Pops the current state once the running handler returns, resuming the state below it.
    pub fn pop(&mut self) -> Result<()> {
        let id = self.ctx.id().clone();
        self.ctx.assert(
            self.depth > 1,
            &format!("Machine '{}' popped with no matching push.", id),
        )?;
        *self.pop_requested = true;
        Ok(())
    }
}

impl<'a, 'b> Deref for MachineContext<'a, 'b> {
    type Target = Context<'b>;

    fn deref(&self) -> &Context<'b> {
        self.ctx
    }
}

impl<'a, 'b> DerefMut for MachineContext<'a, 'b> {
    fn deref_mut(&mut self) -> &mut Context<'b> {
        self.ctx
    }
}
