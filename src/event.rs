//! Events are the only thing actors exchange. An [`Event`] carries a payload of any
//! `'static` type; its [`EventKind`] is derived from that type and drives handler lookup.
//!
//! ```
//! use stepwise::{Event, EventKind};
//!
//! #[derive(Debug, PartialEq)]
//! struct Ping(u32);
//!
//! let event = Event::new(Ping(3));
//! assert_eq!(event.kind(), EventKind::of::<Ping>());
//! assert_eq!(event.name(), "Ping");
//! assert_eq!(event.payload::<Ping>(), Some(&Ping(3)));
//! ```

use std::any::{Any, TypeId};
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};

/// Anything that can ride inside an [`Event`].
pub trait Payload: Any + Debug + Send + Sync {}
impl<T> Payload for T where T: Any + Debug + Send + Sync {}

/// Identifies the type of an event's payload. Two kinds are equal when their payload types are.
#[derive(Clone, Copy)]
pub struct EventKind {
    type_id: TypeId,
    name: &'static str,
}

impl EventKind {
    /// The kind of events carrying a `T`.
    pub fn of<T: Payload>() -> Self {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let name = base.rsplit("::").next().unwrap_or(base);
        EventKind {
            type_id: TypeId::of::<T>(),
            name,
        }
    }

    /// Short type name, used in diagnostic lines.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for EventKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}
impl Eq for EventKind {}

impl Hash for EventKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state)
    }
}

impl Debug for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Payload of the built-in empty event.
#[derive(Debug)]
struct NullEvent;

/// Payload of the built-in directive that moves a machine to a named state.
#[derive(Debug)]
struct JumpEvent;

type ErasedPayload = Box<dyn Any + Send + Sync>;
type PayloadFormatter = fn(&(dyn Any + Send + Sync), &mut Formatter<'_>) -> fmt::Result;

enum Body {
    Empty,
    Jump(String),
    User {
        kind: EventKind,
        payload: ErasedPayload,
        format: PayloadFormatter,
    },
}

/// A message delivered to an actor, monitor, or state machine.
pub struct Event(Body);

fn format_payload<T: Payload>(payload: &(dyn Any + Send + Sync), f: &mut Formatter<'_>) -> fmt::Result {
    match payload.downcast_ref::<T>() {
        Some(payload) => Debug::fmt(payload, f),
        None => f.write_str("?"),
    }
}

impl Event {
    /// Wraps a payload.
    pub fn new<T: Payload>(payload: T) -> Self {
        Event(Body::User {
            kind: EventKind::of::<T>(),
            payload: Box::new(payload),
            format: format_payload::<T>,
        })
    }

    /// The empty event. It can never be sent or raised.
    pub fn empty() -> Self {
        Event(Body::Empty)
    }

    pub(crate) fn jump(state: impl Into<String>) -> Self {
        Event(Body::Jump(state.into()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.0, Body::Empty)
    }

    pub(crate) fn jump_target(&self) -> Option<&str> {
        match &self.0 {
            Body::Jump(state) => Some(state),
            _ => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match &self.0 {
            Body::Empty => EventKind::of::<NullEvent>(),
            Body::Jump(_) => EventKind::of::<JumpEvent>(),
            Body::User { kind, .. } => *kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Whether the payload is a `T`.
    pub fn is<T: Payload>(&self) -> bool {
        self.payload::<T>().is_some()
    }

    /// Borrows the payload if it is a `T`.
    pub fn payload<T: Payload>(&self) -> Option<&T> {
        match &self.0 {
            Body::User { payload, .. } => payload.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Takes the payload out if it is a `T`, otherwise hands the event back.
    pub fn into_payload<T: Payload>(self) -> Result<T, Event> {
        match self.0 {
            Body::User {
                kind,
                payload,
                format,
            } => match payload.downcast::<T>() {
                Ok(payload) => Ok(*payload),
                Err(payload) => Err(Event(Body::User {
                    kind,
                    payload,
                    format,
                })),
            },
            body => Err(Event(body)),
        }
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Body::Empty => f.write_str("NullEvent"),
            Body::Jump(state) => write!(f, "JumpEvent({:?})", state),
            Body::User {
                payload, format, ..
            } => format(&**payload, f),
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
