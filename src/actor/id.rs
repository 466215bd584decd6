use crate::Runtime;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Uniquely identifies an actor within the [`Runtime`] that created it. Cheap to clone.
///
/// Values come from a counter owned by the runtime instance, so two runtimes (for example two
/// bug-finding iterations) hand out the same values. The id remembers its runtime, which lets
/// the runtime reject ids that belong to another instance.
#[derive(Clone)]
pub struct ActorId(Arc<Inner>);

struct Inner {
    value: u64,
    name: String,
    runtime: u64,
}

impl ActorId {
    pub(crate) fn new(value: u64, name: &str, runtime: u64) -> Self {
        ActorId(Arc::new(Inner {
            value,
            name: name.to_owned(),
            runtime,
        }))
    }

    /// The numeric part of the id.
    pub fn value(&self) -> u64 {
        self.0.value
    }

    /// The name given at creation, possibly empty.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Whether this id was issued by `runtime`.
    pub fn is_owned_by(&self, runtime: &dyn Runtime) -> bool {
        self.0.runtime == runtime.instance()
    }
}

impl PartialEq for ActorId {
    fn eq(&self, other: &Self) -> bool {
        self.0.value == other.0.value && self.0.runtime == other.0.runtime
    }
}
impl Eq for ActorId {}

impl Hash for ActorId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.runtime.hash(state);
        self.0.value.hash(state);
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.name.is_empty() {
            write!(f, "{}", self.0.value)
        } else {
            write!(f, "{}({})", self.0.name, self.0.value)
        }
    }
}

impl Debug for ActorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn displays_name_and_value() {
        assert_eq!(ActorId::new(3, "Client", 0).to_string(), "Client(3)");
        assert_eq!(ActorId::new(3, "", 0).to_string(), "3");
        assert_eq!(format!("{:?}", ActorId::new(1, "Server", 0)), "ActorId(Server(1))");
    }

    #[test]
    fn equality_ignores_name_but_not_runtime() {
        assert_eq!(ActorId::new(1, "a", 7), ActorId::new(1, "b", 7));
        assert_ne!(ActorId::new(1, "a", 7), ActorId::new(1, "a", 8));
        assert_ne!(ActorId::new(1, "a", 7), ActorId::new(2, "a", 7));
    }
}
