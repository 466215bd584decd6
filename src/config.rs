//! Private module for selective re-export.

use serde::{Deserialize, Serialize};

/// Which [`ExplorationStrategy`](crate::testing::ExplorationStrategy) the bug finder uses by
/// default.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Picks uniformly among enabled actors at every scheduling point.
    #[default]
    Random,
}

/// Settings shared by both runtimes and the bug-finding engine. Immutable once a runtime owns
/// a copy.
///
/// Missing fields take their defaults when deserializing, so a partial JSON document works:
///
/// ```
/// use stepwise::Configuration;
/// let configuration = Configuration::from_json(r#"{ "scheduling_iterations": 10 }"#).unwrap();
/// assert_eq!(configuration.scheduling_iterations, 10);
/// assert!(!configuration.verbosity);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Emits runtime diagnostic lines (`<SendLog>` and friends) at `info` instead of `trace`.
    pub verbosity: bool,
    /// Emits engine progress lines at `info` instead of `debug`.
    pub tool_verbosity: bool,
    /// Upper bound on the number of bug-finding iterations. Values below one count as one.
    pub scheduling_iterations: usize,
    pub strategy: StrategyKind,
    /// Seed for random choices. Absent means seeded from entropy.
    pub random_seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            verbosity: false,
            tool_verbosity: false,
            scheduling_iterations: 1,
            strategy: StrategyKind::Random,
            random_seed: None,
        }
    }
}

impl Configuration {
    pub fn verbosity(mut self, verbosity: bool) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn tool_verbosity(mut self, tool_verbosity: bool) -> Self {
        self.tool_verbosity = tool_verbosity;
        self
    }

    pub fn scheduling_iterations(mut self, scheduling_iterations: usize) -> Self {
        self.scheduling_iterations = scheduling_iterations;
        self
    }

    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let configuration = Configuration::default();
        assert_eq!(configuration.scheduling_iterations, 1);
        assert_eq!(configuration.strategy, StrategyKind::Random);
        assert_eq!(configuration.random_seed, None);
        assert!(!configuration.verbosity);
        assert!(!configuration.tool_verbosity);
    }

    #[test]
    fn builder_chains() {
        let configuration = Configuration::default()
            .verbosity(true)
            .scheduling_iterations(5)
            .random_seed(42);
        assert!(configuration.verbosity);
        assert_eq!(configuration.scheduling_iterations, 5);
        assert_eq!(configuration.random_seed, Some(42));
    }

    #[test]
    fn survives_json() {
        let configuration = Configuration::default().tool_verbosity(true).random_seed(9);
        let json = serde_json::to_string(&configuration).unwrap();
        assert_eq!(Configuration::from_json(&json).unwrap(), configuration);
        assert_eq!(
            Configuration::from_json(r#"{"strategy": "Random"}"#).unwrap(),
            Configuration::default());
    }
}
