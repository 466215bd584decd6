use crate::testing::ActorInfo;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides which actor runs next at every scheduling point. One instance serves every iteration
/// of a bug-finding run, so it can carry state (and randomness) across iterations.
pub trait ExplorationStrategy: Send {
    /// Picks the next actor among the enabled entries of `choices`, which are ordered by id.
    /// `None` means nothing is left to run: the schedule is fully explored.
    fn try_get_next<'a>(&mut self, choices: &[&'a ActorInfo], current: &ActorInfo) -> Option<&'a ActorInfo>;

    /// A nondeterministic boolean, true with probability `1 / max_value` for random strategies.
    /// `None` ends the iteration as fully explored.
    fn get_next_boolean_choice(&mut self, max_value: u32) -> Option<bool>;

    /// Called between iterations. `false` ends the run early.
    fn prepare_for_next_iteration(&mut self) -> bool;

    fn description(&self) -> String;
}

/// Chooses uniformly at random among enabled actors. Seeded instances replay the same choices.
pub struct RandomStrategy {
    seed: u64,
    rng: StdRng,
}

impl RandomStrategy {
    /// Seeds from entropy when `seed` is `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        RandomStrategy {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl ExplorationStrategy for RandomStrategy {
    fn try_get_next<'a>(&mut self, choices: &[&'a ActorInfo], _current: &ActorInfo) -> Option<&'a ActorInfo> {
        let enabled: Vec<&'a ActorInfo> = choices.iter().copied().filter(|info| info.is_enabled()).collect();
        if enabled.is_empty() {
            return None;
        }
        Some(enabled[self.rng.gen_range(0..enabled.len())])
    }

    fn get_next_boolean_choice(&mut self, max_value: u32) -> Option<bool> {
        Some(self.rng.gen_range(0..max_value.max(1)) == 0)
    }

    fn prepare_for_next_iteration(&mut self) -> bool {
        true
    }

    fn description(&self) -> String {
        format!("random[seed '{}']", self.seed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn infos() -> Vec<ActorInfo> {
        let mut infos: Vec<ActorInfo> = (0..4).map(|id| ActorInfo::new(id, "")).collect();
        infos[1].enabled = false;
        infos[3].enabled = false;
        infos
    }

    #[test]
    fn only_picks_enabled_actors() {
        let infos = infos();
        let choices: Vec<&ActorInfo> = infos.iter().collect();
        let mut strategy = RandomStrategy::new(Some(5));
        for _ in 0..100 {
            let next = strategy.try_get_next(&choices, &infos[0]).unwrap();
            assert!(next.id() == 0 || next.id() == 2);
        }
    }

    #[test]
    fn nothing_enabled_means_explored() {
        let mut infos = infos();
        for info in &mut infos {
            info.enabled = false;
        }
        let choices: Vec<&ActorInfo> = infos.iter().collect();
        assert!(RandomStrategy::new(None).try_get_next(&choices, &infos[0]).is_none());
    }

    #[test]
    fn seeds_replay() {
        let infos = infos();
        let choices: Vec<&ActorInfo> = infos.iter().collect();
        let picks = |seed| {
            let mut strategy = RandomStrategy::new(Some(seed));
            (0..32)
                .map(|_| strategy.try_get_next(&choices, &infos[0]).unwrap().id())
                .collect::<Vec<_>>()
        };
        assert_eq!(picks(17), picks(17));
        assert_eq!(RandomStrategy::new(Some(17)).description(), "random[seed '17']");
    }

    #[test]
    fn boolean_choice_with_one_option_is_always_true() {
        let mut strategy = RandomStrategy::new(Some(1));
        assert!((0..10).all(|_| strategy.get_next_boolean_choice(1) == Some(true)));
        assert!(strategy.prepare_for_next_iteration());
    }
}
