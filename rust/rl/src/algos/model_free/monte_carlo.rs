use crate::algos::{no_actions, MdpSolver};
use crate::config::ModelFreeParams;
use mdp_env::*;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Weight given to an action that has no rollout yet: the shortest possible
/// rollout is a single step.
const UNSEEN_ACTION_WEIGHT: Continous = 1.;

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseScore {
    pub episodes: usize,
    pub score: usize,
}

impl PhaseScore {
    pub fn average(&self) -> Option<Continous> {
        (self.episodes > 0).then(|| self.score as Continous / self.episodes as Continous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelFreeOutcome {
    pub total_score: usize,
    pub explore: PhaseScore,
    pub exploit: PhaseScore,
    pub truncated_episodes: usize,
}

/// First step at which a (state, action) pair was taken in the current
/// exploit episode and how often it has been taken since.
#[derive(Debug, Clone, Copy)]
struct Visit {
    first_step: usize,
    taken: usize,
}

/// Monte-Carlo control on episode lengths. Only observed rollouts are used,
/// the true probabilities are only ever touched through the sampler.
pub struct MonteCarloControl {
    graph: Graph,
    params: ModelFreeParams,
    explore: PhaseScore,
    exploit: PhaseScore,
    truncated: usize,
}

impl MonteCarloControl {
    pub fn new(graph: Graph, params: ModelFreeParams) -> Self {
        Self {
            graph,
            params,
            explore: Default::default(),
            exploit: Default::default(),
            truncated: 0,
        }
    }

    pub fn total_score(&self) -> usize {
        self.explore.score + self.exploit.score
    }

    pub fn outcome(&self) -> ModelFreeOutcome {
        ModelFreeOutcome {
            total_score: self.total_score(),
            explore: self.explore,
            exploit: self.exploit,
            truncated_episodes: self.truncated,
        }
    }

    /// Runs `n` exploring episodes, cycling over every (state, action) pair.
    /// Each episode forces the pair's action first and records its length in
    /// the pair's rollout history.
    pub fn explore(&mut self, n: usize, rng: &mut dyn RngCore) -> Result<(), EnvError> {
        let pairs = self
            .graph
            .non_absorbing()
            .flat_map(|s| {
                self.graph
                    .state(s)
                    .action_labels()
                    .iter()
                    .map(move |a| (s, a.clone()))
            })
            .collect::<Vec<_>>();
        if pairs.is_empty() {
            return Ok(());
        }

        for (s, a) in pairs.iter().cycle().take(n) {
            let r = rollout(
                &self.graph,
                *s,
                Some(a.as_str()),
                &WeightedByRollout,
                rng,
                self.params.max_episode_steps,
            )?;
            self.note_truncation(*s, r);

            self.graph.record_rollout(*s, a, r.steps)?;
            self.refresh_utility(*s);
            self.explore.episodes += 1;
            self.explore.score += r.steps;
        }

        Ok(())
    }

    /// Runs `n` greedy episodes from uniformly chosen starting states.
    pub fn exploit(&mut self, n: usize, rng: &mut dyn RngCore) -> Result<(), EnvError> {
        let starts = self.graph.non_absorbing().collect::<Vec<_>>();
        if starts.is_empty() {
            return Ok(());
        }

        for _ in 0..n {
            let s = starts[rng.gen_range(0..starts.len())];
            let r = self.exploit_episode(s, rng)?;
            self.note_truncation(s, r);

            self.exploit.episodes += 1;
            self.exploit.score += r.steps;
        }

        Ok(())
    }

    /// One greedy walk to absorption. A pair taken earlier in the walk is an
    /// open sample at least `taken` steps long, so repeating a looping action
    /// raises its average until another action wins. Ties are broken at
    /// random. At the end every visited pair records its first-visit length.
    fn exploit_episode(&mut self, start: StateId, rng: &mut dyn RngCore) -> Result<Rollout, EnvError> {
        let mut visits: HashMap<(StateId, String), Visit> = HashMap::new();
        let mut s = start;
        let mut steps = 0;
        let mut truncated = false;

        while !self.graph.is_absorbing(s) {
            if self.params.max_episode_steps.is_some_and(|m| steps >= m) {
                truncated = true;
                break;
            }

            let a = self.greedy_action(s, &visits, rng)?;
            visits
                .entry((s, a.clone()))
                .or_insert(Visit {
                    first_step: steps,
                    taken: 0,
                })
                .taken += 1;
            s = sample_next(&self.graph, s, &a, rng)?;
            steps += 1;
        }

        for ((s, a), v) in visits {
            self.graph.record_rollout(s, &a, steps - v.first_step)?;
            self.refresh_utility(s);
        }

        Ok(Rollout { steps, truncated })
    }

    fn greedy_action(
        &self,
        s: StateId,
        visits: &HashMap<(StateId, String), Visit>,
        rng: &mut dyn RngCore,
    ) -> Result<String, EnvError> {
        let state = self.graph.state(s);
        let scores = state
            .action_labels()
            .iter()
            .map(|a| {
                let open = visits.get(&(s, a.clone())).map_or(0, |v| v.taken);
                (a.as_str(), rollout_score(state, a, open))
            })
            .collect::<Vec<_>>();

        let best = scores
            .iter()
            .map(|&(_, x)| x)
            .min_by(|x, y| x.total_cmp(y))
            .ok_or_else(|| no_actions(&self.graph, s))?;
        let ties = scores
            .iter()
            .filter(|&&(_, x)| x == best)
            .map(|&(a, _)| a)
            .collect::<Vec<_>>();

        ties.choose(rng)
            .map(|a| a.to_string())
            .ok_or_else(|| no_actions(&self.graph, s))
    }

    fn note_truncation(&mut self, s: StateId, r: Rollout) {
        if r.truncated {
            self.truncated += 1;
            warn!(
                start = self.graph.state(s).name(),
                steps = r.steps,
                "episode truncated before absorption"
            );
        }
    }

    /// Utility of a state is its best average rollout length.
    fn refresh_utility(&mut self, s: StateId) {
        let state = self.graph.state(s);
        let best = state
            .action_labels()
            .iter()
            .filter_map(|a| state.average_rollout(a))
            .min_by(|x, y| x.total_cmp(y));

        if let Some(u) = best {
            self.graph.set_utility(s, u);
        }
    }
}

impl MdpSolver<ModelFreeOutcome> for MonteCarloControl {
    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn pi_star(&self, s: StateId) -> Option<String> {
        if self.graph.is_absorbing(s) {
            return None;
        }

        get_optimal_action(&self.graph, s).map(str::to_string)
    }

    fn exec(&mut self, rng: &mut dyn RngCore) -> Result<ModelFreeOutcome, EnvError> {
        let n = self.params.total_episodes;
        let n_explore =
            ((n as Continous) * (1. - self.params.exploit_ratio)).round() as usize;
        let n_exploit = n.saturating_sub(n_explore);

        self.explore(n_explore, rng)?;
        debug!(episodes = n_explore, score = self.explore.score, "exploration done");
        self.exploit(n_exploit, rng)?;

        let outcome = self.outcome();
        info!(
            total_score = outcome.total_score,
            explore_episodes = outcome.explore.episodes,
            exploit_episodes = outcome.exploit.episodes,
            exploit_average = ?outcome.exploit.average(),
            "model-free run finished"
        );

        Ok(outcome)
    }
}

/// Average rollout length of `action` counting `open` as a lower bound on a
/// sample still in progress. An action with no samples at all scores as the
/// shortest possible rollout.
fn rollout_score(state: &State, action: &str, open: usize) -> Continous {
    let h = state.rollout_history(action);
    let n = h.len() + usize::from(open > 0);
    if n == 0 {
        UNSEEN_ACTION_WEIGHT
    } else {
        (h.iter().sum::<usize>() + open) as Continous / n as Continous
    }
}

/// Action with the lowest average rollout length, unseen actions scoring
/// as a single step. Ties go to the earlier label.
pub fn get_optimal_action(graph: &Graph, s: StateId) -> Option<&str> {
    let state = graph.state(s);
    let mut best: Option<(&str, Continous)> = None;
    for a in state.action_labels() {
        let score = rollout_score(state, a, 0);
        if best.map_or(true, |(_, b)| score < b) {
            best = Some((a.as_str(), score));
        }
    }

    best.map(|(a, _)| a)
}

struct ActionWeight<'a> {
    action: &'a str,
    weight: Continous,
}

impl<'a> Weighted<&'a str> for ActionWeight<'a> {
    fn s(&self) -> &'a str {
        self.action
    }

    fn p(&self) -> Continous {
        self.weight
    }
}

/// Picks an action with probability proportional to its average rollout length.
pub fn weighted_sample<'a>(graph: &'a Graph, s: StateId, rng: &mut dyn RngCore) -> Option<&'a str> {
    let state = graph.state(s);
    let weights = state
        .action_labels()
        .iter()
        .map(|a| ActionWeight {
            action: a,
            weight: rollout_score(state, a, 0),
        })
        .collect::<Vec<_>>();

    pick_next(rng, &weights)
}

struct WeightedByRollout;

impl Policy for WeightedByRollout {
    fn policy(&self, graph: &Graph, s: StateId, rng: &mut dyn RngCore) -> Result<String, EnvError> {
        weighted_sample(graph, s, rng)
            .map(str::to_string)
            .ok_or_else(|| no_actions(graph, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::simple_golf;
    use float_eq::*;
    use rand::prelude::*;

    fn green() -> Graph {
        Graph::build(&simple_golf::facts(), "In").unwrap()
    }

    #[test]
    fn explore_cycles_over_every_pair() {
        let mut mc = MonteCarloControl::new(green(), Default::default());
        let rng = &mut StdRng::seed_from_u64(2718);
        mc.explore(10, rng).unwrap();

        let g = mc.graph();
        assert_eq!(g.state(0).rollout_history("Putt").len(), 5);
        assert_eq!(g.state(0).rollout_history("Chip").len(), 5);
        // Chip never reaches the hole by itself.
        assert!(g.state(0).rollout_history("Chip").iter().all(|&n| n >= 2));
        let recorded = ["Putt", "Chip"]
            .iter()
            .flat_map(|a| g.state(0).rollout_history(a).to_vec())
            .sum::<usize>();
        assert_eq!(mc.total_score(), recorded);
    }

    #[test]
    fn utility_is_best_average_rollout() {
        let mut mc = MonteCarloControl::new(green(), Default::default());
        let rng = &mut StdRng::seed_from_u64(5);
        mc.explore(200, rng).unwrap();

        let g = mc.graph();
        let putt = g.state(0).average_rollout("Putt").unwrap();
        let chip = g.state(0).average_rollout("Chip").unwrap();
        assert_float_eq!(g.state(0).utility(), putt.min(chip), abs <= 1e-12);
        assert_eq!(g.state(g.absorbing()).utility(), 0.);
    }

    #[test]
    fn optimal_action_breaks_ties_on_first_label() {
        let g = green();

        assert_eq!(get_optimal_action(&g, 0), Some("Putt"));
    }

    #[test]
    fn optimal_action_tries_unseen_actions_first() {
        let mut g = green();
        g.record_rollout(0, "Putt", 2).unwrap();

        assert_eq!(get_optimal_action(&g, 0), Some("Chip"));
    }

    #[test]
    fn exploit_escapes_a_misleading_self_loop() {
        let mut g = Graph::build(
            &[
                TransitionFact::new("Green", "Chip", "Green", 1.0),
                TransitionFact::new("Green", "Putt", "In", 0.8),
                TransitionFact::new("Green", "Putt", "Green", 0.2),
            ],
            "In",
        )
        .unwrap();
        for _ in 0..10 {
            g.record_rollout(0, "Chip", 1).unwrap();
        }
        g.record_rollout(0, "Putt", 5).unwrap();
        let params = ModelFreeParams {
            total_episodes: 20,
            exploit_ratio: 1.,
            max_episode_steps: Some(10_000),
        };
        let mut mc = MonteCarloControl::new(g, params);
        let out = mc.exec(&mut StdRng::seed_from_u64(17)).unwrap();

        assert_eq!(out.truncated_episodes, 0);
        assert!(out.total_score < 20 * 100);
        // Every exploit episode records what it learned.
        assert!(mc.graph().state(0).rollout_history("Putt").len() > 1);
    }

    #[test]
    fn optimal_action_prefers_shorter_rollouts() {
        let mut g = green();
        g.record_rollout(0, "Putt", 4).unwrap();
        g.record_rollout(0, "Chip", 2).unwrap();
        g.record_rollout(0, "Chip", 3).unwrap();

        assert_eq!(get_optimal_action(&g, 0), Some("Chip"));
    }

    #[test]
    fn weighted_sample_follows_average_lengths() {
        let mut g = green();
        g.record_rollout(0, "Putt", 1).unwrap();
        g.record_rollout(0, "Chip", 3).unwrap();

        let rng = &mut StdRng::seed_from_u64(11);
        let n = 10_000;
        let chips = (0..n)
            .filter(|_| weighted_sample(&g, 0, rng) == Some("Chip"))
            .count();

        assert_float_eq!(chips as f64 / n as f64, 0.75, abs <= 0.02);
    }

    #[test]
    fn exec_splits_episodes_by_exploit_ratio() {
        let params = ModelFreeParams {
            total_episodes: 101,
            exploit_ratio: 0.25,
            max_episode_steps: None,
        };
        let mut mc = MonteCarloControl::new(green(), params);
        let out = mc.exec(&mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(out.explore.episodes, 76);
        assert_eq!(out.exploit.episodes, 25);
        assert_eq!(out.total_score, out.explore.score + out.exploit.score);
        assert_eq!(out.truncated_episodes, 0);
    }

    #[test]
    fn truncated_episodes_are_counted() {
        let g = Graph::build(
            &[
                TransitionFact::new("Bunker", "Splash", "Bunker", 0.999),
                TransitionFact::new("Bunker", "Splash", "In", 0.001),
            ],
            "In",
        )
        .unwrap();
        let params = ModelFreeParams {
            total_episodes: 10,
            exploit_ratio: 0.,
            max_episode_steps: Some(3),
        };
        let mut mc = MonteCarloControl::new(g, params);
        let out = mc.exec(&mut StdRng::seed_from_u64(3)).unwrap();

        assert!(out.truncated_episodes > 0);
        assert!(out.total_score <= 30);
    }
}
