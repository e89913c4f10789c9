use crate::algos::{no_actions, MdpSolver};
use crate::config::ModelBasedParams;
use mdp_env::*;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelBasedOutcome {
    pub total_utility: Continous,
    /// Passes run, the converging pass included.
    pub iterations: usize,
    pub converged: bool,
    /// Summed Bellman residual of the last pass.
    pub residual: Continous,
    pub truncated_episodes: usize,
}

/// Value iteration over transition probabilities learned online.
///
/// Experience comes from the sampler, the estimator itself only ever reads
/// its own counts.
pub struct ValueIteration {
    graph: Graph,
    params: ModelBasedParams,
    truncated: usize,
}

impl ValueIteration {
    pub fn new(graph: Graph, params: ModelBasedParams) -> Self {
        Self {
            graph,
            params,
            truncated: 0,
        }
    }

    /// `(action, sum(estimated_probability * successor.utility))` minimising
    /// the expected successor utility; ties go to the earlier action.
    pub fn greedy(&self, s: StateId) -> Result<(&str, Continous), EnvError> {
        let mut best: Option<(&str, Continous)> = None;
        for a in self.graph.state(s).action_labels() {
            let q = self.graph.estimated_value(s, a)?;
            if best.map_or(true, |(_, b)| q < b) {
                best = Some((a.as_str(), q));
            }
        }

        best.ok_or_else(|| no_actions(&self.graph, s))
    }

    /// Epsilon-greedy behaviour policy.
    fn behave(&self, s: StateId, rng: &mut dyn RngCore) -> Result<String, EnvError> {
        if rng.gen::<Continous>() < self.params.exploration {
            return self
                .graph
                .state(s)
                .action_labels()
                .choose(rng)
                .cloned()
                .ok_or_else(|| no_actions(&self.graph, s));
        }

        self.greedy(s).map(|(a, _)| a.to_string())
    }

    /// `gamma * min_a(sum(estimated_probability * successor.utility)) + reward`.
    pub fn backup(&self, s: StateId) -> Result<Continous, EnvError> {
        let (_, q) = self.greedy(s)?;
        Ok(self.params.gamma * q + self.graph.state(s).reward())
    }

    /// Largest gap between a state's utility and its Bellman backup.
    pub fn bellman_error(&self) -> Result<Continous, EnvError> {
        self.graph.non_absorbing().try_fold(0., |acc: Continous, s| {
            Ok(acc.max((self.backup(s)? - self.graph.state(s).utility()).abs()))
        })
    }

    /// One episode from `start`: act, observe, re-estimate, back up, move on.
    /// Returns the summed utility change.
    fn episode(&mut self, start: StateId, rng: &mut dyn RngCore) -> Result<Continous, EnvError> {
        let mut s = start;
        let mut steps = 0;
        let mut residual = 0.;

        while !self.graph.is_absorbing(s) {
            if self.params.max_episode_steps.is_some_and(|m| steps >= m) {
                self.truncated += 1;
                warn!(
                    start = self.graph.state(start).name(),
                    steps, "episode truncated before absorption"
                );
                break;
            }

            let a = self.behave(s, rng)?;
            let next = sample_next(&self.graph, s, &a, rng)?;
            self.graph
                .observe(s, &a, next, self.params.probability_floor)?;

            let old = self.graph.state(s).utility();
            let new = self.backup(s)?;
            residual += (new - old).abs();
            self.graph.set_utility(s, new);

            s = next;
            steps += 1;
        }

        Ok(residual)
    }

    /// One pass: an episode from every non-absorbing state.
    pub fn iterate(&mut self, rng: &mut dyn RngCore) -> Result<Continous, EnvError> {
        let starts = self.graph.non_absorbing().collect::<Vec<_>>();
        let mut residual = 0.;
        for s in starts {
            residual += self.episode(s, rng)?;
        }

        Ok(residual)
    }
}

impl MdpSolver<ModelBasedOutcome> for ValueIteration {
    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn pi_star(&self, s: StateId) -> Option<String> {
        if self.graph.is_absorbing(s) {
            return None;
        }

        self.greedy(s).ok().map(|(a, _)| a.to_string())
    }

    fn exec(&mut self, rng: &mut dyn RngCore) -> Result<ModelBasedOutcome, EnvError> {
        let mut iterations = 0;
        let mut residual = Continous::INFINITY;
        let mut converged = false;

        while iterations < self.params.max_iterations {
            residual = self.iterate(rng)?;
            iterations += 1;
            debug!(iteration = iterations, residual, "value iteration pass");

            if residual < self.params.epsilon {
                converged = true;
                break;
            }
        }

        let outcome = ModelBasedOutcome {
            total_utility: self.graph.total_utility(),
            iterations,
            converged,
            residual,
            truncated_episodes: self.truncated,
        };
        let bellman_error = self.bellman_error()?;
        info!(
            iterations,
            converged,
            residual,
            total_utility = outcome.total_utility,
            bellman_error,
            "model-based run finished"
        );

        Ok(outcome)
    }
}
