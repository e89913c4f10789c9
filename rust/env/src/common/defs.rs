use crate::*;
use rand::RngCore;

pub trait Policy {
    fn policy(&self, graph: &Graph, s: StateId, rng: &mut dyn RngCore) -> Result<String, EnvError>;
}

/// Outcome of walking from a start state to absorption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollout {
    pub steps: usize,
    /// `max_steps` was hit before reaching the absorbing state.
    pub truncated: bool,
}

/// Walks the true dynamics from `start` until the absorbing state is reached.
///
/// `first` forces the first action, after that `policy` picks each action.
/// Without `max_steps` the walk only ends if the absorbing state is reachable
/// with positive probability from every visited state.
pub fn rollout(
    graph: &Graph,
    start: StateId,
    first: Option<&str>,
    policy: &dyn Policy,
    rng: &mut dyn RngCore,
    max_steps: Option<usize>,
) -> Result<Rollout, EnvError> {
    let mut s = start;
    let mut steps = 0;

    while !graph.is_absorbing(s) {
        if max_steps.is_some_and(|m| steps >= m) {
            return Ok(Rollout {
                steps,
                truncated: true,
            });
        }

        let a = match (steps, first) {
            (0, Some(a)) => a.to_string(),
            _ => policy.policy(graph, s, rng)?,
        };
        s = sample_next(graph, s, &a, rng)?;
        steps += 1;
    }

    Ok(Rollout {
        steps,
        truncated: false,
    })
}
