pub mod model_based;
pub mod model_free;

use mdp_env::*;
use rand::RngCore;

/// A learner that owns an MDP graph and solves it by interacting with the
/// environment sampler.
pub trait MdpSolver<T> {
    fn graph(&self) -> &Graph;

    fn v_star(&self, s: StateId) -> Continous {
        self.graph().state(s).utility()
    }

    /// Greedy action under the solver's final statistics. `None` for the
    /// absorbing state.
    fn pi_star(&self, s: StateId) -> Option<String>;

    fn exec(&mut self, rng: &mut dyn RngCore) -> Result<T, EnvError>;
}

pub(crate) fn no_actions(graph: &Graph, s: StateId) -> EnvError {
    ValidationError::NoActions(graph.state(s).name().to_string()).into()
}
