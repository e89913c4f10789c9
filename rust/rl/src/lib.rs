extern crate mdp_env;
extern crate rand;
extern crate serde;

pub mod algos;
pub mod config;
pub mod envs;
pub mod report;

use algos::model_based::ValueIteration;
use algos::model_free::MonteCarloControl;
use algos::MdpSolver;
use config::{Config, Mode};
use mdp_env::*;
use rand::RngCore;
use report::Report;

/// Builds the graph from `facts` and runs the learner selected by `cfg.mode`.
pub fn solve(
    facts: &[TransitionFact],
    cfg: &Config,
    rng: &mut dyn RngCore,
) -> Result<Report, EnvError> {
    let graph = Graph::build(facts, &cfg.absorbing_state_name)?;

    Ok(match cfg.mode {
        Mode::ModelFree => {
            let mut mc = MonteCarloControl::new(graph, cfg.model_free());
            let out = mc.exec(rng)?;
            Report::new(&mc, out)
        }
        Mode::ModelBased => {
            let mut vi = ValueIteration::new(graph, cfg.model_based());
            let out = vi.exec(rng)?;
            Report::new(&vi, out)
        }
    })
}
