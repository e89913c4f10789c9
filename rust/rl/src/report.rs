use crate::algos::model_based::ModelBasedOutcome;
use crate::algos::model_free::ModelFreeOutcome;
use crate::algos::MdpSolver;
use mdp_env::*;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rollout: Option<Continous>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollouts: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub estimates: Vec<EstimatedEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateReport {
    pub name: String,
    pub utility: Continous,
    pub optimal_action: Option<String>,
    pub actions: Vec<ActionReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunSummary {
    ModelFree(ModelFreeOutcome),
    ModelBased(ModelBasedOutcome),
}

impl From<ModelFreeOutcome> for RunSummary {
    fn from(o: ModelFreeOutcome) -> Self {
        Self::ModelFree(o)
    }
}

impl From<ModelBasedOutcome> for RunSummary {
    fn from(o: ModelBasedOutcome) -> Self {
        Self::ModelBased(o)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub states: Vec<StateReport>,
    pub summary: RunSummary,
}

impl Report {
    /// Reads the final statistics of `solver`. Per-action statistics follow
    /// the mode: rollout averages for model-free runs, learned edges for
    /// model-based ones.
    pub fn new<T, S>(solver: &S, outcome: T) -> Self
    where
        S: MdpSolver<T> + ?Sized,
        T: Into<RunSummary>,
    {
        let summary = outcome.into();
        let g = solver.graph();

        let states = (0..g.len())
            .map(|id| {
                let s = g.state(id);
                let actions = s
                    .action_labels()
                    .iter()
                    .filter(|_| !g.is_absorbing(id))
                    .map(|a| Self::action_report(s, a, &summary))
                    .collect();

                StateReport {
                    name: s.name().to_string(),
                    utility: solver.v_star(id),
                    optimal_action: solver.pi_star(id),
                    actions,
                }
            })
            .collect();

        Self { states, summary }
    }

    fn action_report(s: &State, action: &str, summary: &RunSummary) -> ActionReport {
        match summary {
            RunSummary::ModelFree(_) => ActionReport {
                action: action.to_string(),
                average_rollout: s.average_rollout(action),
                rollouts: Some(s.rollout_history(action).len()),
                estimates: vec![],
            },
            RunSummary::ModelBased(_) => ActionReport {
                action: action.to_string(),
                average_rollout: None,
                rollouts: None,
                estimates: s
                    .edges(action)
                    .unwrap_or_default()
                    .iter()
                    .map(|&e| s.outgoing_estimates()[e].clone())
                    .collect(),
            },
        }
    }

    pub fn state(&self, name: &str) -> Option<&StateReport> {
        self.states.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.states {
            writeln!(
                f,
                "{:<16} utility {:>10.4}  best {}",
                s.name,
                s.utility,
                s.optimal_action.as_deref().unwrap_or("-")
            )?;
            for a in &s.actions {
                write!(f, "    {:<12}", a.action)?;
                if let Some(n) = a.rollouts {
                    match a.average_rollout {
                        Some(avg) => write!(f, " avg {avg:.4} over {n} rollouts")?,
                        None => write!(f, " no rollouts")?,
                    }
                }
                for e in &a.estimates {
                    write!(
                        f,
                        " {}={:.3} ({}/{})",
                        e.to_state, e.probability, e.times_matched, e.times_observed
                    )?;
                }
                writeln!(f)?;
            }
        }

        match self.summary {
            RunSummary::ModelFree(o) => write!(
                f,
                "total score {} over {} episodes ({} exploring, {} exploiting)",
                o.total_score,
                o.explore.episodes + o.exploit.episodes,
                o.explore.episodes,
                o.exploit.episodes
            ),
            RunSummary::ModelBased(o) => write!(
                f,
                "total utility {:.4} after {} iterations ({})",
                o.total_utility,
                o.iterations,
                if o.converged { "converged" } else { "not converged" }
            ),
        }
    }
}
