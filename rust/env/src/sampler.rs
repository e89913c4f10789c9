use crate::{Continous, EnvError, Graph, StateId};
use rand::prelude::*;

pub trait Weighted<S> {
    fn s(&self) -> S;

    fn p(&self) -> Continous;
}

/// Walks `ts` in order accumulating weights and returns the first item whose
/// running sum reaches `u`. Items with a non-positive weight are never picked.
/// If rounding leaves the total short of `u`, the last positive item wins.
pub fn pick_at<T, S>(u: Continous, ts: &[T]) -> Option<S>
where
    T: Weighted<S>,
{
    let mut acc = 0.;
    let mut last = None;
    for t in ts.iter().filter(|t| t.p() > 0.) {
        acc += t.p();
        if acc >= u {
            return Some(t.s());
        }
        last = Some(t);
    }

    last.map(|t| t.s())
}

/// Draws uniformly in `[0, sum of weights)` and picks the matching item.
pub fn pick_next<T, S, R>(rng: &mut R, ts: &[T]) -> Option<S>
where
    T: Weighted<S>,
    R: Rng + ?Sized,
{
    let total = ts.iter().map(|t| t.p()).filter(|&p| p > 0.).sum::<Continous>();
    pick_at(rng.gen::<Continous>() * total, ts)
}

struct Outcome {
    next: StateId,
    probability: Continous,
}

impl Weighted<StateId> for Outcome {
    fn s(&self) -> StateId {
        self.next
    }

    fn p(&self) -> Continous {
        self.probability
    }
}

/// Draws the state reached by taking `action` in `state`, using the true
/// transition probabilities.
pub fn sample_next<R>(
    graph: &Graph,
    state: StateId,
    action: &str,
    rng: &mut R,
) -> Result<StateId, EnvError>
where
    R: Rng + ?Sized,
{
    let s = graph.state(state);
    let not_applicable = || EnvError::ActionNotApplicable {
        state: s.name().to_string(),
        action: action.to_string(),
    };

    let outcomes = s
        .edges(action)
        .ok_or_else(not_applicable)?
        .iter()
        .map(|&e| Outcome {
            next: s.successor(e),
            probability: s.outgoing_facts()[e].true_probability,
        })
        .collect::<Vec<_>>();

    pick_at(rng.gen::<Continous>(), &outcomes).ok_or_else(not_applicable)
}
