use crate::{Continous, EnvError, StateId, TransitionFact, ValidationError};
use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Tolerance used when checking that an action's probabilities sum to 1.
pub const PROBABILITY_SUM_TOLERANCE: Continous = 1e-6;

/// Per-step cost of every non-absorbing state.
pub const STEP_COST: Continous = 1.;

/// Learned counterpart of a [`TransitionFact`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatedEdge {
    pub to_state: String,
    pub probability: Continous,
    pub times_matched: u64,
    pub times_observed: u64,
}

impl EstimatedEdge {
    fn seeded(to_state: &str, probability: Continous) -> Self {
        Self {
            to_state: to_state.to_string(),
            probability,
            times_matched: 0,
            times_observed: 0,
        }
    }

    /// Counts one observation of the edge's action. A ratio of exactly 0 is
    /// replaced by `floor` so the edge is never locked out.
    pub fn observe(&mut self, matched: bool, floor: Continous) {
        self.times_observed += 1;
        if matched {
            self.times_matched += 1;
        }

        let p = self.times_matched as Continous / self.times_observed as Continous;
        self.probability = if p == 0. { floor } else { p };
    }
}

#[derive(Debug, Clone)]
pub struct State {
    name: String,
    outgoing_facts: Vec<TransitionFact>,
    outgoing_estimates: Vec<EstimatedEdge>,
    successors: Vec<StateId>,
    action_labels: Vec<String>,
    edges_by_action: HashMap<String, Vec<usize>>,
    utility: Continous,
    reward: Continous,
    rollout_history: HashMap<String, Vec<usize>>,
}

impl State {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outgoing_facts(&self) -> &[TransitionFact] {
        &self.outgoing_facts
    }

    pub fn outgoing_estimates(&self) -> &[EstimatedEdge] {
        &self.outgoing_estimates
    }

    /// Distinct action labels, in the order they first appear in the facts.
    pub fn action_labels(&self) -> &[String] {
        &self.action_labels
    }

    /// Indices into `outgoing_facts` / `outgoing_estimates` for `action`.
    pub fn edges(&self, action: &str) -> Option<&[usize]> {
        self.edges_by_action.get(action).map(Vec::as_slice)
    }

    pub fn successor(&self, edge: usize) -> StateId {
        self.successors[edge]
    }

    pub fn utility(&self) -> Continous {
        self.utility
    }

    pub fn reward(&self) -> Continous {
        self.reward
    }

    pub fn rollout_history(&self, action: &str) -> &[usize] {
        self.rollout_history
            .get(action)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn average_rollout(&self, action: &str) -> Option<Continous> {
        let h = self.rollout_history(action);
        if h.is_empty() {
            None
        } else {
            Some(h.iter().sum::<usize>() as Continous / h.len() as Continous)
        }
    }

    fn not_applicable(&self, action: &str) -> EnvError {
        EnvError::ActionNotApplicable {
            state: self.name.clone(),
            action: action.to_string(),
        }
    }
}

/// State graph of an absorbing MDP, built once from a list of facts.
#[derive(Debug, Clone)]
pub struct Graph {
    states: Vec<State>,
    index: HashMap<String, StateId>,
    absorbing: StateId,
}

impl Graph {
    pub fn build(facts: &[TransitionFact], absorbing_state: &str) -> Result<Self, ValidationError> {
        if facts.is_empty() {
            return Err(ValidationError::Empty);
        }

        if let Some(f) = facts
            .iter()
            .find(|f| !(0. ..=1.).contains(&f.true_probability))
        {
            return Err(ValidationError::InvalidProbability {
                from: f.from_state.clone(),
                action: f.action_label.clone(),
                to: f.to_state.clone(),
                probability: f.true_probability,
            });
        }

        let names = facts
            .iter()
            .flat_map(|f| [f.from_state.as_str(), f.to_state.as_str()])
            .unique()
            .collect::<Vec<_>>();
        let index = names
            .iter()
            .enumerate()
            .map(|(id, &name)| (name.to_string(), id))
            .collect::<HashMap<_, _>>();

        let absorbing = *index
            .get(absorbing_state)
            .ok_or_else(|| ValidationError::MissingAbsorbingState(absorbing_state.to_string()))?;

        let by_source = facts.iter().into_group_map_by(|f| f.from_state.as_str());

        let mut states = Vec::with_capacity(names.len());
        for (id, &name) in names.iter().enumerate() {
            let outgoing_facts = by_source
                .get(name)
                .map(|fs| fs.iter().map(|&f| f.clone()).collect::<Vec<_>>())
                .unwrap_or_default();

            if id != absorbing && outgoing_facts.is_empty() {
                return Err(ValidationError::NoActions(name.to_string()));
            }

            let state = Self::make_state(name, outgoing_facts, &index, id == absorbing)?;
            debug!(
                state = state.name(),
                actions = ?state.action_labels(),
                transitions = state.outgoing_facts().len(),
                "built state"
            );
            states.push(state);
        }

        Ok(Self {
            states,
            index,
            absorbing,
        })
    }

    fn make_state(
        name: &str,
        outgoing_facts: Vec<TransitionFact>,
        index: &HashMap<String, StateId>,
        absorbing: bool,
    ) -> Result<State, ValidationError> {
        let action_labels = outgoing_facts
            .iter()
            .map(|f| f.action_label.clone())
            .unique()
            .collect::<Vec<_>>();
        let edges_by_action = outgoing_facts
            .iter()
            .enumerate()
            .map(|(i, f)| (f.action_label.clone(), i))
            .into_group_map();

        for action in &action_labels {
            let sum = edges_by_action[action]
                .iter()
                .map(|&i| outgoing_facts[i].true_probability)
                .sum::<Continous>();
            if (sum - 1.).abs() > PROBABILITY_SUM_TOLERANCE {
                return Err(ValidationError::ProbabilitySum {
                    state: name.to_string(),
                    action: action.clone(),
                    sum,
                });
            }
        }

        let outgoing_estimates = outgoing_facts
            .iter()
            .map(|f| {
                let n = edges_by_action[&f.action_label].len();
                EstimatedEdge::seeded(&f.to_state, 1. / n as Continous)
            })
            .collect();

        // Every destination is also a key of `index`, it was collected from the same facts.
        let successors = outgoing_facts.iter().map(|f| index[&f.to_state]).collect();

        Ok(State {
            name: name.to_string(),
            outgoing_facts,
            outgoing_estimates,
            successors,
            action_labels,
            edges_by_action,
            utility: 0.,
            reward: if absorbing { 0. } else { STEP_COST },
            rollout_history: HashMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.iter()
    }

    pub fn id(&self, name: &str) -> Option<StateId> {
        self.index.get(name).copied()
    }

    pub fn absorbing(&self) -> StateId {
        self.absorbing
    }

    pub fn is_absorbing(&self, id: StateId) -> bool {
        id == self.absorbing
    }

    /// Ids of every state a learner may act in, in graph order.
    pub fn non_absorbing(&self) -> impl Iterator<Item = StateId> + '_ {
        (0..self.states.len()).filter(move |&id| id != self.absorbing)
    }

    pub fn total_utility(&self) -> Continous {
        self.states.iter().map(|s| s.utility).sum()
    }

    /// Sets the utility of a state. The absorbing state is pinned at 0 and is
    /// left untouched.
    pub fn set_utility(&mut self, id: StateId, utility: Continous) {
        if id == self.absorbing {
            return;
        }
        self.states[id].utility = utility;
    }

    /// `sum(estimated_probability * successor.utility)` over the edges of `action`.
    pub fn estimated_value(&self, id: StateId, action: &str) -> Result<Continous, EnvError> {
        let s = &self.states[id];
        let edges = s.edges(action).ok_or_else(|| s.not_applicable(action))?;

        Ok(edges
            .iter()
            .map(|&e| s.outgoing_estimates[e].probability * self.states[s.successors[e]].utility)
            .sum())
    }

    /// Updates every estimate of `action` in state `id` after `next` was observed.
    pub fn observe(
        &mut self,
        id: StateId,
        action: &str,
        next: StateId,
        floor: Continous,
    ) -> Result<(), EnvError> {
        let s = &mut self.states[id];
        let edges = s
            .edges_by_action
            .get(action)
            .ok_or_else(|| s.not_applicable(action))?;

        for &e in edges {
            let matched = s.successors[e] == next;
            s.outgoing_estimates[e].observe(matched, floor);
        }

        Ok(())
    }

    pub fn record_rollout(
        &mut self,
        id: StateId,
        action: &str,
        steps: usize,
    ) -> Result<(), EnvError> {
        let s = &mut self.states[id];
        if !s.edges_by_action.contains_key(action) {
            return Err(s.not_applicable(action));
        }

        s.rollout_history
            .entry(action.to_string())
            .or_default()
            .push(steps);

        Ok(())
    }
}
