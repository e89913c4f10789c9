use mdp_env::*;
use mdp_rl::envs::simple_golf;

#[allow(dead_code)]
pub fn green() -> Graph {
    Graph::build(&simple_golf::facts(), DEFAULT_ABSORBING_STATE).unwrap()
}

/// The green with the looping chip listed before the putt.
#[allow(dead_code)]
pub fn green_chip_first() -> Graph {
    let mut facts = simple_golf::facts();
    facts.rotate_right(1);
    Graph::build(&facts, DEFAULT_ABSORBING_STATE).unwrap()
}

/// Sand trap with three outcomes; the green behind it always holes out.
#[allow(dead_code)]
pub fn bunker() -> Graph {
    Graph::build(
        &[
            TransitionFact::new("Bunker", "Blast", "In", 0.5),
            TransitionFact::new("Bunker", "Blast", "Bunker", 0.3),
            TransitionFact::new("Bunker", "Blast", "Green", 0.2),
            TransitionFact::new("Green", "Tap", "In", 1.0),
        ],
        DEFAULT_ABSORBING_STATE,
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn estimates(g: &Graph, state: &str) -> Vec<(String, f64)> {
    let s = g.state(g.id(state).unwrap());
    s.outgoing_estimates()
        .iter()
        .map(|e| (e.to_state.clone(), e.probability))
        .collect()
}
