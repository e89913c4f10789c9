use mdp_env::*;

/// A single green: putting holes out 80% of the time, chipping never does.
/// Under the best policy the expected number of strokes is `1 / 0.8 = 1.25`.
pub fn facts() -> Vec<TransitionFact> {
    vec![
        TransitionFact::new("Green", "Putt", DEFAULT_ABSORBING_STATE, 0.8),
        TransitionFact::new("Green", "Putt", "Green", 0.2),
        TransitionFact::new("Green", "Chip", "Green", 1.0),
    ]
}

/// A full hole from the tee, used when no facts file is given.
pub fn course() -> Vec<TransitionFact> {
    let mut facts = vec![
        TransitionFact::new("Tee", "Drive", "Fairway", 0.6),
        TransitionFact::new("Tee", "Drive", "Rough", 0.3),
        TransitionFact::new("Tee", "Drive", "Tee", 0.1),
        TransitionFact::new("Tee", "Iron", "Fairway", 0.9),
        TransitionFact::new("Tee", "Iron", "Rough", 0.1),
        TransitionFact::new("Fairway", "Approach", "Green", 0.7),
        TransitionFact::new("Fairway", "Approach", "Rough", 0.2),
        TransitionFact::new("Fairway", "Approach", DEFAULT_ABSORBING_STATE, 0.1),
        TransitionFact::new("Rough", "Chip", "Green", 0.6),
        TransitionFact::new("Rough", "Chip", "Rough", 0.4),
        TransitionFact::new("Rough", "Pitch", "Green", 0.8),
        TransitionFact::new("Rough", "Pitch", "Fairway", 0.2),
    ];
    facts.extend(self::facts());

    facts
}
