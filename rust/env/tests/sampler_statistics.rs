extern crate float_eq;
extern crate mdp_env;

use float_eq::*;
use mdp_env::*;
use rand::prelude::*;
use rstest::*;

const COURSE: &str = "\
Tee/Drive/Fairway/0.5
Tee/Drive/Rough/0.3
Tee/Drive/Tee/0.2
Tee/Layup/Fairway/1.0
Fairway/Approach/Green/0.7
Fairway/Approach/Rough/0.3
Rough/Chip/Green/0.6
Rough/Chip/Rough/0.4
Green/Putt/In/0.8
Green/Putt/Green/0.2
";

#[fixture]
fn course() -> Graph {
    Graph::build(&parse_facts(COURSE).unwrap(), DEFAULT_ABSORBING_STATE).unwrap()
}

#[rstest]
fn action_probabilities_sum_to_one(course: Graph) {
    for s in course.non_absorbing().map(|id| course.state(id)) {
        for a in s.action_labels() {
            let sum = s
                .edges(a)
                .unwrap()
                .iter()
                .map(|&e| s.outgoing_facts()[e].true_probability)
                .sum::<f64>();
            assert_float_eq!(sum, 1., abs <= PROBABILITY_SUM_TOLERANCE);
        }
    }
}

/// Pearson chi-squared over the three outcomes of Tee/Drive.
#[rstest]
fn sample_next_matches_true_probabilities(course: Graph) {
    let tee = course.id("Tee").unwrap();
    let expected = [
        (course.id("Fairway").unwrap(), 0.5),
        (course.id("Rough").unwrap(), 0.3),
        (tee, 0.2),
    ];

    let n = 20_000;
    let rng = &mut StdRng::seed_from_u64(2718);
    let mut counts = vec![0usize; course.len()];
    for _ in 0..n {
        counts[sample_next(&course, tee, "Drive", rng).unwrap()] += 1;
    }

    let chi2 = expected
        .iter()
        .map(|&(s, p)| {
            let e = p * n as f64;
            (counts[s] as f64 - e).powi(2) / e
        })
        .sum::<f64>();

    // 99.9th percentile of chi-squared with 2 degrees of freedom.
    assert!(chi2 < 13.82, "chi2 = {chi2}, counts = {counts:?}");
    assert_eq!(expected.iter().map(|&(s, _)| counts[s]).sum::<usize>(), n);
}

#[rstest]
fn deterministic_action_always_lands_on_its_target(course: Graph) {
    let tee = course.id("Tee").unwrap();
    let fairway = course.id("Fairway").unwrap();
    let rng = &mut StdRng::seed_from_u64(1);

    assert!((0..1000).all(|_| sample_next(&course, tee, "Layup", rng).unwrap() == fairway));
}

#[rstest]
fn absorbing_state_starts_at_zero(course: Graph) {
    let hole = course.state(course.absorbing());

    assert_eq!(hole.name(), "In");
    assert_eq!(hole.utility(), 0.);
    assert_eq!(hole.reward(), 0.);
    assert!(hole.action_labels().is_empty());
}
