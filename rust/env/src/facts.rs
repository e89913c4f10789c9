use crate::{Continous, ParseError};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Ground truth for a single outcome of taking `action_label` in `from_state`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionFact {
    pub from_state: String,
    pub action_label: String,
    pub to_state: String,
    pub true_probability: Continous,
}

impl TransitionFact {
    pub fn new(from: &str, action: &str, to: &str, probability: Continous) -> Self {
        Self {
            from_state: from.to_string(),
            action_label: action.to_string(),
            to_state: to.to_string(),
            true_probability: probability,
        }
    }
}

/// Parses one fact per line in the form `from/action/to/probability`.
///
/// Reading stops at the first blank line, anything after it is ignored.
pub fn parse_facts(text: &str) -> Result<Vec<TransitionFact>, ParseError> {
    let mut facts = vec![];

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            break;
        }

        let fields = raw.split('/').map(str::trim).collect::<Vec<_>>();
        if fields.len() != 4 {
            return Err(ParseError::FieldCount {
                line,
                fields: fields.len(),
            });
        }
        if let Some(field) = fields.iter().position(|f| f.is_empty()) {
            return Err(ParseError::EmptyField {
                line,
                field: field + 1,
            });
        }

        let probability = fields[3]
            .parse::<Continous>()
            .map_err(|_| ParseError::Probability {
                line,
                value: fields[3].to_string(),
            })?;

        facts.push(TransitionFact::new(
            fields[0],
            fields[1],
            fields[2],
            probability,
        ));
    }

    Ok(facts)
}

pub fn load_facts(path: &Path) -> Result<Vec<TransitionFact>, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    parse_facts(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assertor::*;
    use rstest::*;

    #[test]
    fn parses_facts_in_order() {
        let facts = parse_facts(" Green/Putt/In/0.8 \nGreen/Putt/Green/0.2\nGreen/Chip/Green/1\n")
            .unwrap();

        assert_that!(facts).is_equal_to(vec![
            TransitionFact::new("Green", "Putt", "In", 0.8),
            TransitionFact::new("Green", "Putt", "Green", 0.2),
            TransitionFact::new("Green", "Chip", "Green", 1.0),
        ]);
    }

    #[test]
    fn stops_at_first_blank_line() {
        let facts = parse_facts("A/go/In/1.0\n\nB/go/In/1.0\n").unwrap();

        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].from_state, "A");
    }

    #[rstest]
    #[case("A/go/In", 1)]
    #[case("A/go/In/0.5/extra", 1)]
    #[case("A/go/In/1.0\nA/go//1.0", 2)]
    #[case("A/go/In/likely", 1)]
    fn rejects_malformed_lines(#[case] text: &str, #[case] expected_line: usize) {
        let line = match parse_facts(text).unwrap_err() {
            ParseError::FieldCount { line, .. }
            | ParseError::EmptyField { line, .. }
            | ParseError::Probability { line, .. } => line,
            e => panic!("unexpected error {e:?}"),
        };

        assert_eq!(line, expected_line);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_facts(Path::new("/definitely/not/here.txt")).unwrap_err();

        assert!(matches!(err, ParseError::Io { .. }));
    }
}
