//! Answer checking for spelled words

use strsim::levenshtein;

use crate::words::accepted_answers;

/// Largest edit distance that still earns an "almost" hint.
const NEAR_MISS_DISTANCE: usize = 2;

/// Outcome of comparing a typed answer with a word entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCheck {
    Match,
    Mismatch {
        expected: Vec<String>,
        feedback: String,
    },
}

impl AnswerCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, AnswerCheck::Match)
    }

    /// Accepted answers joined with ", ", empty on a match.
    pub fn expected_display(&self) -> String {
        match self {
            AnswerCheck::Match => String::new(),
            AnswerCheck::Mismatch { expected, .. } => expected.join(", "),
        }
    }
}

/// Check `user_input` against the accepted spellings of `raw_entry`.
///
/// Both sides are split on commas and trimmed. The answer matches when every
/// submitted spelling is accepted, so any subset of alternates in any order
/// passes. Comparison is exact and case sensitive.
pub fn check(raw_entry: &str, user_input: &str) -> AnswerCheck {
    let accepted = accepted_answers(raw_entry);

    if user_input
        .split(',')
        .map(str::trim)
        .all(|given| accepted.contains(&given))
    {
        return AnswerCheck::Match;
    }

    let expected: Vec<String> = accepted.iter().map(|s| s.to_string()).collect();
    let feedback = mismatch_feedback(&expected, user_input.trim());

    AnswerCheck::Mismatch { expected, feedback }
}

fn mismatch_feedback(expected: &[String], given: &str) -> String {
    let joined = expected.join(", ");
    let closest = expected.iter().map(|e| levenshtein(e, given)).min();

    match closest {
        Some(distance) if distance > 0 && distance <= NEAR_MISS_DISTANCE => format!(
            "Almost! {} character{} off. Correct answer: '{}'",
            distance,
            if distance == 1 { "" } else { "s" },
            joined
        ),
        _ => format!("Incorrect. Correct answer: '{}'", joined),
    }
}
