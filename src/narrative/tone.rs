use regex::Regex;
use std::sync::OnceLock;

use crate::profile::Severity;

const ALARM_PATTERN: &str = r"(?i)\b(alarming|severe|severely|critical|dangerous|urgent|serious concern)\b";
const REASSURING_PATTERN: &str = r"(?i)\b(excellent|optimal|great shape|no concerns?|perfectly healthy)\b";

static ALARM: OnceLock<Option<Regex>> = OnceLock::new();
static REASSURING: OnceLock<Option<Regex>> = OnceLock::new();

fn matches(cell: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

pub fn has_alarm_language(text: &str) -> bool {
    matches(&ALARM, ALARM_PATTERN, text)
}

pub fn has_reassuring_language(text: &str) -> bool {
    matches(&REASSURING, REASSURING_PATTERN, text)
}

/// Normal/mild scores must not read as alarming; moderate/severe scores
/// must not read as reassuring.
pub fn tone_matches(text: &str, severity: Severity) -> bool {
    match severity {
        Severity::Normal | Severity::Mild => !has_alarm_language(text),
        Severity::Moderate | Severity::Severe => !has_reassuring_language(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_words_break_a_good_score() {
        assert!(!tone_matches("Your sleep is in a critical state.", Severity::Normal));
        assert!(tone_matches("Your sleep is in a critical state.", Severity::Severe));
    }

    #[test]
    fn test_reassurance_breaks_a_bad_score() {
        assert!(!tone_matches("Stress levels look excellent!", Severity::Severe));
        assert!(tone_matches("Stress levels look excellent!", Severity::Mild));
    }

    #[test]
    fn test_whole_words_only() {
        assert!(!has_alarm_language("Persevere with the routine."));
    }
}
