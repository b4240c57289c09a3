//! Gender-restricted vocabulary shared by the gender_condition and
//! integrity checks and their repairs.

use regex::Regex;
use std::sync::OnceLock;

use crate::profile::{Gender, UserHealthProfile};

const FEMALE_CONDITION_KEYWORDS: [&str; 6] = ["pcos", "pcod", "menstrual", "ovarian", "endometriosis", "menopause"];
const MALE_CONDITION_KEYWORDS: [&str; 3] = ["prostate", "erectile", "testosterone"];

const FEMALE_TERMS_PATTERN: &str =
    r"(?i)\b(polycystic ovary syndrome|pcos|pcod|menstrual|menstruation|ovarian|ovulation|ovaries|menopause|endometriosis)\b";
const MALE_TERMS_PATTERN: &str = r"(?i)\b(prostate|testosterone|erectile)\b";

pub const NEUTRAL_TERM: &str = "hormonal";

static FEMALE_TERMS: OnceLock<Option<Regex>> = OnceLock::new();
static MALE_TERMS: OnceLock<Option<Regex>> = OnceLock::new();
static SPACES: OnceLock<Option<Regex>> = OnceLock::new();

fn opposite_terms(gender: Gender) -> Option<&'static Regex> {
    match gender {
        Gender::Male => FEMALE_TERMS
            .get_or_init(|| Regex::new(FEMALE_TERMS_PATTERN).ok())
            .as_ref(),
        Gender::Female => MALE_TERMS
            .get_or_init(|| Regex::new(MALE_TERMS_PATTERN).ok())
            .as_ref(),
        Gender::Other => None,
    }
}

fn opposite_condition_keywords(gender: Gender) -> &'static [&'static str] {
    match gender {
        Gender::Male => &FEMALE_CONDITION_KEYWORDS,
        Gender::Female => &MALE_CONDITION_KEYWORDS,
        Gender::Other => &[],
    }
}

pub fn is_reserved_condition(gender: Gender, condition: &str) -> bool {
    let lowered = condition.to_lowercase();
    opposite_condition_keywords(gender)
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

/// Opposite-gender terms found in `text`, lowercased, in order of appearance.
pub fn reserved_terms_in(gender: Gender, text: &str) -> Vec<String> {
    opposite_terms(gender)
        .map(|re| re.find_iter(text).map(|m| m.as_str().to_lowercase()).collect())
        .unwrap_or_default()
}

fn collapse_spaces(text: &str) -> String {
    match SPACES.get_or_init(|| Regex::new(r"[ \t]{2,}").ok()).as_ref() {
        Some(re) => re.replace_all(text, " ").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Replaces opposite-gender terms with neutral wording.
pub fn neutralize(gender: Gender, text: &str) -> String {
    match opposite_terms(gender) {
        Some(re) if re.is_match(text) => collapse_spaces(&re.replace_all(text, NEUTRAL_TERM)),
        _ => text.to_string(),
    }
}

fn first_name_prefix(first_name: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b(Mr|Mrs|Ms|Miss|Mx)\.?\s+{}\b", regex::escape(first_name))).ok()
}

/// Salutations in `text` that disagree with the profile's own prefix.
pub fn mismatched_prefixes(profile: &UserHealthProfile, text: &str) -> Vec<String> {
    let Some(re) = first_name_prefix(profile.first_name()) else {
        return Vec::new();
    };
    let expected = profile.display_name();
    re.find_iter(text)
        .map(|m| m.as_str().to_string())
        .filter(|found| *found != expected)
        .collect()
}

/// Rewrites every salutation + first name pair to the profile's display name.
pub fn fix_prefixes(profile: &UserHealthProfile, text: &str) -> String {
    match first_name_prefix(profile.first_name()) {
        Some(re) => {
            let expected = profile.display_name();
            re.replace_all(text, regex::NoExpand(&expected)).into_owned()
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::tests::sample_answers;

    #[test]
    fn test_reserved_conditions_by_gender() {
        assert!(is_reserved_condition(Gender::Male, "PCOS"));
        assert!(is_reserved_condition(Gender::Male, "Irregular menstrual cycle"));
        assert!(!is_reserved_condition(Gender::Female, "PCOS"));
        assert!(is_reserved_condition(Gender::Female, "Enlarged prostate"));
        assert!(!is_reserved_condition(Gender::Other, "PCOS"));
    }

    #[test]
    fn test_neutralize_replaces_terms() {
        let text = "Balanced meals support  menstrual health and PCOS care.";
        assert_eq!(
            neutralize(Gender::Male, text),
            "Balanced meals support hormonal health and hormonal care."
        );
        assert_eq!(neutralize(Gender::Female, text), text);
        assert_eq!(reserved_terms_in(Gender::Male, text), vec!["menstrual", "pcos"]);
    }

    #[test]
    fn test_prefix_mismatch_and_fix() {
        let profile = UserHealthProfile::from_answers(&sample_answers()).unwrap();
        let text = "Ms. Rahul, welcome back. Mr. Rahul, keep going.";
        assert_eq!(mismatched_prefixes(&profile, text), vec!["Ms. Rahul".to_string()]);
        let fixed = fix_prefixes(&profile, text);
        assert_eq!(fixed, "Mr. Rahul, welcome back. Mr. Rahul, keep going.");
        assert!(mismatched_prefixes(&profile, &fixed).is_empty());
    }
}
