// src/linkedin/filter.rs
//! Location/role admission policy expressed as data.
//!
//! Each rule names a location, the words that identify it inside a free-form
//! location string, and what it admits. The first matching rule decides;
//! records matching no rule are dropped.

use serde::{Deserialize, Serialize};

use super::types::JobRecord;
use crate::error::{Result, ScoutError};
use crate::utils::tokenize;

pub const DEFAULT_ROLE_KEYWORDS: &[&str] = &[
    "financial planner",
    "financial advisor",
    "financial adviser",
    "paraplanner",
    "client service officer",
    "wealth advisor",
    "investment advisor",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Every title is admitted
    AllRoles,
    /// Only titles containing one of these (lower-cased) keywords
    RoleKeywords(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRule {
    pub name: String,
    aliases: Vec<Vec<String>>,
    pub admission: Admission,
}

/// YAML shape of a rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationRuleConfig {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub admit_all: bool,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationPolicy {
    rules: Vec<LocationRule>,
}

impl LocationRule {
    pub fn new<S: AsRef<str>>(name: &str, aliases: &[S], admission: Admission) -> Result<Self> {
        let mut tokenized: Vec<Vec<String>> = aliases
            .iter()
            .map(|alias| tokenize(alias.as_ref()))
            .filter(|tokens| !tokens.is_empty())
            .collect();

        if tokenized.is_empty() {
            tokenized.push(tokenize(name));
        }
        if tokenized.iter().all(|tokens| tokens.is_empty()) {
            return Err(ScoutError::config(format!(
                "Location rule {:?} has no usable aliases",
                name
            )));
        }

        let admission = match admission {
            Admission::AllRoles => Admission::AllRoles,
            Admission::RoleKeywords(keywords) => {
                let keywords: Vec<String> = keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                if keywords.is_empty() {
                    return Err(ScoutError::config(format!(
                        "Location rule {:?} admits no roles",
                        name
                    )));
                }
                Admission::RoleKeywords(keywords)
            }
        };

        Ok(Self {
            name: name.to_string(),
            aliases: tokenized,
            admission,
        })
    }

    /// Whether any alias appears as a run of whole words in `location`.
    pub fn matches_location(&self, location: &str) -> bool {
        let tokens = tokenize(location);
        self.aliases.iter().any(|alias| {
            tokens
                .windows(alias.len())
                .any(|window| window == alias.as_slice())
        })
    }

    pub fn admits_title(&self, title: &str) -> bool {
        match &self.admission {
            Admission::AllRoles => true,
            Admission::RoleKeywords(keywords) => {
                let title = title.to_lowercase();
                keywords.iter().any(|keyword| title.contains(keyword.as_str()))
            }
        }
    }
}

impl TryFrom<LocationRuleConfig> for LocationRule {
    type Error = ScoutError;

    fn try_from(config: LocationRuleConfig) -> Result<Self> {
        let admission = match (config.admit_all, config.roles) {
            (true, None) => Admission::AllRoles,
            (false, Some(roles)) => Admission::RoleKeywords(roles),
            (true, Some(_)) => {
                return Err(ScoutError::config(format!(
                    "Location rule {:?} sets both admit_all and roles",
                    config.name
                )))
            }
            (false, None) => {
                return Err(ScoutError::config(format!(
                    "Location rule {:?} needs admit_all or roles",
                    config.name
                )))
            }
        };

        LocationRule::new(&config.name, config.aliases.as_slice(), admission)
    }
}

impl LocationPolicy {
    pub fn new(rules: Vec<LocationRule>) -> Self {
        Self { rules }
    }

    pub fn from_configs(configs: Vec<LocationRuleConfig>) -> Result<Self> {
        let rules = configs
            .into_iter()
            .map(LocationRule::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Melbourne admits every role; Perth, Brisbane and Adelaide admit only
    /// the given role keywords. Other locations are dropped.
    pub fn default_with_roles<S: AsRef<str>>(role_keywords: &[S]) -> Result<Self> {
        let roles: Vec<String> = role_keywords.iter().map(|r| r.as_ref().to_string()).collect();
        let entries: [(&str, &[&str], Admission); 4] = [
            ("Melbourne", &["melbourne", "vic", "victoria"], Admission::AllRoles),
            (
                "Perth",
                &["perth", "wa", "western australia"],
                Admission::RoleKeywords(roles.clone()),
            ),
            (
                "Brisbane",
                &["brisbane", "qld", "queensland"],
                Admission::RoleKeywords(roles.clone()),
            ),
            (
                "Adelaide",
                &["adelaide", "sa", "south australia"],
                Admission::RoleKeywords(roles),
            ),
        ];

        let rules = entries
            .into_iter()
            .map(|(name, aliases, admission)| LocationRule::new(name, aliases, admission))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[LocationRule] {
        &self.rules
    }

    pub fn rule_for(&self, location: &str) -> Option<&LocationRule> {
        self.rules.iter().find(|rule| rule.matches_location(location))
    }

    pub fn admits(&self, record: &JobRecord) -> bool {
        self.rule_for(&record.location)
            .is_some_and(|rule| rule.admits_title(&record.title))
    }
}


/// Keep the records the policy admits, preserving order.
pub fn filter_records(records: Vec<JobRecord>, policy: &LocationPolicy) -> Vec<JobRecord> {
    records
        .into_iter()
        .filter(|record| policy.admits(record))
        .collect()
}

/// Keep records posted no more than `max_age_hours` ago.
pub fn filter_by_recency(records: Vec<JobRecord>, max_age_hours: f64) -> Vec<JobRecord> {
    records
        .into_iter()
        .filter(|record| record.posted_recency_hours <= max_age_hours)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linkedin::types::tests::record;

    fn default_policy() -> LocationPolicy {
        LocationPolicy::default_with_roles(DEFAULT_ROLE_KEYWORDS).unwrap()
    }

    #[test]
    fn test_permissive_location_keeps_any_title() {
        let policy = default_policy();
        let records = vec![
            record("Software Engineer", "Melbourne, Victoria, Australia", "https://l/1"),
            record("Receptionist", "Richmond VIC", "https://l/2"),
        ];
        assert_eq!(filter_records(records, &policy).len(), 2);
    }

    #[test]
    fn test_role_list_locations_require_keyword() {
        let policy = default_policy();
        let records = vec![
            record("Senior Financial Planner", "Perth, Western Australia", "https://l/1"),
            record("Software Engineer", "Perth, Western Australia", "https://l/2"),
            record("PARAPLANNER", "Brisbane QLD", "https://l/3"),
            record("Client Service Officer", "Adelaide, SA", "https://l/4"),
            record("Accountant", "Adelaide, SA", "https://l/5"),
        ];
        let kept: Vec<String> = filter_records(records, &policy)
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(kept, vec!["https://l/1", "https://l/3", "https://l/4"]);
    }

    #[test]
    fn test_unrecognised_locations_are_excluded() {
        let policy = default_policy();
        let records = vec![
            record("Financial Planner", "Sydney, New South Wales", "https://l/1"),
            record("Financial Planner", "Auckland, New Zealand", "https://l/2"),
            record("Financial Planner", "", "https://l/3"),
        ];
        assert!(filter_records(records, &policy).is_empty());
    }

    #[test]
    fn test_aliases_match_whole_words_only() {
        let policy = default_policy();
        // "wales" must not be read as "wa", "usa" must not be read as "sa"
        assert!(policy.rule_for("Newport, Wales").is_none());
        assert!(policy.rule_for("Austin, USA").is_none());
        assert_eq!(policy.rule_for("Fremantle WA").unwrap().name, "Perth");
    }

    #[test]
    fn test_filter_is_idempotent() {
        let policy = default_policy();
        let records = vec![
            record("Wealth Advisor", "Brisbane", "https://l/1"),
            record("Barista", "Brisbane", "https://l/2"),
            record("Barista", "Melbourne", "https://l/3"),
            record("Barista", "Hobart", "https://l/4"),
        ];
        let once = filter_records(records, &policy);
        let twice = filter_records(once.clone(), &policy);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            LocationRule::new("Perth", &["perth"], Admission::RoleKeywords(vec!["planner".into()]))
                .unwrap(),
            LocationRule::new("Australia", &["australia"], Admission::AllRoles).unwrap(),
        ];
        let policy = LocationPolicy::new(rules);
        assert!(!policy.admits(&record("Barista", "Perth, Australia", "https://l/1")));
        assert!(policy.admits(&record("Barista", "Darwin, Australia", "https://l/2")));
    }

    #[test]
    fn test_rule_config_validation() {
        let both = LocationRuleConfig {
            name: "Perth".into(),
            aliases: vec![],
            admit_all: true,
            roles: Some(vec!["planner".into()]),
        };
        assert!(LocationRule::try_from(both).is_err());

        let neither = LocationRuleConfig {
            name: "Perth".into(),
            aliases: vec![],
            admit_all: false,
            roles: None,
        };
        assert!(LocationRule::try_from(neither).is_err());

        let empty_roles = LocationRuleConfig {
            name: "Perth".into(),
            aliases: vec![],
            admit_all: false,
            roles: Some(vec!["  ".into()]),
        };
        assert!(LocationRule::try_from(empty_roles).is_err());

        let ok = LocationRuleConfig {
            name: "Perth".into(),
            aliases: vec![],
            admit_all: false,
            roles: Some(vec!["Planner".into()]),
        };
        let rule = LocationRule::try_from(ok).unwrap();
        assert!(rule.matches_location("perth"));
        assert!(rule.admits_title("Senior planner"));
    }

    #[test]
    fn test_blank_role_keywords_are_rejected() {
        let err = LocationPolicy::default_with_roles(&["  ", ""]).unwrap_err();
        assert!(matches!(err, ScoutError::Config(_)));
        assert_eq!(default_policy().rules().len(), 4);
    }

    #[test]
    fn test_recency_filter() {
        let mut fresh = record("Paraplanner", "Perth", "https://l/1");
        fresh.posted_recency_hours = 20.0;
        let mut stale = record("Paraplanner", "Perth", "https://l/2");
        stale.posted_recency_hours = 216.0;

        let kept = filter_by_recency(vec![fresh, stale], 24.0);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://l/1");
    }
}
