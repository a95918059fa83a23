use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

const BUILTIN_RULES: &str = include_str!("../rules/default.toml");

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Failed to read rule table: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse rule table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Rule '{name}' has an invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
    #[error("Rule '{0}' has an empty pattern")]
    EmptyPattern(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive substring.
    #[default]
    Contains,
    /// Case-insensitive, bounded by non-word characters on alphanumeric edges.
    Word,
    /// Case-insensitive regular expression.
    Regex,
}

/// What a matching line or item name means to the extractor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    HeaderFooter,
    StructuredRecord,
    Summary,
    NoiseName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub action: RuleAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleTable {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    rules: Vec<PatternRule>,
}

/// A rule with its pattern prepared for matching.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: PatternRule,
    lowered: String,
    compiled_regex: Option<Regex>,
}

/// The keyword and pattern tables the extractor consults, loaded from TOML.
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: u32,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn new(version: u32, rules: Vec<PatternRule>) -> Result<Self, RulesError> {
        let rules = rules
            .into_iter()
            .map(compile_rule)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { version, rules })
    }

    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_RULES).expect("embedded rule table is valid")
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RulesError> {
        let table: RuleTable = toml::from_str(toml_content)?;
        Self::new(table.version, table.rules)
    }

    pub fn from_file(path: &Path) -> Result<Self, RulesError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The first rule with `action` that matches `text`, in table order.
    pub fn first_match(&self, action: RuleAction, text: &str) -> Option<&PatternRule> {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .filter(|cr| cr.rule.action == action)
            .find(|cr| rule_matches(cr, text, &lowered))
            .map(|cr| &cr.rule)
    }

    pub fn matches(&self, action: RuleAction, text: &str) -> bool {
        self.first_match(action, text).is_some()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

fn compile_rule(rule: PatternRule) -> Result<CompiledRule, RulesError> {
    if rule.pattern.is_empty() {
        return Err(RulesError::EmptyPattern(rule.name));
    }
    let compiled_regex = match rule.match_type {
        MatchType::Contains => None,
        MatchType::Word => Some(word_regex(&rule.pattern)),
        MatchType::Regex => Some(rule.pattern.clone()),
    }
    .map(|pattern| {
        RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| RulesError::InvalidPattern {
                name: rule.name.clone(),
                source,
            })
    })
    .transpose()?;

    Ok(CompiledRule {
        lowered: rule.pattern.to_lowercase(),
        rule,
        compiled_regex,
    })
}

/// `\b` only holds next to word characters, so it is applied per edge.
fn word_regex(keyword: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let mut pattern = String::new();
    if is_word(keyword.chars().next()) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(keyword));
    if is_word(keyword.chars().last()) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn rule_matches(cr: &CompiledRule, text: &str, lowered: &str) -> bool {
    match cr.rule.match_type {
        MatchType::Contains => lowered.contains(&cr.lowered),
        MatchType::Word | MatchType::Regex => cr
            .compiled_regex
            .as_ref()
            .is_some_and(|re| re.is_match(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rule(pattern: &str, match_type: MatchType, action: RuleAction) -> PatternRule {
        PatternRule {
            name: "test".to_string(),
            pattern: pattern.to_string(),
            match_type,
            action,
        }
    }

    #[test]
    fn builtin_table_loads() {
        let rules = RuleSet::builtin();
        assert!(rules.version() >= 1);
        assert!(!rules.is_empty());
    }

    #[test]
    fn contains_is_case_insensitive() {
        let rules = RuleSet::new(
            1,
            vec![make_rule("printed on", MatchType::Contains, RuleAction::HeaderFooter)],
        )
        .unwrap();
        assert!(rules.matches(RuleAction::HeaderFooter, "PRINTED ON 12 March"));
        assert!(!rules.matches(RuleAction::HeaderFooter, "Printer cable"));
    }

    #[test]
    fn word_match_respects_boundaries() {
        let rules = RuleSet::new(1, vec![make_rule("tel", MatchType::Word, RuleAction::Summary)]).unwrap();
        assert!(rules.matches(RuleAction::Summary, "Tel: 555 1234"));
        assert!(!rules.matches(RuleAction::Summary, "Hotel stay"));
    }

    #[test]
    fn word_match_with_symbol_edge() {
        let rules = RuleSet::new(1, vec![make_rule("sv=", MatchType::Word, RuleAction::HeaderFooter)]).unwrap();
        assert!(rules.matches(RuleAction::HeaderFooter, "blob?sv=2021"));
    }

    #[test]
    fn regex_is_case_insensitive() {
        let rules = RuleSet::new(
            1,
            vec![make_rule(r"\bitem[ _]?name\b", MatchType::Regex, RuleAction::StructuredRecord)],
        )
        .unwrap();
        assert!(rules.matches(RuleAction::StructuredRecord, "\"Item Name\": \"Widget\""));
    }

    #[test]
    fn actions_are_kept_apart() {
        let rules = RuleSet::new(
            1,
            vec![make_rule("total", MatchType::Word, RuleAction::Summary)],
        )
        .unwrap();
        assert!(rules.matches(RuleAction::Summary, "Grand Total"));
        assert!(!rules.matches(RuleAction::NoiseName, "Grand Total"));
    }

    #[test]
    fn first_match_follows_table_order() {
        let rules = RuleSet::new(
            1,
            vec![
                PatternRule { name: "first".into(), ..make_rule("page", MatchType::Contains, RuleAction::HeaderFooter) },
                PatternRule { name: "second".into(), ..make_rule("page 1", MatchType::Contains, RuleAction::HeaderFooter) },
            ],
        )
        .unwrap();
        assert_eq!(rules.first_match(RuleAction::HeaderFooter, "Page 1 of 2").unwrap().name, "first");
    }

    #[test]
    fn from_toml_parses_table() {
        let toml = r#"
            version = 7

            [[rules]]
            name = "vat"
            pattern = "vat"
            match_type = "word"
            action = "summary"
        "#;
        let rules = RuleSet::from_toml(toml).unwrap();
        assert_eq!(rules.version(), 7);
        assert!(rules.matches(RuleAction::Summary, "VAT 20"));
    }

    #[test]
    fn from_toml_defaults_match_type_to_contains() {
        let toml = r#"
            [[rules]]
            name = "footer"
            pattern = "thank you"
            action = "header_footer"
        "#;
        let rules = RuleSet::from_toml(toml).unwrap();
        assert!(rules.matches(RuleAction::HeaderFooter, "Thank you for your visit"));
    }

    #[test]
    fn from_toml_rejects_unknown_action() {
        let toml = r#"
            [[rules]]
            name = "bad"
            pattern = "x"
            action = "explode"
        "#;
        assert!(matches!(RuleSet::from_toml(toml), Err(RulesError::Parse(_))));
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let err = RuleSet::new(1, vec![make_rule("(unclosed", MatchType::Regex, RuleAction::Summary)]).unwrap_err();
        assert!(matches!(err, RulesError::InvalidPattern { .. }));
    }

    #[test]
    fn empty_pattern_is_an_error() {
        let err = RuleSet::new(1, vec![make_rule("", MatchType::Contains, RuleAction::Summary)]).unwrap_err();
        assert!(matches!(err, RulesError::EmptyPattern(_)));
    }

    #[test]
    fn from_file_reads_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            "version = 2\n[[rules]]\nname = \"x\"\npattern = \"fee\"\naction = \"noise_name\"\n",
        )
        .unwrap();
        let rules = RuleSet::from_file(&path).unwrap();
        assert_eq!(rules.version(), 2);
        assert!(rules.matches(RuleAction::NoiseName, "Late fee"));
    }
}
