use std::fs;
use std::path::Path;

use glob::glob;
use regex::Regex;
use thiserror::Error;
use yaml_rust2::{Yaml, YamlLoader};

use crate::catalog::FieldKind;
use crate::utility::contains_segment;

// ----------------- Rule Structures -----------------

/// One known field of the document family, with its patterns compiled.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub display_label: String,
    pub aliases: Vec<String>,
    pub label: Regex,
    /// `label` anchored at both ends, for recognising a whole label.
    pub label_exact: Regex,
    pub boolean_labels: Option<(String, String)>,
    pub backfill: Option<Regex>,
}

/// A context regex and the field names it points at.
#[derive(Debug, Clone)]
pub struct SemanticRule {
    pub pattern: Regex,
    pub keys: Vec<String>,
    /// Field the rule was declared with; replaced along with that field.
    pub owner: Option<String>,
}

impl SemanticRule {
    /// The key set contains the field, or a key and the field are substrings
    /// of one another (`protein` vouches for `proteins`). Two-letter names only
    /// match as whole `_` segments, so `ph` stays out of `staphylococcus`.
    pub fn covers(&self, field: &str) -> bool {
        self.keys.iter().any(|key| {
            if key == field {
                return true;
            }
            if key.len().min(field.len()) <= 2 {
                contains_segment(field, key) || contains_segment(key, field)
            } else {
                field.contains(key.as_str()) || key.contains(field)
            }
        })
    }
}

// ----------------- Rule Book -----------------

/// Field and context rules for one document family.
#[derive(Debug, Clone)]
pub struct RuleBook {
    fields: Vec<FieldRule>,
    semantic: Vec<SemanticRule>,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleBook {
    /// The sixteen-row Certificate-of-Analysis panel.
    pub fn builtin() -> Self {
        let mut fields = Vec::with_capacity(FieldKind::ALL.len());
        let mut semantic = Vec::with_capacity(FieldKind::ALL.len());

        for kind in FieldKind::ALL {
            let label = Regex::new(kind.label_pattern()).expect("catalog label pattern");
            let label_exact = anchored(kind.label_pattern()).expect("catalog label pattern");
            fields.push(FieldRule {
                name: kind.canonical_name().to_string(),
                display_label: kind.display_label().to_string(),
                aliases: kind.corrupted_aliases().iter().map(|a| a.to_string()).collect(),
                label,
                label_exact,
                boolean_labels: kind
                    .boolean_labels()
                    .map(|(yes, no)| (yes.to_string(), no.to_string())),
                backfill: kind
                    .backfill_pattern()
                    .map(|p| Regex::new(p).expect("catalog backfill pattern")),
            });
            semantic.push(SemanticRule {
                pattern: Regex::new(kind.context_pattern()).expect("catalog context pattern"),
                keys: kind.context_keys().iter().map(|k| k.to_string()).collect(),
                owner: Some(kind.canonical_name().to_string()),
            });
        }

        Self { fields, semantic }
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn semantic_rules(&self) -> &[SemanticRule] {
        &self.semantic
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn canonical_for_alias(&self, corrupted: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.aliases.iter().any(|a| a == corrupted))
            .map(|f| f.name.as_str())
    }

    /// Canonical name of the field whose label is exactly `label`.
    pub fn canonical_for_label(&self, label: &str) -> Option<&str> {
        let label = label.trim();
        self.fields
            .iter()
            .find(|f| f.label_exact.is_match(label))
            .map(|f| f.name.as_str())
    }

    /// Replaces a field of the same name or appends a new one. A replaced
    /// field takes its context rules with it.
    pub fn upsert_field(&mut self, rule: FieldRule, semantic: Option<SemanticRule>) {
        match self.fields.iter().position(|f| f.name == rule.name) {
            Some(idx) => {
                self.semantic
                    .retain(|s| s.owner.as_deref() != Some(rule.name.as_str()));
                self.fields[idx] = rule;
            }
            None => self.fields.push(rule),
        }
        if let Some(semantic) = semantic {
            self.semantic.push(semantic);
        }
    }

    pub fn push_semantic(&mut self, rule: SemanticRule) {
        self.semantic.push(rule);
    }

    // ----------------- Configuration -----------------

    pub fn from_yaml(config: &str) -> Result<Self, RuleError> {
        Self::builtin().with_yaml(config)
    }

    /// Merges a YAML rule file on top of this book.
    pub fn with_yaml(mut self, config: &str) -> Result<Self, RuleError> {
        let docs = YamlLoader::load_from_str(config)
            .map_err(|e| RuleError::YamlParseError(e.to_string()))?;

        if docs.is_empty() {
            return Err(RuleError::EmptyYaml);
        }

        // multi-document files are merged in order
        for doc in &docs {
            if let Some(field_section) = doc["fields"].as_vec() {
                for item in field_section {
                    let (rule, semantic) = Self::parse_field(item)?;
                    self.upsert_field(rule, semantic);
                }
            }

            if let Some(rule_section) = doc["rules"].as_vec() {
                for item in rule_section {
                    let pattern = item["pattern"]
                        .as_str()
                        .ok_or_else(|| RuleError::InvalidRule("rule without 'pattern'".into()))?;
                    let keys = string_list(&item["keys"]);
                    if keys.is_empty() {
                        return Err(RuleError::InvalidRule(format!(
                            "rule '{}' has no keys",
                            pattern
                        )));
                    }
                    self.push_semantic(SemanticRule {
                        pattern: compile(pattern)?,
                        keys,
                        owner: None,
                    });
                }
            }
        }

        Ok(self)
    }

    fn parse_field(item: &Yaml) -> Result<(FieldRule, Option<SemanticRule>), RuleError> {
        let name = item["name"]
            .as_str()
            .ok_or_else(|| RuleError::InvalidRule("field without 'name'".into()))?
            .to_string();
        let label_pattern = item["label"]
            .as_str()
            .ok_or_else(|| RuleError::InvalidRule(format!("field '{}' has no 'label'", name)))?;

        let label = compile(label_pattern)?;
        let label_exact = anchored(label_pattern)
            .map_err(|e| RuleError::RegexError(label_pattern.to_string(), e.to_string()))?;
        let display_label = item["display"].as_str().unwrap_or(&name).to_string();

        let boolean_labels = match (item["positive"].as_str(), item["negative"].as_str()) {
            (Some(yes), Some(no)) => Some((yes.to_string(), no.to_string())),
            (None, None) => None,
            _ => {
                return Err(RuleError::InvalidRule(format!(
                    "field '{}' needs both 'positive' and 'negative'",
                    name
                )));
            }
        };

        let backfill = item["backfill"].as_str().map(compile).transpose()?;

        let semantic = match item["context"].as_str() {
            Some(pattern) => {
                let mut keys = string_list(&item["keys"]);
                if !keys.contains(&name) {
                    keys.insert(0, name.clone());
                }
                Some(SemanticRule {
                    pattern: compile(pattern)?,
                    keys,
                    owner: Some(name.clone()),
                })
            }
            None => None,
        };

        let rule = FieldRule {
            aliases: string_list(&item["aliases"]),
            name,
            display_label,
            label,
            label_exact,
            boolean_labels,
            backfill,
        };

        Ok((rule, semantic))
    }

    pub fn from_config_file(config_path: &Path) -> Result<Self, RuleError> {
        let content = fs::read_to_string(config_path)
            .map_err(|e| RuleError::FileError(format!("{}: {}", config_path.display(), e)))?;
        Self::from_yaml(&content)
    }

    /// Loads every YAML file matching `pattern` on top of the builtin book.
    pub fn from_config_glob(pattern: &str) -> Result<Self, RuleError> {
        let glob_iter = glob(pattern).map_err(|e| {
            RuleError::GlobError(format!("Invalid glob pattern '{}': {}", pattern, e))
        })?;

        let mut book = Self::builtin();
        let mut loaded = 0;

        for entry in glob_iter {
            match entry {
                Ok(path) if path.is_file() && is_rule_file(&path) => {
                    let content = fs::read_to_string(&path)
                        .map_err(|e| RuleError::FileError(format!("{}: {}", path.display(), e)))?;
                    book = book.with_yaml(&content)?;
                    loaded += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Error accessing file in pattern {}: {}", pattern, e);
                }
            }
        }

        if loaded == 0 {
            return Err(RuleError::FileError(format!(
                "No rule files found for pattern: {}",
                pattern
            )));
        }

        tracing::debug!(files = loaded, pattern, "loaded rule files");
        Ok(book)
    }
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|e| RuleError::RegexError(pattern.to_string(), e.to_string()))
}

/// Anchors a pattern, moving a leading inline flag group in front of the
/// anchor so `(?i)a|b` becomes `(?i)^(?:a|b)$`.
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    let flag_group = pattern.strip_prefix("(?").and_then(|rest| {
        let end = rest.find(')')?;
        let flags = &rest[..end];
        (!flags.is_empty() && flags.chars().all(|c| "imsxuUR-".contains(c))).then_some(end + 3)
    });
    let (flags, body) = match flag_group {
        Some(end) => pattern.split_at(end),
        None => ("", pattern),
    };
    Regex::new(&format!("{}^(?:{})$", flags, body))
}

fn string_list(yaml: &Yaml) -> Vec<String> {
    match yaml {
        Yaml::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Yaml::String(single) => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn is_rule_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    )
}

// ----------------- Error Types -----------------

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("YAML parse error: {0}")]
    YamlParseError(String),

    #[error("Empty YAML document")]
    EmptyYaml,

    #[error("Regex error for pattern '{0}': {1}")]
    RegexError(String, String),

    #[error("Invalid rule configuration: {0}")]
    InvalidRule(String),

    #[error("File error: {0}")]
    FileError(String),

    #[error("Glob pattern error: {0}")]
    GlobError(String),
}
