//! Removable-section rules, loaded once at startup.
//!
//! The schema mirrors the page-loader configuration used by the wiki
//! rendering stack:
//!
//! ```yaml
//! removableSections:
//!   classes:   [ambox, navbox]
//!   rdfa:      [mw:Extension/references]
//!   templates: [Short description, /^More citations needed/]
//! ```
//!
//! Template entries wrapped in `/.../` are regular expressions; bare entries
//! match the template name case-insensitively.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrepConfig {
    pub removable_sections: RemovableSections,
}

/// Raw rule lists as they appear in the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemovableSections {
    pub classes: Vec<String>,
    pub rdfa: Vec<String>,
    pub templates: Vec<String>,
}

impl PrepConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Compiled form of [RemovableSections]. Built once, then shared read-only
/// across requests.
#[derive(Debug, Default)]
pub struct RemovableRules {
    classes: HashSet<String>,
    rdfa: HashSet<String>,
    templates: Vec<TemplateMatcher>,
}

#[derive(Debug)]
enum TemplateMatcher {
    Exact(String),
    Pattern(Regex),
}

impl RemovableRules {
    pub fn compile(sections: &RemovableSections) -> Result<Self, Error> {
        let mut templates = Vec::with_capacity(sections.templates.len());
        for entry in &sections.templates {
            if entry.len() > 1 && entry.starts_with('/') && entry.ends_with('/') {
                let pattern = &entry[1..entry.len() - 1];
                let regex = Regex::new(&format!("(?i){}", pattern)).map_err(|e| {
                    Error::Config(format!("bad template pattern {}: {}", entry, e))
                })?;
                templates.push(TemplateMatcher::Pattern(regex));
            } else {
                templates.push(TemplateMatcher::Exact(entry.to_lowercase()));
            }
        }

        Ok(RemovableRules {
            classes: sections.classes.iter().cloned().collect(),
            rdfa: sections.rdfa.iter().cloned().collect(),
            templates,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.rdfa.is_empty() && self.templates.is_empty()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn has_rdfa(&self, value: &str) -> bool {
        self.rdfa.contains(value)
    }

    pub fn matches_template(&self, name: &str) -> bool {
        self.templates.iter().any(|matcher| match matcher {
            TemplateMatcher::Exact(exact) => name.to_lowercase() == *exact,
            TemplateMatcher::Pattern(regex) => regex.is_match(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schema() {
        let yaml = r"
removableSections:
  classes: [ambox, navbox]
  rdfa: ['mw:Extension/references']
  templates: ['Short description', '/^More citations/']
";
        let config: PrepConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.removable_sections.classes.len(), 2);
        assert_eq!(config.removable_sections.rdfa.len(), 1);
        assert_eq!(config.removable_sections.templates.len(), 2);
    }

    #[test]
    fn missing_sections_default_empty() {
        let config: PrepConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.removable_sections.classes.is_empty());
        let rules = RemovableRules::compile(&config.removable_sections).unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn template_matchers() {
        let sections = RemovableSections {
            classes: vec![],
            rdfa: vec![],
            templates: vec!["Short description".to_string(), "/^Infobox/".to_string()],
        };
        let rules = RemovableRules::compile(&sections).unwrap();
        assert!(rules.matches_template("short DESCRIPTION"));
        assert!(rules.matches_template("infobox person"));
        assert!(!rules.matches_template("citation"));
    }

    #[test]
    fn bad_pattern_is_config_error() {
        let sections = RemovableSections {
            classes: vec![],
            rdfa: vec![],
            templates: vec!["/([unclosed/".to_string()],
        };
        assert!(matches!(
            RemovableRules::compile(&sections),
            Err(Error::Config(_))
        ));
    }
}
