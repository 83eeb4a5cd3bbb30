//! Typed denylist data
//!
//! Patterns are validated and compiled once when the denylist is built and
//! the compiled set is never modified afterwards.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::config::FilterConfig;
use crate::error::{ConfigError, Result};

const DEFAULT_DENYLIST: &str = include_str!("default_denylist.toml");

/// One denylist entry as written in configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenyPattern {
    pub pattern: String,
    pub is_regex: bool,
}

impl DenyPattern {
    pub fn word(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: false,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: true,
        }
    }

    fn compile(&self) -> Result<Regex> {
        if self.pattern.trim().is_empty() && self.pattern != "\n" {
            return Err(ConfigError::InvalidPattern {
                pattern: self.pattern.clone(),
                reason: "pattern is empty".to_string(),
            }
            .into());
        }

        let source = if self.is_regex {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };

        RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ConfigError::InvalidPattern {
                    pattern: self.pattern.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DenylistFile {
    #[serde(default)]
    words: Vec<String>,
    #[serde(default)]
    regex: Vec<String>,
}

impl DenylistFile {
    fn into_patterns(self) -> Vec<DenyPattern> {
        self.words
            .into_iter()
            .map(DenyPattern::word)
            .chain(self.regex.into_iter().map(DenyPattern::regex))
            .collect()
    }
}

/// Compiled, case-insensitive denylist
#[derive(Debug, Clone)]
pub struct Denylist {
    entries: Vec<(DenyPattern, Regex)>,
}

impl Denylist {
    /// Compile a list of patterns, failing on the first invalid one
    pub fn new(patterns: Vec<DenyPattern>) -> Result<Self> {
        let entries = patterns
            .into_iter()
            .map(|p| p.compile().map(|re| (p, re)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// The denylist shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_DENYLIST)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: DenylistFile = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Self::new(file.into_patterns())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    /// Build the denylist described by the `[filter]` section
    ///
    /// `denylist_file` replaces the built-in list; `extra_words` are appended
    /// as plain patterns either way.
    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        let mut denylist = match &config.denylist_file {
            Some(raw) => {
                let expanded = shellexpand::full(raw).map_err(|e| ConfigError::InvalidValue {
                    field: "filter.denylist_file".to_string(),
                    reason: e.to_string(),
                })?;
                let path = Path::new(expanded.as_ref());
                tracing::debug!("Loading denylist from {}", path.display());
                Self::load_from_path(path)?
            }
            None => Self::builtin()?,
        };

        denylist.extend(config.extra_words.iter().cloned().map(DenyPattern::word))?;
        Ok(denylist)
    }

    fn extend(&mut self, patterns: impl IntoIterator<Item = DenyPattern>) -> Result<()> {
        for pattern in patterns {
            let re = pattern.compile()?;
            self.entries.push((pattern, re));
        }
        Ok(())
    }

    /// First pattern found in `text`, if any
    pub fn find(&self, text: &str) -> Option<&DenyPattern> {
        self.entries
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(pattern, _)| pattern)
    }

    pub fn is_denied(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
