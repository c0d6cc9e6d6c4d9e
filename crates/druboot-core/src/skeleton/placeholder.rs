//! Placeholder tokens and literal substitution
//!
//! Skeleton files embed fixed sentinel tokens. Substitution replaces every
//! occurrence of every bound token with its configuration value. Replacement
//! is literal over raw bytes, so values are never interpreted as patterns and
//! binary files pass through untouched when they hold no token.

use crate::config::Configuration;
use crate::error::{Result, ScaffoldError, SubstitutionError};
use std::fmt;

/// Configuration fields that have a token in the skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    HumanName,
    SiteName,
    MachineName,
    DevIp,
}

impl Placeholder {
    pub const ALL: [Placeholder; 4] = [
        Placeholder::HumanName,
        Placeholder::SiteName,
        Placeholder::MachineName,
        Placeholder::DevIp,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Placeholder::HumanName => "human_name",
            Placeholder::SiteName => "site_name",
            Placeholder::MachineName => "machine_name",
            Placeholder::DevIp => "dev_ip",
        }
    }

    /// Required placeholders must resolve to a non-empty value
    pub fn is_required(&self) -> bool {
        !matches!(self, Placeholder::DevIp)
    }

    /// Value held by the configuration; an absent optional field is empty
    fn value<'a>(&self, config: &'a Configuration) -> &'a str {
        match self {
            Placeholder::HumanName => &config.human_name,
            Placeholder::SiteName => &config.site_name,
            Placeholder::MachineName => &config.machine_name,
            Placeholder::DevIp => config.dev_ip.as_deref().unwrap_or(""),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Mapping from placeholder to the literal token found in skeleton files
#[derive(Debug, Clone)]
pub struct PlaceholderMap {
    entries: Vec<(Placeholder, String)>,
}

impl Default for PlaceholderMap {
    fn default() -> Self {
        Self {
            entries: vec![
                (Placeholder::HumanName, "***DRUPAL_HUMAN_NAME***".to_string()),
                (Placeholder::SiteName, "***DRUPAL_SITE_NAME***".to_string()),
                (Placeholder::MachineName, "***DRUPAL_MACHINE_NAME***".to_string()),
                (Placeholder::DevIp, "***CHANGE.THIS.IP.ADDR***".to_string()),
            ],
        }
    }
}

impl PlaceholderMap {
    /// Build a map, rejecting empty, duplicated or overlapping tokens
    pub fn new(entries: Vec<(Placeholder, String)>) -> Result<Self> {
        for (i, (key, token)) in entries.iter().enumerate() {
            if token.is_empty() {
                return Err(ScaffoldError::Placeholder(format!("empty token for {}", key)));
            }
            for (other_key, other_token) in &entries[i + 1..] {
                if key == other_key {
                    return Err(ScaffoldError::Placeholder(format!("{} mapped twice", key)));
                }
                if token.contains(other_token.as_str()) || other_token.contains(token.as_str()) {
                    return Err(ScaffoldError::Placeholder(format!(
                        "tokens for {} and {} overlap",
                        key, other_key
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn token(&self, key: Placeholder) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, t)| t.as_str())
    }

    /// Resolve the (token, value) pair of every key in the map.
    ///
    /// Optional keys without a value are bound to the empty string, so no raw
    /// token survives substitution. Fails when a required key is empty, or
    /// when any value contains a token.
    pub fn bindings(&self, config: &Configuration) -> Result<Bindings> {
        let mut pairs = Vec::with_capacity(self.entries.len());

        for (key, token) in &self.entries {
            let value = key.value(config);
            if value.is_empty() && key.is_required() {
                return Err(SubstitutionError::MissingValue {
                    key: key.to_string(),
                    token: token.clone(),
                }
                .into());
            }

            if let Some((_, found)) = self.entries.iter().find(|(_, t)| value.contains(t.as_str())) {
                return Err(SubstitutionError::ValueContainsToken {
                    key: key.to_string(),
                    token: found.clone(),
                }
                .into());
            }

            pairs.push((token.clone().into_bytes(), value.as_bytes().to_vec()));
        }

        Ok(Bindings { pairs })
    }
}

/// Resolved (token, value) pairs ready for substitution
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Bindings {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// True if `content` still holds any bound token
    pub fn contains_token(&self, content: &[u8]) -> bool {
        self.pairs
            .iter()
            .any(|(token, _)| find(content, token, 0).is_some())
    }
}

/// Replace every bound token in `content` with its value.
///
/// A single left-to-right scan over the original bytes: inserted values are
/// never scanned again, so text produced by a replacement cannot form a token.
pub fn substitute(content: &[u8], bindings: &Bindings) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut copied = 0;
    let mut pos = 0;

    while pos < content.len() {
        let rest = &content[pos..];
        match bindings.pairs.iter().find(|(token, _)| rest.starts_with(token)) {
            Some((token, value)) => {
                out.extend_from_slice(&content[copied..pos]);
                out.extend_from_slice(value);
                pos += token.len();
                copied = pos;
            }
            None => pos += 1,
        }
    }

    out.extend_from_slice(&content[copied..]);
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() || from > haystack.len() - needle.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}
