//! Name selectors for choosing which components a run touches

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use glob::{MatchOptions, Pattern};
use sbx_api::normalize_name;

use crate::{Error, Result};

/// How a selector is compared against a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    Prefix,
    Glob,
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "prefix" => Ok(MatchMode::Prefix),
            "glob" => Ok(MatchMode::Glob),
            _ => Err(Error::InvalidMatchMode { mode: s.to_string() }),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Exact => write!(f, "exact"),
            MatchMode::Prefix => write!(f, "prefix"),
            MatchMode::Glob => write!(f, "glob"),
        }
    }
}

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug)]
struct Selector {
    original: String,
    normalized: String,
    pattern: Option<Pattern>,
}

impl Selector {
    fn matches(&self, mode: MatchMode, name: &str) -> bool {
        if self.normalized.is_empty() {
            return false;
        }
        match mode {
            MatchMode::Exact => name == self.normalized,
            MatchMode::Prefix => name.starts_with(&self.normalized),
            MatchMode::Glob => self
                .pattern
                .as_ref()
                .is_some_and(|p| p.matches_with(name, GLOB_OPTIONS)),
        }
    }
}

/// Items chosen by a [`Matcher`]
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    pub selected: Vec<T>,
    /// Selectors that matched nothing, in their original spelling
    pub missing: Vec<String>,
}

/// A compiled set of selectors
#[derive(Debug)]
pub struct Matcher {
    mode: MatchMode,
    all: bool,
    selectors: Vec<Selector>,
}

impl Matcher {
    /// Compile selectors; without `all` at least one selector is required
    pub fn new(mode: MatchMode, selectors: &[String], all: bool) -> Result<Self> {
        if !all && selectors.is_empty() {
            return Err(Error::NoSelectors);
        }

        let selectors = selectors
            .iter()
            .map(|original| {
                let normalized = normalize_name(original);
                let pattern = match mode {
                    MatchMode::Glob if !normalized.is_empty() => {
                        Some(Pattern::new(&normalized).map_err(|source| Error::Glob {
                            pattern: original.clone(),
                            source,
                        })?)
                    }
                    _ => None,
                };
                Ok(Selector {
                    original: original.clone(),
                    normalized,
                    pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { mode, all, selectors })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Select the items whose name matches any selector.
    ///
    /// Each normalized name is selected once, first occurrence wins, in input
    /// order. With `all` every distinct name is selected and nothing is
    /// reported missing.
    pub fn filter<T>(&self, items: Vec<T>, name: impl Fn(&T) -> &str) -> Selection<T> {
        let mut hit = vec![false; self.selectors.len()];
        let mut seen = HashSet::new();
        let mut selected = Vec::new();

        for item in items {
            let key = normalize_name(name(&item));
            let mut matched = self.all;
            for (index, selector) in self.selectors.iter().enumerate() {
                if selector.matches(self.mode, &key) {
                    hit[index] = true;
                    matched = true;
                }
            }
            if !matched {
                continue;
            }
            if seen.insert(key) {
                selected.push(item);
            } else {
                tracing::warn!(name = name(&item), "skipping duplicate entry; first occurrence wins");
            }
        }

        if self.all {
            return Selection {
                selected,
                missing: Vec::new(),
            };
        }

        let missing = self
            .selectors
            .iter()
            .zip(hit)
            .filter(|(_, hit)| !hit)
            .map(|(selector, _)| selector.original.clone())
            .collect();

        Selection { selected, missing }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn names() -> Vec<&'static str> {
        vec!["hero", "Hero-Banner", "teaser", "footer", "hero"]
    }

    fn select(mode: MatchMode, selectors: &[&str]) -> Selection<&'static str> {
        let selectors: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        Matcher::new(mode, &selectors, false).unwrap().filter(names(), |n| n)
    }

    #[rstest]
    #[case("exact", MatchMode::Exact)]
    #[case("PREFIX", MatchMode::Prefix)]
    #[case(" glob ", MatchMode::Glob)]
    fn test_parse_mode(#[case] input: &str, #[case] expected: MatchMode) {
        assert_eq!(input.parse::<MatchMode>().unwrap(), expected);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let err = "fuzzy".parse::<MatchMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidMatchMode { .. }));
    }

    #[test]
    fn test_exact_is_case_insensitive_and_deduplicated() {
        let selection = select(MatchMode::Exact, &["HERO"]);
        assert_eq!(selection.selected, vec!["hero"]);
        assert!(selection.missing.is_empty());
    }

    #[test]
    fn test_prefix() {
        let selection = select(MatchMode::Prefix, &["her"]);
        assert_eq!(selection.selected, vec!["hero", "Hero-Banner"]);
    }

    #[test]
    fn test_glob() {
        let selection = select(MatchMode::Glob, &["*er", "t?aser"]);
        assert_eq!(selection.selected, vec!["Hero-Banner", "teaser", "footer"]);
    }

    #[test]
    fn test_missing_selectors_keep_original_spelling() {
        let selection = select(MatchMode::Exact, &["hero", "Missing-One", "  "]);
        assert_eq!(selection.selected, vec!["hero"]);
        assert_eq!(selection.missing, vec!["Missing-One", "  "]);
    }

    #[test]
    fn test_all_selects_each_name_once() {
        let matcher = Matcher::new(MatchMode::Exact, &[], true).unwrap();
        let selection = matcher.filter(names(), |n| n);
        assert_eq!(selection.selected, vec!["hero", "Hero-Banner", "teaser", "footer"]);
        assert!(selection.missing.is_empty());
    }

    #[test]
    fn test_no_selectors_without_all() {
        let err = Matcher::new(MatchMode::Exact, &[], false).unwrap_err();
        assert!(matches!(err, Error::NoSelectors));
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let err = Matcher::new(MatchMode::Glob, &["[hero".to_string()], false).unwrap_err();
        assert!(matches!(err, Error::Glob { .. }));
    }
}
