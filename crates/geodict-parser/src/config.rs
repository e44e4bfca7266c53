use std::fmt;

use geodict_types::Category;
use thiserror::Error;

/// Longest place name, in words, a matcher will try to grow.
pub const DEFAULT_WORD_MAX: usize = 3;

/// Words that, placed right before a region, mark it as a location.
pub const DEFAULT_LOCATION_WORDS: [&str; 2] = ["at", "in"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown token category {0:?} in sequence pattern")]
    UnknownCategory(String),
    #[error("sequence pattern is empty")]
    EmptyPattern,
    #[error("sequence pattern {0} ends in LOCATION_CUE and can never produce a token")]
    TrailingCue(String),
    #[error("no sequence patterns configured")]
    NoPatterns,
    #[error("word_max must be at least 1")]
    ZeroWordMax,
}

/// Token categories in the order they appear in text, e.g. `CITY, COUNTRY`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequencePattern {
    categories: Vec<Category>,
}

impl SequencePattern {
    pub fn new(categories: Vec<Category>) -> Result<Self, ConfigError> {
        let Some(&last) = categories.last() else {
            return Err(ConfigError::EmptyPattern);
        };
        let pattern = Self { categories };
        if last == Category::LocationCue {
            return Err(ConfigError::TrailingCue(pattern.to_string()));
        }
        Ok(pattern)
    }

    /// Parse a comma- or whitespace-separated list of category names.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let categories = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| {
                Category::from_name(part).ok_or_else(|| ConfigError::UnknownCategory(part.into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(categories)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Built-in patterns in priority order. Regions are common enough as
    /// ordinary words that they are only accepted next to a city, a country
    /// or a cue word.
    pub fn defaults() -> Vec<SequencePattern> {
        use Category::*;
        [
            vec![City, Country],
            vec![City, Region],
            vec![Region, Country],
            vec![Country],
            vec![LocationCue, Region],
        ]
        .into_iter()
        .map(|categories| SequencePattern { categories })
        .collect()
    }
}

impl fmt::Display for SequencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, category) in self.categories.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{category}")?;
        }
        f.write_str("]")
    }
}

#[derive(Clone, Debug)]
pub struct ParserConfig {
    pub word_max: usize,
    pub location_words: Vec<String>,
    pub patterns: Vec<SequencePattern>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            word_max: DEFAULT_WORD_MAX,
            location_words: DEFAULT_LOCATION_WORDS.iter().map(|w| w.to_string()).collect(),
            patterns: SequencePattern::defaults(),
        }
    }
}

impl ParserConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.word_max == 0 {
            return Err(ConfigError::ZeroWordMax);
        }
        if self.patterns.is_empty() {
            return Err(ConfigError::NoPatterns);
        }
        Ok(())
    }

    /// Parse `;`-separated patterns, e.g. `"CITY,COUNTRY; COUNTRY"`.
    pub fn parse_patterns(raw: &str) -> Result<Vec<SequencePattern>, ConfigError> {
        let patterns = raw
            .split(';')
            .filter(|part| !part.trim().is_empty())
            .map(SequencePattern::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if patterns.is_empty() {
            return Err(ConfigError::NoPatterns);
        }
        Ok(patterns)
    }

    /// `word` must already be lowercased.
    pub fn is_location_word(&self, word: &str) -> bool {
        self.location_words
            .iter()
            .any(|cue| cue.to_lowercase() == word)
    }
}
