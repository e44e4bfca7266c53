use std::collections::HashMap;

use geodict_types::{Category, GazetteerStore, LookupError};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::{ConfigError, ParserConfig, SequencePattern};
use crate::matchers::Matchers;
use crate::phrase::LocatedPhrase;
use crate::tokenizer::ScanContext;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("city lookup failed: {0}")]
    CityLookup(#[from] LookupError),
}

/// Finds place mentions in text by walking it backwards and trying each
/// sequence pattern at every word that could end a country or region name.
///
/// Holds no per-call state, so one parser can serve any number of
/// concurrent `find_locations` calls.
pub struct GeoParser<G> {
    store: G,
    config: ParserConfig,
}

impl<G: GazetteerStore> GeoParser<G> {
    /// Validates `config` up front; a bad pattern list never reaches a scan.
    pub fn new(store: G, config: ParserConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn with_defaults(store: G) -> Self {
        Self {
            store,
            config: ParserConfig::default(),
        }
    }

    pub fn store(&self) -> &G {
        &self.store
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// All place mentions in `text`, ordered by start offset and
    /// non-overlapping.
    pub fn find_locations(&self, text: &str) -> Result<Vec<LocatedPhrase>, ParseError> {
        let mut ctx = ScanContext::new(text);
        let countries = self.store.country_index();
        let regions = self.store.region_index();
        let mut found = Vec::new();

        let mut current = ctx.len() as isize - 1;
        while current >= 0 {
            let pulled = ctx.pull_word_backward(current);
            let lower = pulled.word.to_lowercase();
            if !countries.contains_key(&lower) && !regions.contains_key(&lower) {
                current = pulled.next_index;
                continue;
            }

            match self.match_sequences(&mut ctx, current)? {
                Some(phrase) => {
                    debug!(
                        "matched {:?} at {}..{}",
                        phrase.categories(),
                        phrase.start(),
                        phrase.end()
                    );
                    current = phrase.start() as isize - 1;
                    found.push(phrase);
                }
                // Nothing fits here: back up one word and keep going.
                None => current = pulled.next_index,
            }
        }

        found.reverse();
        Ok(found)
    }

    /// Try every pattern at `position` in priority order; the first one whose
    /// categories all match wins.
    fn match_sequences(
        &self,
        ctx: &mut ScanContext,
        position: isize,
    ) -> Result<Option<LocatedPhrase>, LookupError> {
        let matchers = Matchers::new(&self.store, &self.config);
        // Outcome of the rightmost matcher per category, shared by every
        // pattern ending in that category.
        let mut tail_cache: HashMap<Category, Option<LocatedPhrase>> = HashMap::new();

        for pattern in &self.config.patterns {
            let matched =
                self.match_pattern(&matchers, &mut tail_cache, ctx, pattern, position)?;
            if let Some(phrase) = matched {
                trace!("pattern {pattern} matched at {position}");
                return Ok(Some(phrase));
            }
        }
        Ok(None)
    }

    fn match_pattern(
        &self,
        matchers: &Matchers<'_, G>,
        tail_cache: &mut HashMap<Category, Option<LocatedPhrase>>,
        ctx: &mut ScanContext,
        pattern: &SequencePattern,
        position: isize,
    ) -> Result<Option<LocatedPhrase>, LookupError> {
        let mut result: Option<LocatedPhrase> = None;
        let mut index = position;
        for (step, &category) in pattern.categories().iter().rev().enumerate() {
            result = if step == 0 {
                match tail_cache.get(&category) {
                    Some(cached) => cached.clone(),
                    None => {
                        let outcome = matchers.run(category, ctx, index, None)?;
                        tail_cache.insert(category, outcome.clone());
                        outcome
                    }
                }
            } else {
                matchers.run(category, ctx, index, result.as_ref())?
            };

            match &result {
                Some(phrase) => index = phrase.start() as isize - 1,
                None => return Ok(None),
            }
        }
        Ok(result)
    }
}
