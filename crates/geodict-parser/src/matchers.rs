//! Recognisers for the individual parts of a place mention.
//!
//! Every matcher looks at the text ending at `position` and grows a candidate
//! name leftwards one word at a time, up to `word_max` words. Candidates
//! starting with a lowercase letter are never accepted (but growth goes on),
//! and the first exact case-insensitive hit wins. A successful match returns
//! the previous phrase with the new token prepended.

use std::collections::HashMap;
use std::sync::Arc;

use geodict_types::{
    Category, CityEntry, CityNameMap, CityQuery, GazetteerEntry, GazetteerStore, LookupError,
    Named,
};

use crate::config::ParserConfig;
use crate::phrase::{LocatedPhrase, Token};
use crate::tokenizer::ScanContext;

/// Lowercased full names reachable from one suffix bucket.
trait NameMap {
    type Entry;

    fn find(&self, key: &str) -> Option<Self::Entry>;
}

impl<'a, T> NameMap for HashMap<String, &'a T> {
    type Entry = &'a T;

    fn find(&self, key: &str) -> Option<&'a T> {
        self.get(key).copied()
    }
}

impl NameMap for Arc<CityNameMap> {
    type Entry = CityEntry;

    fn find(&self, key: &str) -> Option<CityEntry> {
        self.get(key).cloned()
    }
}

struct Grown<T> {
    entry: T,
    start: usize,
    end: usize,
}

/// The fixed set of matchers, one per [`Category`], sharing a store and config.
pub struct Matchers<'a, G: ?Sized> {
    store: &'a G,
    config: &'a ParserConfig,
}

impl<'a, G: GazetteerStore + ?Sized> Matchers<'a, G> {
    pub fn new(store: &'a G, config: &'a ParserConfig) -> Self {
        Self { store, config }
    }

    /// Run the matcher for `category` on the text ending at `position`.
    pub fn run(
        &self,
        category: Category,
        ctx: &mut ScanContext,
        position: isize,
        previous: Option<&LocatedPhrase>,
    ) -> Result<Option<LocatedPhrase>, LookupError> {
        match category {
            Category::Country => Ok(self.country(ctx, position, previous)),
            Category::Region => Ok(self.region(ctx, position, previous)),
            Category::City => self.city(ctx, position, previous),
            Category::LocationCue => Ok(self.location_cue(ctx, position, previous)),
        }
    }

    pub fn country(
        &self,
        ctx: &mut ScanContext,
        position: isize,
        previous: Option<&LocatedPhrase>,
    ) -> Option<LocatedPhrase> {
        let index = self.store.country_index();
        let grown = self
            .grow(ctx, position, |word| {
                let bucket = index.get(&word.to_lowercase());
                Ok((!bucket.is_empty()).then(|| name_map(bucket.iter())))
            })
            .ok()
            .flatten()?;
        let entry = GazetteerEntry::Country(grown.entry.clone());
        Some(extend(previous, token(ctx, &entry, &grown)))
    }

    /// Regions, narrowed to the country already found to the right if any.
    pub fn region(
        &self,
        ctx: &mut ScanContext,
        position: isize,
        previous: Option<&LocatedPhrase>,
    ) -> Option<LocatedPhrase> {
        let country_code = previous_code(previous, Category::Country);
        let index = self.store.region_index();
        let grown = self
            .grow(ctx, position, |word| {
                let bucket = index.get(&word.to_lowercase());
                if bucket.is_empty() {
                    return Ok(None);
                }
                let candidates = bucket.iter().filter(|region| {
                    country_code.is_none_or(|code| region.country_code.eq_ignore_ascii_case(code))
                });
                Ok(Some(name_map(candidates)))
            })
            .ok()
            .flatten()?;
        let entry = GazetteerEntry::Region(grown.entry.clone());
        Some(extend(previous, token(ctx, &entry, &grown)))
    }

    /// Cities, looked up through the store and narrowed by any country or
    /// region already found to the right.
    pub fn city(
        &self,
        ctx: &mut ScanContext,
        position: isize,
        previous: Option<&LocatedPhrase>,
    ) -> Result<Option<LocatedPhrase>, LookupError> {
        let country_code = previous_code(previous, Category::Country);
        let region_code = previous_code(previous, Category::Region);

        let store = self.store;
        let grown = self.grow(ctx, position, |word| {
            let cities = store.query_cities(&CityQuery {
                last_word: word,
                candidate: word,
                country_code,
                region_code,
            })?;
            Ok((!cities.is_empty()).then_some(cities))
        })?;
        let Some(grown) = grown else {
            return Ok(None);
        };
        let entry = GazetteerEntry::City(grown.entry.clone());
        Ok(Some(extend(previous, token(ctx, &entry, &grown))))
    }

    /// A single cue word such as "in". Contributes no token: on success the
    /// previous phrase is passed through unchanged.
    pub fn location_cue(
        &self,
        ctx: &mut ScanContext,
        position: isize,
        previous: Option<&LocatedPhrase>,
    ) -> Option<LocatedPhrase> {
        let pulled = ctx.pull_word_backward(position);
        if pulled.word.is_empty() || !self.config.is_location_word(&pulled.word.to_lowercase()) {
            return None;
        }
        previous.cloned()
    }

    /// Grow a candidate leftwards from `position`. `names_for` receives the
    /// last word and returns the names ending in it, or `None` to give up.
    fn grow<M, F>(
        &self,
        ctx: &mut ScanContext,
        position: isize,
        names_for: F,
    ) -> Result<Option<Grown<M::Entry>>, LookupError>
    where
        M: NameMap,
        F: FnOnce(&str) -> Result<Option<M>, LookupError>,
    {
        let first = ctx.pull_word_backward(position);
        if first.word.is_empty() {
            return Ok(None);
        }
        let Some(names) = names_for(&first.word)? else {
            return Ok(None);
        };
        // A non-empty first word lies at or before `position - skipped`, so
        // this is at least 1.
        let end = (position - first.skipped as isize + 1) as usize;

        let mut candidate = first.word;
        let mut current = first.next_index;
        let mut pulled = 1;
        loop {
            if !starts_lowercase(&candidate) {
                if let Some(entry) = names.find(&candidate.to_lowercase()) {
                    return Ok(Some(Grown {
                        entry,
                        start: (current + 1) as usize,
                        end,
                    }));
                }
                if current < 0 {
                    return Ok(None);
                }
            }
            if pulled >= self.config.word_max {
                return Ok(None);
            }
            let next = ctx.pull_word_backward(current);
            current = next.next_index;
            pulled += 1;
            candidate = format!("{} {}", next.word, candidate);
        }
    }
}

fn starts_lowercase(candidate: &str) -> bool {
    candidate.chars().next().is_some_and(char::is_lowercase)
}

/// Index `entries` by lowercased name; on a clash the smaller geoname id wins.
fn name_map<'a, T, I>(entries: I) -> HashMap<String, &'a T>
where
    T: Named + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut map: HashMap<String, &'a T> = HashMap::new();
    for entry in entries {
        map.entry(entry.name().to_lowercase())
            .and_modify(|existing| {
                if entry.geoname_id() < existing.geoname_id() {
                    *existing = entry;
                }
            })
            .or_insert(entry);
    }
    map
}

fn token<T>(ctx: &ScanContext, entry: &GazetteerEntry, grown: &Grown<T>) -> Token {
    Token::from_entry(entry, ctx.slice(grown.start, grown.end), grown.start, grown.end)
}

fn previous_code(previous: Option<&LocatedPhrase>, category: Category) -> Option<&str> {
    previous
        .and_then(|p| p.find(category))
        .and_then(|t| t.code.as_deref())
}

fn extend(previous: Option<&LocatedPhrase>, token: Token) -> LocatedPhrase {
    match previous {
        Some(phrase) => phrase.clone().prepend(token),
        None => LocatedPhrase::new(token),
    }
}
