//! Shared types for the geodict gazetteer and its text scanner.
//!
//! Gazetteer records ([`CountryEntry`], [`RegionEntry`], [`CityEntry`]) are
//! plain owned values; the country and region tables are grouped into a
//! [`SuffixIndex`] keyed by the lowercased last word of each name, so a
//! scanner walking text backwards can find every name ending in the word it
//! just read. City lookups go through the [`GazetteerStore`] trait because the
//! city table is far too large to hold fully parsed in memory.
//!
//! The same word puller ([`pull_word`]) is used both to derive suffix keys and
//! by the scanner, so a name and the text that mentions it always agree on
//! what the "last word" is.
//!
//! ```rust
//! use geodict_types::{CountryEntry, SuffixIndex, suffix_key};
//!
//! let uk = CountryEntry {
//!     geoname_id: 2635167,
//!     code: "GB".into(),
//!     name: "United Kingdom".into(),
//!     lat: 54.75,
//!     lon: -2.69,
//! };
//! assert_eq!(suffix_key("Washington, D.C."), Some("c".to_string()));
//! let index = SuffixIndex::build([uk]);
//! assert_eq!(index.get("kingdom").len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Kind of place-name component recognised in text.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Category {
    Country,
    Region,
    City,
    /// Prepositions such as "in" or "at" that license a following region.
    LocationCue,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Country,
        Category::Region,
        Category::City,
        Category::LocationCue,
    ];

    /// Parse an upper-case category name as written in pattern configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "COUNTRY" => Some(Category::Country),
            "REGION" => Some(Category::Region),
            "CITY" => Some(Category::City),
            "LOCATION_CUE" | "LOCATION_WORD" => Some(Category::LocationCue),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Country => "COUNTRY",
            Category::Region => "REGION",
            Category::City => "CITY",
            Category::LocationCue => "LOCATION_CUE",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything with a display name and a stable GeoNames identifier.
pub trait Named {
    fn name(&self) -> &str;
    fn geoname_id(&self) -> u32;
}

#[derive(Clone, Debug, PartialEq)]
pub struct CountryEntry {
    pub geoname_id: u32,
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// First-level administrative region (state, province, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct RegionEntry {
    pub geoname_id: u32,
    pub country_code: String,
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CityEntry {
    pub geoname_id: u32,
    pub country_code: Option<String>,
    pub region_code: Option<String>,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub population: u64,
}

impl CityEntry {
    /// Whether `self` should replace `other` when both carry the same
    /// lowercased name: larger population wins, then the smaller id.
    pub fn outranks(&self, other: &CityEntry) -> bool {
        (self.population, std::cmp::Reverse(self.geoname_id))
            > (other.population, std::cmp::Reverse(other.geoname_id))
    }
}

impl Named for CountryEntry {
    fn name(&self) -> &str {
        &self.name
    }
    fn geoname_id(&self) -> u32 {
        self.geoname_id
    }
}

impl Named for RegionEntry {
    fn name(&self) -> &str {
        &self.name
    }
    fn geoname_id(&self) -> u32 {
        self.geoname_id
    }
}

impl Named for CityEntry {
    fn name(&self) -> &str {
        &self.name
    }
    fn geoname_id(&self) -> u32 {
        self.geoname_id
    }
}

/// A gazetteer record of any category.
#[derive(Clone, Debug, PartialEq)]
pub enum GazetteerEntry {
    Country(CountryEntry),
    Region(RegionEntry),
    City(CityEntry),
}

impl GazetteerEntry {
    pub fn category(&self) -> Category {
        match self {
            GazetteerEntry::Country(_) => Category::Country,
            GazetteerEntry::Region(_) => Category::Region,
            GazetteerEntry::City(_) => Category::City,
        }
    }

    pub fn geoname_id(&self) -> u32 {
        match self {
            GazetteerEntry::Country(c) => c.geoname_id,
            GazetteerEntry::Region(r) => r.geoname_id,
            GazetteerEntry::City(c) => c.geoname_id,
        }
    }

    pub fn lat_lon(&self) -> (f64, f64) {
        match self {
            GazetteerEntry::Country(c) => (c.lat, c.lon),
            GazetteerEntry::Region(r) => (r.lat, r.lon),
            GazetteerEntry::City(c) => (c.lat, c.lon),
        }
    }

    /// Country code for countries, region code for regions, none for cities.
    pub fn code(&self) -> Option<&str> {
        match self {
            GazetteerEntry::Country(c) => Some(&c.code),
            GazetteerEntry::Region(r) => Some(&r.code),
            GazetteerEntry::City(_) => None,
        }
    }
}

/// Characters that separate words. Whitespace plus the punctuation that
/// commonly trails or joins place names.
pub fn is_boundary(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\'' | '"' | ',' | '.' | '-' | '/' | '<'
            | '>'
    )
}

/// Result of pulling one word backwards out of a character buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PulledWord {
    pub word: String,
    /// Index of the character just before the word, `-1` at the text start.
    pub next_index: isize,
    /// Boundary characters skipped before the first word character.
    pub skipped: usize,
}

/// Walk backwards from `index`, skipping leading boundary characters, and
/// collect one unbroken run of word characters.
///
/// An `index` past the end of `chars` is clamped to the last character.
pub fn pull_word(chars: &[char], index: isize) -> PulledWord {
    let mut current = index.min(chars.len() as isize - 1);
    let mut skipped = 0usize;
    let mut reversed = String::new();
    while current >= 0 {
        let c = chars[current as usize];
        if is_boundary(c) {
            if reversed.is_empty() {
                skipped += 1;
                current -= 1;
                continue;
            }
            break;
        }
        reversed.push(c);
        current -= 1;
    }
    PulledWord {
        word: reversed.chars().rev().collect(),
        next_index: current,
        skipped,
    }
}

/// Lowercased last word of `name`, or `None` if the name holds no word
/// characters at all.
pub fn suffix_key(name: &str) -> Option<String> {
    let chars: Vec<char> = name.chars().collect();
    let pulled = pull_word(&chars, chars.len() as isize - 1);
    if pulled.word.is_empty() {
        None
    } else {
        Some(pulled.word.to_lowercase())
    }
}

/// Entries grouped by the lowercased last word of their name.
///
/// Built once and read-only afterwards; every entry sits under exactly one key.
#[derive(Clone, Debug)]
pub struct SuffixIndex<T> {
    buckets: HashMap<String, Vec<T>>,
    entry_count: usize,
    unkeyed: Vec<String>,
}

impl<T> Default for SuffixIndex<T> {
    fn default() -> Self {
        Self {
            buckets: HashMap::new(),
            entry_count: 0,
            unkeyed: Vec::new(),
        }
    }
}

impl<T: Named> SuffixIndex<T> {
    /// Group `entries` by suffix key. Names without any word characters
    /// cannot be matched and are recorded in [`SuffixIndex::unkeyed`].
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut index = Self::default();
        for entry in entries {
            match suffix_key(entry.name()) {
                Some(key) => {
                    index.buckets.entry(key).or_default().push(entry);
                    index.entry_count += 1;
                }
                None => index.unkeyed.push(entry.name().to_string()),
            }
        }
        index
    }
}

impl<T> SuffixIndex<T> {
    /// Entries whose name ends in `key`. The key must already be lowercased.
    pub fn get(&self, key: &str) -> &[T] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn key_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Names that produced no suffix key and were left out.
    pub fn unkeyed(&self) -> &[String] {
        &self.unkeyed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> + '_ {
        self.buckets
            .iter()
            .map(|(key, entries)| (key.as_str(), entries.as_slice()))
    }
}

/// Arguments for a city lookup. Filters that are `None` do not constrain.
#[derive(Clone, Copy, Debug)]
pub struct CityQuery<'a> {
    pub last_word: &'a str,
    /// Full candidate phrase as grown so far. Stores that can match whole
    /// names may use it; the file-backed store keys on `last_word` only.
    pub candidate: &'a str,
    pub country_code: Option<&'a str>,
    pub region_code: Option<&'a str>,
}

/// Lowercased full city name to the city it resolves to.
pub type CityNameMap = HashMap<String, CityEntry>;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("city store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt city row at byte {offset}: {reason}")]
    CorruptRow { offset: usize, reason: String },
}

/// Read access to a loaded gazetteer.
///
/// Country and region indices are immutable once built. City lookups may hit
/// storage and can fail; implementations must tolerate concurrent callers.
pub trait GazetteerStore: Send + Sync {
    fn country_index(&self) -> &SuffixIndex<CountryEntry>;

    fn region_index(&self) -> &SuffixIndex<RegionEntry>;

    /// Cities whose name ends in `query.last_word`, narrowed by the filters.
    /// An empty map means no city shares that last word.
    fn query_cities(&self, query: &CityQuery<'_>) -> Result<Arc<CityNameMap>, LookupError>;
}

impl<G: GazetteerStore + ?Sized> GazetteerStore for Arc<G> {
    fn country_index(&self) -> &SuffixIndex<CountryEntry> {
        (**self).country_index()
    }

    fn region_index(&self) -> &SuffixIndex<RegionEntry> {
        (**self).region_index()
    }

    fn query_cities(&self, query: &CityQuery<'_>) -> Result<Arc<CityNameMap>, LookupError> {
        (**self).query_cities(query)
    }
}
