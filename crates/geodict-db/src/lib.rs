//! Load a geodict gazetteer from tab-separated files.
//!
//! A gazetteer directory holds three files:
//!
//! | file            | columns                                                               |
//! |-----------------|-----------------------------------------------------------------------|
//! | `countries.tsv` | `geoname_id  country_code  name  lat  lon`                            |
//! | `regions.tsv`   | `geoname_id  country_code  region_code  name  lat  lon`               |
//! | `cities.tsv`    | `geoname_id  country_code  region_code  name  lat  lon  population`   |
//!
//! Blank lines and lines starting with `#` are ignored. Countries and regions
//! are parsed eagerly into [`SuffixIndex`]es. The city file is usually orders of
//! magnitude larger, so only a row-offset index keyed by suffix is built at
//! load; rows are parsed when a query reaches them and query results are
//! memoized in a concurrent map shared by every caller.
//!
//! Callers choose between memory-mapped files or owned buffers at runtime via
//! [`LoadMode`].
//!
//! # Example
//! ```no_run
//! use geodict_db::{Gazetteer, LoadMode};
//! use geodict_types::{CityQuery, GazetteerStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let gaz = Gazetteer::load_with_mode("/path/to/gazetteer", LoadMode::Mmap)?;
//! let france = gaz.country_index().get("france");
//! println!("{} countries end in 'france'", france.len());
//!
//! let cities = gaz.query_cities(&CityQuery {
//!     last_word: "Paris",
//!     candidate: "Paris",
//!     country_code: Some("FR"),
//!     region_code: None,
//! })?;
//! println!("{:?}", cities.get("paris"));
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p geodict-db --example stats -- <dir>`.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use geodict_types::{
    CityEntry, CityNameMap, CityQuery, CountryEntry, GazetteerStore, LookupError, RegionEntry,
    SuffixIndex, suffix_key,
};
use memmap2::Mmap;
use tracing::{debug, info, warn};

pub const COUNTRIES_FILE: &str = "countries.tsv";
pub const REGIONS_FILE: &str = "regions.tsv";
pub const CITIES_FILE: &str = "cities.tsv";

const CITY_FIELDS: usize = 7;

/// Strategy for loading gazetteer files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadMode {
    /// Memory-map each file (fast, zero-copy).
    Mmap,
    /// Read each file into an owned buffer (portable fallback).
    Owned,
}

enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// Group countries by the last word of their name.
pub fn build_country_index(entries: Vec<CountryEntry>) -> SuffixIndex<CountryEntry> {
    let index = SuffixIndex::build(entries);
    for name in index.unkeyed() {
        warn!("country {name:?} has no indexable last word; skipped");
    }
    index
}

/// Group regions by the last word of their name.
pub fn build_region_index(entries: Vec<RegionEntry>) -> SuffixIndex<RegionEntry> {
    let index = SuffixIndex::build(entries);
    for name in index.unkeyed() {
        warn!("region {name:?} has no indexable last word; skipped");
    }
    index
}

/// Entry counts for a loaded gazetteer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GazetteerStats {
    pub countries: usize,
    pub regions: usize,
    pub cities: usize,
    pub country_keys: usize,
    pub region_keys: usize,
    pub city_keys: usize,
    pub cached_city_queries: usize,
}

/// Country and region indices held in memory, cities served from the backing file.
pub struct Gazetteer {
    countries: SuffixIndex<CountryEntry>,
    regions: SuffixIndex<RegionEntry>,
    cities: CityTable,
}

impl Gazetteer {
    /// Load a gazetteer directory, memory-mapping the city file.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(dir, LoadMode::Mmap)
    }

    /// Load a gazetteer directory choosing between mmap and owned buffers.
    pub fn load_with_mode(dir: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let dir = dir.as_ref();
        for name in [COUNTRIES_FILE, REGIONS_FILE, CITIES_FILE] {
            let path = dir.join(name);
            if !path.exists() {
                anyhow::bail!("missing required gazetteer file: {}", path.display());
            }
        }

        let countries_buf = load_file(dir.join(COUNTRIES_FILE), mode)?;
        let countries = build_country_index(parse_countries(countries_buf.as_slice())?);
        info!("loaded {} countries", countries.entry_count());

        let regions_buf = load_file(dir.join(REGIONS_FILE), mode)?;
        let regions = build_region_index(parse_regions(regions_buf.as_slice())?);
        info!("loaded {} regions", regions.entry_count());

        let cities = CityTable::load(load_file(dir.join(CITIES_FILE), mode)?)?;
        info!(
            "indexed {} cities under {} suffix keys",
            cities.row_count,
            cities.by_suffix.len()
        );

        Ok(Self {
            countries,
            regions,
            cities,
        })
    }

    pub fn stats(&self) -> GazetteerStats {
        GazetteerStats {
            countries: self.countries.entry_count(),
            regions: self.regions.entry_count(),
            cities: self.cities.row_count,
            country_keys: self.countries.key_count(),
            region_keys: self.regions.key_count(),
            city_keys: self.cities.by_suffix.len(),
            cached_city_queries: self.cities.cache.len(),
        }
    }
}

impl GazetteerStore for Gazetteer {
    fn country_index(&self) -> &SuffixIndex<CountryEntry> {
        &self.countries
    }

    fn region_index(&self) -> &SuffixIndex<RegionEntry> {
        &self.regions
    }

    fn query_cities(&self, query: &CityQuery<'_>) -> Result<Arc<CityNameMap>, LookupError> {
        self.cities.query(query)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct CacheKey {
    last_word: String,
    country: Option<String>,
    region: Option<String>,
}

#[derive(Clone, Copy)]
struct RowRef {
    start: usize,
    len: usize,
}

struct CityTable {
    rows: Buffer,
    by_suffix: HashMap<String, Vec<RowRef>>,
    row_count: usize,
    cache: DashMap<CacheKey, Arc<CityNameMap>>,
    empty: Arc<CityNameMap>,
}

impl CityTable {
    fn load(rows: Buffer) -> Result<Self> {
        let mut by_suffix: HashMap<String, Vec<RowRef>> = HashMap::new();
        let mut row_count = 0usize;
        for (lineno, start, line) in lines(rows.as_slice()) {
            let line_str = std::str::from_utf8(line)
                .with_context(|| format!("{}:{} invalid utf-8", CITIES_FILE, lineno + 1))?;
            let fields: Vec<&str> = line_str.split('\t').collect();
            if fields.len() < CITY_FIELDS {
                anyhow::bail!(
                    "{}:{} malformed city line (expected {} fields, got {})",
                    CITIES_FILE,
                    lineno + 1,
                    CITY_FIELDS,
                    fields.len()
                );
            }
            let name = fields[3].trim();
            let Some(key) = suffix_key(name) else {
                warn!("city {name:?} on line {} has no indexable last word", lineno + 1);
                continue;
            };
            by_suffix.entry(key).or_default().push(RowRef {
                start,
                len: line.len(),
            });
            row_count += 1;
        }

        Ok(Self {
            rows,
            by_suffix,
            row_count,
            cache: DashMap::new(),
            empty: Arc::new(CityNameMap::new()),
        })
    }

    fn query(&self, query: &CityQuery<'_>) -> Result<Arc<CityNameMap>, LookupError> {
        let last_word = query.last_word.to_lowercase();
        let Some(rows) = self.by_suffix.get(&last_word) else {
            return Ok(Arc::clone(&self.empty));
        };

        let key = CacheKey {
            last_word,
            country: query.country_code.map(str::to_ascii_uppercase),
            region: query.region_code.map(str::to_ascii_uppercase),
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }

        let mut name_map = CityNameMap::new();
        for row in rows {
            let city = self.parse_row(*row)?;
            if !code_matches(key.country.as_deref(), city.country_code.as_deref())
                || !code_matches(key.region.as_deref(), city.region_code.as_deref())
            {
                continue;
            }
            let name_key = city.name.to_lowercase();
            match name_map.get(&name_key) {
                Some(existing) if !city.outranks(existing) => {}
                _ => {
                    name_map.insert(name_key, city);
                }
            }
        }
        debug!(
            "city query {:?} (country {:?}, region {:?}) -> {} names",
            key.last_word,
            key.country,
            key.region,
            name_map.len()
        );

        let name_map = Arc::new(name_map);
        self.cache.insert(key, Arc::clone(&name_map));
        Ok(name_map)
    }

    fn parse_row(&self, row: RowRef) -> Result<CityEntry, LookupError> {
        let corrupt = |reason: String| LookupError::CorruptRow {
            offset: row.start,
            reason,
        };
        let bytes = self
            .rows
            .as_slice()
            .get(row.start..row.start + row.len)
            .ok_or_else(|| corrupt("row span out of bounds".to_string()))?;
        let line = std::str::from_utf8(bytes).map_err(|e| corrupt(e.to_string()))?;
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < CITY_FIELDS {
            return Err(corrupt(format!("expected {CITY_FIELDS} fields")));
        }

        let geoname_id = fields[0]
            .trim()
            .parse::<u32>()
            .map_err(|e| corrupt(format!("geoname_id: {e}")))?;
        let lat = fields[4]
            .trim()
            .parse::<f64>()
            .map_err(|e| corrupt(format!("lat: {e}")))?;
        let lon = fields[5]
            .trim()
            .parse::<f64>()
            .map_err(|e| corrupt(format!("lon: {e}")))?;
        let population = match fields[6].trim() {
            "" => 0,
            raw => raw
                .parse::<u64>()
                .map_err(|e| corrupt(format!("population: {e}")))?,
        };

        Ok(CityEntry {
            geoname_id,
            country_code: optional_code(fields[1]),
            region_code: optional_code(fields[2]),
            name: fields[3].trim().to_string(),
            lat,
            lon,
            population,
        })
    }
}

fn code_matches(filter: Option<&str>, code: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(wanted) => code.is_some_and(|c| c.eq_ignore_ascii_case(wanted)),
    }
}

fn optional_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn load_file(path: PathBuf, mode: LoadMode) -> Result<Buffer> {
    match mode {
        LoadMode::Mmap => {
            let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

/// Record lines as `(line number, byte offset, line)`, skipping blanks and
/// `#` comments and stripping a trailing `\r`.
fn lines(bytes: &[u8]) -> impl Iterator<Item = (usize, usize, &[u8])> + '_ {
    let mut offset = 0usize;
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(move |(lineno, raw_line)| {
            let start = offset;
            offset += raw_line.len() + 1;
            let line = strip_cr(raw_line);
            if line.iter().all(u8::is_ascii_whitespace) || line.first() == Some(&b'#') {
                return None;
            }
            Some((lineno, start, line))
        })
}

fn parse_countries(bytes: &[u8]) -> Result<Vec<CountryEntry>> {
    let mut out = Vec::new();
    for (lineno, _, line) in lines(bytes) {
        let fields = split_fields(line, 5, COUNTRIES_FILE, lineno)?;
        out.push(CountryEntry {
            geoname_id: parse_field(fields[0], "geoname_id", COUNTRIES_FILE, lineno)?,
            code: fields[1].trim().to_string(),
            name: fields[2].trim().to_string(),
            lat: parse_field(fields[3], "lat", COUNTRIES_FILE, lineno)?,
            lon: parse_field(fields[4], "lon", COUNTRIES_FILE, lineno)?,
        });
    }
    Ok(out)
}

fn parse_regions(bytes: &[u8]) -> Result<Vec<RegionEntry>> {
    let mut out = Vec::new();
    for (lineno, _, line) in lines(bytes) {
        let fields = split_fields(line, 6, REGIONS_FILE, lineno)?;
        out.push(RegionEntry {
            geoname_id: parse_field(fields[0], "geoname_id", REGIONS_FILE, lineno)?,
            country_code: fields[1].trim().to_string(),
            code: fields[2].trim().to_string(),
            name: fields[3].trim().to_string(),
            lat: parse_field(fields[4], "lat", REGIONS_FILE, lineno)?,
            lon: parse_field(fields[5], "lon", REGIONS_FILE, lineno)?,
        });
    }
    Ok(out)
}

fn split_fields<'a>(
    line: &'a [u8],
    expected: usize,
    file: &str,
    lineno: usize,
) -> Result<Vec<&'a str>> {
    let line_str =
        std::str::from_utf8(line).with_context(|| format!("{}:{} invalid utf-8", file, lineno + 1))?;
    let fields: Vec<&str> = line_str.split('\t').collect();
    if fields.len() < expected {
        anyhow::bail!(
            "{}:{} malformed line (expected {} fields, got {})",
            file,
            lineno + 1,
            expected,
            fields.len()
        );
    }
    Ok(fields)
}

fn parse_field<T>(raw: &str, what: &str, file: &str, lineno: usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{}:{} {}", file, lineno + 1, what))
}

fn strip_cr(line: &[u8]) -> &[u8] {
    if line.ends_with(b"\r") {
        &line[..line.len() - 1]
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_reports_offsets_and_skips_comments() {
        let bytes = b"# header\n\n1\tA\r\n2\tB\n";
        let got: Vec<(usize, usize, &[u8])> = lines(bytes).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], (2, 10, &b"1\tA"[..]));
        assert_eq!(got[1], (3, 15, &b"2\tB"[..]));
    }

    #[test]
    fn parses_country_rows() {
        let rows = parse_countries(b"3017382\tFR\tFrance\t46.0\t2.0\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code, "FR");
        assert_eq!(rows[0].geoname_id, 3017382);
    }

    #[test]
    fn rejects_short_region_rows() {
        let err = parse_regions(b"4736286\tUS\tTX\tTexas\n").unwrap_err();
        assert!(err.to_string().contains("regions.tsv:1"));
    }

    #[test]
    fn code_filter_is_case_insensitive() {
        assert!(code_matches(None, None));
        assert!(code_matches(Some("FR"), Some("fr")));
        assert!(!code_matches(Some("FR"), None));
        assert!(!code_matches(Some("FR"), Some("US")));
    }

    #[test]
    fn city_table_queries_rows_on_demand() {
        let tsv = b"2988507\tFR\t11\tParis\t48.85\t2.35\t2138551\n\
4717560\tUS\tTX\tParis\t33.66\t-95.55\t24171\n\
1\tFR\t11\tBroken Paris\tnot-a-number\t2.0\t\n"
            .to_vec();
        let table = CityTable::load(Buffer::Owned(tsv)).unwrap();
        assert_eq!(table.row_count, 3);

        let query = CityQuery {
            last_word: "Paris",
            candidate: "Paris",
            country_code: Some("us"),
            region_code: None,
        };
        let err = table.query(&query).unwrap_err();
        assert!(matches!(err, LookupError::CorruptRow { .. }));
    }
}
