use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use geodict_types::{
    CityEntry, CityNameMap, CityQuery, CountryEntry, GazetteerStore, LookupError, RegionEntry,
    SuffixIndex, suffix_key,
};

/// In-memory store for unit tests.
pub(crate) struct MemoryStore {
    countries: SuffixIndex<CountryEntry>,
    regions: SuffixIndex<RegionEntry>,
    cities: Vec<CityEntry>,
    fail: bool,
    queries: AtomicUsize,
}

fn country(geoname_id: u32, code: &str, name: &str, lat: f64, lon: f64) -> CountryEntry {
    CountryEntry {
        geoname_id,
        code: code.into(),
        name: name.into(),
        lat,
        lon,
    }
}

fn region(geoname_id: u32, country_code: &str, code: &str, name: &str) -> RegionEntry {
    RegionEntry {
        geoname_id,
        country_code: country_code.into(),
        code: code.into(),
        name: name.into(),
        lat: 0.0,
        lon: 0.0,
    }
}

fn city(geoname_id: u32, cc: &str, rc: &str, name: &str, population: u64) -> CityEntry {
    CityEntry {
        geoname_id,
        country_code: Some(cc.into()),
        region_code: Some(rc.into()),
        name: name.into(),
        lat: 1.0,
        lon: 2.0,
        population,
    }
}

impl MemoryStore {
    pub(crate) fn sample() -> Self {
        Self {
            countries: SuffixIndex::build([
                country(3017382, "FR", "France", 46.0, 2.0),
                country(2635167, "GB", "United Kingdom", 54.75, -2.69),
                country(6252001, "US", "United States", 39.76, -98.5),
                country(6252002, "US", "United States of America", 39.76, -98.5),
                country(2510769, "ES", "Spain", 40.0, -4.0),
                country(614540, "GE", "Georgia", 42.0, 43.5),
                country(248816, "JO", "Jordan", 31.0, 36.0),
            ]),
            regions: SuffixIndex::build([
                region(4736286, "US", "TX", "Texas"),
                region(5128638, "US", "NY", "New York"),
                region(4197000, "US", "GA", "Georgia"),
                region(9999999, "US", "XG", "GEORGIA"),
            ]),
            cities: vec![
                city(2988507, "FR", "11", "Paris", 2_138_551),
                city(4717560, "US", "TX", "Paris", 24_171),
                city(4699066, "US", "TX", "Houston", 2_296_224),
                city(3117735, "ES", "29", "Madrid", 3_255_944),
                city(2643743, "GB", "ENG", "London", 7_556_900),
                city(4180439, "US", "GA", "Atlanta", 463_878),
                city(5030005, "US", "MN", "Jordan", 6_656),
            ],
            fail: false,
            queries: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl GazetteerStore for MemoryStore {
    fn country_index(&self) -> &SuffixIndex<CountryEntry> {
        &self.countries
    }

    fn region_index(&self) -> &SuffixIndex<RegionEntry> {
        &self.regions
    }

    fn query_cities(&self, query: &CityQuery<'_>) -> Result<Arc<CityNameMap>, LookupError> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(LookupError::Unavailable("connection refused".into()));
        }
        let key = query.last_word.to_lowercase();
        let matches_code = |filter: Option<&str>, code: &Option<String>| {
            filter.is_none_or(|f| code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(f)))
        };
        let mut map = CityNameMap::new();
        for city in &self.cities {
            if suffix_key(&city.name).as_deref() != Some(key.as_str())
                || !matches_code(query.country_code, &city.country_code)
                || !matches_code(query.region_code, &city.region_code)
            {
                continue;
            }
            let name = city.name.to_lowercase();
            if map.get(&name).is_none_or(|existing| city.outranks(existing)) {
                map.insert(name, city.clone());
            }
        }
        Ok(Arc::new(map))
    }
}
