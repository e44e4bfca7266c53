use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use geodict_db::{Gazetteer, LoadMode};
use geodict_types::{CityQuery, GazetteerStore};

fn main() -> Result<()> {
    let dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p geodict-db --example stats -- <path-to-gazetteer-dir>")?;

    let gaz = Gazetteer::load_with_mode(&dir, LoadMode::Mmap)
        .with_context(|| format!("loading gazetteer from {}", dir.display()))?;

    let stats = gaz.stats();
    println!("Gazetteer: {}", dir.display());
    println!("Countries    : {} ({} suffix keys)", stats.countries, stats.country_keys);
    println!("Regions      : {} ({} suffix keys)", stats.regions, stats.region_keys);
    println!("Cities       : {} ({} suffix keys)", stats.cities, stats.city_keys);

    let (key, size) = gaz
        .country_index()
        .iter()
        .max_by_key(|(_, entries)| entries.len())
        .map_or(("", 0), |(key, entries)| (key, entries.len()));
    println!("Largest country bucket: {:?} ({} names)", key, size);

    // Spot-check a couple of city lookups.
    for word in ["Paris", "London"] {
        let cities = gaz.query_cities(&CityQuery {
            last_word: word,
            candidate: word,
            country_code: None,
            region_code: None,
        })?;
        println!("Cities ending in '{}': {}", word, cities.len());
    }

    Ok(())
}
