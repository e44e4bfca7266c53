//! Gazetteer-driven place-name recognition.
//!
//! [`GeoParser::find_locations`] walks a text from its end towards its start.
//! Whenever the word under the cursor could end a country or region name, the
//! configured [`SequencePattern`]s are tried in priority order; each pattern is
//! matched right to left, so a city is looked up already knowing the country
//! or region that follows it. Matches are returned as [`LocatedPhrase`]s in
//! document order.
//!
//! There is no part-of-speech tagging here: the only defence against
//! incidental name collisions ("the New York Times") is word order,
//! capitalisation and cue words such as "in".
//!
//! # Example
//! ```no_run
//! use geodict_db::Gazetteer;
//! use geodict_parser::GeoParser;
//!
//! # fn main() -> anyhow::Result<()> {
//! let parser = GeoParser::with_defaults(Gazetteer::load("/path/to/gazetteer")?);
//! for phrase in parser.find_locations("I live in Paris, France.")? {
//!     for token in phrase.tokens() {
//!         println!("{} {:?} ({}, {})", token.category, token.matched_text, token.lat, token.lon);
//!     }
//! }
//! # Ok(()) }
//! ```

pub mod config;
pub mod matchers;
pub mod phrase;
pub mod sequence;
pub mod tokenizer;

#[cfg(test)]
mod testing;

pub use config::{
    ConfigError, DEFAULT_LOCATION_WORDS, DEFAULT_WORD_MAX, ParserConfig, SequencePattern,
};
pub use geodict_types::Category;
pub use matchers::Matchers;
pub use phrase::{LocatedPhrase, Token};
pub use sequence::{GeoParser, ParseError};
pub use tokenizer::ScanContext;
