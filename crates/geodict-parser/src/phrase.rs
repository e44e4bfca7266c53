use geodict_types::{Category, GazetteerEntry};
use serde::{Serialize, Serializer};

/// One recognised, geocoded place-name span.
///
/// `start`/`end` are character offsets into the scanned text (half-open), so
/// `matched_text` is always the exact slice `text[start..end]` counted in chars.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Token {
    #[serde(serialize_with = "category_name")]
    pub category: Category,
    pub matched_text: String,
    #[serde(rename = "start_offset")]
    pub start: usize,
    #[serde(rename = "end_offset")]
    pub end: usize,
    pub lat: f64,
    pub lon: f64,
    pub geoname_id: u32,
    /// Country code for countries, region code for regions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Token {
    /// Token for `entry` spanning chars `start..end` of the scanned text.
    pub fn from_entry(
        entry: &GazetteerEntry,
        matched_text: String,
        start: usize,
        end: usize,
    ) -> Self {
        let (lat, lon) = entry.lat_lon();
        Self {
            category: entry.category(),
            matched_text,
            start,
            end,
            lat,
            lon,
            geoname_id: entry.geoname_id(),
            code: entry.code().map(str::to_string),
        }
    }
}

/// Adjacent tokens describing one place, in reading order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocatedPhrase {
    tokens: Vec<Token>,
}

impl LocatedPhrase {
    pub fn new(token: Token) -> Self {
        Self {
            tokens: vec![token],
        }
    }

    /// Put `token` in front. Scanning runs right to left, so each new token
    /// lies before everything already in the phrase.
    pub fn prepend(mut self, token: Token) -> Self {
        debug_assert!(self.tokens.first().is_none_or(|first| token.end <= first.start));
        self.tokens.insert(0, token);
        self
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn start(&self) -> usize {
        self.tokens.first().map_or(0, |t| t.start)
    }

    pub fn end(&self) -> usize {
        self.tokens.last().map_or(0, |t| t.end)
    }

    /// First token of the given category, if any.
    pub fn find(&self, category: Category) -> Option<&Token> {
        self.tokens.iter().find(|t| t.category == category)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.tokens.iter().map(|t| t.category).collect()
    }
}

fn category_name<S: Serializer>(category: &Category, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(category.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(category: Category, text: &str, start: usize, code: Option<&str>) -> Token {
        Token {
            category,
            matched_text: text.to_string(),
            start,
            end: start + text.chars().count(),
            lat: 1.5,
            lon: -2.0,
            geoname_id: 42,
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn prepend_keeps_reading_order() {
        let phrase = LocatedPhrase::new(token(Category::Country, "France", 7, Some("FR")))
            .prepend(token(Category::City, "Paris", 0, None));
        assert_eq!(phrase.categories(), vec![Category::City, Category::Country]);
        assert_eq!(phrase.start(), 0);
        assert_eq!(phrase.end(), 13);
        assert_eq!(phrase.find(Category::Country).unwrap().matched_text, "France");
        assert!(phrase.find(Category::Region).is_none());
    }

    #[test]
    fn token_from_entry_copies_geocode() {
        let texas = GazetteerEntry::Region(geodict_types::RegionEntry {
            geoname_id: 4736286,
            country_code: "US".into(),
            code: "TX".into(),
            name: "Texas".into(),
            lat: 31.25,
            lon: -99.25,
        });
        let token = Token::from_entry(&texas, "Texas".into(), 11, 16);
        assert_eq!(token.category, Category::Region);
        assert_eq!(token.code.as_deref(), Some("TX"));
        assert_eq!((token.lat, token.lon), (31.25, -99.25));
        assert_eq!(token.geoname_id, 4736286);

        let city = GazetteerEntry::City(geodict_types::CityEntry {
            geoname_id: 4717560,
            country_code: Some("US".into()),
            region_code: Some("TX".into()),
            name: "Paris".into(),
            lat: 33.66,
            lon: -95.55,
            population: 24_171,
        });
        let token = Token::from_entry(&city, "Paris".into(), 4, 9);
        assert_eq!(token.category, Category::City);
        assert!(token.code.is_none());
    }

    #[test]
    fn serializes_as_token_list() {
        let phrase = LocatedPhrase::new(token(Category::Region, "Texas", 11, Some("TX")))
            .prepend(token(Category::City, "Paris", 4, None));
        let value = serde_json::to_value(&phrase).unwrap();
        let tokens = value.as_array().expect("phrase is a list");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0]["category"], "CITY");
        assert_eq!(tokens[0]["start_offset"], 4);
        assert_eq!(tokens[0]["end_offset"], 9);
        assert!(tokens[0].get("code").is_none());
        assert_eq!(tokens[1]["category"], "REGION");
        assert_eq!(tokens[1]["code"], "TX");
        assert_eq!(tokens[1]["geoname_id"], 42);
    }
}
