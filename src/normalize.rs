//! Text normalization for scraped review content.
//!
//! Review cards carry free-form text in several scripts, star ratings as
//! human-readable labels ("4.0 stars"), and relative publication dates
//! ("3 weeks ago"). The helpers here turn those into stable values: a
//! language tag, an integer, an absolute ISO-8601 timestamp. Every function
//! degrades to a neutral default instead of returning an error; the scraping
//! pipeline treats unparseable fields as missing, not fatal.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{SecondsFormat, TimeDelta, Utc};
use regex::Regex;

/// Language of a piece of review text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    En,
    He,
    Th,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::He => "he",
            Lang::Th => "th",
        }
    }
}

fn digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid digit pattern"))
}

fn is_hebrew(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

fn is_thai(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}

/// Detect the language of review text by script membership.
///
/// Hebrew wins over Thai for mixed-script input; anything without Hebrew or
/// Thai characters, including empty input, is reported as English.
pub fn detect_language(text: &str) -> Lang {
    if text.chars().any(is_hebrew) {
        Lang::He
    } else if text.chars().any(is_thai) {
        Lang::Th
    } else {
        Lang::En
    }
}

/// Bounded memoization for [`detect_language`].
///
/// Keyed by the exact input string. When full, the least recently used
/// entry is evicted, so the cache never grows past its fixed capacity no
/// matter how many distinct texts pass through a long scraping run.
pub struct LangCache {
    capacity: usize,
    entries: HashMap<String, (Lang, u64)>,
    tick: u64,
}

impl LangCache {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            tick: 0,
        }
    }

    pub fn detect(&mut self, text: &str) -> Lang {
        self.tick += 1;
        if let Some((lang, stamp)) = self.entries.get_mut(text) {
            *stamp = self.tick;
            return *lang;
        }

        let lang = detect_language(text);
        if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (_, stamp))| *stamp)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(text.to_string(), (lang, self.tick));
        lang
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LangCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Extract the first run of decimal digits from a label, defaulting to 0.
///
/// Handles star labels like "4.0 stars" (yields 4) and like counts like
/// "12 people found this helpful". A run too large for `u32` saturates.
pub fn first_integer(text: &str) -> u32 {
    match digits_re().find(text) {
        Some(m) => match m.as_str().parse::<u64>() {
            Ok(n) => u32::try_from(n).unwrap_or(u32::MAX),
            // Digits-only input can only fail to parse by overflowing.
            Err(_) => u32::MAX,
        },
        None => 0,
    }
}

/// Convert a relative date phrase to an absolute ISO-8601 UTC timestamp.
///
/// Recognizes `<n> <unit> ago` with units minute, hour, day, week, month
/// (30 days) and year (365 days), case-insensitively. A phrase like
/// "a minute ago" with no digits counts as 1. Anything else, including
/// absolute dates and arbitrary text, yields an empty string; the caller
/// records the date as unknown rather than guessing.
pub fn relative_date_to_iso(text: &str) -> String {
    let lowered = text.to_lowercase();
    if !lowered.contains("ago") {
        return String::new();
    }

    let amount = digits_re()
        .find(&lowered)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(1);

    let delta = if lowered.contains("minute") {
        TimeDelta::try_minutes(amount)
    } else if lowered.contains("hour") {
        TimeDelta::try_hours(amount)
    } else if lowered.contains("day") {
        TimeDelta::try_days(amount)
    } else if lowered.contains("week") {
        TimeDelta::try_weeks(amount)
    } else if lowered.contains("month") {
        amount.checked_mul(30).and_then(TimeDelta::try_days)
    } else if lowered.contains("year") {
        amount.checked_mul(365).and_then(TimeDelta::try_days)
    } else {
        None
    };

    let Some(delta) = delta else {
        return String::new();
    };

    match Utc::now().checked_sub_signed(delta) {
        Some(stamp) => stamp.to_rfc3339_opts(SecondsFormat::Secs, false),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_detect_language_english() {
        assert_eq!(detect_language("Great coffee and friendly staff"), Lang::En);
    }

    #[test]
    fn test_detect_language_hebrew() {
        assert_eq!(detect_language("שירות מעולה"), Lang::He);
    }

    #[test]
    fn test_detect_language_thai() {
        assert_eq!(detect_language("อาหารอร่อยมาก"), Lang::Th);
    }

    #[test]
    fn test_detect_language_empty_defaults_to_english() {
        assert_eq!(detect_language(""), Lang::En);
    }

    #[test]
    fn test_detect_language_hebrew_wins_over_thai() {
        assert_eq!(detect_language("אוכל อร่อย"), Lang::He);
    }

    #[test]
    fn test_detect_language_latin_with_punctuation() {
        assert_eq!(detect_language("5/5, would come again!!"), Lang::En);
    }

    #[test]
    fn test_lang_cache_hit_returns_same_answer() {
        let mut cache = LangCache::new(16);
        assert_eq!(cache.detect("בסדר גמור"), Lang::He);
        assert_eq!(cache.detect("בסדר גמור"), Lang::He);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lang_cache_stays_bounded() {
        let mut cache = LangCache::new(2);
        cache.detect("one");
        cache.detect("two");
        cache.detect("three");
        cache.detect("four");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lang_cache_evicts_least_recently_used() {
        let mut cache = LangCache::new(2);
        cache.detect("one");
        cache.detect("two");
        // Touch "one" so "two" becomes the eviction candidate.
        cache.detect("one");
        cache.detect("three");
        assert!(cache.entries.contains_key("one"));
        assert!(!cache.entries.contains_key("two"));
        assert!(cache.entries.contains_key("three"));
    }

    #[test]
    fn test_first_integer_from_star_label() {
        assert_eq!(first_integer("4.0 stars"), 4);
        assert_eq!(first_integer("Rated 5 out of 5"), 5);
    }

    #[test]
    fn test_first_integer_from_like_count() {
        assert_eq!(first_integer("123 people found this helpful"), 123);
    }

    #[test]
    fn test_first_integer_no_digits() {
        assert_eq!(first_integer("no digits here"), 0);
        assert_eq!(first_integer(""), 0);
    }

    #[test]
    fn test_first_integer_saturates_on_overflow() {
        assert_eq!(first_integer("99999999999999999999"), u32::MAX);
    }

    #[test]
    fn test_relative_date_three_weeks_ago() {
        let iso = relative_date_to_iso("3 weeks ago");
        let parsed = DateTime::parse_from_rfc3339(&iso).unwrap();
        let expected = Utc::now() - TimeDelta::days(21);
        let drift = (parsed.timestamp() - expected.timestamp()).abs();
        assert!(drift <= 1, "drift was {drift}s");
    }

    #[test]
    fn test_relative_date_defaults_to_one_unit() {
        let iso = relative_date_to_iso("a minute ago");
        let parsed = DateTime::parse_from_rfc3339(&iso).unwrap();
        let drift = (Utc::now().timestamp() - parsed.timestamp() - 60).abs();
        assert!(drift <= 1, "drift was {drift}s");
    }

    #[test]
    fn test_relative_date_month_is_thirty_days() {
        let iso = relative_date_to_iso("2 months ago");
        let parsed = DateTime::parse_from_rfc3339(&iso).unwrap();
        let expected = Utc::now() - TimeDelta::days(60);
        assert!((parsed.timestamp() - expected.timestamp()).abs() <= 1);
    }

    #[test]
    fn test_relative_date_is_case_insensitive() {
        assert!(!relative_date_to_iso("3 Weeks AGO").is_empty());
    }

    #[test]
    fn test_relative_date_has_seconds_precision() {
        let iso = relative_date_to_iso("1 hour ago");
        assert!(!iso.contains('.'), "unexpected fractional seconds: {iso}");
    }

    #[test]
    fn test_relative_date_rejects_gibberish() {
        assert_eq!(relative_date_to_iso("gibberish"), "");
    }

    #[test]
    fn test_relative_date_rejects_absolute_dates() {
        assert_eq!(relative_date_to_iso("January 2023"), "");
    }

    #[test]
    fn test_relative_date_rejects_unknown_unit() {
        assert_eq!(relative_date_to_iso("5 fortnights ago"), "");
    }

    #[test]
    fn test_relative_date_rejects_empty() {
        assert_eq!(relative_date_to_iso(""), "");
    }
}
