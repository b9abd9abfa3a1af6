use std::cmp::Ordering;
use std::fmt;

use dashmap::DashMap;
use deunicode::deunicode;

/// Locale-independent name comparison.
///
/// Names are compared by their *reading*: leading ignored articles dropped,
/// transliterated to ASCII and case-folded. Equal readings fall back to the
/// raw strings so the order stays total. Readings are memoized until
/// [`Collator::clear_cache`] runs at the end of a scan.
pub struct Collator {
    articles: Vec<String>,
    readings: DashMap<String, String>,
}

impl fmt::Debug for Collator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collator")
            .field("articles", &self.articles)
            .field("cached_readings", &self.readings.len())
            .finish()
    }
}

impl Default for Collator {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_IGNORED_ARTICLES)
    }
}

impl Collator {
    /// `ignored_articles` is a whitespace separated list such as `"The El La"`.
    pub fn new(ignored_articles: &str) -> Self {
        Self {
            articles: ignored_articles
                .split_whitespace()
                .map(str::to_lowercase)
                .collect(),
            readings: DashMap::new(),
        }
    }

    /// ASCII transliteration of `name`, case preserved. Used to synthesize
    /// sort tags for names that carry none.
    pub fn transliterate(&self, name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.is_ascii() {
            return trimmed.to_string();
        }
        deunicode(trimmed).trim().to_string()
    }

    /// True when `name` reads differently from how it is written.
    pub fn needs_reading(&self, name: &str) -> bool {
        self.transliterate(name) != name.trim()
    }

    /// `name` without a leading ignored article.
    pub fn strip_article<'a>(&self, name: &'a str) -> &'a str {
        let trimmed = name.trim_start();
        for article in &self.articles {
            let Some(head) = trimmed.get(..article.len()) else {
                continue;
            };
            if !head.eq_ignore_ascii_case(article) {
                continue;
            }
            let rest = &trimmed[article.len()..];
            if rest.starts_with(char::is_whitespace) && !rest.trim().is_empty() {
                return rest.trim_start();
            }
        }
        trimmed
    }

    /// Collation key for `name`.
    pub fn reading(&self, name: &str) -> String {
        if let Some(cached) = self.readings.get(name) {
            return cached.clone();
        }
        let reading = self
            .transliterate(self.strip_article(name))
            .to_lowercase();
        self.readings.insert(name.to_string(), reading.clone());
        reading
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.reading(a)
            .cmp(&self.reading(b))
            .then_with(|| a.cmp(b))
    }

    /// Compare by an explicit sort key when present, falling back to the name.
    pub fn compare_sortable(
        &self,
        a: (&str, Option<&str>),
        b: (&str, Option<&str>),
    ) -> Ordering {
        let left = a.1.filter(|s| !s.trim().is_empty()).unwrap_or(a.0);
        let right = b.1.filter(|s| !s.trim().is_empty()).unwrap_or(b.0);
        self.compare(left, right).then_with(|| a.0.cmp(b.0))
    }

    pub fn cached_readings(&self) -> usize {
        self.readings.len()
    }

    /// Drop cached readings between runs.
    pub fn clear_cache(&self) {
        self.readings.clear();
    }
}
