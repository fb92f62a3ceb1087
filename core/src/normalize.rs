use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // "2 cups", "1.5 tbsp", "1/2 tsp", "500g"
    static ref QUANTITY_RE: Regex = Regex::new(
        r"\d+(?:[./]\d+)?\s*(?:cups?|tbsps?|tsps?|tablespoons?|teaspoons?|oz|ounces?|lbs?|pounds?|grams?|g|kg|ml|l)?\b"
    )
    .expect("valid regex");
    static ref DIGITS_RE: Regex = Regex::new(r"\d+").expect("valid regex");
    static ref PUNCT_RE: Regex = Regex::new(r"[^\w\s-]").expect("valid regex");

    static ref IRREGULAR: HashMap<&'static str, &'static str> = {
        let pairs: &[(&str, &str)] = &[
            ("leaves", "leaf"), ("loaves", "loaf"), ("halves", "half"), ("knives", "knife"),
            ("calves", "calf"), ("wolves", "wolf"), ("shelves", "shelf"),
            ("geese", "goose"), ("mice", "mouse"), ("teeth", "tooth"),
            ("cookies", "cookie"), ("brownies", "brownie"), ("veggies", "veggie"),
            ("smoothies", "smoothie"), ("calories", "calorie"), ("pies", "pie"),
            ("quiches", "quiche"), ("brioches", "brioche"), ("cloches", "cloche"),
        ];
        pairs.iter().copied().collect()
    };

    // Singular nouns that merely end in "s".
    static ref INVARIANT: HashSet<&'static str> = {
        let words: &[&str] = &[
            "asparagus", "hummus", "couscous", "molasses", "citrus", "octopus", "swiss",
            "grits", "series", "species", "bass",
        ];
        words.iter().copied().collect()
    };
}

/// Built-in stopwords: articles, connectives, preparation and size descriptors, and units.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "for", "with", "to", "in", "on", "some", "few",
    "fresh", "freshly", "dried", "ground", "chopped", "diced", "minced", "sliced", "grated",
    "shredded", "crushed", "peeled", "cubed", "halved", "quartered", "mashed", "melted",
    "softened", "frozen", "raw", "cooked", "finely", "roughly", "thinly", "coarsely",
    "large", "medium", "small", "big", "whole", "optional", "taste", "about", "approximately",
    "cup", "tbsp", "tsp", "tablespoon", "teaspoon", "oz", "ounce", "lb", "pound", "gram",
    "kg", "ml", "pinch", "dash", "handful", "piece", "slice", "clove", "can", "package",
];

/// The normalized, singular, synonym-resolved unit of matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalTerm(String);

impl CanonicalTerm {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CanonicalTerm {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CanonicalTerm {
    /// Wraps an already-canonical string verbatim. Use [`Normalizer::normalize`] for raw input.
    fn from(s: &str) -> Self {
        CanonicalTerm(s.to_string())
    }
}

/// Canonicalizes raw ingredient strings. Holds only the immutable stopword set;
/// `normalize` is a pure function of its input.
#[derive(Debug, Clone)]
pub struct Normalizer {
    stopwords: HashSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied())
    }
}

impl Normalizer {
    pub fn new<I, S>(stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = stopwords
            .into_iter()
            .map(|w| fold(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { stopwords }
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    pub fn stopwords(&self) -> impl Iterator<Item = &str> + '_ {
        self.stopwords.iter().map(String::as_str)
    }

    /// Normalize a raw ingredient phrase: NFKC, lowercase, strip quantities and
    /// punctuation, drop stopwords, lemmatize and singularize word by word.
    ///
    /// Falls back to the folded input when every word is stripped, so only a
    /// blank input yields an empty term.
    pub fn normalize(&self, raw: &str) -> CanonicalTerm {
        let folded = fold(raw);
        let cleaned = DIGITS_RE.replace_all(&QUANTITY_RE.replace_all(&folded, " "), " ").into_owned();
        let cleaned = PUNCT_RE.replace_all(&cleaned, " ");

        let words: Vec<String> = cleaned
            .split_whitespace()
            .filter_map(|word| {
                let base = singularize(word);
                if self.is_stopword(word) || self.is_stopword(&base) {
                    None
                } else {
                    Some(base)
                }
            })
            .collect();

        if words.is_empty() {
            CanonicalTerm(folded)
        } else {
            CanonicalTerm(words.join(" "))
        }
    }
}

/// NFKC, lowercase, trim and collapse internal whitespace.
fn fold(raw: &str) -> String {
    let lowered = raw.nfkc().collect::<String>().to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce one lowercase word to its singular dictionary form.
///
/// Irregular forms come from a lookup table. Regular suffixes are only removed
/// when what remains is at least three letters and the word does not end in
/// "ss", "us" or "is". Output is always a fixed point of this function.
pub fn singularize(word: &str) -> String {
    if let Some(base) = IRREGULAR.get(word) {
        return (*base).to_string();
    }
    if INVARIANT.contains(word)
        || !word.ends_with('s')
        || word.ends_with("ss")
        || word.ends_with("us")
        || word.ends_with("is")
    {
        return word.to_string();
    }

    let strip = |suffix: &str, replacement: &str| -> Option<String> {
        let stem = word.strip_suffix(suffix)?;
        let out = format!("{stem}{replacement}");
        (out.chars().count() >= 3).then_some(out)
    };

    let candidate = if word.ends_with("ies") {
        strip("ies", "y")
    } else if word.ends_with("sses")
        || word.ends_with("xes")
        || word.ends_with("ches")
        || word.ends_with("shes")
        || word.ends_with("zzes")
        || word.ends_with("oes")
    {
        strip("es", "")
    } else {
        None
    };

    match candidate.or_else(|| strip("s", "")) {
        Some(out) => IRREGULAR.get(out.as_str()).map(|base| (*base).to_string()).unwrap_or(out),
        None => word.to_string(),
    }
}
