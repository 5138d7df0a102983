//! Canonicalization of free-form product keys coming from price sources.
//!
//! Price sheets spell products many ways: canonical ids (`white_onion`),
//! Arabic display names (`بصل أبيض`), labels with emoji, English synonyms and
//! regional variants. [`ProductKeyNormalizer`] maps all of them onto the
//! catalog's canonical ids with a deterministic lookup pipeline:
//!
//! 1. exact canonical id
//! 2. folded index of every product's id, name, label and catalog aliases
//! 3. the static synonym table
//! 4. the static synonym table with underscores stripped

use std::collections::{BTreeMap, BTreeSet, HashMap};

use onemarket_core::Product;

/// Synonyms, misspellings and regional names that price sheets use.
/// Targets that are not in the loaded catalog are ignored.
const SYNONYMS: &[(&str, &str)] = &[
    ("tomatoe", "tomato"),
    ("tomatos", "tomato"),
    ("قوطه", "tomato"),
    ("طماطه", "tomato"),
    ("onion", "white_onion"),
    ("بصل", "white_onion"),
    ("cucumbers", "cucumber"),
    ("خياره", "cucumber"),
    ("كوسا", "zucchini"),
    ("courgettes", "zucchini"),
    ("egg_plant", "eggplant"),
    ("بدنجان", "eggplant"),
    ("جزره", "carrot"),
    ("bellpepper", "bell_pepper"),
    ("pepper", "bell_pepper"),
    ("فلفل اخضر", "bell_pepper"),
    ("فلفل حلو", "bell_pepper"),
    ("chilli", "chili"),
    ("chillies", "chili"),
    ("potatos", "potato"),
    ("بطاطا", "potato"),
    ("hot_chili", "hot_pepper"),
    ("فلفل شطه", "hot_pepper"),
    ("green_bean", "green_beans"),
    ("pea", "peas"),
    ("بازلا", "peas"),
    ("ladies_finger", "okra"),
    ("ملوخيا", "molokhia"),
    ("molokheya", "molokhia"),
    ("بقدونسي", "parsley"),
    ("كسبره", "coriander"),
    ("شبث", "dill"),
    ("روكا", "arugula"),
    ("rocket_leaves", "arugula"),
    ("خسه", "lettuce"),
    ("romaine", "lettuce"),
    ("repolyo", "cabbage"),
    ("قرنابيط", "cauliflower"),
    ("زهره", "cauliflower"),
    ("كرفسي", "celery"),
    ("كراث", "leek"),
    ("green_onions", "spring_onion"),
    ("ثومه", "garlic"),
    ("زنجبيل طازج", "ginger"),
    ("بطاطا حلوه", "sweet_potato"),
    ("sweetpotato", "sweet_potato"),
    ("ذره", "corn"),
];

/// Folds a raw key into its comparison form.
///
/// Lower-cases, removes Arabic diacritics and tatweel, unifies alef/yeh/teh
/// marbuta variants, maps Arabic-Indic digits to ASCII, drops everything
/// outside Arabic letters, ASCII letters, digits, `_` and whitespace, then
/// collapses whitespace/underscore runs to a single `_` and trims `_` from
/// both ends.
#[must_use]
pub fn fold_key(raw: &str) -> String {
    let mut kept = String::with_capacity(raw.len());
    for c in raw.to_lowercase().chars() {
        let c = match c {
            '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0640}' => continue,
            '\u{0622}' | '\u{0623}' | '\u{0625}' | '\u{0671}' => '\u{0627}',
            '\u{0649}' => '\u{064A}',
            '\u{0629}' => '\u{0647}',
            '\u{0660}'..='\u{0669}' => ascii_digit(c, '\u{0660}'),
            '\u{06F0}'..='\u{06F9}' => ascii_digit(c, '\u{06F0}'),
            other => other,
        };

        if is_arabic_letter(c) || c.is_ascii_alphanumeric() || c == '_' {
            kept.push(c);
        } else if c.is_whitespace() {
            kept.push(' ');
        }
    }

    let mut folded = String::with_capacity(kept.len());
    let mut pending_sep = false;
    for c in kept.chars() {
        if c == ' ' || c == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !folded.is_empty() {
            folded.push('_');
        }
        pending_sep = false;
        folded.push(c);
    }
    folded
}

fn ascii_digit(c: char, zero: char) -> char {
    let offset = u32::from(c) - u32::from(zero);
    char::from_digit(offset, 10).unwrap_or('0')
}

fn is_arabic_letter(c: char) -> bool {
    matches!(c, '\u{0621}'..='\u{064A}' | '\u{066E}'..='\u{06D3}' | '\u{06FA}'..='\u{06FF}')
}

/// Maps arbitrary product spellings onto canonical catalog ids.
#[derive(Debug, Clone, Default)]
pub struct ProductKeyNormalizer {
    canonical: BTreeSet<String>,
    index: HashMap<String, String>,
    synonyms: HashMap<String, String>,
    synonyms_compact: HashMap<String, String>,
}

impl ProductKeyNormalizer {
    /// Builds the lookup tables for the given catalog.
    ///
    /// On collisions the first product in id order wins.
    #[must_use]
    pub fn from_products(products: &BTreeMap<String, Product>) -> Self {
        let canonical: BTreeSet<String> = products.keys().cloned().collect();

        let mut index = HashMap::new();
        for product in products.values() {
            let spellings = [&product.id, &product.name, &product.label]
                .into_iter()
                .chain(product.aliases.iter());
            for spelling in spellings {
                let folded = fold_key(spelling);
                if folded.is_empty() {
                    continue;
                }
                let compact = folded.replace('_', "");
                index
                    .entry(folded)
                    .or_insert_with(|| product.id.clone());
                index.entry(compact).or_insert_with(|| product.id.clone());
            }
        }

        let mut synonyms = HashMap::new();
        let mut synonyms_compact = HashMap::new();
        for (alias, target) in SYNONYMS {
            if !canonical.contains(*target) {
                continue;
            }
            let folded = fold_key(alias);
            synonyms_compact
                .entry(folded.replace('_', ""))
                .or_insert_with(|| (*target).to_string());
            synonyms
                .entry(folded)
                .or_insert_with(|| (*target).to_string());
        }

        Self {
            canonical,
            index,
            synonyms,
            synonyms_compact,
        }
    }

    /// Resolves `raw` to a canonical product id, or `None` if nothing matches.
    ///
    /// Never fails; unknown keys are the caller's cue to drop the entry.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if self.canonical.contains(trimmed) {
            return Some(trimmed.to_string());
        }

        let folded = fold_key(trimmed);
        if folded.is_empty() {
            return None;
        }
        if self.canonical.contains(&folded) {
            return Some(folded);
        }

        if let Some(id) = self.index.get(&folded) {
            return Some(id.clone());
        }
        if let Some(id) = self.synonyms.get(&folded) {
            return Some(id.clone());
        }
        self.synonyms_compact.get(&folded.replace('_', "")).cloned()
    }

    /// Returns `true` if `id` is a canonical product id.
    #[must_use]
    pub fn is_canonical(&self, id: &str) -> bool {
        self.canonical.contains(id)
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
