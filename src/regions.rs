//! Region-name canonicalization
//!
//! Input files spell the same administrative region a dozen ways
//! ("Sana'a", "Sanaa", "Şanʿāʾ", "SAN'A"). Everything downstream keys on
//! [`RegionId`], so this module owns the one function that maps raw
//! spellings into that identifier space. Normalization is deliberately
//! total: a malformed name degrades to its cleaned form instead of failing
//! the pipeline.

use std::collections::HashMap;

use crate::types::RegionId;

/// Built-in alias table mapping *cleaned* spelling variants to their
/// canonical identifier. Keys must already be in cleaned form (lowercase,
/// folded, separator-collapsed); values must be fixed points of
/// [`RegionNormalizer::normalize`] or idempotence breaks.
///
/// This is a data asset, not logic: deployments with a different region
/// inventory swap it via [`RegionNormalizer::with_aliases`].
const REGION_ALIASES: &[(&str, &str)] = &[
    // Sana'a governorate vs. the capital district
    ("sana_a", "sanaa"),
    ("san_a", "sanaa"),
    ("sana", "sanaa"),
    ("sana_a_city", "sanaa_city"),
    ("amanat_al_asimah", "sanaa_city"),
    // Red Sea coast
    ("al_hudaydah", "hodeidah"),
    ("al_hodeidah", "hodeidah"),
    ("hudaydah", "hodeidah"),
    ("hodeida", "hodeidah"),
    // Highlands and south
    ("ta_izz", "taiz"),
    ("ta_iz", "taiz"),
    ("taizz", "taiz"),
    ("adan", "aden"),
    ("lahij", "lahj"),
    ("lahej", "lahj"),
    ("sa_dah", "saada"),
    ("sa_ada", "saada"),
    ("saadah", "saada"),
    ("sadah", "saada"),
    ("al_dhale", "al_dhalee"),
    ("al_dhale_e", "al_dhalee"),
    ("ad_dali", "al_dhalee"),
    ("al_dali", "al_dhalee"),
    // East
    ("hadhramaut", "hadramaut"),
    ("hadramawt", "hadramaut"),
    ("hadhramawt", "hadramaut"),
    ("ma_rib", "marib"),
    ("mareb", "marib"),
    ("shabwa", "shabwah"),
    ("al_maharah", "al_mahrah"),
    ("mahra", "al_mahrah"),
    ("al_baidha", "al_bayda"),
    ("al_baida", "al_bayda"),
    ("al_mahweet", "al_mahwit"),
    ("rayma", "raymah"),
    ("soqatra", "socotra"),
    ("suqutra", "socotra"),
];

/// Quote-like characters stripped during cleaning, including the modifier
/// letters used to transliterate hamza and ʿayn.
const QUOTE_CHARS: &[char] = &[
    '\'', '"', '`', '´', '’', '‘', '‚', '“', '”', 'ʼ', 'ʻ', 'ʽ', 'ʾ', 'ʿ',
];

/// Canonicalizes arbitrary region-name strings into [`RegionId`] space.
///
/// Construct one per pipeline and pass it where needed; there is no global
/// instance. The normalizer is pure: same input, same output, no side
/// effects, and `normalize` is idempotent.
#[derive(Debug, Clone)]
pub struct RegionNormalizer {
    aliases: HashMap<String, String>,
}

impl RegionNormalizer {
    /// A normalizer backed by the built-in alias table.
    pub fn new() -> Self {
        Self::with_aliases(REGION_ALIASES.iter().copied())
    }

    /// A normalizer with a caller-supplied alias table. Keys are cleaned
    /// spelling variants, values the canonical form they collapse to.
    pub fn with_aliases<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let aliases = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self { aliases }
    }

    /// Map a raw region name to its canonical identifier.
    ///
    /// Cleaning steps, in order: lowercase; fold diacritics to their base
    /// letter and drop combining marks; strip quote characters; collapse
    /// runs of whitespace/hyphens/underscores to a single underscore; trim
    /// leading and trailing underscores. The cleaned string is then looked
    /// up in the alias table, falling back to itself.
    ///
    /// Never fails: garbage in, best-effort cleaned garbage out.
    pub fn normalize(&self, raw: &str) -> RegionId {
        let cleaned = clean_name(raw);
        match self.aliases.get(&cleaned) {
            Some(canonical) => RegionId::new(canonical.clone()),
            None => RegionId::new(cleaned),
        }
    }
}

impl Default for RegionNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercase, fold, strip quotes, collapse separators, trim.
fn clean_name(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        let c = match fold_diacritic(c) {
            Some(folded) => folded,
            None => continue,
        };
        if QUOTE_CHARS.contains(&c) {
            continue;
        }
        if c.is_whitespace() || c == '-' || c == '_' {
            // Leading separators never emit; interior runs emit one '_'.
            pending_sep = !cleaned.is_empty();
            continue;
        }
        if pending_sep {
            cleaned.push('_');
            pending_sep = false;
        }
        cleaned.push(c);
    }

    cleaned
}

/// Fold one already-lowercased character to its undecorated base letter.
///
/// Returns `None` for combining diacritical marks (the decomposed-form
/// leftovers), the character itself when no fold applies. Covers Latin-1,
/// Latin Extended-A, and the dotted letters of romanized Arabic (ḥ, ṣ, ṭ,
/// ḍ, ẓ); other scripts pass through untouched.
fn fold_diacritic(c: char) -> Option<char> {
    let folded = match c {
        '\u{0300}'..='\u{036f}' => return None,
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' | 'ð' | 'ḍ' | 'ḑ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' | 'ḡ' => 'g',
        'ĥ' | 'ħ' | 'ḥ' | 'ḩ' => 'h',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' | 'ṣ' => 's',
        'ţ' | 'ť' | 'ŧ' | 'ṭ' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' | 'ẓ' => 'z',
        other => other,
    };
    Some(folded)
}
