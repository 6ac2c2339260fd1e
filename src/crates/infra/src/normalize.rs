use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Characters folded before a name search, as `(from, to)` strings of equal length.
/// Kept in sync with [`NAME_MATCH_SQL`] so both sides of the LIKE fold identically.
const TURKISH_FROM: &str = "İIıŞşĞğÜüÖöÇç";
const TURKISH_TO: &str = "iiissgguuoocc";

/// Case and diacritic insensitive partial match on `users.name`.
pub const NAME_MATCH_SQL: &str =
    "lower(translate(\"users\".\"name\", 'İIıŞşĞğÜüÖöÇç', 'iiissgguuoocc')) LIKE $1";

static TURKISH_FOLD: Lazy<HashMap<char, char>> = Lazy::new(|| {
    TURKISH_FROM.chars().zip(TURKISH_TO.chars()).collect()
});

/// Folds Turkish letters to their ASCII base and lowercases the rest.
pub fn fold_turkish(value: &str) -> String {
    value
        .chars()
        .map(|c| TURKISH_FOLD.get(&c).copied().unwrap_or(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Builds the LIKE pattern for a search term, or `None` when there is nothing to search.
/// `%`, `_` and `\` in the term match literally.
pub fn name_like_pattern(term: &str) -> Option<String> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in fold_turkish(term).chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Some(pattern)
}

/// In-process equivalent of [`NAME_MATCH_SQL`].
pub fn name_matches(name: &str, term: &str) -> bool {
    let term = term.trim();
    term.is_empty() || fold_turkish(name).contains(&fold_turkish(term))
}
