//! URL slugs derived from display names.

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, folds common Spanish accents, and collapses every run of
/// non-alphanumeric characters into a single `-`.
///
/// ```
/// use tienda_core::slugify;
///
/// assert_eq!(slugify("Playera Cañón Básica"), "playera-canon-basica");
/// assert_eq!(slugify("  --Hello,  World!-- "), "hello-world");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        };

        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Pick the first free slug in the sequence `base`, `base-1`, `base-2`, ...
///
/// `is_taken` reports whether a candidate is already used by another row.
///
/// ```
/// use tienda_core::unique_slug;
///
/// let taken = ["shirt", "shirt-1"];
/// assert_eq!(unique_slug("shirt", |s| taken.contains(&s)), "shirt-2");
/// ```
#[must_use]
pub fn unique_slug(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_owned();
    }

    (1_u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Shirt"), "shirt");
        assert_eq!(slugify("Vintage Rock Tee 2024"), "vintage-rock-tee-2024");
    }

    #[test]
    fn slugify_strips_edges_and_collapses_runs() {
        assert_eq!(slugify("***Hola!!! Mundo***"), "hola-mundo");
        assert_eq!(slugify("a -- b"), "a-b");
    }

    #[test]
    fn slugify_folds_accents() {
        assert_eq!(slugify("Diseño Único"), "diseno-unico");
    }

    #[test]
    fn slugify_of_symbols_is_empty() {
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn unique_slug_returns_base_when_free() {
        assert_eq!(unique_slug("shirt", |_| false), "shirt");
    }

    #[test]
    fn unique_slug_appends_increasing_suffix() {
        let mut taken: HashSet<String> = HashSet::new();
        let mut issued = Vec::new();
        for _ in 0..3 {
            let slug = unique_slug("shirt", |s| taken.contains(s));
            taken.insert(slug.clone());
            issued.push(slug);
        }
        assert_eq!(issued, vec!["shirt", "shirt-1", "shirt-2"]);
    }

    #[test]
    fn unique_slug_fills_gaps() {
        let taken = ["shirt", "shirt-2"];
        assert_eq!(unique_slug("shirt", |s| taken.contains(&s)), "shirt-1");
    }
}
