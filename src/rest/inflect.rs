//! Naming helpers: case conversion and English pluralization.
//!
//! Case conversion is delegated to `heck`. Pluralization covers the regular
//! English suffix rules plus a short list of irregular and uncountable words,
//! which is enough for deriving collection paths and root keys from model
//! names.

use heck::{ToSnakeCase, ToUpperCamelCase};

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
    "metadata",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
    ("ox", "oxen"),
    ("mouse", "mice"),
];

/// Converts a model name such as `Admin::BlogPost` to `blog_post`.
#[must_use]
pub fn snake_case(name: &str) -> String {
    demodulize(name).to_snake_case()
}

/// Converts an association name such as `blog_posts` to `BlogPosts`.
#[must_use]
pub fn camel_case(name: &str) -> String {
    name.to_upper_camel_case()
}

/// Strips any `::`-separated namespace from a name.
#[must_use]
pub fn demodulize(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// Returns the plural form of a word.
///
/// ```rust
/// use rest_model::rest::inflect::pluralize;
///
/// assert_eq!(pluralize("user"), "users");
/// assert_eq!(pluralize("category"), "categories");
/// assert_eq!(pluralize("person"), "people");
/// ```
#[must_use]
pub fn pluralize(word: &str) -> String {
    inflect(word, true)
}

/// Returns the singular form of a word.
#[must_use]
pub fn singularize(word: &str) -> String {
    inflect(word, false)
}

fn inflect(word: &str, plural: bool) -> String {
    if word.is_empty() {
        return String::new();
    }

    // Only the last underscore-separated segment is inflected.
    let (head, last) = word
        .rfind('_')
        .map_or(("", word), |at| (&word[..=at], &word[at + 1..]));
    let lower = last.to_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }

    for (singular, plural_form) in IRREGULAR {
        let (from, to) = if plural {
            (*singular, *plural_form)
        } else {
            (*plural_form, *singular)
        };
        if lower == from {
            return format!("{head}{}", keep_initial_case(last, to));
        }
        if lower == to {
            return word.to_string();
        }
    }

    let inflected = if plural {
        plural_suffix(last)
    } else {
        singular_suffix(last)
    };
    format!("{head}{inflected}")
}

fn keep_initial_case(original: &str, replacement: &str) -> String {
    let upper = original.chars().next().is_some_and(char::is_uppercase);
    if !upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn is_vowel(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'a' | 'e' | 'i' | 'o' | 'u')
}

fn replace_suffix(word: &str, suffix_len: usize, with: &str) -> String {
    format!("{}{with}", &word[..word.len() - suffix_len])
}

fn plural_suffix(word: &str) -> String {
    let lower = word.to_lowercase();

    if lower.ends_with("quiz") {
        return format!("{word}zes");
    }
    for stem in ["matrix", "vertex", "index"] {
        if lower.ends_with(stem) {
            return replace_suffix(word, 2, "ices");
        }
    }
    for stem in ["octopus", "virus"] {
        if lower.ends_with(stem) {
            return replace_suffix(word, 2, "i");
        }
    }
    if lower.ends_with("sis") {
        return replace_suffix(word, 2, "es");
    }
    if lower.ends_with("alias") || lower.ends_with("status") || lower.ends_with("bus") {
        return format!("{word}es");
    }
    if ["x", "ch", "ss", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        let qu = lower.ends_with("quy");
        if qu || before.is_some_and(|c| !is_vowel(c) && c != 'y') {
            return replace_suffix(word, 1, "ies");
        }
    }
    if lower.ends_with("fe") && !lower.ends_with("ffe") {
        return replace_suffix(word, 2, "ves");
    }
    if lower.ends_with("lf") || lower.ends_with("rf") {
        return replace_suffix(word, 1, "ves");
    }
    if lower.ends_with('s') {
        return word.to_string();
    }
    format!("{word}s")
}

fn singular_suffix(word: &str) -> String {
    let lower = word.to_lowercase();

    if lower.ends_with("quizzes") {
        return replace_suffix(word, 3, "");
    }
    for (plural, singular) in [("matrices", "matrix"), ("vertices", "vertex"), ("indices", "index")] {
        if lower.ends_with(plural) {
            return replace_suffix(word, plural.len(), singular);
        }
    }
    for stem in ["octopi", "viri"] {
        if lower.ends_with(stem) {
            return replace_suffix(word, 1, "us");
        }
    }
    for (plural, singular) in [("aliases", "alias"), ("statuses", "status"), ("buses", "bus")] {
        if lower.ends_with(plural) {
            return replace_suffix(word, plural.len(), singular);
        }
    }
    for stem in ["analyses", "bases", "crises", "diagnoses", "theses", "parentheses", "synopses"] {
        if lower.ends_with(stem) {
            return replace_suffix(word, 2, "is");
        }
    }
    if ["xes", "ches", "sses", "shes"].iter().any(|s| lower.ends_with(s)) {
        return replace_suffix(word, 2, "");
    }
    if lower.ends_with("ies") && lower.len() > 3 {
        return replace_suffix(word, 3, "y");
    }
    if lower.ends_with("lves") || lower.ends_with("rves") {
        return replace_suffix(word, 3, "f");
    }
    if lower.ends_with("ives") {
        return replace_suffix(word, 3, "fe");
    }
    if lower.ends_with("ss") || lower.ends_with("us") {
        return word.to_string();
    }
    if lower.ends_with('s') {
        return replace_suffix(word, 1, "");
    }
    word.to_string()
}
