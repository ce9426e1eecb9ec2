//! Identifier conversions used for class, table, column, route and variable names.
//! Every function is a pure function of its input so repeated runs name things identically.

/// Split an identifier into words: separators (`_`, `-`, space, `.`, `/`, `\`) end a word and
/// every uppercase letter starts one. e.g. "BlogPost" -> ["Blog", "Post"], "user_id" -> ["user", "id"]
pub fn words(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if matches!(c, '_' | '-' | ' ' | '.' | '/' | '\\') {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else if c.is_uppercase() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            current.push(c);
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Lowercase words joined by `delimiter`.
/// e.g. ("PostController", "/") -> "post/controller", ("BlogPost", ".") -> "blog.post"
pub fn to_delimited(s: &str, delimiter: &str) -> String {
    words(s)
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(delimiter)
}

/// e.g. "BlogPost" -> "blog_post", "userId" -> "user_id"
pub fn to_snake_case(s: &str) -> String {
    to_delimited(s, "_")
}

/// e.g. "blog_post" -> "BlogPost", "view-dashboard" -> "ViewDashboard"
pub fn to_studly_case(s: &str) -> String {
    words(s).iter().map(|w| upper_first(w)).collect()
}

/// e.g. "BlogPost" -> "blogPost", "user_id" -> "userId"
pub fn to_camel_case(s: &str) -> String {
    lower_first(&to_studly_case(s))
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// True when the first character is an uppercase letter (a class-like reference).
pub fn starts_uppercase(s: &str) -> bool {
    s.chars().next().map(char::is_uppercase).unwrap_or(false)
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "metadata",
    "money",
    "news",
    "series",
    "sheep",
    "species",
];

/// English plural of a single word, keeping its leading case.
/// e.g. "post" -> "posts", "Category" -> "Categories", "status" -> "statuses"
pub fn plural(word: &str) -> String {
    let lower = word.to_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, p)) = IRREGULAR.iter().find(|(s, _)| *s == lower) {
        return if starts_uppercase(word) {
            upper_first(p)
        } else {
            (*p).to_string()
        };
    }
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if before.map(|c| !"aeiou".contains(c)).unwrap_or(false) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{}s", word)
}

/// Pluralize the last word of a studly identifier. e.g. "BlogPost" -> "BlogPosts"
pub fn plural_studly(s: &str) -> String {
    let mut parts: Vec<String> = words(s).iter().map(|w| upper_first(w)).collect();
    if let Some(last) = parts.pop() {
        parts.push(plural(&last));
    }
    parts.concat()
}

/// Last segment of a namespaced key. e.g. "Admin\\User" -> "User"
pub fn class_basename(key: &str) -> &str {
    key.rsplit('\\').next().unwrap_or(key)
}

/// Namespace prefix of a namespaced key, if any. e.g. "Admin\\User" -> Some("Admin")
pub fn namespace_prefix(key: &str) -> Option<&str> {
    key.rfind('\\').map(|i| &key[..i]).filter(|p| !p.is_empty())
}
