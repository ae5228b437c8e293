use crate::utils::validation::is_valid_folder_name;
use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    survey_token: Regex,
    whitespace: Regex,
    disallowed: Regex,
    underscores: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        survey_token: Regex::new(r"(?i)befahrung").expect("static regex"),
        whitespace: Regex::new(r"\s+").expect("static regex"),
        disallowed: Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"),
        underscores: Regex::new(r"_{2,}").expect("static regex"),
    })
}

/// 固定的轉寫表：德文變音轉成雙字母，其他常見重音字母去掉重音
fn transliterate_char(c: char) -> Option<&'static str> {
    let mapped = match c {
        'ä' => "ae",
        'ö' => "oe",
        'ü' => "ue",
        'Ä' => "Ae",
        'Ö' => "Oe",
        'Ü' => "Ue",
        'ß' => "ss",
        'æ' => "ae",
        'Æ' => "Ae",
        'œ' => "oe",
        'Œ' => "Oe",
        'à' | 'á' | 'â' | 'ã' | 'å' => "a",
        'À' | 'Á' | 'Â' | 'Ã' | 'Å' => "A",
        'ç' => "c",
        'Ç' => "C",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'È' | 'É' | 'Ê' | 'Ë' => "E",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I",
        'ñ' => "n",
        'Ñ' => "N",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ø' => "O",
        'ù' | 'ú' | 'û' => "u",
        'Ù' | 'Ú' | 'Û' => "U",
        'ý' | 'ÿ' => "y",
        'Ý' => "Y",
        _ => return None,
    };
    Some(mapped)
}

fn transliterate(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match transliterate_char(c) {
            Some(replacement) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}

/// Turns a free-form project name into a folder name.
///
/// Steps run in a fixed order: leading non-alphanumerics are stripped, the
/// word "Befahrung" is removed (any case), accented letters are transliterated,
/// whitespace runs become `_`, `+` becomes `_plus_`, every other character
/// outside `[A-Za-z0-9_-]` becomes `_`, repeated underscores collapse and
/// underscores at both ends are trimmed.
pub fn sanitize_project_name(raw: &str) -> String {
    let p = patterns();

    let stripped = raw.trim_start_matches(|c: char| !c.is_alphanumeric());
    let without_token = p.survey_token.replace_all(stripped, "");
    let ascii = transliterate(&without_token);
    let spaced = p.whitespace.replace_all(&ascii, "_");
    let plus = spaced.replace('+', "_plus_");
    let cleaned = p.disallowed.replace_all(&plus, "_");
    let collapsed = p.underscores.replace_all(&cleaned, "_");

    collapsed.trim_matches('_').to_string()
}

/// Sanitizes and returns the name only when the result is a usable folder name.
pub fn sanitized_folder_name(raw: &str) -> Option<String> {
    let name = sanitize_project_name(raw);
    if is_valid_folder_name(&name) {
        Some(name)
    } else {
        None
    }
}
