//! Text folding applied to both indexed text and queries.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const TATWEEL: char = '\u{0640}';

/// Honorifics dropped from names before matching.
const TITLES: &[&str] = &["dr", "dr.", "d.", "د", "د.", "د/", "دكتور", "دكتوره"];

/// Lower-cases, folds Arabic letter variants and diacritics, strips
/// honorific titles and collapses punctuation to single spaces.
///
/// Clock times survive as single words: `"8:00 AM"` becomes `"08:00am"`.
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(fold_arabic_letter)
        .collect::<String>()
        .nfd()
        .filter(|c| !is_combining_mark(*c) && *c != TATWEEL)
        .collect();

    let mut words: Vec<String> = Vec::new();
    for token in folded.split_whitespace() {
        let Some(token) = strip_title(token) else {
            continue;
        };
        for word in split_words(token) {
            if is_meridiem(word) {
                let bare_clock = |w: &&mut String| {
                    w.ends_with(|c: char| c.is_ascii_digit()) && clock_time(w).is_some()
                };
                if let Some(last) = words.last_mut().filter(bare_clock) {
                    last.push_str(word);
                    continue;
                }
            }
            words.push(clock_time(word).unwrap_or_else(|| word.to_string()));
        }
    }
    words.join(" ")
}

/// Splits normalized text into query tokens. The index tokenizer splits on
/// whitespace only, so both sides see the same terms.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Breaks a token on separators, except a `:` between two digits.
fn split_words(token: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = token.char_indices().collect();
    let mut words = Vec::new();
    let mut start = 0;
    for (i, &(pos, c)) in chars.iter().enumerate() {
        let clock_colon = c == ':'
            && i > 0
            && chars[i - 1].1.is_ascii_digit()
            && chars.get(i + 1).is_some_and(|(_, next)| next.is_ascii_digit());
        if is_separator(c) && !clock_colon {
            if pos > start {
                words.push(&token[start..pos]);
            }
            start = pos + c.len_utf8();
        }
    }
    if start < token.len() {
        words.push(&token[start..]);
    }
    words
}

fn is_meridiem(word: &str) -> bool {
    matches!(word, "am" | "pm")
}

/// `h:mm` or `hh:mm`, optionally glued to `am`/`pm`, with the hour padded to
/// two digits. `None` for anything else.
fn clock_time(word: &str) -> Option<String> {
    let (clock, meridiem) = ["am", "pm"]
        .into_iter()
        .find_map(|m| word.strip_suffix(m).map(|clock| (clock, m)))
        .unwrap_or((word, ""));
    let (hour, minute) = clock.split_once(':')?;
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !(1..=2).contains(&hour.len()) || minute.len() != 2 || !digits(hour) || !digits(minute) {
        return None;
    }
    Some(format!("{hour:0>2}:{minute}{meridiem}"))
}

fn fold_arabic_letter(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ء' | 'ؤ' => 'ا',
        'ة' => 'ه',
        'ى' | 'ئ' => 'ي',
        other => other,
    }
}

/// `None` when the whole token is a title; otherwise the token with a
/// glued title prefix (`"dr.ahmed"`) removed.
fn strip_title(token: &str) -> Option<&str> {
    if TITLES.contains(&token) {
        return None;
    }
    for prefix in ["dr.", "d.", "د.", "د/"] {
        if let Some(rest) = token.strip_prefix(prefix) {
            if !rest.is_empty() {
                return Some(rest);
            }
        }
    }
    Some(token)
}

fn is_separator(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '-' | '\u{2013}' | '\u{2014}' | '.' | ',' | '/' | '،' | ':' | ';' | '_' | '\''
            | '"' | '[' | ']' | '!' | '?'
    )
}
