//! Fuzzy comparison of typed answers against the accepted answers of a question.
//!
//! Both sides are normalised first (case, kana script, full-width forms, punctuation), then a
//! cascade of strategies is tried; the first one that succeeds accepts the answer. All lengths
//! are counted in `char`s.

const MIN_ANSWER_CHARS: usize = 2;
const PARTIAL_MATCH_RATIO: f64 = 0.8;
const SIMILARITY_THRESHOLD: f64 = 0.7;
const CONTAINMENT_MIN_CHARS: usize = 3;
const CONTAINMENT_RATIO: f64 = 0.5;

/// Whether `submitted` is accepted by at least one entry of `accepted`.
pub fn is_match<S: AsRef<str>>(submitted: &str, accepted: &[S]) -> bool {
    let answer = normalize(submitted);
    if answer.len() < MIN_ANSWER_CHARS {
        return false;
    }

    accepted.iter().any(|correct| {
        let correct = normalize(correct.as_ref());
        answer == correct
            || is_partial_match(&answer, &correct)
            || is_similar(&answer, &correct)
            || is_contained(&answer, &correct)
    })
}

/// Best similarity in `[0, 1]` between `submitted` and any accepted answer.
///
/// Informational only; acceptance is decided by [`is_match`].
pub fn confidence<S: AsRef<str>>(submitted: &str, accepted: &[S]) -> f64 {
    let answer = normalize(submitted);
    accepted
        .iter()
        .map(|correct| {
            let correct = normalize(correct.as_ref());
            if answer == correct {
                return 1.0;
            }
            let longest = answer.len().max(correct.len());
            if longest == 0 {
                return 0.0;
            }
            let common = longest_common_substring(&answer, &correct) as f64 / longest as f64;
            common.max(similarity(&answer, &correct))
        })
        .fold(0.0, f64::max)
}

/// Canonical form used for comparisons, as a vector of chars.
pub fn normalize(text: &str) -> Vec<char> {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(fold_char)
        .filter(|c| !c.is_whitespace() && is_kept(*c))
        .collect()
}

fn fold_char(c: char) -> char {
    match c {
        // Hiragana to katakana.
        '\u{3041}'..='\u{3093}' => shift(c, 0x60, true),
        // Full-width alphanumerics to ASCII.
        'ａ'..='ｚ' | 'Ａ'..='Ｚ' | '０'..='９' => shift(c, 0xFEE0, false).to_ascii_lowercase(),
        _ => c,
    }
}

fn shift(c: char, offset: u32, up: bool) -> char {
    let code = if up {
        c as u32 + offset
    } else {
        c as u32 - offset
    };
    char::from_u32(code).unwrap_or(c)
}

fn is_kept(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || ('\u{30A0}'..='\u{30FF}').contains(&c)
        || ('\u{4E00}'..='\u{9FAF}').contains(&c)
}

fn contains(haystack: &[char], needle: &[char]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

fn ordered<'a>(a: &'a [char], b: &'a [char]) -> (&'a [char], &'a [char]) {
    if a.len() > b.len() { (b, a) } else { (a, b) }
}

fn is_partial_match(answer: &[char], correct: &[char]) -> bool {
    let (shorter, longer) = ordered(answer, correct);
    if contains(longer, shorter) {
        return !longer.is_empty()
            && shorter.len() as f64 / longer.len() as f64 >= PARTIAL_MATCH_RATIO;
    }
    if shorter.is_empty() {
        return false;
    }
    let common = longest_common_substring(answer, correct);
    common as f64 / shorter.len() as f64 >= PARTIAL_MATCH_RATIO
}

fn is_similar(answer: &[char], correct: &[char]) -> bool {
    answer.len().max(correct.len()) > 0 && similarity(answer, correct) >= SIMILARITY_THRESHOLD
}

fn is_contained(answer: &[char], correct: &[char]) -> bool {
    if !contains(answer, correct) && !contains(correct, answer) {
        return false;
    }
    let (shorter, longer) = ordered(answer, correct);
    shorter.len() >= CONTAINMENT_MIN_CHARS
        && shorter.len() as f64 / longer.len() as f64 >= CONTAINMENT_RATIO
}

fn similarity(a: &[char], b: &[char]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Classic two-row Levenshtein distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Length of the longest common substring.
fn longest_common_substring(a: &[char], b: &[char]) -> usize {
    let mut best = 0;
    let mut previous = vec![0; b.len() + 1];
    let mut current = vec![0; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb { previous[j] + 1 } else { 0 };
            best = best.max(current[j + 1]);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    best
}
