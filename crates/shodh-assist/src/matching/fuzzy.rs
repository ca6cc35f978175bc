//! Lexical similarity scores in 0..=100, tolerant of case, punctuation,
//! word order and small edits.
//!
//! All scorers work on chars, not bytes. Scores are rounded half-to-even.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W").expect("non-word regex is valid"));

/// Lowercase, replace every non-word character with a space, trim the ends.
/// Inner runs of spaces are kept.
pub fn full_process(s: &str) -> String {
    NON_WORD_RE.replace_all(s, " ").to_lowercase().trim().to_string()
}

/// Edit distance where insertions and deletions cost 1 and substitutions 2.
fn indel_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 2 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn raw_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (total - indel_distance(a, b)) as f64 / total as f64
}

fn to_score(fraction: f64) -> u8 {
    (100.0 * fraction).round_ties_even().clamp(0.0, 100.0) as u8
}

/// Normalized indel similarity. Either side empty scores 0.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    to_score(raw_ratio(&a, &b))
}

/// Best [`ratio`] of the shorter string against any equal-length window of
/// the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    if short.is_empty() {
        return 0;
    }

    let mut best = 0.0f64;
    for window in long.windows(short.len()) {
        let r = raw_ratio(short, window);
        if r > best {
            best = r;
            if best >= 1.0 {
                break;
            }
        }
    }
    to_score(best)
}

fn sorted_tokens(processed: &str) -> String {
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn token_sort(a: &str, b: &str, partial: bool) -> u8 {
    let a = sorted_tokens(&full_process(a));
    let b = sorted_tokens(&full_process(b));
    if partial {
        partial_ratio(&a, &b)
    } else {
        ratio(&a, &b)
    }
}

fn token_set(a: &str, b: &str, partial: bool) -> u8 {
    let p1 = full_process(a);
    let p2 = full_process(b);
    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    let tokens1: BTreeSet<&str> = p1.split_whitespace().collect();
    let tokens2: BTreeSet<&str> = p2.split_whitespace().collect();

    let join = |set: Vec<&str>| set.join(" ");
    let sect = join(tokens1.intersection(&tokens2).copied().collect());
    let diff12 = join(tokens1.difference(&tokens2).copied().collect());
    let diff21 = join(tokens2.difference(&tokens1).copied().collect());

    let combined12 = format!("{} {}", sect, diff12).trim().to_string();
    let combined21 = format!("{} {}", sect, diff21).trim().to_string();

    let score = |x: &str, y: &str| if partial { partial_ratio(x, y) } else { ratio(x, y) };

    score(&sect, &combined12)
        .max(score(&sect, &combined21))
        .max(score(&combined12, &combined21))
}

/// [`ratio`] after sorting the words of both strings.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    token_sort(a, b, false)
}

/// Compares the shared words against each side's shared-plus-remaining words,
/// so extra words on one side cost little.
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    token_set(a, b, false)
}

/// Blend of the scorers above, weighted by how different the lengths are.
pub fn weighted_ratio(a: &str, b: &str) -> u8 {
    const UNBASE_SCALE: f64 = 0.95;

    let p1 = full_process(a);
    let p2 = full_process(b);
    if p1.is_empty() || p2.is_empty() {
        return 0;
    }

    let base = ratio(&p1, &p2) as f64;

    let len1 = p1.chars().count() as f64;
    let len2 = p2.chars().count() as f64;
    let len_ratio = len1.max(len2) / len1.min(len2);

    let best = if len_ratio >= 1.5 {
        let partial_scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
        let partial = partial_ratio(&p1, &p2) as f64 * partial_scale;
        let ptsor = token_sort(&p1, &p2, true) as f64 * UNBASE_SCALE * partial_scale;
        let ptser = token_set(&p1, &p2, true) as f64 * UNBASE_SCALE * partial_scale;
        base.max(partial).max(ptsor).max(ptser)
    } else {
        let tsor = token_sort(&p1, &p2, false) as f64 * UNBASE_SCALE;
        let tser = token_set(&p1, &p2, false) as f64 * UNBASE_SCALE;
        base.max(tsor).max(tser)
    };

    best.round_ties_even() as u8
}

/// Best-scoring choice as `(index, choice, score)`. Ties keep the earliest
/// choice. Returns `None` only when there are no choices.
pub fn extract_one<'a, I>(query: &str, choices: I) -> Option<(usize, &'a str, u8)>
where
    I: IntoIterator<Item = &'a str>,
{
    let processed_query = full_process(query);
    if processed_query.is_empty() {
        tracing::debug!(query, "Query is empty after processing; every choice scores 0");
    }

    let mut best: Option<(usize, &'a str, u8)> = None;
    for (i, choice) in choices.into_iter().enumerate() {
        let score = weighted_ratio(&processed_query, choice);
        if best.map_or(true, |(_, _, s)| score > s) {
            best = Some((i, choice, score));
        }
    }
    best
}
