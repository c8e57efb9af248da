//! Similarity scoring for the fuzzy tier.
//!
//! The score is the Ratcliff/Obershelp ratio `2*M / (len(a) + len(b))`, where
//! `M` counts characters in the matching blocks found by repeatedly taking the
//! longest common run and recursing on both sides of it. A cutoff of 0.6 on
//! this ratio is the documented default for close matches.

use std::collections::HashMap;

/// Default cutoff for accepting a close match
pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Similarity ratio in `[0.0, 1.0]`; two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

/// Best candidate whose ratio against `word` is at least `cutoff`.
///
/// Ties keep the first candidate in iteration order.
pub fn best_match<'a, I>(word: &str, candidates: I, cutoff: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let score = ratio(word, candidate);
        if score < cutoff {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((candidate, score)),
        }
    }
    best
}

/// Total size of the matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run in `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a` on ties.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run length ending at b[j] for the previous row of a
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j > 0 {
                    j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                } else {
                    1
                };
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_k)
}
