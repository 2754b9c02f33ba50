//! Fuzzy string comparison used for "did you mean" suggestions.
//!
//! The similarity of two strings is `1 - D / (len1 + len2)` where `D` is the
//! number of single byte inserts and deletes in the shortest edit script,
//! found with Myers' O(ND) greedy forward search.

use std::cell::RefCell;

thread_local! {
    // diagonal furthest-reaching table, grown to the largest input seen
    static SCRATCH: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Similarity in `[0, 1]`, or `-1.0` if the scratch table could not be allocated.
pub fn fstrcmp(left: &str, right: &str) -> f64 {
    similarity(left.as_bytes(), right.as_bytes())
}

/// Case insensitive [`fstrcmp`].
pub fn fstrcasecmp(left: &str, right: &str) -> f64 {
    similarity(left.to_lowercase().as_bytes(), right.to_lowercase().as_bytes())
}

/// Picks the candidate most similar to `name`, if any scores above `threshold`.
pub fn best_match<'a, I>(name: &str, candidates: I, threshold: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best = None;
    let mut best_weight = threshold;
    for candidate in candidates {
        let weight = fstrcmp(name, candidate);
        if weight > best_weight {
            best_weight = weight;
            best = Some(candidate);
        }
    }
    best
}

fn similarity(left: &[u8], right: &[u8]) -> f64 {
    let total = left.len() + right.len();
    if total == 0 {
        return 1.0;
    }
    SCRATCH.with(|scratch| {
        let mut scratch = scratch.borrow_mut();
        match edit_distance(left, right, &mut scratch) {
            Some(distance) => 1.0 - distance as f64 / total as f64,
            None => -1.0,
        }
    })
}

fn edit_distance(left: &[u8], right: &[u8], furthest: &mut Vec<usize>) -> Option<usize> {
    let n = left.len();
    let m = right.len();
    let max = n + m;
    let offset = max as isize + 1;
    let width = 2 * max + 3;
    if furthest.len() < width {
        furthest.try_reserve(width - furthest.len()).ok()?;
        furthest.resize(width, 0);
    }
    furthest[offset as usize + 1] = 0;

    for d in 0..=max as isize {
        let mut k = -d;
        while k <= d {
            let index = (k + offset) as usize;
            let mut x = if k == -d || (k != d && furthest[index - 1] < furthest[index + 1]) {
                furthest[index + 1]
            } else {
                furthest[index - 1] + 1
            };
            let mut y = (x as isize - k) as usize;
            while x < n && y < m && left[x] == right[y] {
                x += 1;
                y += 1;
            }
            furthest[index] = x;
            if x >= n && y >= m {
                return Some(d as usize);
            }
            k += 2;
        }
    }
    Some(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_are_one() {
        for s in ["a", "hello", "/usr/local/bin", "EXPLAIN_OPTIONS"] {
            assert_eq!(fstrcmp(s, s), 1.0);
        }
        assert_eq!(fstrcmp("", ""), 1.0);
    }

    #[test]
    fn disjoint_strings_are_zero() {
        assert_eq!(fstrcmp("abc", "xyz"), 0.0);
        assert_eq!(fstrcmp("", "xyz"), 0.0);
    }

    #[test]
    fn symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("numeric-errno", "numeric-eror"),
            ("", "a"),
            ("abcabba", "cbabac"),
        ];
        for (a, b) in pairs {
            assert_eq!(fstrcmp(a, b), fstrcmp(b, a));
        }
    }

    #[test]
    fn counts_inserts_and_deletes() {
        // one substitution is a delete plus an insert
        let weight = fstrcmp("abc", "abd");
        assert!((weight - (1.0 - 2.0 / 6.0)).abs() < 1e-12);
        // the classic Myers example has D = 5
        let weight = fstrcmp("abcabba", "cbabac");
        assert!((weight - (1.0 - 5.0 / 13.0)).abs() < 1e-12);
    }

    #[test]
    fn case_insensitive_variant() {
        assert_eq!(fstrcasecmp("Makefile", "makefile"), 1.0);
        assert!(fstrcmp("Makefile", "makefile") < 1.0);
    }

    #[test]
    fn best_match_respects_threshold() {
        let names = ["debug", "numeric-errno", "dialect-specific"];
        assert_eq!(best_match("numeric-erno", names, 0.6), Some("numeric-errno"));
        assert_eq!(best_match("zzz", names, 0.6), None);
    }
}
