// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

/// Weighted ratio in `0..=100` between `query` and `candidate`, case
/// insensitive. Scored as the best windowed Levenshtein alignment of the
/// shorter string over the longer one, so a query that occurs verbatim
/// anywhere in the candidate scores at the top of the fuzzy band regardless
/// of where it occurs. Kept below the prefix tier (90) by construction so a
/// true prefix match never loses to a fuzzy one in the smart combiner.
const FUZZY_CEILING: f64 = 89.0;

pub fn ratio(query: &str, candidate: &str) -> u8 {
    let query: Vec<char> = query.to_lowercase().chars().collect();
    let candidate: Vec<char> = candidate.to_lowercase().chars().collect();

    if query.is_empty() || candidate.is_empty() {
        return 0;
    }

    let (shorter, longer) = if query.len() <= candidate.len() { (&query, &candidate) } else { (&candidate, &query) };

    let best_distance = if longer.len() == shorter.len() {
        levenshtein(shorter, longer)
    } else {
        (0..=(longer.len() - shorter.len()))
            .map(|start| levenshtein(shorter, &longer[start..start + shorter.len()]))
            .min()
            .unwrap_or(shorter.len())
    };

    let similarity = 1.0 - (best_distance as f64 / shorter.len() as f64);
    (similarity.clamp(0.0, 1.0) * FUZZY_CEILING).round() as u8
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_ceiling() {
        assert_eq!(ratio("architect", "architect"), FUZZY_CEILING as u8);
    }

    #[test]
    fn substring_anywhere_scores_at_ceiling() {
        assert_eq!(ratio("arch", "code-archaeologist"), FUZZY_CEILING as u8);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(ratio("ARCH", "architect"), ratio("arch", "architect"));
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(ratio("architect", "zzzzzzzzz") < 20);
    }

    #[test]
    fn never_exceeds_ceiling() {
        for candidate in ["architect", "arch", "a", "architecture-planner"] {
            assert!(ratio("architect", candidate) <= FUZZY_CEILING as u8);
        }
    }

    #[test]
    fn monotone_as_match_improves() {
        let worse = ratio("archtct", "architect");
        let better = ratio("architec", "architect");
        assert!(better >= worse);
    }
}
