//! Column name deduplication.

use std::collections::{HashMap, HashSet};

/// Make column names unique within one table.
///
/// The first occurrence of a name is kept; the k-th repeat becomes
/// `name_k`. A generated name that is already taken is skipped in favour of
/// the next free suffix, so the output is always unique and already-unique
/// input comes back unchanged.
pub fn dedup_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut repeats: HashMap<&str, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());

    for name in names {
        let name = name.as_ref();
        let unique = if taken.contains(name) {
            let k = repeats.entry(name).or_insert(0);
            loop {
                *k += 1;
                let candidate = format!("{}_{}", name, k);
                if !taken.contains(&candidate) {
                    break candidate;
                }
            }
        } else {
            name.to_string()
        };
        taken.insert(unique.clone());
        out.push(unique);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeats_get_suffixes() {
        assert_eq!(
            dedup_names(&["Spend", "Spend", "Clicks"]),
            vec!["Spend", "Spend_1", "Clicks"]
        );
        assert_eq!(
            dedup_names(&["a", "a", "a", "b", "a"]),
            vec!["a", "a_1", "a_2", "b", "a_3"]
        );
    }

    #[test]
    fn test_unique_names_unchanged() {
        let names = ["Date", "Revenue", "Orders"];
        assert_eq!(dedup_names(&names), names);
    }

    #[test]
    fn test_generated_name_collision() {
        // "Spend_1" is taken by the second entry before the third is seen
        let out = dedup_names(&["Spend", "Spend_1", "Spend"]);
        assert_eq!(out, vec!["Spend", "Spend_1", "Spend_2"]);

        // a later literal "Spend_1" collides with a generated one
        let out = dedup_names(&["Spend", "Spend", "Spend_1"]);
        assert_eq!(out, vec!["Spend", "Spend_1", "Spend_1_1"]);
    }

    #[test]
    fn test_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["Spend", "Spend", "Clicks"],
            vec!["x", "x", "x_1", "x", ""],
            vec!["", "", ""],
        ];
        for input in inputs {
            let once = dedup_names(&input);
            let twice = dedup_names(&once);
            assert_eq!(once, twice);
            let unique: HashSet<&String> = once.iter().collect();
            assert_eq!(unique.len(), once.len());
        }
    }

    #[test]
    fn test_empty_input() {
        let empty: [&str; 0] = [];
        assert!(dedup_names(&empty).is_empty());
    }
}
