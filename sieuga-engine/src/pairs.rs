use std::collections::BTreeSet;

use sieuga_feed::models::TwoDigitKey;

/// Toutes les paires ordonnées `d_i d_j` formées avec les chiffres d'une valeur.
/// Les valeurs hors 0..=9 sont ignorées.
pub fn pairs(digits: &[u8], include_doubles: bool) -> BTreeSet<TwoDigitKey> {
    let mut out = BTreeSet::new();
    for &a in digits {
        for &b in digits {
            if !include_doubles && a == b {
                continue;
            }
            if let Ok(key) = TwoDigitKey::from_digits(a, b) {
                out.insert(key);
            }
        }
    }
    out
}

pub fn pairs_with_repetition(digits: &[u8]) -> BTreeSet<TwoDigitKey> {
    pairs(digits, true)
}

pub fn pairs_without_repetition(digits: &[u8]) -> BTreeSet<TwoDigitKey> {
    pairs(digits, false)
}

/// Ne garde que les nombres contenant `digit` à l'une des deux positions.
pub fn containing(set: &BTreeSet<TwoDigitKey>, digit: u8) -> BTreeSet<TwoDigitKey> {
    set.iter().copied().filter(|k| k.contains_digit(digit)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(set: &BTreeSet<TwoDigitKey>) -> Vec<String> {
        set.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_without_repetition_example() {
        assert_eq!(strings(&pairs_without_repetition(&[1, 2, 2])), vec!["12", "21"]);
    }

    #[test]
    fn test_with_repetition_includes_doubles() {
        let set = pairs_with_repetition(&[1, 2, 2]);
        assert_eq!(strings(&set), vec!["11", "12", "21", "22"]);
    }

    #[test]
    fn test_cardinality_bounds() {
        for digits in [vec![4u8, 8, 2, 1], vec![0, 0, 0], vec![1, 2, 3, 4, 5], vec![9, 9, 1]] {
            let unique: BTreeSet<u8> = digits.iter().copied().collect();
            let with = pairs_with_repetition(&digits);
            let without = pairs_without_repetition(&digits);

            assert!(with.len() <= unique.len() * unique.len());
            for d in &unique {
                assert!(with.contains(&TwoDigitKey::from_digits(*d, *d).unwrap()));
            }
            let expected: BTreeSet<TwoDigitKey> = with.iter().copied().filter(|k| !k.is_double()).collect();
            assert_eq!(without, expected);
        }
    }

    #[test]
    fn test_empty_digits() {
        assert!(pairs_with_repetition(&[]).is_empty());
        assert!(pairs_without_repetition(&[7]).is_empty());
    }

    #[test]
    fn test_containing() {
        let set = pairs_with_repetition(&[3, 5, 7]);
        let with_five = containing(&set, 5);
        assert_eq!(strings(&with_five), vec!["35", "53", "55", "57", "75"]);
        assert!(containing(&set, 0).is_empty());
    }
}
