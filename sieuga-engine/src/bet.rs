use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sieuga_feed::models::TwoDigitKey;

/// Relation de position entre le tirage du jour `d1` et le précédent `d2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BetMode {
    /// d1[i] == d2[i]
    #[value(alias = "thang")]
    Straight,
    /// d1[i] == d2[i + 1]
    #[value(alias = "bet-phai")]
    ShiftRight,
    /// d1[i] == d2[i - 1]
    #[value(alias = "bet-trai")]
    ShiftLeft,
}

impl BetMode {
    pub const ALL: [BetMode; 3] = [BetMode::Straight, BetMode::ShiftRight, BetMode::ShiftLeft];

    /// Position dans `d2` comparée à `d1[i]`, pour un recouvrement de longueur `n`.
    pub fn partner(&self, i: usize, n: usize) -> Option<usize> {
        let j = match self {
            BetMode::Straight => Some(i),
            BetMode::ShiftRight => i.checked_add(1),
            BetMode::ShiftLeft => i.checked_sub(1),
        }?;
        (i < n && j < n).then_some(j)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BetMode::Straight => "Thẳng",
            BetMode::ShiftRight => "Bệt Phải",
            BetMode::ShiftLeft => "Bệt Trái",
        }
    }
}

pub fn find_bet_digits(d1: &[u8], d2: &[u8], mode: BetMode) -> BTreeSet<u8> {
    let n = d1.len().min(d2.len());
    (0..n)
        .filter_map(|i| mode.partner(i, n).map(|j| (i, j)))
        .filter(|&(i, j)| d1[i] == d2[j])
        .map(|(i, _)| d1[i])
        .collect()
}

/// Union des chiffres trouvés pour chaque mode demandé.
pub fn find_bet_digits_multi(d1: &[u8], d2: &[u8], modes: &[BetMode]) -> BTreeSet<u8> {
    modes
        .iter()
        .flat_map(|mode| find_bet_digits(d1, d2, *mode))
        .collect()
}

/// Dàn chạm : tout nombre 00..99 contenant au moins un des chiffres trouvés.
pub fn dan_cham(found: &BTreeSet<u8>) -> Vec<TwoDigitKey> {
    TwoDigitKey::all()
        .filter(|k| found.contains(&k.tens()) || found.contains(&k.units()))
        .collect()
}

/// Nhị hợp : paires de chiffres distincts tirés de `tail_digits` dont au moins
/// un appartient à `found`, dans les deux sens.
pub fn nhi_hop(found: &BTreeSet<u8>, tail_digits: &[u8]) -> BTreeSet<TwoDigitKey> {
    let unique: Vec<u8> = tail_digits
        .iter()
        .copied()
        .filter(|d| *d <= 9)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut out = BTreeSet::new();
    for (i, &a) in unique.iter().enumerate() {
        for &b in &unique[i + 1..] {
            if found.contains(&a) || found.contains(&b) {
                if let Ok(ab) = TwoDigitKey::from_digits(a, b) {
                    out.insert(ab);
                    out.insert(ab.reversed());
                }
            }
        }
    }
    out
}

/// Chiffres de nhị hợp d'un jour : les deux derniers chiffres du tirage du
/// jour puis ceux du tirage précédent.
pub fn tail_digits(today: TwoDigitKey, previous: TwoDigitKey) -> [u8; 4] {
    [today.tens(), today.units(), previous.tens(), previous.units()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieuga_feed::models::parse_digits;

    fn digits(s: &str) -> Vec<u8> {
        parse_digits(s).unwrap()
    }

    fn set(ds: &[u8]) -> BTreeSet<u8> {
        ds.iter().copied().collect()
    }

    fn strings<'a>(keys: impl IntoIterator<Item = &'a TwoDigitKey>) -> Vec<String> {
        keys.into_iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_shift_right_example() {
        let found = find_bet_digits(&digits("123"), &digits("912"), BetMode::ShiftRight);
        assert_eq!(found, set(&[1, 2]));
    }

    #[test]
    fn test_straight() {
        let found = find_bet_digits(&digits("4821"), &digits("4020"), BetMode::Straight);
        assert_eq!(found, set(&[2, 4]));
    }

    #[test]
    fn test_shift_left() {
        // d1[1]==d2[0], d1[3]==d2[2]
        let found = find_bet_digits(&digits("5371"), &digits("3010"), BetMode::ShiftLeft);
        assert_eq!(found, set(&[1, 3]));
    }

    #[test]
    fn test_uneven_lengths_use_overlap() {
        let found = find_bet_digits(&digits("12345"), &digits("12"), BetMode::Straight);
        assert_eq!(found, set(&[1, 2]));
        // d2[2] n'existe pas : seul i = 0 est testé
        let found = find_bet_digits(&digits("99"), &digits("19"), BetMode::ShiftRight);
        assert_eq!(found, set(&[9]));
    }

    #[test]
    fn test_empty_inputs() {
        for mode in BetMode::ALL {
            assert!(find_bet_digits(&[], &digits("123"), mode).is_empty());
            assert!(find_bet_digits(&digits("123"), &[], mode).is_empty());
        }
        assert!(find_bet_digits(&digits("1"), &digits("1"), BetMode::ShiftRight).is_empty());
    }

    #[test]
    fn test_straight_subset_of_common_digits() {
        let samples = [("4821", "1824"), ("0000", "0101"), ("12345", "54321"), ("987", "789")];
        for (a, b) in samples {
            let (d1, d2) = (digits(a), digits(b));
            let found = find_bet_digits(&d1, &d2, BetMode::Straight);
            let common: BTreeSet<u8> = set(&d1).intersection(&set(&d2)).copied().collect();
            assert!(found.is_subset(&common), "{a} / {b}");
            for d in &found {
                assert!((0..d1.len().min(d2.len())).any(|i| d1[i] == *d && d2[i] == *d));
            }
        }
    }

    #[test]
    fn test_multi_is_union() {
        let d1 = digits("1234");
        let d2 = digits("2214");
        let all = find_bet_digits_multi(&d1, &d2, &BetMode::ALL);
        let mut expected = BTreeSet::new();
        for mode in BetMode::ALL {
            expected.extend(find_bet_digits(&d1, &d2, mode));
        }
        assert_eq!(all, expected);
        assert!(find_bet_digits_multi(&d1, &d2, &[]).is_empty());
    }

    #[test]
    fn test_dan_cham_contains_any_digit() {
        let dan = dan_cham(&set(&[5]));
        assert_eq!(dan.len(), 19);
        assert!(dan.iter().all(|k| k.contains_digit(5)));
        assert_eq!(dan.first().unwrap().to_string(), "05");

        let dan = dan_cham(&set(&[1, 2]));
        // 100 - 8*8 nombres sans 1 ni 2
        assert_eq!(dan.len(), 36);
        assert!(dan.iter().any(|k| k.to_string() == "13"));
        assert!(dan_cham(&BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_nhi_hop() {
        let nh = nhi_hop(&set(&[3]), &digits("3845"));
        assert_eq!(strings(&nh), vec!["34", "35", "38", "43", "53", "83"]);
    }

    #[test]
    fn test_nhi_hop_ignores_doubles_and_unrelated_pairs() {
        let nh = nhi_hop(&set(&[1]), &digits("1122"));
        assert_eq!(strings(&nh), vec!["12", "21"]);
        assert!(nhi_hop(&set(&[7]), &digits("1234")).is_empty());
        assert!(nhi_hop(&set(&[1]), &[]).is_empty());
    }

    #[test]
    fn test_nhi_hop_uses_tails_only() {
        let (today, previous) = ("4821", "4027");
        let found = find_bet_digits_multi(&digits(today), &digits(previous), &BetMode::ALL);
        assert_eq!(found, set(&[2, 4]));

        let tails = tail_digits(TwoDigitKey::from_tail(today).unwrap(), TwoDigitKey::from_tail(previous).unwrap());
        assert_eq!(tails, [2, 1, 2, 7]);
        let nh = nhi_hop(&found, &tails);
        assert_eq!(strings(&nh), vec!["12", "21", "27", "72"]);

        // avec tous les chiffres, le 4 et le 8 de tête s'inviteraient
        let all: Vec<u8> = digits(today).into_iter().chain(digits(previous)).collect();
        assert_eq!(nhi_hop(&found, &all).len(), 18);
    }
}
