use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use sieuga_feed::models::TwoDigitKey;

/// Mức số : les nombres 00..99 regroupés par nombre d'apparitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Levels {
    groups: BTreeMap<usize, Vec<TwoDigitKey>>,
}

impl Levels {
    /// Ne garde que les niveaux compris dans `range`. Chaque groupe est trié.
    pub fn from_counts(counts: &[usize; 100], range: RangeInclusive<usize>) -> Self {
        let mut groups: BTreeMap<usize, Vec<TwoDigitKey>> = BTreeMap::new();
        for key in TwoDigitKey::all() {
            let count = counts[key.index()];
            if range.contains(&count) {
                groups.entry(count).or_default().push(key);
            }
        }
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn max_level(&self) -> Option<usize> {
        self.groups.keys().next_back().copied()
    }

    pub fn get(&self, level: usize) -> &[TwoDigitKey] {
        self.groups.get(&level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Niveaux croissants.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[TwoDigitKey])> {
        self.groups.iter().map(|(level, keys)| (*level, keys.as_slice()))
    }

    /// Niveaux décroissants, pour l'affichage.
    pub fn iter_desc(&self) -> impl Iterator<Item = (usize, &[TwoDigitKey])> {
        self.groups.iter().rev().map(|(level, keys)| (*level, keys.as_slice()))
    }

    pub fn level_of(&self, key: TwoDigitKey) -> Option<usize> {
        self.groups
            .iter()
            .find(|(_, keys)| keys.binary_search(&key).is_ok())
            .map(|(level, _)| *level)
    }

    /// Union triée des niveaux `0..=max_level`.
    pub fn up_to(&self, max_level: usize) -> Vec<TwoDigitKey> {
        let mut out: Vec<TwoDigitKey> = self
            .groups
            .range(..=max_level)
            .flat_map(|(_, keys)| keys.iter().copied())
            .collect();
        out.sort();
        out
    }
}

/// Nombre d'occurrences de chaque "00".."99" comme sous-chaîne, sans
/// recouvrement, cumulé sur toutes les sources.
pub fn count_pair_occurrences<S: AsRef<str>>(sources: &[S]) -> [usize; 100] {
    let mut counts = [0usize; 100];
    for key in TwoDigitKey::all() {
        let pattern = key.to_string();
        counts[key.index()] = sources
            .iter()
            .map(|s| s.as_ref().matches(pattern.as_str()).count())
            .sum();
    }
    counts
}

pub fn levels_from_sources<S: AsRef<str>>(sources: &[S], range: RangeInclusive<usize>) -> Levels {
    Levels::from_counts(&count_pair_occurrences(sources), range)
}

/// Appartenance de chaque nombre aux dàn fournies, niveau 0 compris.
pub fn levels_from_dans(dans: &[Vec<TwoDigitKey>]) -> Levels {
    let mut counts = [0usize; 100];
    for key in dans.iter().flatten() {
        counts[key.index()] += 1;
    }
    Levels::from_counts(&counts, 0..=usize::MAX)
}
