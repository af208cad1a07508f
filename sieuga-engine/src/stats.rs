use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use sieuga_feed::models::TwoDigitKey;

use crate::tables::{self, Class, Scheme};

/// Résultat d'un extracteur. L'ordre est numérique pour les nombres et les
/// chiffres, canonique pour les classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Key(TwoDigitKey),
    Digit(u8),
    Class(Class),
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Key(k) => write!(f, "{k}"),
            Bucket::Digit(d) => write!(f, "{d}"),
            Bucket::Class(c) => write!(f, "{c}"),
        }
    }
}

/// Ce que l'on étudie dans chaque nombre de l'historique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extractor {
    Identity,
    /// Chiffre des dizaines (đầu)
    Head,
    /// Chiffre des unités (đuôi)
    Tail,
    Class(Scheme),
}

impl Extractor {
    pub fn extract(&self, key: TwoDigitKey) -> Option<Bucket> {
        match self {
            Extractor::Identity => Some(Bucket::Key(key)),
            Extractor::Head => Some(Bucket::Digit(key.tens())),
            Extractor::Tail => Some(Bucket::Digit(key.units())),
            Extractor::Class(scheme) => tables::classify(*scheme, key).map(Bucket::Class),
        }
    }

    /// Univers fermé des valeurs possibles.
    pub fn universe(&self) -> Vec<Bucket> {
        match self {
            Extractor::Identity => TwoDigitKey::all().map(Bucket::Key).collect(),
            Extractor::Head | Extractor::Tail => (0..10).map(Bucket::Digit).collect(),
            Extractor::Class(scheme) => tables::classes(*scheme).map(Bucket::Class).collect(),
        }
    }

    /// Nombres 00..99 qui tombent dans `bucket`, triés.
    pub fn members(&self, bucket: Bucket) -> Vec<TwoDigitKey> {
        TwoDigitKey::all()
            .filter(|k| self.extract(*k) == Some(bucket))
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Identity => "Số",
            Extractor::Head => "Đầu",
            Extractor::Tail => "Đuôi",
            Extractor::Class(scheme) => scheme.name(),
        }
    }
}

/// Fréquences décroissantes, à égalité dans l'ordre de première apparition.
pub fn frequency<K, F>(history: &[TwoDigitKey], extractor: F, top_n: usize) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    F: Fn(TwoDigitKey) -> Option<K>,
{
    let mut counts: Vec<(K, usize)> = Vec::new();
    let mut positions: HashMap<K, usize> = HashMap::new();

    for key in history.iter().filter_map(|k| extractor(*k)) {
        match positions.get(&key) {
            Some(&pos) => counts[pos].1 += 1,
            None => {
                positions.insert(key.clone(), counts.len());
                counts.push((key, 1));
            }
        }
    }

    // tri stable : l'ordre de première apparition départage
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(top_n);
    counts
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleStats {
    pub occurrences: usize,
    pub gaps: Vec<usize>,
    /// `None` avec moins de deux apparitions
    pub avg_gap: Option<f64>,
    pub last_seen_index: Option<usize>,
    /// Extrapolation linéaire naïve : `max(0, dernière apparition - round(écart moyen))`.
    /// Ce n'est pas une prévision.
    pub predicted_next_index: usize,
}

pub fn cycle<K, F>(history: &[TwoDigitKey], target: &K, extractor: F) -> CycleStats
where
    K: PartialEq,
    F: Fn(TwoDigitKey) -> Option<K>,
{
    let indices: Vec<usize> = history
        .iter()
        .enumerate()
        .filter(|(_, k)| extractor(**k).as_ref() == Some(target))
        .map(|(i, _)| i)
        .collect();

    let gaps: Vec<usize> = indices.windows(2).map(|w| w[1] - w[0]).collect();
    let avg_gap = if gaps.is_empty() {
        None
    } else {
        Some(gaps.iter().sum::<usize>() as f64 / gaps.len() as f64)
    };

    let last_seen_index = indices.first().copied();
    let rounded = avg_gap.map(|g| g.round() as usize).unwrap_or(0);
    let predicted_next_index = last_seen_index
        .map(|first| first.saturating_sub(rounded))
        .unwrap_or(0);

    CycleStats {
        occurrences: indices.len(),
        gaps,
        avg_gap,
        last_seen_index,
        predicted_next_index,
    }
}

/// Gan : indice de la dernière apparition (0 = aujourd'hui) de chaque valeur observée.
pub fn staleness<K, F>(history: &[TwoDigitKey], extractor: F) -> BTreeMap<K, usize>
where
    K: Ord,
    F: Fn(TwoDigitKey) -> Option<K>,
{
    let mut table = BTreeMap::new();
    for (i, key) in history.iter().enumerate() {
        if let Some(k) = extractor(*key) {
            table.entry(k).or_insert(i);
        }
    }
    table
}

/// Comme [`staleness`], mais chaque valeur de `universe` jamais vue reçoit `history.len()`.
pub fn staleness_seeded<K, F>(
    history: &[TwoDigitKey],
    extractor: F,
    universe: impl IntoIterator<Item = K>,
) -> BTreeMap<K, usize>
where
    K: Ord,
    F: Fn(TwoDigitKey) -> Option<K>,
{
    let mut table: BTreeMap<K, usize> = universe.into_iter().map(|k| (k, history.len())).collect();
    table.extend(staleness(history, extractor));
    table
}

/// Les `n` valeurs les plus en retard ; à égalité, la plus petite valeur d'abord.
pub fn rank_stale<K: Ord + Clone>(table: &BTreeMap<K, usize>, n: usize) -> Vec<(K, usize)> {
    let mut ranked: Vec<(K, usize)> = table.iter().map(|(k, i)| (k.clone(), *i)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

pub fn top_stale<K, F>(history: &[TwoDigitKey], extractor: F, n: usize) -> Vec<(K, usize)>
where
    K: Ord + Clone,
    F: Fn(TwoDigitKey) -> Option<K>,
{
    rank_stale(&staleness(history, extractor), n)
}

#[derive(Debug, Clone)]
pub struct BucketStats {
    pub bucket: Bucket,
    pub frequency: u32,
    /// Tirages depuis la dernière apparition, `history.len()` si jamais vue
    pub gap: usize,
}

/// Fréquence et gan de chaque valeur de l'univers de l'extracteur.
pub fn bucket_stats(history: &[TwoDigitKey], extractor: Extractor) -> Vec<BucketStats> {
    let gaps = staleness_seeded(history, |k| extractor.extract(k), extractor.universe());
    let mut counts: HashMap<Bucket, u32> = HashMap::new();
    for bucket in history.iter().filter_map(|k| extractor.extract(*k)) {
        *counts.entry(bucket).or_insert(0) += 1;
    }

    gaps.into_iter()
        .map(|(bucket, gap)| BucketStats {
            bucket,
            frequency: counts.get(&bucket).copied().unwrap_or(0),
            gap,
        })
        .collect()
}
