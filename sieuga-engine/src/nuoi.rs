//! Dàn nuôi, dàn lâu ra et test rétroactif.
//!
//! `results` (Thần Tài ou Điện Toán) et `reference` (queues GĐB ou G1) sont
//! indexés du plus récent au plus ancien et doivent partager le même
//! alignement de dates. La colonne de comparaison d'un jour `i` est
//! `reference[i - k]` pour `k = 1..=check_range` : les tirages de référence
//! qui ont suivi ce jour.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sieuga_feed::models::{parse_digits, TwoDigitKey};
use sieuga_feed::FeedError;

use crate::levels::{levels_from_dans, levels_from_sources, Levels};
use crate::pairs::pairs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NuoiParams {
    pub days: usize,
    pub check_range: usize,
    pub watch_limit: usize,
    pub include_doubles: bool,
}

impl Default for NuoiParams {
    fn default() -> Self {
        Self {
            days: 50,
            check_range: 21,
            watch_limit: 28,
            include_doubles: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauRaParams {
    pub days: usize,
    pub window: usize,
    pub check_range: usize,
    pub watch_limit: usize,
    pub threshold: usize,
}

impl Default for LauRaParams {
    fn default() -> Self {
        Self {
            days: 50,
            window: 7,
            check_range: 28,
            watch_limit: 28,
            threshold: 4,
        }
    }
}

/// Colonne K : pour chaque `k`, la référence de `i - k` si elle tombe dans la dàn.
fn comparison_hits(
    i: usize,
    reference: &[TwoDigitKey],
    check_range: usize,
    in_dan: impl Fn(TwoDigitKey) -> bool,
) -> Vec<Option<TwoDigitKey>> {
    (1..=check_range)
        .map(|k| {
            i.checked_sub(k)
                .and_then(|j| reference.get(j).copied())
                .filter(|key| in_dan(*key))
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct NuoiRow {
    pub index: usize,
    pub value: String,
    pub dan: BTreeSet<TwoDigitKey>,
    pub hits: Vec<Option<TwoDigitKey>>,
    pub chua_ra: bool,
}

impl NuoiRow {
    pub fn is_hit(&self) -> bool {
        self.hits.iter().any(Option::is_some)
    }
}

pub fn dan_nuoi<S: AsRef<str>>(
    results: &[S],
    reference: &[TwoDigitKey],
    params: &NuoiParams,
) -> Result<Vec<NuoiRow>, FeedError> {
    results
        .iter()
        .take(params.days)
        .enumerate()
        .map(|(i, value)| {
            let value = value.as_ref();
            let dan = pairs(&parse_digits(value)?, params.include_doubles);
            let hits = comparison_hits(i, reference, params.check_range, |key| dan.contains(&key));
            let chua_ra = i <= params.watch_limit && hits.iter().all(Option::is_none);
            Ok(NuoiRow {
                index: i,
                value: value.to_string(),
                dan,
                hits,
                chua_ra,
            })
        })
        .collect()
}

/// Mức số calculés sur les seules dàn encore en attente.
pub fn chua_ra_levels(rows: &[NuoiRow]) -> Levels {
    let dans: Vec<Vec<TwoDigitKey>> = rows
        .iter()
        .filter(|row| row.chua_ra)
        .map(|row| row.dan.iter().copied().collect())
        .collect();
    if dans.is_empty() {
        return Levels::default();
    }
    levels_from_dans(&dans)
}

#[derive(Debug, Clone)]
pub struct LauRaDan {
    pub index: usize,
    pub value: String,
    pub dan: Vec<TwoDigitKey>,
    /// Ô rỗng : jours écoulés depuis la dernière sortie dans la colonne de comparaison
    pub empty_count: usize,
}

fn empty_count(i: usize, hits: &[Option<TwoDigitKey>]) -> usize {
    let valid = (i + 1).min(hits.len());
    match hits[..valid].iter().rposition(Option::is_some) {
        None => valid,
        Some(last) => (valid - 1 - last).saturating_sub(1),
    }
}

/// Toutes les dàn candidates, avant le filtre sur le seuil.
fn lau_ra_candidates<S: AsRef<str>>(
    results: &[S],
    reference: &[TwoDigitKey],
    params: &LauRaParams,
) -> Vec<LauRaDan> {
    let n = results.len();
    let mut out = Vec::new();

    for (i, value) in results.iter().take(params.days).enumerate() {
        if i > params.watch_limit {
            break;
        }
        let start = if i + params.window <= n {
            i
        } else {
            n.saturating_sub(params.window)
        };
        let end = (start + params.window).min(n);
        let levels = levels_from_sources(&results[start..end], 1..=params.window);
        let dan: Vec<TwoDigitKey> = {
            let mut keys: Vec<TwoDigitKey> = levels.iter().flat_map(|(_, ks)| ks.iter().copied()).collect();
            keys.sort();
            keys
        };
        if dan.is_empty() {
            continue;
        }

        let hits = comparison_hits(i, reference, params.check_range, |key| dan.binary_search(&key).is_ok());
        out.push(LauRaDan {
            index: i,
            value: value.as_ref().to_string(),
            empty_count: empty_count(i, &hits),
            dan,
        });
    }
    out
}

fn filter_threshold(candidates: &[LauRaDan], threshold: usize) -> Vec<LauRaDan> {
    candidates
        .iter()
        .filter(|c| c.empty_count >= threshold)
        .cloned()
        .collect()
}

pub fn lau_ra<S: AsRef<str>>(results: &[S], reference: &[TwoDigitKey], params: &LauRaParams) -> Vec<LauRaDan> {
    filter_threshold(&lau_ra_candidates(results, reference, params), params.threshold)
}

/// Comme [`lau_ra`], mais abaisse le seuil d'un cran à la fois (jusqu'à 1)
/// tant que rien n'est trouvé. Renvoie aussi le seuil retenu.
pub fn lau_ra_auto<S: AsRef<str>>(
    results: &[S],
    reference: &[TwoDigitKey],
    params: &LauRaParams,
) -> (Vec<LauRaDan>, usize) {
    let candidates = lau_ra_candidates(results, reference, params);
    let mut threshold = params.threshold;
    let mut found = filter_threshold(&candidates, threshold);
    while found.is_empty() && threshold > 1 {
        threshold -= 1;
        found = filter_threshold(&candidates, threshold);
    }
    if threshold != params.threshold {
        log::debug!("lâu ra : seuil abaissé de {} à {threshold}", params.threshold);
    }
    (found, threshold)
}

pub fn lau_ra_levels(dans: &[LauRaDan]) -> Levels {
    if dans.is_empty() {
        return Levels::default();
    }
    let lists: Vec<Vec<TwoDigitKey>> = dans.iter().map(|d| d.dan.clone()).collect();
    levels_from_dans(&lists)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRow {
    /// Décalage effectif dans l'historique
    pub offset: usize,
    /// Résultat de référence du jour `offset - 1`
    pub result: Option<TwoDigitKey>,
    pub level: Option<usize>,
    pub threshold: usize,
}

impl BacktestRow {
    pub fn is_hit(&self) -> bool {
        self.level.is_some()
    }
}

/// Recalcule les mức số lâu ra sur l'historique décalé de `offset` tirages et
/// cherche le niveau qui contient le résultat du jour suivant.
pub fn backtest_at<S: AsRef<str>>(
    results: &[S],
    reference: &[TwoDigitKey],
    params: &LauRaParams,
    offset: usize,
) -> BacktestRow {
    let window = |len: usize| offset.min(len)..(offset + params.days).min(len);
    let local_results = &results[window(results.len())];
    let local_reference = &reference[window(reference.len())];

    let (dans, threshold) = lau_ra_auto(local_results, local_reference, params);
    let levels = lau_ra_levels(&dans);
    let result = offset.checked_sub(1).and_then(|j| reference.get(j).copied());
    let level = result.and_then(|key| levels.level_of(key));

    BacktestRow {
        offset,
        result,
        level,
        threshold,
    }
}

/// Part des lignes dont le résultat tombe dans un niveau. `None` sans ligne.
pub fn hit_rate(rows: &[BacktestRow]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let hits = rows.iter().filter(|r| r.is_hit()).count();
    Some(hits as f64 / rows.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &str) -> TwoDigitKey {
        TwoDigitKey::parse(s).unwrap()
    }

    fn keys(values: &[&str]) -> Vec<TwoDigitKey> {
        values.iter().map(|s| k(s)).collect()
    }

    #[test]
    fn test_dan_nuoi_hits_on_following_days() {
        // jour 2 : dàn de "123" ; les références des jours 1 et 0 l'ont suivi
        let results = ["4567", "8888", "123"];
        let reference = keys(&["31", "90", "00"]);
        let rows = dan_nuoi(&results, &reference, &NuoiParams::default()).unwrap();
        assert_eq!(rows.len(), 3);

        let row = &rows[2];
        assert_eq!(row.dan.len(), 9);
        assert_eq!(row.hits[0], None);
        assert_eq!(row.hits[1], Some(k("31")));
        assert!(row.is_hit());
        assert!(!row.chua_ra);

        // le jour le plus récent n'a aucune référence postérieure
        assert!(rows[0].hits.iter().all(Option::is_none));
        assert!(rows[0].chua_ra);
        assert_eq!(rows[0].hits.len(), 21);
    }

    #[test]
    fn test_dan_nuoi_without_doubles() {
        let params = NuoiParams {
            include_doubles: false,
            ..NuoiParams::default()
        };
        let rows = dan_nuoi(&["1222"], &[], &params).unwrap();
        let dan: Vec<String> = rows[0].dan.iter().map(|k| k.to_string()).collect();
        assert_eq!(dan, vec!["12", "21"]);
    }

    #[test]
    fn test_dan_nuoi_watch_limit_and_days() {
        let results = vec!["12"; 40];
        let params = NuoiParams {
            days: 35,
            ..NuoiParams::default()
        };
        let rows = dan_nuoi(&results, &[], &params).unwrap();
        assert_eq!(rows.len(), 35);
        assert!(rows[28].chua_ra);
        assert!(!rows[29].chua_ra);
    }

    #[test]
    fn test_dan_nuoi_rejects_bad_value() {
        let err = dan_nuoi(&["12a"], &[], &NuoiParams::default()).unwrap_err();
        assert!(matches!(err, FeedError::BadCharset { .. }));
    }

    #[test]
    fn test_chua_ra_levels() {
        let results = ["12", "13"];
        let rows = dan_nuoi(&results, &[], &NuoiParams::default()).unwrap();
        let levels = chua_ra_levels(&rows);
        assert_eq!(levels.get(2), keys(&["11"]).as_slice());
        assert_eq!(levels.get(1), keys(&["12", "13", "21", "22", "31", "33"]).as_slice());
        assert_eq!(levels.get(0).len(), 93);
        assert!(chua_ra_levels(&[]).is_empty());
    }

    #[test]
    fn test_empty_count() {
        fn h(v: &[Option<u8>]) -> Vec<Option<TwoDigitKey>> {
            v.iter().map(|o| o.map(|n| TwoDigitKey::new(n).unwrap())).collect()
        }
        // aucune sortie : toute la plage valide
        assert_eq!(empty_count(5, &h(&[None; 28])), 6);
        // plage bornée par la longueur de la colonne
        assert_eq!(empty_count(40, &h(&[None; 28])), 28);
        let mut hits = vec![None; 28];
        hits[1] = Some(12);
        // valid = 6, dernière sortie en 1 : (6 - 1 - 1) - 1
        assert_eq!(empty_count(5, &h(&hits)), 3);
        hits[5] = Some(12);
        assert_eq!(empty_count(5, &h(&hits)), 0);
        // une sortie au-delà de la plage valide est ignorée
        let mut hits = vec![None; 28];
        hits[10] = Some(1);
        assert_eq!(empty_count(3, &h(&hits)), 4);
    }

    #[test]
    fn test_lau_ra_window_dan() {
        let results = ["12", "34"];
        let params = LauRaParams {
            threshold: 0,
            ..LauRaParams::default()
        };
        let found = lau_ra(&results, &[], &params);
        assert_eq!(found.len(), 2);
        // fenêtre recadrée sur tout l'historique quand il est plus court
        assert_eq!(found[0].dan, keys(&["12", "34"]));
        assert_eq!(found[1].dan, keys(&["12", "34"]));
        assert_eq!(found[0].empty_count, 1);
        assert_eq!(found[1].empty_count, 2);
    }

    #[test]
    fn test_lau_ra_threshold_filters() {
        let results = vec!["4512"; 10];
        let params = LauRaParams {
            threshold: 5,
            ..LauRaParams::default()
        };
        let found = lau_ra(&results, &[], &params);
        // ô rỗng = i + 1
        assert_eq!(found.iter().map(|d| d.index).collect::<Vec<_>>(), vec![4, 5, 6, 7, 8, 9]);
        assert!(found.iter().all(|d| d.empty_count >= 5));
    }

    #[test]
    fn test_lau_ra_excludes_over_window_counts() {
        // "11" apparaît 8 fois dans la fenêtre de 7 et sort du dàn
        let results = ["1111", "1111", "1111", "1111"];
        let params = LauRaParams {
            threshold: 0,
            ..LauRaParams::default()
        };
        let found = lau_ra(&results, &[], &params);
        assert!(found.is_empty());
    }

    #[test]
    fn test_lau_ra_auto_reduces_threshold() {
        let results = ["12", "34", "56"];
        let params = LauRaParams {
            threshold: 9,
            ..LauRaParams::default()
        };
        assert!(lau_ra(&results, &[], &params).is_empty());
        let (found, used) = lau_ra_auto(&results, &[], &params);
        assert_eq!(used, 3);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 2);
    }

    #[test]
    fn test_lau_ra_auto_keeps_threshold_when_found() {
        let results = vec!["4512"; 10];
        let (found, used) = lau_ra_auto(&results, &[], &LauRaParams::default());
        assert_eq!(used, 4);
        assert_eq!(found.len(), 7);
    }

    #[test]
    fn test_lau_ra_auto_stops_at_one() {
        let (found, used) = lau_ra_auto(&[] as &[&str], &[], &LauRaParams::default());
        assert!(found.is_empty());
        assert_eq!(used, 1);
    }

    fn backtest(results: &[&str], reference: &[TwoDigitKey], offset: usize, days: usize) -> Vec<BacktestRow> {
        (1..=days)
            .map(|i| backtest_at(results, reference, &LauRaParams::default(), offset + i))
            .collect()
    }

    #[test]
    fn test_backtest_finds_levels() {
        let results = vec!["4512"; 20];
        let reference = vec![k("45"); 20];
        let rows = backtest(&results, &reference, 0, 3);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].offset, 1);
        assert_eq!(rows[0].result, Some(k("45")));
        assert!(rows.iter().all(|r| r.level.is_some()));
        assert_eq!(hit_rate(&rows), Some(1.0));
    }

    #[test]
    fn test_backtest_past_history_end() {
        let rows = backtest(&["12"], &keys(&["12"]), 5, 2);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.result.is_none() && r.level.is_none()));
        assert_eq!(hit_rate(&rows), Some(0.0));
        assert_eq!(hit_rate(&[]), None);
    }
}
