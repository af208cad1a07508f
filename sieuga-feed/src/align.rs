use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::error::FeedError;
use crate::models::{DrawRecord, TwoDigitKey};

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

/// Extrait la date d'un libellé d'affichage ("Thứ 2, 15/07/2024", "Ngày 15/07/2024", "2024-07-15").
pub fn parse_draw_date(display: &str) -> Option<NaiveDate> {
    display
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .find_map(|token| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(token, fmt).ok())
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedDay {
    pub date: NaiveDate,
    /// Libellé du flux principal
    pub display: String,
    pub primary: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default)]
pub struct Alignment {
    /// Plus récent d'abord
    pub days: Vec<AlignedDay>,
    pub missing_in_primary: Vec<NaiveDate>,
    pub missing_in_reference: Vec<NaiveDate>,
    pub unparsed: usize,
}

impl Alignment {
    pub fn is_consistent(&self) -> bool {
        self.missing_in_primary.is_empty() && self.missing_in_reference.is_empty()
    }

    pub fn primary_values(&self) -> Vec<String> {
        self.days.iter().map(|d| d.primary.clone()).collect()
    }

    pub fn reference_tails(&self) -> Result<Vec<TwoDigitKey>, FeedError> {
        self.days.iter().map(|d| TwoDigitKey::from_tail(&d.reference)).collect()
    }

    pub fn dates(&self) -> Vec<String> {
        self.days.iter().map(|d| d.display.clone()).collect()
    }

    pub fn date_set(&self) -> BTreeSet<NaiveDate> {
        self.days.iter().map(|d| d.date).collect()
    }

    /// Ne garde que les jours dont la date figure dans `keep`. Renvoie le nombre de jours écartés.
    pub fn retain_dates(&mut self, keep: &BTreeSet<NaiveDate>) -> usize {
        let before = self.days.len();
        self.days.retain(|d| keep.contains(&d.date));
        before - self.days.len()
    }
}

fn index_by_date<'a>(
    records: &'a [DrawRecord],
    unparsed: &mut usize,
) -> BTreeMap<NaiveDate, &'a DrawRecord> {
    let mut map = BTreeMap::new();
    for record in records {
        match parse_draw_date(&record.date) {
            Some(date) => {
                if map.contains_key(&date) {
                    log::warn!("date en double ignorée : {date}");
                } else {
                    map.insert(date, record);
                }
            }
            None => *unparsed += 1,
        }
    }
    map
}

/// Jointure explicite par date entre un flux principal et un flux de référence.
/// Seules les dates présentes des deux côtés sont conservées ; les autres sont listées.
pub fn align_by_date(primary: &[DrawRecord], reference: &[DrawRecord]) -> Alignment {
    let mut unparsed = 0;
    let primary_by_date = index_by_date(primary, &mut unparsed);
    let reference_by_date = index_by_date(reference, &mut unparsed);

    let mut alignment = Alignment {
        unparsed,
        ..Alignment::default()
    };

    for (date, record) in primary_by_date.iter().rev() {
        match reference_by_date.get(date) {
            Some(reference) => alignment.days.push(AlignedDay {
                date: *date,
                display: record.date.clone(),
                primary: record.value.clone(),
                reference: reference.value.clone(),
            }),
            None => alignment.missing_in_reference.push(*date),
        }
    }

    alignment.missing_in_primary = reference_by_date
        .keys()
        .rev()
        .filter(|d| !primary_by_date.contains_key(d))
        .copied()
        .collect();

    if !alignment.is_consistent() {
        log::warn!(
            "flux désalignés : {} dates absentes du flux principal, {} absentes de la référence",
            alignment.missing_in_primary.len(),
            alignment.missing_in_reference.len()
        );
    }
    if alignment.unparsed > 0 {
        log::warn!("{} tirages sans date exploitable écartés", alignment.unparsed);
    }

    alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_draw_date() {
        assert_eq!(parse_draw_date("Thứ 2, 15/07/2024"), Some(d(2024, 7, 15)));
        assert_eq!(parse_draw_date("Ngày 01/01/2025"), Some(d(2025, 1, 1)));
        assert_eq!(parse_draw_date("2024-07-15"), Some(d(2024, 7, 15)));
        assert_eq!(parse_draw_date("15-07-2024"), Some(d(2024, 7, 15)));
        assert_eq!(parse_draw_date("hier"), None);
        assert_eq!(parse_draw_date(""), None);
    }

    #[test]
    fn test_align_same_dates() {
        let primary = vec![
            DrawRecord::new("17/07/2024", "1111"),
            DrawRecord::new("16/07/2024", "2222"),
        ];
        let reference = vec![
            DrawRecord::new("Ngày 17/07/2024", "12345"),
            DrawRecord::new("Ngày 16/07/2024", "67890"),
        ];
        let a = align_by_date(&primary, &reference);
        assert!(a.is_consistent());
        assert_eq!(a.days.len(), 2);
        assert_eq!(a.days[0].primary, "1111");
        assert_eq!(a.days[0].reference, "12345");
        assert_eq!(a.days[0].display, "17/07/2024");
        assert_eq!(a.primary_values(), vec!["1111", "2222"]);
        let tails: Vec<String> = a.reference_tails().unwrap().iter().map(|k| k.to_string()).collect();
        assert_eq!(tails, vec!["45", "90"]);
    }

    #[test]
    fn test_align_reports_gaps_instead_of_shifting() {
        let primary = vec![
            DrawRecord::new("18/07/2024", "1111"),
            DrawRecord::new("17/07/2024", "2222"),
            DrawRecord::new("16/07/2024", "3333"),
        ];
        // la référence n'a pas le 17
        let reference = vec![
            DrawRecord::new("18/07/2024", "00011"),
            DrawRecord::new("16/07/2024", "00033"),
            DrawRecord::new("15/07/2024", "00044"),
        ];
        let a = align_by_date(&primary, &reference);
        assert!(!a.is_consistent());
        assert_eq!(a.days.len(), 2);
        assert_eq!(a.days[1].primary, "3333");
        assert_eq!(a.days[1].reference, "00033");
        assert_eq!(a.missing_in_reference, vec![d(2024, 7, 17)]);
        assert_eq!(a.missing_in_primary, vec![d(2024, 7, 15)]);
    }

    #[test]
    fn test_align_counts_unparsed_dates() {
        let primary = vec![DrawRecord::new("???", "1111"), DrawRecord::new("16/07/2024", "2222")];
        let reference = vec![DrawRecord::new("16/07/2024", "00033")];
        let a = align_by_date(&primary, &reference);
        assert_eq!(a.unparsed, 1);
        assert_eq!(a.days.len(), 1);
    }

    #[test]
    fn test_align_empty() {
        let a = align_by_date(&[], &[]);
        assert!(a.days.is_empty());
        assert!(a.is_consistent());
    }

    #[test]
    fn test_retain_dates_restricts_to_shared_days() {
        let reference = vec![
            DrawRecord::new("18/07/2024", "00011"),
            DrawRecord::new("17/07/2024", "00022"),
            DrawRecord::new("16/07/2024", "00033"),
        ];
        let than_tai = vec![
            DrawRecord::new("18/07/2024", "1111"),
            DrawRecord::new("17/07/2024", "2222"),
            DrawRecord::new("16/07/2024", "3333"),
        ];
        // Điện Toán n'a pas le 17
        let dien_toan = vec![DrawRecord::new("18/07/2024", "123"), DrawRecord::new("16/07/2024", "456")];

        let mut tt = align_by_date(&than_tai, &reference);
        let mut dt = align_by_date(&dien_toan, &reference);
        let shared: BTreeSet<NaiveDate> = tt.date_set().intersection(&dt.date_set()).copied().collect();

        assert_eq!(tt.retain_dates(&shared), 1);
        assert_eq!(dt.retain_dates(&shared), 0);
        assert_eq!(tt.primary_values(), vec!["1111", "3333"]);
        assert_eq!(tt.reference_tails().unwrap(), dt.reference_tails().unwrap());
        assert_eq!(tt.date_set(), dt.date_set());
    }
}
