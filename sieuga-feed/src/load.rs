use std::io::Read;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::align::parse_draw_date;
use crate::error::FeedError;
use crate::models::{validate_value, DrawRecord, FeedKind};

/// Cellules vides des tableaux exportés (semaines incomplètes).
const PLACEHOLDERS: &[&str] = &["-----", "\u{a0}"];

fn parse_record(record: &csv::StringRecord, kind: FeedKind) -> Result<DrawRecord, FeedError> {
    let date = record.get(0).map(|s| s.trim().to_string()).unwrap_or_default();

    // DienToan : soit "123" dans une seule colonne, soit trois colonnes n1,n2,n3
    let raw: String = record
        .iter()
        .skip(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let value = validate_value(&raw, kind)?;
    Ok(DrawRecord { date, value })
}

fn is_placeholder(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .skip(1)
        .map(str::trim)
        .all(|s| s.is_empty() || PLACEHOLDERS.contains(&s))
}

#[derive(Debug, Default)]
pub struct FeedLoad {
    pub records: Vec<DrawRecord>,
    pub total_rows: u32,
    pub skipped: u32,
    pub errors: u32,
}

/// Lit un flux CSV (en-tête obligatoire, `date` en première colonne).
/// Les lignes invalides sont journalisées et comptées, pas fatales.
pub fn read_feed<R: Read>(reader: R, kind: FeedKind) -> Result<FeedLoad, FeedError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    reader.headers()?;

    let mut result = FeedLoad::default();

    for record_result in reader.records() {
        result.total_rows += 1;
        let record = match record_result {
            Ok(record) => record,
            Err(e) => {
                log::warn!("{kind} : ligne {} illisible : {e}", result.total_rows);
                result.errors += 1;
                continue;
            }
        };

        if is_placeholder(&record) {
            result.skipped += 1;
            continue;
        }

        match parse_record(&record, kind) {
            Ok(draw) => result.records.push(draw),
            Err(e) => {
                let line = record.position().map(|p| p.line()).unwrap_or(result.total_rows as u64);
                let err = FeedError::Row {
                    kind,
                    line,
                    source: Box::new(e),
                };
                log::warn!("{err}");
                result.errors += 1;
            }
        }
    }

    warn_if_unordered(&result.records, kind);
    Ok(result)
}

pub fn load_feed_csv(path: &Path, kind: FeedKind) -> Result<FeedLoad, FeedError> {
    let file = std::fs::File::open(path).map_err(|source| FeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let load = read_feed(file, kind)?;
    log::info!(
        "{kind} : {} tirages chargés depuis {:?} ({} ignorés, {} erreurs)",
        load.records.len(),
        path,
        load.skipped,
        load.errors
    );
    Ok(load)
}

/// Vérifie l'ordre "plus récent d'abord" sans le corriger.
fn warn_if_unordered(records: &[DrawRecord], kind: FeedKind) {
    let dates: Vec<_> = records.iter().filter_map(|r| parse_draw_date(&r.date)).collect();
    if let Some(pos) = dates.windows(2).position(|w| w[0] <= w[1]) {
        log::warn!(
            "{kind} : ordre chronologique rompu vers {} / {} (attendu : plus récent d'abord)",
            dates[pos],
            dates[pos + 1]
        );
    }
}

#[derive(Debug, Clone)]
pub struct FeedSource {
    pub kind: FeedKind,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct FeedSet {
    pub dien_toan: Vec<DrawRecord>,
    pub than_tai: Vec<DrawRecord>,
    pub dac_biet: Vec<DrawRecord>,
    pub giai_nhat: Vec<DrawRecord>,
}

impl FeedSet {
    pub fn get(&self, kind: FeedKind) -> &[DrawRecord] {
        match kind {
            FeedKind::DienToan => &self.dien_toan,
            FeedKind::ThanTai => &self.than_tai,
            FeedKind::DacBiet => &self.dac_biet,
            FeedKind::GiaiNhat => &self.giai_nhat,
        }
    }

    fn slot(&mut self, kind: FeedKind) -> &mut Vec<DrawRecord> {
        match kind {
            FeedKind::DienToan => &mut self.dien_toan,
            FeedKind::ThanTai => &mut self.than_tai,
            FeedKind::DacBiet => &mut self.dac_biet,
            FeedKind::GiaiNhat => &mut self.giai_nhat,
        }
    }

    /// Tronque chaque flux aux `limit` tirages les plus récents.
    pub fn truncate(&mut self, limit: usize) {
        for kind in FeedKind::ALL {
            self.slot(kind).truncate(limit);
        }
    }

    pub fn is_empty(&self) -> bool {
        FeedKind::ALL.iter().all(|k| self.get(*k).is_empty())
    }
}

/// Charge les flux en parallèle et attend la fin de tous les chargements.
/// Un flux en échec devient une séquence vide.
pub fn load_feeds(sources: &[FeedSource]) -> FeedSet {
    let loaded: Vec<(FeedKind, Vec<DrawRecord>)> = sources
        .par_iter()
        .map(|source| match load_feed_csv(&source.path, source.kind) {
            Ok(load) => (source.kind, load.records),
            Err(e) => {
                log::warn!("{} indisponible : {e}", source.kind);
                (source.kind, Vec::new())
            }
        })
        .collect();

    let mut set = FeedSet::default();
    for (kind, records) in loaded {
        *set.slot(kind) = records;
    }
    set
}
