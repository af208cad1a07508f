use std::collections::BTreeSet;

use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use sieuga_engine::levels::Levels;
use sieuga_engine::nuoi::{LauRaDan, NuoiRow};
use sieuga_engine::stats::{Bucket, BucketStats, CycleStats, Extractor};
use sieuga_engine::tables::{self, Scheme};
use sieuga_feed::models::{join_keys, DrawRecord, FeedKind, TwoDigitKey};

use crate::{BacktestLine, BetDay};

/// Au-delà, les listes de nombres sont coupées à l'affichage.
const MAX_INLINE_KEYS: usize = 20;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn class_cell(scheme: Scheme, key: Option<TwoDigitKey>) -> String {
    key.and_then(|k| tables::classify(scheme, k))
        .map(|c| c.label().to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn short_list(keys: &[TwoDigitKey]) -> String {
    if keys.len() > MAX_INLINE_KEYS {
        format!("{}...", join_keys(&keys[..MAX_INLINE_KEYS], ", "))
    } else {
        join_keys(keys, ", ")
    }
}

fn digits_str(digits: &BTreeSet<u8>) -> String {
    if digits.is_empty() {
        return "-".to_string();
    }
    digits.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(" ")
}

pub fn display_records(kind: FeedKind, records: &[DrawRecord]) {
    if records.is_empty() {
        println!("Aucun tirage {kind} à afficher.");
        return;
    }

    println!("\n── {kind} ──");
    let mut table = new_table(vec!["Ngày", "Kết quả", "Đuôi", "Bộ", "Kép"]);
    for record in records {
        let tail = record.tail().ok();
        table.add_row(vec![
            record.date.clone(),
            record.value.clone(),
            tail.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string()),
            class_cell(Scheme::Bo, tail),
            class_cell(Scheme::Kep, tail),
        ]);
    }
    println!("{table}");
}

pub fn display_classification(key: TwoDigitKey) {
    let mut table = new_table(vec!["Schéma", "Classe", "Dàn"]);
    for scheme in Scheme::ALL {
        let class = tables::classify(scheme, key);
        table.add_row(vec![
            scheme.name().to_string(),
            class.map(|c| c.label().to_string()).unwrap_or_else(|| "-".to_string()),
            class.map(|c| join_keys(c.members(), ",")).unwrap_or_default(),
        ]);
    }
    println!("\nClassement de {key}\n");
    println!("{table}");
}

pub fn display_members(scheme: Scheme, label: &str, members: &[TwoDigitKey]) {
    println!("{} {label} ({} số) : {}", scheme.name(), members.len(), join_keys(members, ","));
}

pub fn display_bet_days(kind: FeedKind, days: &[BetDay]) {
    if days.is_empty() {
        println!("Pas assez de tirages {kind} pour comparer deux jours.");
        return;
    }

    println!("\n🔁 Bệt sur {kind}\n");
    let mut table = new_table(vec!["Ngày", "Hôm nay", "Hôm trước", "Chạm bệt", "Dàn chạm", "Nhị hợp"]);
    for day in days {
        let found = Cell::new(digits_str(&day.found));
        let found = if day.found.is_empty() { found } else { found.fg(Color::Green) };
        let nhi_hop: Vec<TwoDigitKey> = day.nhi_hop.iter().copied().collect();
        table.add_row(vec![
            Cell::new(&day.date),
            Cell::new(&day.today),
            Cell::new(&day.previous),
            found,
            Cell::new(day.dan_cham_len),
            Cell::new(short_list(&nhi_hop)),
        ]);
    }
    println!("{table}");
}

pub fn display_pairs(value: &str, with: &BTreeSet<TwoDigitKey>, without: &BTreeSet<TwoDigitKey>) {
    let with: Vec<TwoDigitKey> = with.iter().copied().collect();
    let without: Vec<TwoDigitKey> = without.iter().copied().collect();
    println!("Paires de {value}");
    println!("  avec kép ({:>2}) : {}", with.len(), join_keys(&with, ","));
    println!("  sans kép ({:>2}) : {}", without.len(), join_keys(&without, ","));
}

pub fn display_frequency(extractor: Extractor, freq: &[(Bucket, usize)], window: usize) {
    println!("\n📊 {} les plus fréquents sur {window} tirages\n", extractor.name());
    let mut table = new_table(vec!["Valeur", "Fréquence", "Part"]);
    for (bucket, count) in freq {
        let share = if window > 0 { *count as f64 / window as f64 } else { 0.0 };
        table.add_row(vec![
            bucket.to_string(),
            count.to_string(),
            format!("{:.1} %", share * 100.0),
        ]);
    }
    println!("{table}");
}

pub fn display_bucket_stats(extractor: Extractor, stats: &[BucketStats], window: usize) {
    println!("\n── {} : fréquence et gan ──", extractor.name());
    let mut table = new_table(vec!["Valeur", "Fréquence", "Gan"]);

    let mut sorted = stats.to_vec();
    sorted.sort_by(|a, b| b.frequency.cmp(&a.frequency));

    for stat in &sorted {
        let color = if stat.gap == 0 {
            Color::Green
        } else if stat.gap >= window {
            Color::Red
        } else {
            Color::White
        };
        table.add_row(vec![
            Cell::new(stat.bucket.to_string()),
            Cell::new(stat.frequency),
            Cell::new(stat.gap).fg(color),
        ]);
    }
    println!("{table}");
}

/// Classes les plus en retard, avec leur dàn.
pub fn display_stale(title: &str, entries: &[(Bucket, usize)], extractor: Extractor) {
    println!("\n── {title} ──");
    if entries.is_empty() {
        println!("  (aucune)");
        return;
    }
    let mut table = new_table(vec!["Classe", "Lâu ra", "Dàn"]);
    for (bucket, lag) in entries {
        table.add_row(vec![
            bucket.to_string(),
            format!("{lag} ngày"),
            join_keys(&extractor.members(*bucket), ","),
        ]);
    }
    println!("{table}");
}

pub fn display_cycle(target: &str, stats: &CycleStats) {
    println!("\n🔄 Chu kỳ de {target}\n");
    let gaps = if stats.gaps.is_empty() {
        "-".to_string()
    } else {
        stats.gaps.iter().map(|g| g.to_string()).collect::<Vec<_>>().join(" ")
    };

    let mut table = new_table(vec!["Mesure", "Valeur"]);
    table.add_row(vec!["Apparitions".to_string(), stats.occurrences.to_string()]);
    table.add_row(vec!["Écarts".to_string(), gaps]);
    table.add_row(vec![
        "Écart moyen".to_string(),
        stats.avg_gap.map(|g| format!("{g:.2}")).unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Dernière sortie".to_string(),
        stats
            .last_seen_index
            .map(|i| format!("il y a {i} tirage(s)"))
            .unwrap_or_else(|| "jamais".to_string()),
    ]);
    table.add_row(vec!["Indice extrapolé".to_string(), stats.predicted_next_index.to_string()]);
    println!("{table}");
    println!("L'indice extrapolé est une simple extrapolation linéaire, pas une prévision.");
}

pub fn display_nuoi(rows: &[NuoiRow], dates: &[String], show_hits: usize) {
    if rows.is_empty() {
        println!("Aucune dàn nuôi à afficher.");
        return;
    }

    let mut table = new_table(vec!["Ngày", "KQ", "Dàn nuôi", "Hit", "K1-K5"]);
    for row in rows {
        let hit = if row.is_hit() {
            Cell::new("✅").fg(Color::Green)
        } else {
            Cell::new("❌").fg(Color::Red)
        };
        let dan: Vec<TwoDigitKey> = row.dan.iter().copied().collect();
        let first_hits = row
            .hits
            .iter()
            .take(show_hits)
            .map(|h| h.map(|k| k.to_string()).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" | ");
        table.add_row(vec![
            Cell::new(dates.get(row.index).map(String::as_str).unwrap_or("")),
            Cell::new(&row.value),
            Cell::new(join_keys(&dan, " ")),
            hit,
            Cell::new(first_hits),
        ]);
    }
    println!("{table}");
}

pub fn display_levels(title: &str, levels: &Levels, max_levels: usize) {
    if levels.is_empty() {
        return;
    }
    println!("\n📊 {title}");
    for (level, keys) in levels.iter_desc().take(max_levels) {
        if keys.is_empty() {
            continue;
        }
        println!("  Mức {level} : {} số ({})", keys.len(), short_list(keys));
    }
}

pub fn display_lau_ra(kind: FeedKind, dans: &[LauRaDan], used: usize, requested: usize) {
    println!("\n── Lâu ra {kind} ──");
    if used != requested {
        println!("⚠️  Seuil abaissé automatiquement à {used} ô rỗng (demandé : {requested})");
    }
    if dans.is_empty() {
        println!("Không có dàn lâu ra");
        return;
    }
    let mut table = new_table(vec!["KQ", "Ô rỗng", "Dàn"]);
    for dan in dans {
        table.add_row(vec![
            dan.value.clone(),
            dan.empty_count.to_string(),
            join_keys(&dan.dan, " "),
        ]);
    }
    println!("{table}");
}

pub fn display_selection(title: &str, keys: &[TwoDigitKey]) {
    println!("\n{title} : {} số", keys.len());
    if !keys.is_empty() {
        println!("{}", join_keys(keys, ","));
    }
}

pub fn display_backtest(compare: FeedKind, lines: &[BacktestLine], rates: &[(FeedKind, Option<f64>)]) {
    println!("\n📊 Test ngược sur {} jours\n", lines.len());

    let mut table = new_table(vec!["Lùi", "Ngày KQ", compare.label(), "TT Mức", "ĐT Mức"]);
    let level_cell = |level: Option<usize>| match level {
        Some(l) => Cell::new(format!("M{l}")).fg(Color::Green),
        None => Cell::new("-"),
    };
    for line in lines {
        table.add_row(vec![
            Cell::new(&line.label),
            Cell::new(&line.date),
            Cell::new(line.result.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string())),
            level_cell(line.than_tai),
            level_cell(line.dien_toan),
        ]);
    }
    println!("{table}");

    for (kind, rate) in rates {
        match rate {
            Some(r) => println!("Taux de présence {kind} : {:.1} %", r * 100.0),
            None => println!("Taux de présence {kind} : -"),
        }
    }
}
