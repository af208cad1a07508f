mod config;
mod display;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use sieuga_engine::bet::{dan_cham, find_bet_digits_multi, nhi_hop, tail_digits, BetMode};
use sieuga_engine::levels::levels_from_dans;
use sieuga_engine::nuoi::{backtest_at, chua_ra_levels, dan_nuoi, hit_rate, lau_ra_auto, BacktestRow};
use sieuga_engine::pairs::{containing, pairs_with_repetition, pairs_without_repetition};
use sieuga_engine::stats::{bucket_stats, cycle, frequency, top_stale, Bucket, Extractor};
use sieuga_engine::tables::{self, Scheme};
use sieuga_feed::align::{align_by_date, Alignment};
use sieuga_feed::load::{load_feeds, FeedSet};
use sieuga_feed::models::{parse_digits, DrawRecord, FeedKind, TwoDigitKey};

use crate::config::{AnalysisConfig, DEFAULT_CONFIG_PATH};

/// Ce que l'on extrait de chaque nombre pour les statistiques.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum By {
    #[value(name = "so")]
    Number,
    #[value(name = "dau")]
    Head,
    #[value(name = "duoi")]
    Tail,
    Bo,
    Kep,
    Zodiac,
    Hieu,
    Tong,
}

impl By {
    fn extractor(self) -> Extractor {
        match self {
            By::Number => Extractor::Identity,
            By::Head => Extractor::Head,
            By::Tail => Extractor::Tail,
            By::Bo => Extractor::Class(Scheme::Bo),
            By::Kep => Extractor::Class(Scheme::Kep),
            By::Zodiac => Extractor::Class(Scheme::Zodiac),
            By::Hieu => Extractor::Class(Scheme::Hieu),
            By::Tong => Extractor::Class(Scheme::Tong),
        }
    }
}

#[derive(Parser)]
#[command(name = "sieuga", about = "Analyse des fréquences et motifs des loteries du Nord du Vietnam")]
struct Cli {
    /// Fichier de configuration JSON
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lister les derniers tirages d'un flux
    List {
        /// Flux à afficher
        #[arg(short, long, default_value = "tt")]
        feed: FeedKind,
        /// Nombre de tirages affichés
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Classer un nombre à deux chiffres dans tous les schémas
    Classify {
        /// Nombre à deux chiffres (ex : 05)
        key: String,
    },

    /// Afficher la dàn d'une classe
    Members {
        /// Schéma de classement
        scheme: Scheme,
        /// Libellé de la classe (ex : 05 pour un bộ, 2 pour un tổng)
        label: String,
    },

    /// Chạm bệt entre deux tirages consécutifs
    Bet {
        /// Flux étudié (par défaut le flux de résultat configuré)
        #[arg(short, long)]
        feed: Option<FeedKind>,
        /// Modes de comparaison, séparés par des virgules (par défaut ceux de la configuration)
        #[arg(short, long, value_delimiter = ',')]
        modes: Vec<BetMode>,
        /// Nombre de jours comparés
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Paires ordonnées formées avec les chiffres d'une valeur
    Pairs {
        /// Valeur dont on prend les chiffres
        value: String,
        /// Ne garder que les paires contenant ce chiffre
        #[arg(short, long)]
        digit: Option<u8>,
    },

    /// Fréquences, gan et classes lâu ra sur le flux de référence
    Stats {
        /// Flux de référence : gdb ou g1
        #[arg(long)]
        compare: Option<FeedKind>,
        /// Extraction : so, dau, duoi ou un schéma (par défaut le schéma configuré)
        #[arg(short, long)]
        by: Option<By>,
        /// Nombre d'entrées par classement
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Chu kỳ d'un nombre ou d'une classe
    Cycle {
        /// Nombre (ex : 05), chiffre ou libellé de classe selon --by
        target: String,
        /// Extraction : so, dau, duoi ou un schéma (par défaut le schéma configuré)
        #[arg(short, long)]
        by: Option<By>,
        /// Flux de référence : gdb ou g1
        #[arg(long)]
        compare: Option<FeedKind>,
    },

    /// Dàn nuôi et mức số des dàn chưa ra
    Nuoi {
        /// Flux de résultat : tt ou dt
        #[arg(short, long)]
        result: Option<FeedKind>,
        /// Flux de référence : gdb ou g1
        #[arg(long)]
        compare: Option<FeedKind>,
        /// Tirages récents ignorés avant l'analyse
        #[arg(short, long)]
        offset: Option<usize>,
        /// Exclure les kép de la dàn
        #[arg(long)]
        no_doubles: bool,
    },

    /// Dàn lâu ra Thần Tài et Điện Toán, avec mức số
    LauRa {
        /// Flux de référence : gdb ou g1
        #[arg(long)]
        compare: Option<FeedKind>,
        /// Tirages récents ignorés avant l'analyse
        #[arg(short, long)]
        offset: Option<usize>,
        /// Seuil d'ô rỗng pour Thần Tài
        #[arg(long)]
        threshold_tt: Option<usize>,
        /// Seuil d'ô rỗng pour Điện Toán
        #[arg(long)]
        threshold_dt: Option<usize>,
        /// Niveaux retenus : mức 0 à N
        #[arg(short, long, default_value = "2")]
        select: usize,
    },

    /// Test ngược des mức số lâu ra
    Backtest {
        /// Flux de référence : gdb ou g1
        #[arg(long)]
        compare: Option<FeedKind>,
        /// Décalage de départ, en tirages
        #[arg(short, long)]
        offset: Option<usize>,
        /// Nombre de jours rejoués
        #[arg(short, long)]
        days: Option<usize>,
    },

    /// Gérer le fichier de configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Afficher la configuration effective
    Show,
    /// Écrire la configuration par défaut
    Init {
        /// Écraser un fichier existant
        #[arg(long)]
        force: bool,
    },
}

/// Une ligne de la commande `bet`.
pub struct BetDay {
    pub date: String,
    pub today: String,
    pub previous: String,
    pub found: BTreeSet<u8>,
    pub dan_cham_len: usize,
    pub nhi_hop: BTreeSet<TwoDigitKey>,
}

/// Une ligne du test ngược, Thần Tài et Điện Toán réunis.
pub struct BacktestLine {
    pub label: String,
    pub date: String,
    pub result: Option<TwoDigitKey>,
    pub than_tai: Option<usize>,
    pub dien_toan: Option<usize>,
}

/// Flux de résultat et de référence joints par date, décalage appliqué.
struct Series {
    dates: Vec<String>,
    results: Vec<String>,
    reference: Vec<TwoDigitKey>,
}

impl Series {
    fn from_alignment(alignment: &Alignment, compare: FeedKind, offset: usize) -> Result<Series> {
        let reference = alignment
            .reference_tails()
            .with_context(|| format!("Flux {compare} illisible"))?;
        let skip = offset.min(alignment.days.len());
        Ok(Series {
            dates: alignment.dates().split_off(skip),
            results: alignment.primary_values().split_off(skip),
            reference: reference[skip..].to_vec(),
        })
    }

    fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let mut config = AnalysisConfig::load(&cli.config)?;

    match cli.command {
        Command::List { feed, last } => {
            let feeds = load(&config);
            let records = feeds.get(feed);
            display::display_records(feed, &records[..last.min(records.len())]);
            Ok(())
        }
        Command::Classify { key } => {
            let key = TwoDigitKey::parse(&key).with_context(|| format!("Nombre invalide : {key}"))?;
            display::display_classification(key);
            Ok(())
        }
        Command::Members { scheme, label } => {
            let Some(members) = tables::class_members(scheme, &label) else {
                bail!("Classe inconnue pour {scheme} : {label}");
            };
            display::display_members(scheme, &label, &members);
            Ok(())
        }
        Command::Bet { feed, modes, last } => {
            if !modes.is_empty() {
                config.bet_modes = modes;
            }
            cmd_bet(&config, feed.unwrap_or(config.result), last)
        }
        Command::Pairs { value, digit } => cmd_pairs(&value, digit),
        Command::Stats { compare, by, top } => {
            if let Some(compare) = compare {
                config.compare = compare;
            }
            let extractor = config.extractor(by.map(By::extractor));
            cmd_stats(&config, extractor, top)
        }
        Command::Cycle { target, by, compare } => {
            if let Some(compare) = compare {
                config.compare = compare;
            }
            let extractor = config.extractor(by.map(By::extractor));
            cmd_cycle(&config, &target, extractor)
        }
        Command::Nuoi {
            result,
            compare,
            offset,
            no_doubles,
        } => {
            config.result = result.unwrap_or(config.result);
            config.compare = compare.unwrap_or(config.compare);
            config.offset = offset.unwrap_or(config.offset);
            if no_doubles {
                config.nuoi.include_doubles = false;
            }
            config.validate()?;
            cmd_nuoi(&config)
        }
        Command::LauRa {
            compare,
            offset,
            threshold_tt,
            threshold_dt,
            select,
        } => {
            config.compare = compare.unwrap_or(config.compare);
            config.offset = offset.unwrap_or(config.offset);
            config.thresholds.than_tai = threshold_tt.unwrap_or(config.thresholds.than_tai);
            config.thresholds.dien_toan = threshold_dt.unwrap_or(config.thresholds.dien_toan);
            config.validate()?;
            cmd_lau_ra(&config, select)
        }
        Command::Backtest { compare, offset, days } => {
            config.compare = compare.unwrap_or(config.compare);
            config.offset = offset.unwrap_or(config.offset);
            config.backtest_days = days.unwrap_or(config.backtest_days);
            config.validate()?;
            cmd_backtest(&config)
        }
        Command::Config { action } => cmd_config(&config, &cli.config, action),
    }
}

fn load(config: &AnalysisConfig) -> FeedSet {
    let mut feeds = load_feeds(&config.feeds.sources());
    feeds.truncate(config.window);
    feeds
}

fn reference_tails(feeds: &FeedSet, compare: FeedKind) -> Result<Vec<TwoDigitKey>> {
    feeds
        .get(compare)
        .iter()
        .map(|r| r.tail())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Flux {compare} illisible"))
}

fn series(feeds: &FeedSet, result: FeedKind, compare: FeedKind, offset: usize) -> Result<Series> {
    let alignment = align_by_date(feeds.get(result), feeds.get(compare));
    Series::from_alignment(&alignment, compare, offset)
}

/// Séries Thần Tài et Điện Toán restreintes aux dates présentes dans les trois flux,
/// pour que chaque ligne du test ngược parle du même jour.
fn shared_series(
    than_tai: &[DrawRecord],
    dien_toan: &[DrawRecord],
    reference: &[DrawRecord],
    compare: FeedKind,
) -> Result<(Series, Series)> {
    let mut tt = align_by_date(than_tai, reference);
    let mut dt = align_by_date(dien_toan, reference);
    let shared: BTreeSet<_> = tt.date_set().intersection(&dt.date_set()).copied().collect();
    let dropped = tt.retain_dates(&shared) + dt.retain_dates(&shared);
    if dropped > 0 {
        log::warn!("{dropped} jour(s) absent(s) de Thần Tài ou de Điện Toán écarté(s) du test ngược");
    }
    Ok((
        Series::from_alignment(&tt, compare, 0)?,
        Series::from_alignment(&dt, compare, 0)?,
    ))
}

fn bet_day(today: &DrawRecord, previous: &DrawRecord, modes: &[BetMode]) -> Result<BetDay> {
    let d1 = parse_digits(&today.value)?;
    let d2 = parse_digits(&previous.value)?;
    let found = find_bet_digits_multi(&d1, &d2, modes);
    let tails = tail_digits(today.tail()?, previous.tail()?);
    Ok(BetDay {
        date: today.date.clone(),
        today: today.value.clone(),
        previous: previous.value.clone(),
        dan_cham_len: dan_cham(&found).len(),
        nhi_hop: nhi_hop(&found, &tails),
        found,
    })
}

fn cmd_bet(config: &AnalysisConfig, feed: FeedKind, last: usize) -> Result<()> {
    let feeds = load(config);
    let records = feeds.get(feed);

    let days = records
        .windows(2)
        .take(last)
        .map(|pair| bet_day(&pair[0], &pair[1], &config.bet_modes))
        .collect::<Result<Vec<_>>>()?;

    display::display_bet_days(feed, &days);
    Ok(())
}

fn cmd_pairs(value: &str, digit: Option<u8>) -> Result<()> {
    let digits = parse_digits(value).with_context(|| format!("Valeur invalide : {value}"))?;
    let mut with = pairs_with_repetition(&digits);
    let mut without = pairs_without_repetition(&digits);
    if let Some(d) = digit {
        with = containing(&with, d);
        without = containing(&without, d);
    }
    display::display_pairs(value, &with, &without);
    Ok(())
}

fn cmd_stats(config: &AnalysisConfig, extractor: Extractor, top: usize) -> Result<()> {
    let feeds = load(config);
    let history = reference_tails(&feeds, config.compare)?;
    if history.is_empty() {
        println!("Flux {} vide. Vérifiez le fichier {}", config.compare, config.feeds.path(config.compare).display());
        return Ok(());
    }
    println!("📊 Thống kê {} sur {} tirages", config.compare, history.len());

    let freq = frequency(&history, |k| extractor.extract(k), top);
    display::display_frequency(extractor, &freq, history.len());
    display::display_bucket_stats(extractor, &bucket_stats(&history, extractor), history.len());

    for scheme in [Scheme::Bo, Scheme::Tong, Scheme::Zodiac, Scheme::Hieu] {
        let ex = Extractor::Class(scheme);
        let stale = top_stale(&history, |k| ex.extract(k), top);
        display::display_stale(scheme.name(), &stale, ex);
    }

    let kep = Extractor::Class(Scheme::Kep);
    let stale: Vec<(Bucket, usize)> = top_stale(&history, |k| kep.extract(k), usize::MAX)
        .into_iter()
        .filter(|(_, lag)| *lag > 0)
        .collect();
    display::display_stale(Scheme::Kep.name(), &stale, kep);
    Ok(())
}

fn parse_target(extractor: Extractor, target: &str) -> Result<Bucket> {
    let bucket = match extractor {
        Extractor::Identity => TwoDigitKey::parse(target).ok().map(Bucket::Key),
        Extractor::Head | Extractor::Tail => target
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|d| *d <= 9)
            .map(Bucket::Digit),
        Extractor::Class(scheme) => tables::find_class(scheme, target).map(Bucket::Class),
    };
    bucket.with_context(|| format!("Cible invalide pour {} : {target}", extractor.name()))
}

fn cmd_cycle(config: &AnalysisConfig, target: &str, extractor: Extractor) -> Result<()> {
    let bucket = parse_target(extractor, target)?;
    let feeds = load(config);
    let history = reference_tails(&feeds, config.compare)?;
    if history.is_empty() {
        println!("Flux {} vide.", config.compare);
        return Ok(());
    }
    let stats = cycle(&history, &bucket, |k| extractor.extract(k));
    display::display_cycle(&format!("{} {bucket}", extractor.name()), &stats);
    Ok(())
}

fn cmd_nuoi(config: &AnalysisConfig) -> Result<()> {
    let feeds = load(config);
    let series = series(&feeds, config.result, config.compare, config.offset)?;
    if series.is_empty() {
        println!("Aucun tirage commun entre {} et {}.", config.result, config.compare);
        return Ok(());
    }

    println!("🎲 Dàn nuôi {} / {}", config.result, config.compare);
    let rows = dan_nuoi(&series.results, &series.reference, &config.nuoi_params())?;
    display::display_nuoi(&rows, &series.dates, 5);

    let levels = chua_ra_levels(&rows);
    display::display_levels("Mức số từ dàn chưa ra", &levels, 10);
    Ok(())
}

fn cmd_lau_ra(config: &AnalysisConfig, select: usize) -> Result<()> {
    let feeds = load(config);
    let mut selected = Vec::new();

    for kind in [FeedKind::ThanTai, FeedKind::DienToan] {
        let series = series(&feeds, kind, config.compare, config.offset)?;
        let params = config.lau_ra_params(kind);
        let (dans, used) = lau_ra_auto(&series.results, &series.reference, &params);
        display::display_lau_ra(kind, &dans, used, params.threshold);
        if dans.is_empty() {
            continue;
        }

        let lists: Vec<Vec<TwoDigitKey>> = dans.iter().map(|d| d.dan.clone()).collect();
        let levels = levels_from_dans(&lists);
        display::display_levels(&format!("Mức số {kind}"), &levels, usize::MAX);
        let chosen = levels.up_to(select);
        display::display_selection(&format!("Dàn {kind} (mức 0 à {select})"), &chosen);
        selected.push(chosen);
    }

    if selected.is_empty() {
        println!("\nAucun mức retenu.");
        return Ok(());
    }
    let combined = levels_from_dans(&selected);
    display::display_levels("Tổng hợp mức số", &combined, usize::MAX);
    Ok(())
}

fn backtest_series(config: &AnalysisConfig, series: &Series, kind: FeedKind, pb: &ProgressBar) -> Vec<BacktestRow> {
    let params = config.lau_ra_params(kind);
    (1..=config.backtest_days)
        .into_par_iter()
        .map(|i| {
            let row = backtest_at(&series.results, &series.reference, &params, config.offset + i);
            pb.inc(1);
            row
        })
        .collect()
}

fn cmd_backtest(config: &AnalysisConfig) -> Result<()> {
    let feeds = load(config);
    let (tt_series, dt_series) = shared_series(
        feeds.get(FeedKind::ThanTai),
        feeds.get(FeedKind::DienToan),
        feeds.get(config.compare),
        config.compare,
    )?;
    if tt_series.is_empty() {
        println!("Aucun tirage commun entre Thần Tài, Điện Toán et {}.", config.compare);
        return Ok(());
    }

    let pb = ProgressBar::new((config.backtest_days * 2) as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    pb.set_message(FeedKind::ThanTai.label());
    let than_tai = backtest_series(config, &tt_series, FeedKind::ThanTai, &pb);
    pb.set_message(FeedKind::DienToan.label());
    let dien_toan = backtest_series(config, &dt_series, FeedKind::DienToan, &pb);
    pb.finish_and_clear();

    let lines: Vec<BacktestLine> = than_tai
        .iter()
        .zip(&dien_toan)
        .enumerate()
        .map(|(i, (tt, dt))| {
            let prev = tt.offset - 1;
            let label = if config.offset == 0 {
                format!("Lùi {}", i + 1)
            } else {
                format!("Lùi {}+{}", config.offset, i + 1)
            };
            BacktestLine {
                label,
                date: tt_series.dates.get(prev).cloned().unwrap_or_else(|| format!("N-{prev}")),
                result: tt.result,
                than_tai: tt.level,
                dien_toan: dt.level,
            }
        })
        .collect();

    let rates = [
        (FeedKind::ThanTai, hit_rate(&than_tai)),
        (FeedKind::DienToan, hit_rate(&dien_toan)),
    ];
    display::display_backtest(config.compare, &lines, &rates);
    Ok(())
}

fn cmd_config(config: &AnalysisConfig, path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} existe déjà (utilisez --force pour l'écraser)", path.display());
            }
            AnalysisConfig::default().save(path)?;
            println!("Configuration par défaut écrite dans {}", path.display());
        }
    }
    Ok(())
}
