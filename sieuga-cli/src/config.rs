use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sieuga_engine::bet::BetMode;
use sieuga_engine::nuoi::{LauRaParams, NuoiParams};
use sieuga_engine::stats::Extractor;
use sieuga_engine::Scheme;
use sieuga_feed::load::FeedSource;
use sieuga_feed::models::FeedKind;

pub const DEFAULT_CONFIG_PATH: &str = "sieuga.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedPaths {
    pub dien_toan: PathBuf,
    pub than_tai: PathBuf,
    pub dac_biet: PathBuf,
    pub giai_nhat: PathBuf,
}

impl Default for FeedPaths {
    fn default() -> Self {
        Self {
            dien_toan: PathBuf::from("data/dien_toan.csv"),
            than_tai: PathBuf::from("data/than_tai.csv"),
            dac_biet: PathBuf::from("data/dac_biet.csv"),
            giai_nhat: PathBuf::from("data/giai_nhat.csv"),
        }
    }
}

impl FeedPaths {
    pub fn path(&self, kind: FeedKind) -> &Path {
        match kind {
            FeedKind::DienToan => &self.dien_toan,
            FeedKind::ThanTai => &self.than_tai,
            FeedKind::DacBiet => &self.dac_biet,
            FeedKind::GiaiNhat => &self.giai_nhat,
        }
    }

    pub fn sources(&self) -> Vec<FeedSource> {
        FeedKind::ALL
            .iter()
            .map(|kind| FeedSource {
                kind: *kind,
                path: self.path(*kind).to_path_buf(),
            })
            .collect()
    }
}

/// Seuils d'ô rỗng du dàn lâu ra, par flux de résultat. Ils priment sur `lau_ra.threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub than_tai: usize,
    pub dien_toan: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            than_tai: 4,
            dien_toan: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub feeds: FeedPaths,
    /// Flux de référence : GĐB ou G1
    pub compare: FeedKind,
    /// Flux de résultat : Thần Tài ou Điện Toán
    pub result: FeedKind,
    /// Schéma utilisé par `stats` et `cycle` sans `--by`
    pub scheme: Scheme,
    pub bet_modes: Vec<BetMode>,
    /// Nombre de tirages chargés par flux
    pub window: usize,
    pub offset: usize,
    pub backtest_days: usize,
    pub nuoi: NuoiParams,
    pub lau_ra: LauRaParams,
    pub thresholds: Thresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            feeds: FeedPaths::default(),
            compare: FeedKind::DacBiet,
            result: FeedKind::ThanTai,
            scheme: Scheme::Bo,
            bet_modes: BetMode::ALL.to_vec(),
            window: 100,
            offset: 0,
            backtest_days: 10,
            nuoi: NuoiParams::default(),
            lau_ra: LauRaParams::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Charge la configuration ; un fichier absent donne la configuration par défaut.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("{} absent, configuration par défaut", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&json)
            .with_context(|| format!("JSON invalide dans {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !matches!(self.compare, FeedKind::DacBiet | FeedKind::GiaiNhat) {
            anyhow::bail!("compare doit être gdb ou g1 (reçu : {})", self.compare);
        }
        if !matches!(self.result, FeedKind::ThanTai | FeedKind::DienToan) {
            anyhow::bail!("result doit être tt ou dt (reçu : {})", self.result);
        }
        if self.lau_ra.window == 0 {
            anyhow::bail!("lau_ra.window doit être strictement positif");
        }
        Ok(())
    }

    /// Paramètres lâu ra avec le seuil propre au flux de résultat.
    pub fn lau_ra_params(&self, result: FeedKind) -> LauRaParams {
        let threshold = match result {
            FeedKind::DienToan => self.thresholds.dien_toan,
            _ => self.thresholds.than_tai,
        };
        LauRaParams {
            threshold,
            ..self.lau_ra
        }
    }

    pub fn nuoi_params(&self) -> NuoiParams {
        self.nuoi
    }

    /// Extraction demandée, ou classement par le schéma configuré.
    pub fn extractor(&self, requested: Option<Extractor>) -> Extractor {
        requested.unwrap_or(Extractor::Class(self.scheme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalysisConfig::default();
        assert_eq!(config.window, 100);
        assert_eq!(config.nuoi.days, 50);
        assert_eq!(config.lau_ra.days, 50);
        assert_eq!(config.compare, FeedKind::DacBiet);
        assert_eq!(config.nuoi.check_range, 21);
        assert_eq!(config.lau_ra.check_range, 28);
        assert_eq!(config.lau_ra.window, 7);
        assert_eq!(config.bet_modes.len(), 3);
        assert!(config.nuoi.include_doubles);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AnalysisConfig {
            scheme: Scheme::Zodiac,
            bet_modes: vec![BetMode::ShiftLeft],
            ..AnalysisConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "compare": "giai-nhat", "thresholds": { "dien_toan": 6 } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.compare, FeedKind::GiaiNhat);
        assert_eq!(config.thresholds.dien_toan, 6);
        assert_eq!(config.thresholds.than_tai, 4);
        assert_eq!(config.window, 100);
    }

    #[test]
    fn test_validate_rejects_swapped_feeds() {
        let config = AnalysisConfig {
            compare: FeedKind::ThanTai,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lau_ra_params_per_feed() {
        let mut config = AnalysisConfig::default();
        config.thresholds.dien_toan = 2;
        config.lau_ra.days = 30;
        let dt = config.lau_ra_params(FeedKind::DienToan);
        assert_eq!(dt.threshold, 2);
        assert_eq!(dt.days, 30);
        assert_eq!(dt.window, config.lau_ra.window);
        assert_eq!(config.lau_ra_params(FeedKind::ThanTai).threshold, 4);
    }

    #[test]
    fn test_nested_days_are_honoured() {
        let json = r#"{ "nuoi": { "days": 20 }, "lau_ra": { "days": 35 } }"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.nuoi_params().days, 20);
        assert_eq!(config.nuoi_params().check_range, 21);
        assert_eq!(config.lau_ra_params(FeedKind::ThanTai).days, 35);
    }

    #[test]
    fn test_extractor_falls_back_to_scheme() {
        let config = AnalysisConfig {
            scheme: Scheme::Tong,
            ..AnalysisConfig::default()
        };
        assert_eq!(config.extractor(None), Extractor::Class(Scheme::Tong));
        assert_eq!(config.extractor(Some(Extractor::Head)), Extractor::Head);
        assert_eq!(AnalysisConfig::default().extractor(None), Extractor::Class(Scheme::Bo));
    }

    #[test]
    fn test_missing_file_gives_default() {
        let config = AnalysisConfig::load(Path::new("/nonexistent/sieuga.json")).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }
}
