use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FeedError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    pub date: String,
    pub value: String,
}

impl DrawRecord {
    pub fn new(date: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            value: value.into(),
        }
    }

    pub fn digits(&self) -> Result<Vec<u8>, FeedError> {
        parse_digits(&self.value)
    }

    /// Clé formée des deux derniers chiffres du résultat.
    pub fn tail(&self) -> Result<TwoDigitKey, FeedError> {
        TwoDigitKey::from_tail(&self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    #[value(name = "dt", alias = "dien-toan")]
    DienToan,
    #[value(name = "tt", alias = "than-tai")]
    ThanTai,
    #[value(name = "gdb", alias = "dac-biet")]
    DacBiet,
    #[value(name = "g1", alias = "giai-nhat")]
    GiaiNhat,
}

impl FeedKind {
    pub const ALL: [FeedKind; 4] = [
        FeedKind::DienToan,
        FeedKind::ThanTai,
        FeedKind::DacBiet,
        FeedKind::GiaiNhat,
    ];

    pub fn width(&self) -> usize {
        match self {
            FeedKind::DienToan => 3,
            FeedKind::ThanTai => 4,
            FeedKind::DacBiet | FeedKind::GiaiNhat => 5,
        }
    }

    /// Les miroirs GĐB / G1 perdent parfois les zéros de tête.
    pub fn pads_leading_zeros(&self) -> bool {
        matches!(self, FeedKind::DacBiet | FeedKind::GiaiNhat)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeedKind::DienToan => "Điện Toán 123",
            FeedKind::ThanTai => "Thần Tài",
            FeedKind::DacBiet => "Giải Đặc Biệt",
            FeedKind::GiaiNhat => "Giải Nhất",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Nombre à deux chiffres "00".."99".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TwoDigitKey(u8);

impl TwoDigitKey {
    pub fn new(n: u8) -> Result<Self, FeedError> {
        if n > 99 {
            return Err(FeedError::KeyOutOfRange(n));
        }
        Ok(Self(n))
    }

    pub(crate) const fn from_digits_unchecked(tens: u8, units: u8) -> Self {
        Self(tens * 10 + units)
    }

    pub fn from_digits(tens: u8, units: u8) -> Result<Self, FeedError> {
        if tens > 9 || units > 9 {
            return Err(FeedError::KeyOutOfRange(tens.saturating_mul(10).saturating_add(units)));
        }
        Ok(Self::from_digits_unchecked(tens, units))
    }

    /// Exactement deux chiffres.
    pub fn parse(s: &str) -> Result<Self, FeedError> {
        let digits = parse_digits(s)?;
        if digits.len() != 2 {
            return Err(FeedError::BadWidth {
                value: s.to_string(),
                expected: 2,
                found: digits.len(),
            });
        }
        Ok(Self::from_digits_unchecked(digits[0], digits[1]))
    }

    /// Deux derniers chiffres d'une valeur, complétée à gauche par des zéros si trop courte.
    pub fn from_tail(value: &str) -> Result<Self, FeedError> {
        let digits = parse_digits(value)?;
        match digits.as_slice() {
            [] => Err(FeedError::EmptyInput),
            [u] => Ok(Self::from_digits_unchecked(0, *u)),
            [.., t, u] => Ok(Self::from_digits_unchecked(*t, *u)),
        }
    }

    pub fn all() -> impl Iterator<Item = TwoDigitKey> {
        (0..100u8).map(TwoDigitKey)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub fn tens(&self) -> u8 {
        self.0 / 10
    }

    pub fn units(&self) -> u8 {
        self.0 % 10
    }

    pub fn is_double(&self) -> bool {
        self.tens() == self.units()
    }

    pub fn contains_digit(&self, d: u8) -> bool {
        self.tens() == d || self.units() == d
    }

    pub fn reversed(&self) -> Self {
        Self::from_digits_unchecked(self.units(), self.tens())
    }
}

impl fmt::Display for TwoDigitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for TwoDigitKey {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim())
    }
}

pub fn parse_digits(s: &str) -> Result<Vec<u8>, FeedError> {
    s.chars()
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| FeedError::BadCharset { value: s.to_string() })
        })
        .collect()
}

/// Valide une valeur brute pour un flux et la renvoie normalisée.
pub fn validate_value(raw: &str, kind: FeedKind) -> Result<String, FeedError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FeedError::EmptyInput);
    }
    parse_digits(value)?;

    let width = kind.width();
    let len = value.chars().count();
    if len < width && kind.pads_leading_zeros() {
        return Ok(format!("{:0>width$}", value, width = width));
    }
    if len != width {
        return Err(FeedError::BadWidth {
            value: value.to_string(),
            expected: width,
            found: len,
        });
    }
    Ok(value.to_string())
}

pub fn join_keys(keys: &[TwoDigitKey], sep: &str) -> String {
    keys.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
