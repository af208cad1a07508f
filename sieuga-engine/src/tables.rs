use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use sieuga_feed::models::TwoDigitKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Bộ : 15 classes
    Bo,
    /// Kép : 4 classes, ne couvre que 50 nombres
    Kep,
    /// Con giáp : 12 classes
    Zodiac,
    /// Hiệu : (dizaine - unité) mod 10
    Hieu,
    /// Tổng : (dizaine + unité) mod 10
    Tong,
}

impl Scheme {
    pub const ALL: [Scheme; 5] = [Scheme::Bo, Scheme::Kep, Scheme::Zodiac, Scheme::Hieu, Scheme::Tong];

    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Bo => "Bộ",
            Scheme::Kep => "Kép",
            Scheme::Zodiac => "Con giáp",
            Scheme::Hieu => "Hiệu",
            Scheme::Tong => "Tổng",
        }
    }

    /// Vrai si chaque nombre 00..99 appartient à exactement une classe.
    pub fn is_partition(&self) -> bool {
        !matches!(self, Scheme::Kep)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Libellés dans l'ordre numérique, membres dans l'ordre de saisie
const BO: &[(&str, &[u8])] = &[
    ("00", &[0, 55, 5, 50]),
    ("01", &[1, 10, 6, 60, 51, 15, 56, 65]),
    ("02", &[2, 20, 7, 70, 25, 52, 57, 75]),
    ("03", &[3, 30, 8, 80, 35, 53, 58, 85]),
    ("04", &[4, 40, 9, 90, 45, 54, 59, 95]),
    ("11", &[11, 66, 16, 61]),
    ("12", &[12, 21, 17, 71, 26, 62, 67, 76]),
    ("13", &[13, 31, 18, 81, 36, 63, 68, 86]),
    ("14", &[14, 41, 19, 91, 46, 64, 69, 96]),
    ("22", &[22, 77, 27, 72]),
    ("23", &[23, 32, 28, 82, 73, 37, 78, 87]),
    ("24", &[24, 42, 29, 92, 74, 47, 79, 97]),
    ("33", &[33, 88, 38, 83]),
    ("34", &[34, 43, 39, 93, 84, 48, 89, 98]),
    ("44", &[44, 99, 49, 94]),
];

const KEP: &[(&str, &[u8])] = &[
    ("K.ÂM", &[7, 70, 14, 41, 29, 92, 36, 63, 58, 85]),
    ("K.BẰNG", &[0, 11, 22, 33, 44, 55, 66, 77, 88, 99]),
    ("K.LỆCH", &[5, 50, 16, 61, 27, 72, 38, 83, 49, 94]),
    (
        "S.KÉP",
        &[1, 10, 12, 21, 23, 32, 34, 43, 45, 54, 56, 65, 67, 76, 78, 87, 89, 98, 9, 90],
    ),
];

const ZODIAC: [&str; 12] = [
    "Tý", "Sửu", "Dần", "Mão", "Thìn", "Tỵ", "Ngọ", "Mùi", "Thân", "Dậu", "Tuất", "Hợi",
];

const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

struct SchemeTable {
    labels: Vec<&'static str>,
    /// Triés par valeur numérique
    members: Vec<Vec<TwoDigitKey>>,
    reverse: [Option<u8>; 100],
}

impl SchemeTable {
    fn build(labels: Vec<&'static str>, rule: impl Fn(TwoDigitKey) -> Option<u8>) -> Self {
        let mut members = vec![Vec::new(); labels.len()];
        let mut reverse = [None; 100];
        for key in TwoDigitKey::all() {
            if let Some(class) = rule(key) {
                reverse[key.index()] = Some(class);
                members[class as usize].push(key);
            }
        }
        Self {
            labels,
            members,
            reverse,
        }
    }

    fn from_lists(lists: &'static [(&'static str, &'static [u8])]) -> Self {
        Self::build(lists.iter().map(|(label, _)| *label).collect(), |key| {
            lists
                .iter()
                .position(|(_, nums)| nums.contains(&key.value()))
                .map(|p| p as u8)
        })
    }
}

struct Tables {
    bo: SchemeTable,
    kep: SchemeTable,
    zodiac: SchemeTable,
    hieu: SchemeTable,
    tong: SchemeTable,
}

impl Tables {
    fn build() -> Self {
        Self {
            bo: SchemeTable::from_lists(BO),
            kep: SchemeTable::from_lists(KEP),
            zodiac: SchemeTable::build(ZODIAC.to_vec(), |k| Some(k.value() % 12)),
            hieu: SchemeTable::build(DIGITS.to_vec(), |k| Some((k.tens() + 10 - k.units()) % 10)),
            tong: SchemeTable::build(DIGITS.to_vec(), |k| Some((k.tens() + k.units()) % 10)),
        }
    }

    fn for_scheme(&self, scheme: Scheme) -> &SchemeTable {
        match scheme {
            Scheme::Bo => &self.bo,
            Scheme::Kep => &self.kep,
            Scheme::Zodiac => &self.zodiac,
            Scheme::Hieu => &self.hieu,
            Scheme::Tong => &self.tong,
        }
    }
}

static TABLES: LazyLock<Tables> = LazyLock::new(Tables::build);

fn table(scheme: Scheme) -> &'static SchemeTable {
    TABLES.for_scheme(scheme)
}

/// Une classe d'un schéma. L'ordre suit l'ordre canonique de la table
/// (numérique pour Bộ, Hiệu et Tổng).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Class {
    scheme: Scheme,
    index: u8,
}

impl Class {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn label(&self) -> &'static str {
        table(self.scheme).labels[self.index as usize]
    }

    pub fn members(&self) -> &'static [TwoDigitKey] {
        &table(self.scheme).members[self.index as usize]
    }

    pub fn contains(&self, key: TwoDigitKey) -> bool {
        table(self.scheme).reverse[key.index()] == Some(self.index)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `None` est l'unique sentinelle : seul Kép peut la produire.
pub fn classify(scheme: Scheme, key: TwoDigitKey) -> Option<Class> {
    table(scheme).reverse[key.index()].map(|index| Class { scheme, index })
}

pub fn classify_set(key: TwoDigitKey) -> Option<Class> {
    classify(Scheme::Bo, key)
}

pub fn classify_double(key: TwoDigitKey) -> Option<Class> {
    classify(Scheme::Kep, key)
}

pub fn classify_zodiac(key: TwoDigitKey) -> Option<Class> {
    classify(Scheme::Zodiac, key)
}

pub fn classify_hieu(key: TwoDigitKey) -> Option<Class> {
    classify(Scheme::Hieu, key)
}

pub fn classify_tong(key: TwoDigitKey) -> Option<Class> {
    classify(Scheme::Tong, key)
}

pub fn classes(scheme: Scheme) -> impl Iterator<Item = Class> {
    (0..table(scheme).labels.len() as u8).map(move |index| Class { scheme, index })
}

pub fn find_class(scheme: Scheme, label: &str) -> Option<Class> {
    let label = label.trim();
    table(scheme)
        .labels
        .iter()
        .position(|l| *l == label)
        .map(|p| Class { scheme, index: p as u8 })
}

/// Membres d'une classe, triés par valeur numérique. `None` si le libellé est inconnu.
pub fn class_members(scheme: Scheme, label: &str) -> Option<Vec<TwoDigitKey>> {
    find_class(scheme, label).map(|c| c.members().to_vec())
}
