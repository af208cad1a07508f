use std::path::PathBuf;

use thiserror::Error;

use crate::models::FeedKind;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("valeur '{value}' : {found} chiffres au lieu de {expected}")]
    BadWidth {
        value: String,
        expected: usize,
        found: usize,
    },

    #[error("valeur '{value}' : caractère non numérique")]
    BadCharset { value: String },

    #[error("entrée vide")]
    EmptyInput,

    #[error("nombre {0} hors limites (00-99)")]
    KeyOutOfRange(u8),

    #[error("impossible d'ouvrir {path:?} : {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("erreur CSV : {0}")]
    Csv(#[from] csv::Error),

    #[error("{kind}, ligne {line} : {source}")]
    Row {
        kind: FeedKind,
        line: u64,
        #[source]
        source: Box<FeedError>,
    },
}
