#![forbid(unsafe_code)]

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
    TreeNotFound,
    SpeciesNotFound,
    CommentNotFound,
    /// The species exists but belongs to a different tree than the one named
    /// by the caller (also covers cross-tree re-parent attempts).
    ForeignSpecies {
        species_id: String,
        tree_id: String,
    },
    /// Re-parenting would make the node an ancestor of itself.
    AncestryCycle {
        species_id: String,
    },
    AccessDenied,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::TreeNotFound => write!(f, "ph. tree not found"),
            Self::SpeciesNotFound => write!(f, "species not found"),
            Self::CommentNotFound => write!(f, "comment not found"),
            Self::ForeignSpecies {
                species_id,
                tree_id,
            } => write!(
                f,
                "species {species_id} does not belong to ph. tree {tree_id}"
            ),
            Self::AncestryCycle { species_id } => {
                write!(f, "species {species_id} cannot become its own ancestor")
            }
            Self::AccessDenied => write!(f, "access denied to the ph. tree"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}
