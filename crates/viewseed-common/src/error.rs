use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Message used when a fetch finds no matching row.
pub const RECORD_NOT_FOUND: &str = "record not found";

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("view error: {0}")]
    View(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn record_not_found() -> Self {
        Error::NotFound(RECORD_NOT_FOUND.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_display_includes_context() {
        let e = Error::Config("bad yaml".into());
        assert_eq!(e.to_string(), "configuration error: bad yaml");

        let e = Error::Migration("table users".into());
        assert_eq!(e.to_string(), "migration error: table users");

        let e = Error::View("already exists".into());
        assert_eq!(e.to_string(), "view error: already exists");

        let e = Error::Other("misc".into());
        assert_eq!(e.to_string(), "misc");
    }

    #[test]
    fn record_not_found_is_classified() {
        let e = Error::record_not_found();
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "record not found");

        assert!(!Error::Database("locked".into()).is_not_found());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(!e.is_not_found());
    }
}
