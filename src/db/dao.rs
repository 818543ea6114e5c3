/// One incremental schema step. Statements run in order inside a single
/// transaction together with the version bump.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub statements: &'static [&'static str],
}

/// Contract between a DAO and `DatabaseManager::upgrade`.
///
/// `migrations()` must be sorted by ascending version, starting at 1.
pub trait DataAccessObject {
    /// Key under which the schema version is recorded in `versions`.
    const NAME: &'static str;

    /// Tables owned elsewhere that the first migration references.
    const REQUIRES: &'static [&'static str] = &[];

    fn migrations() -> &'static [Migration];

    fn version() -> i64 {
        Self::migrations().last().map(|m| m.version).unwrap_or(0)
    }

    fn pending(stored: i64) -> impl Iterator<Item = &'static Migration> {
        Self::migrations().iter().filter(move |m| m.version > stored)
    }
}
