//! SQLite specific DSN handling: file path preparation and connection pragmas.

pub(crate) mod path;
pub(crate) mod pragmas;

pub(crate) use path::{is_memory_dsn, prepare_sqlite_path};
pub(crate) use pragmas::Pragmas;
