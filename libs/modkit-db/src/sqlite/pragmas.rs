//! Whitelisted PRAGMA parameters carried in the SQLite DSN query string.
//!
//! `sqlite://qure.db?journal_mode=WAL&synchronous=FULL&busy_timeout=2000`

use super::path::is_memory_dsn;

const PRAGMA_PARAMS: &[&str] = &["journal_mode", "synchronous", "busy_timeout", "wal"];
const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JournalMode {
    Delete,
    Wal,
    Memory,
    Truncate,
}

impl JournalMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Some(Self::Delete),
            "WAL" => Some(Self::Wal),
            "MEMORY" => Some(Self::Memory),
            "TRUNCATE" => Some(Self::Truncate),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Wal => "WAL",
            Self::Memory => "MEMORY",
            Self::Truncate => "TRUNCATE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SyncMode {
    Off,
    Normal,
    Full,
}

impl SyncMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OFF" => Some(Self::Off),
            "NORMAL" => Some(Self::Normal),
            "FULL" => Some(Self::Full),
            _ => None,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
        }
    }
}

/// Pragmas applied to every pooled SQLite connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Pragmas {
    pub journal_mode: JournalMode,
    pub synchronous: SyncMode,
    /// `None` for in-memory databases.
    pub busy_timeout_ms: Option<u32>,
}

impl Pragmas {
    /// Defaults (WAL, NORMAL, 5s busy timeout; DELETE and no timeout in memory)
    /// overridden by valid DSN parameters. Invalid values are logged and ignored.
    pub(crate) fn from_dsn(dsn: &str, busy_timeout_ms: Option<u32>) -> Self {
        let memory = is_memory_dsn(dsn);
        let mut pragmas = Pragmas {
            journal_mode: if memory {
                JournalMode::Delete
            } else {
                JournalMode::Wal
            },
            synchronous: SyncMode::Normal,
            busy_timeout_ms: if memory {
                None
            } else {
                Some(busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS))
            },
        };

        for (key, value) in query_pairs(dsn) {
            match key.to_ascii_lowercase().as_str() {
                "journal_mode" => match JournalMode::parse(&value) {
                    Some(mode) if !memory => pragmas.journal_mode = mode,
                    Some(_) => {}
                    None => tracing::warn!(value = %value, "invalid 'journal_mode' pragma, ignoring"),
                },
                "wal" => match value.to_ascii_lowercase().as_str() {
                    "true" | "1" if !memory => pragmas.journal_mode = JournalMode::Wal,
                    "false" | "0" => pragmas.journal_mode = JournalMode::Delete,
                    "true" | "1" => {}
                    _ => tracing::warn!(value = %value, "invalid 'wal' pragma, ignoring"),
                },
                "synchronous" => match SyncMode::parse(&value) {
                    Some(mode) => pragmas.synchronous = mode,
                    None => tracing::warn!(value = %value, "invalid 'synchronous' pragma, ignoring"),
                },
                "busy_timeout" => match value.parse::<u32>() {
                    Ok(ms) if !memory => pragmas.busy_timeout_ms = Some(ms),
                    Ok(_) => {}
                    Err(_) => tracing::warn!(value = %value, "invalid 'busy_timeout' pragma, ignoring"),
                },
                _ => {}
            }
        }

        pragmas
    }

    pub(crate) fn statements(&self) -> Vec<String> {
        let mut out = vec![
            format!("PRAGMA journal_mode = {}", self.journal_mode.as_sql()),
            format!("PRAGMA synchronous = {}", self.synchronous.as_sql()),
            "PRAGMA foreign_keys = ON".to_string(),
        ];
        if let Some(ms) = self.busy_timeout_ms {
            out.push(format!("PRAGMA busy_timeout = {ms}"));
        }
        out
    }
}

fn query_pairs(dsn: &str) -> Vec<(String, String)> {
    let Some((_, query)) = dsn.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Drop the pragma parameters sqlx does not understand.
pub(crate) fn strip_pragma_params(dsn: &str) -> String {
    let Some((base, query)) = dsn.split_once('?') else {
        return dsn.to_string();
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default().to_ascii_lowercase();
            !PRAGMA_PARAMS.contains(&key.as_str())
        })
        .collect();
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}
