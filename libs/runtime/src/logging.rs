use crate::config::{LoggingConfig, Section};
use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use parking_lot::Mutex;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::Level;
use tracing_subscriber::{
    filter::FilterFn,
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// `target == prefix` or `target` starts with `prefix::`.
fn matches_crate_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .map(|rest| rest.is_empty() || rest.starts_with("::"))
        .unwrap_or(false)
}

// -------- per-target level lookup --------

/// Maximum level per target prefix, with a fallback for unmatched targets.
/// Longer prefixes win over shorter ones.
#[derive(Clone, Debug)]
struct LevelTable {
    fallback: Option<Level>,
    by_prefix: Vec<(String, Option<Level>)>,
}

impl LevelTable {
    fn build(cfg: &LoggingConfig, pick: impl Fn(&Section) -> Option<Level>) -> Self {
        let mut by_prefix: Vec<(String, Option<Level>)> = cfg
            .iter()
            .filter(|(name, _)| name.as_str() != "default")
            .map(|(name, section)| (name.clone(), pick(section)))
            .collect();
        by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            fallback: cfg.get("default").and_then(&pick),
            by_prefix,
        }
    }

    fn level_for(&self, target: &str) -> Option<Level> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, level)| *level)
            .unwrap_or(self.fallback)
    }

    fn enabled(&self, meta: &tracing::Metadata<'_>) -> bool {
        self.level_for(meta.target())
            .map(|max| meta.level() <= &max)
            .unwrap_or(false)
    }

    fn is_silent(&self) -> bool {
        self.fallback.is_none() && self.by_prefix.iter().all(|(_, l)| l.is_none())
    }
}

fn console_level(section: &Section) -> Option<Level> {
    parse_tracing_level(&section.console_level)
}

fn file_level(section: &Section) -> Option<Level> {
    if section.file.trim().is_empty() {
        return None;
    }
    let raw = if section.file_level.trim().is_empty() {
        &section.console_level
    } else {
        &section.file_level
    };
    parse_tracing_level(raw)
}

// -------- rotating file writers --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendCount>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

/// Writer that silently drops records with no destination file.
struct MaybeWriter(Option<RotWriter>);

impl Write for MaybeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes each record to the file of the longest matching target prefix,
/// falling back to the `"default"` file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn build(cfg: &LoggingConfig, base_dir: &Path) -> Self {
        let mut router = FileRouter::default();
        for (name, section) in cfg {
            let Some(writer) = open_section_file(name, section, base_dir) else {
                continue;
            };
            if name == "default" {
                router.default = Some(writer);
            } else {
                router.by_prefix.push((name.clone(), writer));
            }
        }
        router.by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        router
    }

    fn resolve(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> MakeWriter<'a> for FileRouter {
    type Writer = MaybeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MaybeWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaybeWriter(self.resolve(meta.target()))
    }
}

/// Relative log paths are placed under `base_dir` (normally `server.home_dir`).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer(
    log_path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(max_backups),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn open_section_file(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }

    let path = resolve_log_path(&section.file, base_dir);
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);

    match create_rotating_writer(&path, max_bytes as usize, backups) {
        Ok(w) => Some(w),
        Err(e) => {
            // The subscriber is not installed yet.
            eprintln!(
                "failed to open log file for '{}' at {}: {}",
                name,
                path.display(),
                e
            );
            None
        }
    }
}

// -------- public init --------

/// Install the global subscriber from the logging sections.
///
/// Console output is human readable; file output is JSON and routed per target
/// prefix. `base_dir` resolves relative file paths.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let ansi = atty::is(atty::Stream::Stdout);
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console_table = LevelTable::build(cfg, console_level);
    if !console_table.is_silent() {
        layers.push(
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(FilterFn::new(move |meta: &tracing::Metadata<'_>| {
                    console_table.enabled(meta)
                }))
                .boxed(),
        );
    }

    let router = FileRouter::build(cfg, base_dir);
    let file_table = LevelTable::build(cfg, file_level);
    if !router.is_empty() && !file_table.is_silent() {
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router)
                .with_filter(FilterFn::new(move |meta: &tracing::Metadata<'_>| {
                    file_table.enabled(meta)
                }))
                .boxed(),
        );
    }

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_age_days: None,
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level(" Warn "), Some(Level::WARN));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("bogus"), Some(Level::INFO));
    }

    #[test]
    fn prefix_matching_respects_module_boundaries() {
        assert!(matches_crate_prefix("queues", "queues"));
        assert!(matches_crate_prefix("queues::domain::service", "queues"));
        assert!(!matches_crate_prefix("queues_extra::x", "queues"));
        assert!(!matches_crate_prefix("identity", "queues"));
    }

    #[test]
    fn longest_prefix_wins_and_default_is_fallback() {
        let mut cfg = default_logging_config();
        cfg.insert("queues".into(), section("warn", "", ""));
        cfg.insert("queues::infra".into(), section("trace", "", ""));

        let table = LevelTable::build(&cfg, console_level);
        assert_eq!(table.level_for("queues::api::rest"), Some(Level::WARN));
        assert_eq!(table.level_for("queues::infra::storage"), Some(Level::TRACE));
        assert_eq!(table.level_for("sqlx::query"), Some(Level::INFO));
    }

    #[test]
    fn sections_without_file_are_silent_in_file_table() {
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("info", "", "debug"));
        cfg.insert("identity".into(), section("info", "logs/identity.log", ""));

        let table = LevelTable::build(&cfg, file_level);
        assert_eq!(table.level_for("tower_http"), None);
        // file_level falls back to console_level when empty
        assert_eq!(table.level_for("identity::domain"), Some(Level::INFO));
    }

    #[test]
    fn relative_log_paths_resolve_under_base_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/qure.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/qure.log"));

        let abs = tmp.path().join("abs.log");
        assert_eq!(resolve_log_path(abs.to_str().unwrap(), Path::new("/ignored")), abs);
    }

    #[test]
    fn file_router_creates_parent_dirs_and_routes_by_prefix() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("info", "logs/qure.log", "debug"));
        cfg.insert("api_ingress".into(), section("info", "logs/http/api.log", "info"));

        let router = FileRouter::build(&cfg, tmp.path());
        assert!(tmp.path().join("logs/http").is_dir());
        assert!(router.resolve("api_ingress::request_id").is_some());
        assert!(router.resolve("queues").is_some());
        assert!(!router.is_empty());
    }
}
