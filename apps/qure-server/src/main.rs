use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use modkit::{DbOptions, ModuleRegistry, RunOptions, ShutdownOptions};
use modkit_db::{ConnectOpts, DbHandle};
use runtime::{AppConfig, AppConfigProvider, CliArgs, ConfigProvider, DatabaseConfig};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MEMORY_DSN: &str = "sqlite::memory:";

/// Exposes the runtime's module sections to modkit.
struct ModkitConfigAdapter(Arc<AppConfigProvider>);

impl modkit::ConfigProvider for ModkitConfigAdapter {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get_module_config(module_name)
    }
}

/// Qure Server - hospital appointments and patient queues
#[derive(Parser)]
#[command(name = "qure-server")]
#[command(about = "Qure Server - hospital appointments and patient queues")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory SQLite database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);
    sync_bind_addr(&mut config, args.port);
    if args.mock {
        config.database = Some(DatabaseConfig {
            url: MEMORY_DSN.to_string(),
            max_conns: Some(1),
            busy_timeout_ms: None,
        });
    }

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Qure Server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

/// Points `api_ingress.bind_addr` at `server.host:port` unless the section
/// sets its own address. An explicit `--port` always wins.
fn sync_bind_addr(config: &mut AppConfig, cli_port: Option<u16>) {
    let listen = config.listen_addr();
    let section = config
        .modules
        .entry(api_ingress::MODULE_NAME.to_string())
        .or_insert_with(|| serde_json::json!({}));
    if !section.is_object() {
        *section = serde_json::json!({});
    }
    if let Some(obj) = section.as_object_mut() {
        if cli_port.is_some() || !obj.contains_key("bind_addr") {
            obj.insert("bind_addr".to_string(), serde_json::Value::String(listen));
        }
    }
}

/// Rewrites a relative `sqlite://` path under `base_dir` and creates its
/// parent directory. Other DSNs pass through.
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let Some(db_path) = dsn.strip_prefix("sqlite://") else {
        return Ok(dsn.to_string());
    };

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };
    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        return Err(anyhow!("empty SQLite path in DSN"));
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }
    if let Some(dir) = p.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    if let Some(q) = query {
        out.push('?');
        out.push_str(q);
    }
    Ok(out)
}

fn validate_dsn(cfg: &DatabaseConfig) -> Result<()> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        return Err(anyhow!("database.url is empty"));
    }
    if raw.eq_ignore_ascii_case(MEMORY_DSN) {
        return Ok(());
    }
    let url = Url::parse(raw).map_err(|e| {
        anyhow!(
            "invalid database DSN '{}': {e}",
            modkit_db::redact_credentials(raw)
        )
    })?;
    match url.scheme() {
        "sqlite" | "postgres" | "postgresql" => Ok(()),
        other => Err(anyhow!("unsupported database type: {other}")),
    }
}

async fn connect_db(cfg: &DatabaseConfig, base_dir: &Path) -> Result<Arc<DbHandle>> {
    validate_dsn(cfg)?;
    let dsn = absolutize_sqlite_dsn(cfg.url.trim(), base_dir)?;
    let opts = ConnectOpts {
        max_conns: cfg.max_conns,
        acquire_timeout: Some(Duration::from_secs(5)),
        busy_timeout_ms: cfg.busy_timeout_ms,
        create_sqlite_dirs: true,
        ..Default::default()
    };
    let db = DbHandle::connect(&dsn, opts)
        .await
        .with_context(|| format!("failed to connect to {}", modkit_db::redact_credentials(&dsn)))?;
    tracing::info!(engine = ?db.engine(), "database connected");
    Ok(Arc::new(db))
}

/// Every module of the server, in no particular order; the registry sorts
/// them by their declared dependencies.
fn build_registry() -> Result<ModuleRegistry> {
    let mut builder = ModuleRegistry::builder();
    api_ingress::register(&mut builder);
    identity::register(&mut builder);
    notifications::register(&mut builder);
    appointments::register(&mut builder);
    queues::register(&mut builder);
    Ok(builder.build_topo_sorted()?)
}

async fn run_server(config: AppConfig) -> Result<()> {
    let registry = build_registry()?;
    let provider = Arc::new(ModkitConfigAdapter(Arc::new(AppConfigProvider::new(
        config.clone(),
    ))));

    let db = match &config.database {
        Some(db_config) => {
            DbOptions::Handle(connect_db(db_config, Path::new(&config.server.home_dir)).await?)
        }
        None => {
            tracing::warn!("no database configured; modules that need one will fail to start");
            DbOptions::None
        }
    };

    modkit::run(RunOptions {
        registry,
        modules_cfg: provider,
        db,
        shutdown: ShutdownOptions::Signals,
    })
    .await
}

fn check_section<T: DeserializeOwned + Default>(config: &AppConfig, module: &str) -> Result<()> {
    if let Some(section) = config.modules.get(module).filter(|v| !v.is_null()) {
        serde_json::from_value::<T>(section.clone())
            .with_context(|| format!("invalid '{module}' module config"))?;
    }
    Ok(())
}

/// Validates the database DSN, every module section and the dependency graph.
fn check_config(config: &AppConfig) -> Result<()> {
    if let Some(db) = &config.database {
        validate_dsn(db)?;
    }
    check_section::<api_ingress::ApiIngressConfig>(config, api_ingress::MODULE_NAME)?;
    check_section::<identity::config::IdentityConfig>(config, "identity")?;
    check_section::<notifications::config::NotificationsConfig>(config, "notifications")?;
    check_section::<appointments::config::AppointmentsConfig>(config, "appointments")?;
    check_section::<queues::config::QueuesConfig>(config, "queues")?;
    build_registry()?;

    tracing::info!("configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bind_addr_follows_server_section_unless_set() {
        let mut config = AppConfig::default();
        config.server.port = 9001;
        sync_bind_addr(&mut config, None);
        assert_eq!(config.modules["api_ingress"]["bind_addr"], "127.0.0.1:9001");

        config.modules.insert(
            "api_ingress".into(),
            serde_json::json!({"bind_addr": "0.0.0.0:8087", "enable_docs": false}),
        );
        sync_bind_addr(&mut config, None);
        assert_eq!(config.modules["api_ingress"]["bind_addr"], "0.0.0.0:8087");

        config.server.port = 9100;
        sync_bind_addr(&mut config, Some(9100));
        assert_eq!(config.modules["api_ingress"]["bind_addr"], "127.0.0.1:9100");
        assert_eq!(config.modules["api_ingress"]["enable_docs"], false);
    }

    #[test]
    fn relative_sqlite_paths_land_under_home() {
        let tmp = tempdir().unwrap();
        let dsn = absolutize_sqlite_dsn("sqlite://database/qure.db?mode=rwc", tmp.path()).unwrap();
        assert!(dsn.starts_with("sqlite://"));
        assert!(dsn.ends_with("database/qure.db?mode=rwc"));
        assert!(tmp.path().join("database").is_dir());

        assert_eq!(absolutize_sqlite_dsn("sqlite::memory:", tmp.path()).unwrap(), MEMORY_DSN);
        assert_eq!(
            absolutize_sqlite_dsn("postgres://u:p@db/qure", tmp.path()).unwrap(),
            "postgres://u:p@db/qure"
        );
        assert!(absolutize_sqlite_dsn("sqlite://", tmp.path()).is_err());
    }

    #[test]
    fn dsn_validation_rejects_unknown_engines() {
        let cfg = |url: &str| DatabaseConfig {
            url: url.into(),
            max_conns: None,
            busy_timeout_ms: None,
        };
        assert!(validate_dsn(&cfg("sqlite://qure.db")).is_ok());
        assert!(validate_dsn(&cfg("sqlite::memory:")).is_ok());
        assert!(validate_dsn(&cfg("postgresql://db/qure")).is_ok());
        assert!(validate_dsn(&cfg("mysql://db/qure")).is_err());
        assert!(validate_dsn(&cfg("  ")).is_err());
    }

    #[test]
    fn every_module_is_registered() {
        let registry = build_registry().unwrap();
        let names: Vec<_> = registry.modules().iter().map(|m| m.name).collect();
        for name in ["api_ingress", "identity", "notifications", "appointments", "queues"] {
            assert!(names.contains(&name), "{name} missing from {names:?}");
        }
        let pos = |n: &str| names.iter().position(|m| *m == n).unwrap();
        assert!(pos("identity") < pos("queues"));
        assert!(pos("notifications") < pos("appointments"));
    }

    #[test]
    fn check_rejects_malformed_module_sections() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "queues".into(),
            serde_json::json!({"minutes_per_patiant": 10}),
        );
        let err = check_config(&config).unwrap_err();
        assert!(format!("{err:#}").contains("'queues'"));
    }
}
