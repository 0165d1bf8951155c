use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

const LOG_CONFIG_ENV: &str = "LOG4RS_CONFIG";
const DEFAULT_LOG_CONFIG: &str = "config/log4rs.yaml";
const DEFAULT_LOG_FILE: &str = "logs/agentdeck.log";

static INIT: Once = Once::new();

/// Initializes log4rs once per process.
///
/// Uses `LOG4RS_CONFIG` (or `config/log4rs.yaml`) when it exists, otherwise a
/// file appender under `logs/`. Nothing is written to stdout; the terminal UI
/// owns it.
pub fn init(workspace_root: &Path) -> Result<()> {
    let mut outcome = Ok(());
    INIT.call_once(|| outcome = init_inner(workspace_root));
    outcome
}

fn init_inner(workspace_root: &Path) -> Result<()> {
    let config_path = std::env::var_os(LOG_CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace_root.join(DEFAULT_LOG_CONFIG));
    if config_path.exists() {
        return log4rs::init_file(&config_path, Default::default())
            .with_context(|| format!("failed to load {}", config_path.display()));
    }

    let log_file = workspace_root.join(DEFAULT_LOG_FILE);
    let pattern = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {t} - {m}\n";
    let appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(&log_file)
        .with_context(|| format!("failed to create {}", log_file.display()))?;
    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(appender)))
        .build(Root::builder().appender("logfile").build(LevelFilter::Debug))
        .context("invalid log4rs config")?;
    log4rs::init_config(config).context("failed to install logger")?;
    Ok(())
}
