//! ログ出力の初期化
//!
//! ログファイルは実行ごとに作り直す。`RUST_LOG` があればそちらを優先。
//! 1プロセスで1回だけ呼ぶ（2回目はエラー）。

use crate::error::{BotError, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub fn init(log_file: &Path, verbose: bool) -> Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(log_file)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| BotError::Config(format!("ログ出力を初期化できません: {}", e)))
}
