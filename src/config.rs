use crate::color::Color;
use crate::error::{BotError, Result};
use crate::vision::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// テンプレート画像のフォルダ
    pub template_dir: PathBuf,
    /// テンプレート照合の閾値 (0.0-1.0)
    pub confidence: f32,
    /// 照合の最大試行回数
    pub max_attempts: u32,
    pub retry_interval_ms: u64,
    /// アンカークリック後の待機
    pub step_delay_ms: u64,
    /// キー入力間の待機
    pub key_interval_ms: u64,
    pub sentinel_color: Color,
    pub color_tolerance: u8,
    /// センチネル色の検出領域（Noneで画面全体）
    pub sentinel_region: Option<Region>,
    pub clear_timeout_secs: u64,
    pub detect_timeout_secs: u64,
    pub detect_interval_ms: u64,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("."),
            confidence: 0.8,
            max_attempts: 3,
            retry_interval_ms: 500,
            step_delay_ms: 1000,
            key_interval_ms: 10,
            sentinel_color: Color::RED,
            color_tolerance: 10,
            sentinel_region: None,
            clear_timeout_secs: 300,
            detect_timeout_secs: 30,
            detect_interval_ms: 1000,
            log_file: PathBuf::from("app.log"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// 設定ファイルを既定値で上書き
    ///
    /// 読めない・検証に通らないファイルもそのまま置き換える。
    pub fn reset() -> Result<Self> {
        Self::reset_to(&Self::config_path()?)
    }

    pub fn reset_to(config_path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save_to(config_path)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| BotError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("cimt-bot").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(BotError::Config(format!(
                "confidence は0.0-1.0で指定してください: {}",
                self.confidence
            )));
        }
        if self.max_attempts == 0 {
            return Err(BotError::Config("max_attempts は1以上にしてください".into()));
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn key_interval(&self) -> Duration {
        Duration::from_millis(self.key_interval_ms)
    }

    pub fn clear_timeout(&self) -> Duration {
        Duration::from_secs(self.clear_timeout_secs)
    }

    pub fn detect_timeout(&self) -> Duration {
        Duration::from_secs(self.detect_timeout_secs)
    }

    pub fn detect_interval(&self) -> Duration {
        Duration::from_millis(self.detect_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.confidence, 0.8);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.sentinel_color, Color::RED);
        assert_eq!(config.color_tolerance, 10);
        assert_eq!(config.log_file, PathBuf::from("app.log"));
        assert!(config.sentinel_region.is_none());
    }

    #[test]
    fn test_load_missing_returns_default() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config.detect_timeout_secs, 30);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            template_dir: PathBuf::from("/tmp/templates"),
            sentinel_color: Color::new(0, 128, 0),
            sentinel_region: Some(Region::new(10, 20, 300, 40)),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.template_dir, PathBuf::from("/tmp/templates"));
        assert_eq!(loaded.sentinel_color, Color::new(0, 128, 0));
        assert_eq!(loaded.sentinel_region, Some(Region::new(10, 20, 300, 40)));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "confidence": 0.9 }"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.confidence, 0.9);
        assert_eq!(loaded.max_attempts, 3);
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "confidence": 1.5 }"#).unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn test_reset_recovers_from_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{ "confidence": 1.5, "max_attempts": 7 }"#).unwrap();
        assert!(Config::load_from(&path).is_err());

        let config = Config::reset_to(&path).unwrap();
        assert_eq!(config.confidence, 0.8);

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.confidence, 0.8);
        assert_eq!(loaded.max_attempts, 3);
    }

    #[test]
    fn test_reset_recovers_from_broken_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(BotError::Json(_))));

        Config::reset_to(&path).unwrap();
        assert!(Config::load_from(&path).is_ok());
    }
}
