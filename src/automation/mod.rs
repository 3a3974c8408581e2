//! 端末画面の自動操作
//!
//! - テンプレートを探してクリック
//! - テンプレートを探してクリック → 文字入力 → Enter
//! - テンプレートの出現待ち
//! - 各画面への移動（navigate）
//! - CIMTクリア処理（clear）
//!
//! いずれも固定間隔の再試行ループで、画面は `Desktop` 越しに操作する。

mod clear;
mod navigate;

pub use clear::{BatchSummary, ClearOutcome};
pub use navigate::{NavOutcome, Transaction};

use crate::config::Config;
use crate::desktop::{Desktop, KeyPress};
use crate::error::Result;
use crate::templates::TemplateLibrary;
use crate::vision::{self, Match};
use std::time::{Duration, Instant};

pub struct Automator<D: Desktop> {
    desktop: D,
    templates: TemplateLibrary,
    config: Config,
}

impl<D: Desktop> Automator<D> {
    pub fn new(desktop: D, templates: TemplateLibrary, config: Config) -> Self {
        Self {
            desktop,
            templates,
            config,
        }
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }

    pub fn desktop_mut(&mut self) -> &mut D {
        &mut self.desktop
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub fn into_desktop(self) -> D {
        self.desktop
    }

    /// 現在の画面からテンプレートを1回探す
    pub fn locate(&mut self, template: &str) -> Result<Option<Match>> {
        let screen = self.desktop.capture()?;
        let gray = image::imageops::grayscale(&screen);
        let needle = self.templates.load(template)?;

        Ok(vision::locate(&gray, needle, self.config.confidence))
    }

    /// テンプレートを探してクリック
    ///
    /// 最大 `max_attempts` 回試行し、見つからなければ `false`
    pub fn find_and_click(&mut self, template: &str) -> Result<bool> {
        match self.find_with_retry(template)? {
            Some(found) => {
                let (x, y) = found.region.center();
                self.desktop.click(x, y)?;
                tracing::info!(template, x, y, score = found.score, "クリック");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// テンプレートを探してクリックし、文字列を入力してEnter
    pub fn find_type_and_confirm(&mut self, template: &str, text: &str) -> Result<bool> {
        if !self.find_and_click(template)? {
            return Ok(false);
        }

        self.desktop.write(text)?;
        self.desktop.press(KeyPress::Enter)?;
        tracing::info!(template, text, "入力確定");
        Ok(true)
    }

    /// テンプレートが画面に出るまで待つ
    ///
    /// 見つかれば `true`、`timeout` 経過で `false`
    pub fn wait_for_image(&mut self, template: &str, timeout: Duration, interval: Duration) -> Result<bool> {
        let started = Instant::now();

        loop {
            if let Some(found) = self.locate(template)? {
                tracing::info!(template, region = %found.region, "画像を検出");
                return Ok(true);
            }

            if started.elapsed() >= timeout {
                tracing::warn!(template, timeout_secs = timeout.as_secs(), "タイムアウト、画像を検出できませんでした");
                return Ok(false);
            }

            pause(interval);
        }
    }

    /// センチネル色が画面に出ているか
    pub fn sentinel_visible(&mut self) -> Result<bool> {
        let screen = self.desktop.capture()?;
        let target = self.config.sentinel_color;
        let tolerance = self.config.color_tolerance;

        let found = match self.config.sentinel_region {
            Some(region) => vision::detect_color(&vision::crop(&screen, region), target, tolerance),
            None => vision::detect_color(&screen, target, tolerance),
        };
        Ok(found)
    }

    fn find_with_retry(&mut self, template: &str) -> Result<Option<Match>> {
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            if let Some(found) = self.locate(template)? {
                return Ok(Some(found));
            }

            tracing::debug!(template, attempt, attempts, "画像が見つからない、再試行");
            if attempt < attempts {
                pause(self.config.retry_interval());
            }
        }

        Ok(None)
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
