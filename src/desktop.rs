//! 画面キャプチャと入力操作
//!
//! `Desktop` トレイトの裏で実機（xcap + enigo）を扱う。
//! 自動操作ロジックはこのトレイト越しにしか画面に触れない。

use crate::error::{BotError, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use image::RgbaImage;
use xcap::Monitor;

/// 送信するキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPress {
    Enter,
    Backspace,
    Down,
}

impl KeyPress {
    fn to_enigo(self) -> Key {
        match self {
            KeyPress::Enter => Key::Return,
            KeyPress::Backspace => Key::Backspace,
            KeyPress::Down => Key::DownArrow,
        }
    }
}

impl std::fmt::Display for KeyPress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyPress::Enter => write!(f, "enter"),
            KeyPress::Backspace => write!(f, "backspace"),
            KeyPress::Down => write!(f, "down"),
        }
    }
}

/// 画面と入力デバイス
///
/// 座標はキャプチャ画像のピクセル座標（左上原点）。
pub trait Desktop {
    /// 画面全体をキャプチャ
    fn capture(&mut self) -> Result<RgbaImage>;

    /// 指定座標を左クリック
    fn click(&mut self, x: u32, y: u32) -> Result<()>;

    /// 文字列を入力
    fn write(&mut self, text: &str) -> Result<()>;

    /// キーを1回押す
    fn press(&mut self, key: KeyPress) -> Result<()>;
}

/// 実機のプライマリモニタ
pub struct LiveDesktop {
    monitor: Monitor,
    origin: (i32, i32),
    enigo: Enigo,
}

impl LiveDesktop {
    pub fn new() -> Result<Self> {
        let monitors = Monitor::all().map_err(|e| BotError::Capture(e.to_string()))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .ok_or_else(|| BotError::Capture("プライマリモニタが見つかりません".into()))?;

        let origin = (
            monitor.x().map_err(|e| BotError::Capture(e.to_string()))?,
            monitor.y().map_err(|e| BotError::Capture(e.to_string()))?,
        );

        let enigo = Enigo::new(&Settings::default()).map_err(|e| {
            BotError::Input(format!(
                "入力デバイスを初期化できません（macOSではアクセシビリティ権限を確認）: {:?}",
                e
            ))
        })?;

        tracing::debug!(x = origin.0, y = origin.1, "モニタ検出");
        Ok(Self { monitor, origin, enigo })
    }
}

impl Desktop for LiveDesktop {
    fn capture(&mut self) -> Result<RgbaImage> {
        self.monitor
            .capture_image()
            .map_err(|e| BotError::Capture(e.to_string()))
    }

    fn click(&mut self, x: u32, y: u32) -> Result<()> {
        let screen_x = self.origin.0 + x as i32;
        let screen_y = self.origin.1 + y as i32;

        self.enigo
            .move_mouse(screen_x, screen_y, Coordinate::Abs)
            .map_err(|e| BotError::Input(format!("マウス移動失敗: {:?}", e)))?;

        // 移動の反映待ち
        std::thread::sleep(std::time::Duration::from_millis(50));

        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| BotError::Input(format!("クリック失敗: {:?}", e)))?;

        tracing::debug!(x = screen_x, y = screen_y, "クリック");
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<()> {
        self.enigo
            .text(text)
            .map_err(|e| BotError::Input(format!("文字入力失敗: {:?}", e)))
    }

    fn press(&mut self, key: KeyPress) -> Result<()> {
        self.enigo
            .key(key.to_enigo(), Direction::Click)
            .map_err(|e| BotError::Input(format!("キー入力失敗 ({}): {:?}", key, e)))
    }
}
