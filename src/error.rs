use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("テンプレート画像が見つかりません: {0}")]
    TemplateNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画面キャプチャエラー: {0}")]
    Capture(String),

    #[error("入力操作エラー: {0}")]
    Input(String),

    #[error("シート読み込みエラー: {0}")]
    Sheet(String),

    #[error("タイムアウト: {what} ({secs}秒経過)")]
    Timeout { what: String, secs: u64 },

    #[error("引数が不正: {0}")]
    InvalidArgument(String),

    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("画像処理エラー: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, BotError>;
