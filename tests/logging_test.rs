//! ログ初期化テスト
//!
//! グローバルなsubscriberを設定するため、他のテストとは別バイナリにする

use cimt_bot::error::BotError;
use cimt_bot::logging;
use tempfile::tempdir;

#[test]
fn test_init_creates_log_file_and_rejects_second_init() {
    let dir = tempdir().expect("Failed to create temp dir");
    let log_file = dir.path().join("logs").join("app.log");

    logging::init(&log_file, true).unwrap();
    assert!(log_file.is_file());

    // 2回目は黙って無視せずエラーを返す
    let second = dir.path().join("second.log");
    let err = logging::init(&second, false).unwrap_err();
    assert!(matches!(err, BotError::Config(_)));
}
