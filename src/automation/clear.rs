//! CIMTクリア処理
//!
//! CIMT画面で顧客コードを入力し、センチネル色（既定は赤）が出るまで
//! Backspace → ↓ を送り続ける。全体の経過時間でタイムアウトする。

use super::{navigate::Transaction, pause, Automator};
use crate::desktop::{Desktop, KeyPress};
use crate::error::{BotError, Result};
use std::time::{Duration, Instant};

/// Backspace + ↓ の進捗をコンソールに出す間隔（往復回数）
const PROGRESS_EVERY: usize = 10;

/// 1顧客分のクリア結果
#[derive(Debug, Clone, PartialEq)]
pub struct ClearOutcome {
    pub customer: String,
    /// 送信したキーの回数（Enterを含む）
    pub key_presses: usize,
    /// Backspace + ↓ の往復回数
    pub rounds: usize,
    pub elapsed: Duration,
}

/// 一括処理の集計
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<ClearOutcome>,
    /// (顧客コード, エラーメッセージ)
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

impl<D: Desktop> Automator<D> {
    /// 顧客のCIMTをクリア
    pub fn cimt_clear(&mut self, customer: &str) -> Result<ClearOutcome> {
        let nav = self.reset(Transaction::Cimt)?;
        if !nav.is_complete() {
            tracing::warn!(missed = ?nav.missed, "CIMT画面への移動が不完全なまま続行");
        }

        self.desktop.write(customer)?;
        println!("  顧客コード入力: {}", customer);
        println!("  CIMTクリア中: '{}'...", customer);
        tracing::info!(customer, "CIMTクリア開始");

        match self.config.sentinel_region {
            Some(region) => tracing::debug!(%region, "センチネル検出範囲"),
            None => tracing::debug!("センチネル検出範囲: 画面全体"),
        }

        let started = Instant::now();
        let timeout = self.config.clear_timeout();
        let mut key_presses = 0;
        let mut rounds = 0;

        if !self.sentinel_reached(started, timeout)? {
            self.desktop.press(KeyPress::Enter)?;
            key_presses += 1;
            println!("  ↵ Enter");
            tracing::debug!("enter");
            pause(self.config.key_interval());

            while !self.sentinel_reached(started, timeout)? {
                self.desktop.press(KeyPress::Backspace)?;
                self.desktop.press(KeyPress::Down)?;
                key_presses += 2;
                rounds += 1;
                if should_report(rounds) {
                    println!("  ↓ Backspace + ↓ ({}回目)", rounds);
                }
                tracing::debug!(key_presses, rounds, "backspace + down");
                pause(self.config.key_interval());
            }
        }

        let elapsed = started.elapsed();
        println!("  🔴 センチネル色を検出、ループ終了");
        tracing::info!(customer, key_presses, rounds, elapsed_ms = elapsed.as_millis() as u64, "センチネル色を検出、ループ終了");
        println!("  ✔ 完了 (キー入力 {}回, {:.1}秒)", key_presses, elapsed.as_secs_f64());

        Ok(ClearOutcome {
            customer: customer.to_string(),
            key_presses,
            rounds,
            elapsed,
        })
    }

    /// 複数顧客を順にクリア
    ///
    /// テンプレート画像が欠けている場合は中断する。
    /// それ以外のエラーは記録して次の顧客へ進む。
    pub fn cimt_clear_all<F>(&mut self, customers: &[String], mut on_done: F) -> Result<BatchSummary>
    where
        F: FnMut(&str, &Result<ClearOutcome>),
    {
        let mut summary = BatchSummary::default();

        for customer in customers {
            let result = self.cimt_clear(customer);
            on_done(customer, &result);

            match result {
                Ok(outcome) => summary.succeeded.push(outcome),
                Err(e @ BotError::TemplateNotFound(_)) => return Err(e),
                Err(e) => {
                    tracing::error!(customer = customer.as_str(), error = %e, "CIMTクリア失敗");
                    summary.failed.push((customer.clone(), e.to_string()));
                }
            }
        }

        Ok(summary)
    }

    /// センチネル色を検出したら `true`、タイムアウトでエラー
    fn sentinel_reached(&mut self, started: Instant, timeout: Duration) -> Result<bool> {
        if self.sentinel_visible()? {
            return Ok(true);
        }

        if started.elapsed() >= timeout {
            return Err(BotError::Timeout {
                what: "センチネル色の検出".into(),
                secs: timeout.as_secs(),
            });
        }

        Ok(false)
    }
}

/// 最初の1回と、以降 `PROGRESS_EVERY` 回ごとに表示
fn should_report(rounds: usize) -> bool {
    rounds == 1 || rounds % PROGRESS_EVERY == 0
}
