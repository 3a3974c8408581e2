//! 各画面への移動
//!
//! CUSMメニューからCIMT/COMT/ITPIへ、CIMTから検索欄経由でSDAL/AUDTへ移動する。

use super::{pause, Automator};
use crate::desktop::Desktop;
use crate::error::Result;
use crate::templates::{CIMT, COMT, CUSM, ITPI, SEARCH};
use clap::ValueEnum;

/// 端末の画面（トランザクション）
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Transaction {
    Cimt,
    Comt,
    Itpi,
    Sdal,
    Audt,
}

impl Transaction {
    pub fn code(&self) -> &'static str {
        match self {
            Transaction::Cimt => "CIMT",
            Transaction::Comt => "COMT",
            Transaction::Itpi => "ITPI",
            Transaction::Sdal => "SDAL",
            Transaction::Audt => "AUDT",
        }
    }

    /// 順にクリックするアンカー
    fn anchors(&self) -> &'static [&'static str] {
        match self {
            Transaction::Cimt | Transaction::Sdal | Transaction::Audt => &[CUSM, CIMT],
            Transaction::Comt => &[CUSM, COMT],
            Transaction::Itpi => &[CUSM, ITPI],
        }
    }

    /// 検索欄に入力する画面コード（CIMT経由の画面のみ）
    fn search_code(&self) -> Option<&'static str> {
        match self {
            Transaction::Sdal | Transaction::Audt => Some(self.code()),
            _ => None,
        }
    }

    /// 移動に必要なテンプレート画像
    pub fn required_templates(&self) -> Vec<&'static str> {
        let mut names = self.anchors().to_vec();
        if self.search_code().is_some() {
            names.push(SEARCH);
        }
        names
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 画面移動の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavOutcome {
    pub clicked: Vec<String>,
    /// 画面上で見つからなかったアンカー
    pub missed: Vec<String>,
}

impl NavOutcome {
    pub fn is_complete(&self) -> bool {
        self.missed.is_empty()
    }
}

impl<D: Desktop> Automator<D> {
    /// 指定画面へ移動
    ///
    /// テンプレート画像が1つでも欠けていれば操作前にエラー。
    /// 画面上で見つからないアンカーは警告を出して先へ進む。
    pub fn reset(&mut self, transaction: Transaction) -> Result<NavOutcome> {
        self.templates.ensure_exists(&transaction.required_templates())?;
        tracing::info!(screen = %transaction, "画面移動開始");

        let mut outcome = NavOutcome::default();
        let step_delay = self.config.step_delay();

        for anchor in transaction.anchors() {
            self.record(&mut outcome, anchor, |bot| bot.find_and_click(anchor))?;
            pause(step_delay);
        }

        if let Some(code) = transaction.search_code() {
            self.record(&mut outcome, SEARCH, |bot| bot.find_type_and_confirm(SEARCH, code))?;
            pause(step_delay);
        }

        Ok(outcome)
    }

    fn record<F>(&mut self, outcome: &mut NavOutcome, anchor: &str, step: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<bool>,
    {
        if step(self)? {
            outcome.clicked.push(anchor.to_string());
        } else {
            tracing::warn!(template = anchor, "画面上に画像が見つかりません");
            outcome.missed.push(anchor.to_string());
        }
        Ok(())
    }
}
