use clap::{Parser, Subcommand};
use crate::automation::Transaction;
use crate::vision::Region;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cimt-bot")]
#[command(about = "端末画面（CIMT/COMT/SDAL/AUDT）の操作自動化ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// テンプレート画像フォルダ（設定より優先）
    #[arg(long, global = true)]
    pub template_dir: Option<PathBuf>,

    /// ログファイル（設定より優先）
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 顧客のCIMTをクリア
    Clear {
        /// 顧客コード
        #[arg(required = true)]
        customer: String,
    },

    /// シートの顧客コードを順にクリア
    Batch {
        /// 入力シート（xlsx/xls/ods）
        #[arg(required = true)]
        file: PathBuf,

        /// 顧客コードの列（見出し名または1始まりの番号、省略時は1列目）
        #[arg(short, long)]
        column: Option<String>,

        /// 開始確認をスキップ
        #[arg(short, long)]
        yes: bool,
    },

    /// 指定画面へ移動
    Reset {
        /// 移動先の画面
        #[arg(value_enum)]
        screen: Transaction,
    },

    /// テンプレートを探してクリック
    Click {
        /// テンプレート画像のファイル名
        #[arg(required = true)]
        template: String,
    },

    /// テンプレートを探してクリックし、文字列を入力してEnter
    Type {
        /// テンプレート画像のファイル名
        #[arg(required = true)]
        template: String,

        /// 入力する文字列
        #[arg(required = true)]
        text: String,
    },

    /// テンプレートが画面に出るまで待つ
    Wait {
        /// テンプレート画像のファイル名
        #[arg(required = true)]
        template: String,

        /// タイムアウト秒（省略時は設定値）
        #[arg(short, long)]
        timeout: Option<u64>,

        /// 確認間隔ミリ秒（省略時は設定値）
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// シートの内容を表示
    Rows {
        /// 入力シート（xlsx/xls/ods）
        #[arg(required = true)]
        file: PathBuf,
    },

    /// テンプレート画像の一覧と必須画像の有無を表示
    Templates,

    /// 画面をキャプチャして保存（テンプレート作成用）
    Capture {
        /// 保存先
        #[arg(short, long, default_value = "screenshot.png")]
        output: PathBuf,

        /// 切り出し範囲 left,top,width,height
        #[arg(short, long)]
        region: Option<Region>,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// テンプレート画像フォルダを設定
        #[arg(long)]
        set_template_dir: Option<PathBuf>,

        /// CIMTクリアのタイムアウト秒を設定
        #[arg(long)]
        set_timeout: Option<u64>,

        /// センチネル色を設定 (#RRGGBB / R,G,B)
        #[arg(long)]
        set_sentinel_color: Option<crate::color::Color>,

        /// 設定を初期値に戻す
        #[arg(long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_reset() {
        let cli = Cli::parse_from(["cimt-bot", "reset", "sdal"]);
        assert!(matches!(cli.command, Commands::Reset { screen: Transaction::Sdal }));
    }

    #[test]
    fn test_parse_capture_region() {
        let cli = Cli::parse_from(["cimt-bot", "capture", "--region", "0,0,200,100"]);
        match cli.command {
            Commands::Capture { region, .. } => assert_eq!(region, Some(Region::new(0, 0, 200, 100))),
            _ => panic!("capture として解析されていない"),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::parse_from(["cimt-bot", "clear", "ARGOCZ", "-v", "--template-dir", "tpl"]);
        assert!(cli.verbose);
        assert_eq!(cli.template_dir, Some(PathBuf::from("tpl")));
    }
}
