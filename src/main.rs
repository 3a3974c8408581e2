use clap::Parser;
use cimt_bot::{automation, cli, config, desktop, error, logging, sheet, templates, vision};
use automation::Automator;
use cli::{Cli, Commands};
use config::Config;
use desktop::{Desktop, LiveDesktop};
use error::Result;
use indicatif::{ProgressBar, ProgressStyle};
use templates::TemplateLibrary;

fn main() -> Result<()> {
    let cli = Cli::parse();
    // config サブコマンドは壊れた設定ファイルでも動かす（--reset で復旧するため）
    let (mut config, load_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) if matches!(cli.command, Commands::Config { .. }) => (Config::default(), Some(e)),
        Err(e) => return Err(e),
    };

    if let Some(dir) = cli.template_dir.clone() {
        config.template_dir = dir;
    }
    if let Some(log_file) = cli.log_file.clone() {
        config.log_file = log_file;
    }

    logging::init(&config.log_file, cli.verbose)?;
    tracing::info!(command = command_name(&cli.command), "開始");
    if let Some(e) = &load_error {
        tracing::warn!(error = %e, "設定ファイルを読めないため既定値を使用");
    }

    match cli.command {
        Commands::Clear { customer } => {
            println!("🧹 cimt-bot - CIMTクリア\n");
            let mut bot = live_automator(&config)?;
            bot.cimt_clear(&customer)?;
            println!("\n✅ 完了");
        }

        Commands::Batch { file, column, yes } => {
            println!("📋 cimt-bot - 一括クリア\n");

            println!("[1/2] シートを読み込み中...");
            let table = sheet::read_sheet(&file)?;
            let customers = table.column(column.as_deref())?;
            println!("✔ {}件の顧客コードを検出\n", customers.len());

            if customers.is_empty() {
                return Err(error::BotError::InvalidArgument(format!(
                    "顧客コードがありません: {}",
                    file.display()
                )));
            }

            if !yes && !confirm_start(customers.len())? {
                println!("中止しました");
                return Ok(());
            }

            println!("[2/2] CIMTクリア中...");
            let started_at = chrono::Local::now();
            let progress = ProgressBar::new(customers.len() as u64);
            progress.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );

            let mut bot = live_automator(&config)?;
            let summary = bot.cimt_clear_all(&customers, |customer, result| {
                if let Err(e) = result {
                    progress.println(format!("⚠ {}: {}", customer, e));
                }
                progress.set_message(customer.to_string());
                progress.inc(1);
            })?;
            progress.finish_and_clear();

            println!("\n開始: {}", started_at.format("%Y-%m-%d %H:%M:%S"));
            println!("成功: {}件 / 失敗: {}件 (全{}件)", summary.succeeded.len(), summary.failed.len(), summary.total());
            for (customer, message) in &summary.failed {
                println!("  ✗ {}: {}", customer, message);
            }
            println!("\n✅ 一括処理完了");
        }

        Commands::Reset { screen } => {
            println!("🧭 cimt-bot - {}へ移動\n", screen);
            let mut bot = live_automator(&config)?;
            let outcome = bot.reset(screen)?;
            for name in &outcome.missed {
                println!("⚠ 画面上に見つかりません: {}", name);
            }
            println!("\n✅ 完了");
        }

        Commands::Click { template } => {
            let mut bot = live_automator(&config)?;
            bot.templates().ensure_exists(&[template.as_str()])?;
            if bot.find_and_click(&template)? {
                println!("✔ クリックしました: {}", template);
            } else {
                println!("⚠ 画面上に見つかりません: {}", template);
            }
        }

        Commands::Type { template, text } => {
            let mut bot = live_automator(&config)?;
            bot.templates().ensure_exists(&[template.as_str()])?;
            if bot.find_type_and_confirm(&template, &text)? {
                println!("✔ 入力しました: {}", text);
            } else {
                println!("⚠ 画面上に見つかりません: {}", template);
            }
        }

        Commands::Wait { template, timeout, interval } => {
            let timeout = timeout.map(std::time::Duration::from_secs).unwrap_or_else(|| config.detect_timeout());
            let interval = interval
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.detect_interval());

            let mut bot = live_automator(&config)?;
            bot.templates().ensure_exists(&[template.as_str()])?;
            println!("⏳ {} を待機中 (最大{}秒)...", template, timeout.as_secs());
            if bot.wait_for_image(&template, timeout, interval)? {
                println!("✔ 検出しました");
            } else {
                return Err(error::BotError::Timeout {
                    what: format!("{} の検出", template),
                    secs: timeout.as_secs(),
                });
            }
        }

        Commands::Rows { file } => {
            let table = sheet::read_sheet(&file)?;
            println!("{}", table.headers.join("\t"));
            for row in &table.rows {
                println!("{}", row.join("\t"));
            }
            println!("\n{}行", table.len());
        }

        Commands::Templates => {
            let library = TemplateLibrary::new(&config.template_dir);
            println!("テンプレート: {}", library.dir().display());
            for name in library.list()? {
                println!("  {}", name);
            }
            println!("\n必須画像:");
            for name in templates::REQUIRED_TEMPLATES {
                let mark = if library.path(name).is_file() { "✔" } else { "✗" };
                println!("  {} {}", mark, name);
            }
        }

        Commands::Capture { output, region } => {
            let mut desktop = LiveDesktop::new()?;
            let screen = desktop.capture()?;
            let image = match region {
                Some(region) => vision::crop(&screen, region),
                None => screen,
            };
            image.save(&output)?;
            println!("✔ 保存しました: {} ({}x{})", output.display(), image.width(), image.height());
        }

        Commands::Config { show, set_template_dir, set_timeout, set_sentinel_color, reset } => {
            let mut config = if reset {
                let config = Config::reset()?;
                println!("✔ 設定を初期化しました: {}", Config::config_path()?.display());
                config
            } else {
                Config::load().map_err(|e| {
                    error::BotError::Config(format!("{} (config --reset で初期化できます)", e))
                })?
            };
            let changed = set_template_dir.is_some() || set_timeout.is_some() || set_sentinel_color.is_some();

            if let Some(dir) = set_template_dir {
                config.template_dir = dir;
            }
            if let Some(secs) = set_timeout {
                config.clear_timeout_secs = secs;
            }
            if let Some(color) = set_sentinel_color {
                config.sentinel_color = color;
            }

            if changed {
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !(changed || reset) {
                println!("設定:");
                println!("  テンプレート: {}", config.template_dir.display());
                println!("  照合閾値: {}", config.confidence);
                println!("  試行回数: {} ({}ms間隔)", config.max_attempts, config.retry_interval_ms);
                println!("  センチネル色: {} (許容差 {})", config.sentinel_color, config.color_tolerance);
                match config.sentinel_region {
                    Some(region) => println!("  検出範囲: {}", region),
                    None => println!("  検出範囲: 画面全体"),
                }
                println!("  クリアのタイムアウト: {}秒", config.clear_timeout_secs);
                println!("  ログ: {}", config.log_file.display());
            }
        }
    }

    Ok(())
}

fn live_automator(config: &Config) -> Result<Automator<LiveDesktop>> {
    let desktop = LiveDesktop::new()?;
    let library = TemplateLibrary::new(&config.template_dir);
    Ok(Automator::new(desktop, library, config.clone()))
}

fn confirm_start(count: usize) -> Result<bool> {
    println!("端末画面を前面に表示してから開始してください。");
    dialoguer::Confirm::new()
        .with_prompt(format!("{}件のCIMTクリアを開始しますか?", count))
        .default(true)
        .interact()
        .map_err(|e| error::BotError::Io(std::io::Error::other(e.to_string())))
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Clear { .. } => "clear",
        Commands::Batch { .. } => "batch",
        Commands::Reset { .. } => "reset",
        Commands::Click { .. } => "click",
        Commands::Type { .. } => "type",
        Commands::Wait { .. } => "wait",
        Commands::Rows { .. } => "rows",
        Commands::Templates => "templates",
        Commands::Capture { .. } => "capture",
        Commands::Config { .. } => "config",
    }
}
