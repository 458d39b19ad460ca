mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "schooling-ics")]
#[command(about = "スクーリング日程をICSに書き出すツール")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// 科目の選択と学期設定
#[derive(Args, Clone)]
pub struct SelectionArgs {
    /// 科目カタログ (JSON または YAML)
    #[arg(short, long)]
    pub courses: String,

    /// 対象の科目コード（カンマ区切り、省略時はカタログ全体）
    #[arg(long, value_delimiter = ',')]
    pub codes: Vec<String>,

    /// 学期設定 (JSON)。省略時は既定の学期
    #[arg(short, long)]
    pub term: Option<String>,

    /// 追加の休講日ICS
    #[arg(long)]
    pub holiday_ics: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// 生成されるセッションを一覧表示
    Sessions {
        #[command(flatten)]
        selection: SelectionArgs,

        /// 出力形式
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// エクスポート内容の集計を表示
    Summary {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// ICSファイルを生成
    Generate {
        #[command(flatten)]
        selection: SelectionArgs,

        /// 出力ファイルパス（省略時は keio-courses-YYYY-MM-DD.ics）
        #[arg(short, long)]
        output: Option<String>,

        /// カレンダー名
        #[arg(long)]
        calendar_name: Option<String>,

        /// 行の折り返しを無効にする
        #[arg(long)]
        no_fold: bool,

        /// 集計だけ表示して書き出さない
        #[arg(long)]
        dry_run: bool,
    },

    /// 同じ曜日に重なる科目を表示
    Conflicts {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// 学期設定をJSONで表示
    Term {
        /// 学期設定 (JSON)。省略時は既定の学期
        #[arg(short, long)]
        term: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ログレベル
    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("schooling_ics_cli={0},schooling_ics_core={0}", log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Sessions { selection, format } => {
            commands::sessions_command(&selection, format)
        }
        Commands::Summary { selection } => commands::summary_command(&selection),
        Commands::Generate {
            selection,
            output,
            calendar_name,
            no_fold,
            dry_run,
        } => commands::generate_command(commands::GenerateParams {
            selection,
            output,
            calendar_name,
            fold_lines: !no_fold,
            dry_run,
        }),
        Commands::Conflicts { selection } => commands::conflicts_command(&selection),
        Commands::Term { term } => commands::term_command(term.as_deref()),
    }
}
