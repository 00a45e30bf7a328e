// ==========================================
// 周缺陷 PPM 追踪系统 - 命令行入口
// ==========================================
// 输出: stdout 为 JSON，日志写 stderr
// ==========================================

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use ppm_tracker::app::{get_default_db_path, AppState, DB_PATH_ENV};
use ppm_tracker::domain::{ActionPlanEntry, AnnualPpmUpdate, Category, WeekLabel};
use ppm_tracker::{i18n, logging};

/// 周缺陷 PPM 追踪系统
#[derive(Parser, Debug)]
#[command(name = "ppm-tracker")]
#[command(about = "Weekly defect PPM tracker: upload, rollover, pareto and root cause")]
#[command(version)]
struct Cli {
    /// 数据库文件路径
    #[arg(long, global = true, env = DB_PATH_ENV)]
    db: Option<PathBuf>,

    /// 消息语言（zh-CN / en / es）
    #[arg(long, global = true, default_value = "zh-CN")]
    locale: String,

    /// 日志输出为 JSON 行（stderr）
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 建库（幂等）
    Init,
    /// 导入分类参照表（Familia, Producto, Tipo）
    Families { file: PathBuf },
    /// 预览上传文件（不落库）
    Preview { file: PathBuf },
    /// 上传文件并切换到新的一周
    Upload {
        file: PathBuf,
        #[arg(long)]
        week: u32,
        /// 期望的当前世代号（不一致时拒绝）
        #[arg(long)]
        expected_generation: Option<i64>,
    },
    /// 帕累托表
    Pareto {
        category: Category,
        #[arg(long)]
        week: WeekLabel,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        historical: bool,
    },
    /// 根因与行动计划
    Actions {
        category: Category,
        #[arg(long)]
        week: WeekLabel,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        historical: bool,
    },
    /// 替换某根因行的行动计划（JSON 数组文件）
    SetActions {
        category: Category,
        row_id: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// 更新首条行动状态
    SetStatus {
        category: Category,
        row_id: String,
        status: String,
    },
    /// 历史中某年的周列表
    Weeks {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        category: Option<Category>,
    },
    /// 历史中的年份列表
    Years {
        #[arg(long)]
        category: Option<Category>,
    },
    /// 当前周
    Current,
    /// 导出条目 CSV
    Export {
        category: Category,
        #[arg(long)]
        week: WeekLabel,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        historical: bool,
        #[arg(long)]
        out: PathBuf,
    },
    /// 年度 PPM 表（可附带月度实绩 JSON 文件）
    Annual {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        updates: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }
    i18n::set_locale(&cli.locale);

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    run(&state, cli.command).await
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::Init => print_json(&state.db_path),
        Command::Families { file } => {
            let count = state
                .classification_api
                .import_families(&file.to_string_lossy())?;
            print_json(&count)
        }
        Command::Preview { file } => {
            let preview = state.upload_api.preview_file(&file.to_string_lossy()).await?;
            print_json(&preview)
        }
        Command::Upload {
            file,
            week,
            expected_generation,
        } => {
            let response = state
                .upload_api
                .upload_file(&file.to_string_lossy(), week, expected_generation)
                .await?;
            print_json(&response)
        }
        Command::Pareto {
            category,
            week,
            year,
            historical,
        } => print_json(&state.ppm_api.get_pareto(category, week, year, historical)?),
        Command::Actions {
            category,
            week,
            year,
            historical,
        } => print_json(
            &state
                .ppm_api
                .get_action_plan(category, week, year, historical)?,
        ),
        Command::SetActions {
            category,
            row_id,
            file,
        } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("读取行动计划文件失败: {}", file.display()))?;
            let actions: Vec<ActionPlanEntry> =
                serde_json::from_str(&raw).context("行动计划 JSON 格式错误")?;
            print_json(&state.ppm_api.update_action_plan(category, &row_id, actions)?)
        }
        Command::SetStatus {
            category,
            row_id,
            status,
        } => print_json(&state.ppm_api.update_status(category, &row_id, &status)?),
        Command::Weeks { year, category } => {
            print_json(&state.ppm_api.list_weeks(year, category)?)
        }
        Command::Years { category } => print_json(&state.ppm_api.list_years(category)?),
        Command::Current => print_json(&state.ppm_api.current_week()?),
        Command::Export {
            category,
            week,
            year,
            historical,
            out,
        } => {
            let rows = state
                .ppm_api
                .export_entries(week, year, category, historical, &out)?;
            print_json(&rows)
        }
        Command::Annual { year, updates } => {
            let rows = match updates {
                Some(file) => {
                    let raw = std::fs::read_to_string(&file)
                        .with_context(|| format!("读取月度实绩文件失败: {}", file.display()))?;
                    let updates: Vec<AnnualPpmUpdate> =
                        serde_json::from_str(&raw).context("月度实绩 JSON 格式错误")?;
                    state.annual_api.ensure_year(year)?;
                    state.annual_api.update_months(year, updates)?
                }
                None => state.annual_api.ensure_year(year)?,
            };
            print_json(&rows)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
