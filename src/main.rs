// ==========================================
// Excel2DB - 命令行入口
// ==========================================
// 用法:
//   excel2db import <template> <file> [db_path]
//   excel2db template <template> <out.xlsx>
//   excel2db templates
// ==========================================

use anyhow::{bail, Context};
use excel2db::api::import_success_message;
use excel2db::app::{get_default_db_path, AppState, DB_PATH_ENV};
use excel2db::config::ConfigManager;
use excel2db::importer::TemplateGenerator;
use std::path::PathBuf;

const USAGE: &str = "用法:
  excel2db import <template> <file> [db_path]
  excel2db template <template> <out.xlsx>
  excel2db templates";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    excel2db::logging::init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();

    match command.as_str() {
        "import" => {
            let (template_id, file) = match (args.next(), args.next()) {
                (Some(t), Some(f)) => (t, PathBuf::from(f)),
                _ => bail!("{}", USAGE),
            };
            let state = build_state(args.next())?;

            let report = state
                .import_api
                .import_path(&template_id, file)
                .await
                .with_context(|| format!("导入失败 (模板 {})", template_id))?;

            println!("{}", import_success_message(report.imported));
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "template" => {
            let (template_id, out) = match (args.next(), args.next()) {
                (Some(t), Some(o)) => (t, PathBuf::from(o)),
                _ => bail!("{}", USAGE),
            };
            let state = build_state(None)?;
            TemplateGenerator::new(&state.registry).save(&template_id, &out)?;
            println!("{}", out.display());
        }
        "templates" => {
            let state = build_state(None)?;
            for summary in state.import_api.list_templates() {
                println!(
                    "{}\t{}\t{}\t{}",
                    summary.id,
                    summary.display_name,
                    summary.table,
                    summary.columns.join(",")
                );
            }
        }
        _ => bail!("{}", USAGE),
    }

    Ok(())
}

fn build_state(db_arg: Option<String>) -> anyhow::Result<AppState> {
    let config = ConfigManager::load_default()?;
    let db_path = db_arg
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .or_else(|| {
            std::env::var(DB_PATH_ENV)
                .ok()
                .filter(|p| !p.trim().is_empty())
        })
        .or_else(|| config.db_path().map(str::to_string))
        .unwrap_or_else(get_default_db_path);

    tracing::info!(db_path = %db_path, version = excel2db::VERSION, "{}", excel2db::APP_NAME);
    AppState::new(db_path, config).map_err(anyhow::Error::msg)
}
