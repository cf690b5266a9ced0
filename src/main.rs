use actix::prelude::*;
use log::{error, info};
use partdown::cli;
use partdown::core::{AwcTransport, FetchOptions, Orchestrator};
use partdown::ui::{self, DownloadSummary, Finish, ProgressActor};
use partdown::utils::logger;

/// 分块不完整时的退出码
const EXIT_INCOMPLETE: i32 = 3;

#[actix::main]
async fn main() -> anyhow::Result<()> {
    // 解析参数和配置
    let (args, config) = match cli::Args::parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            ui::print_error(&format!("参数解析失败: {}", e));
            std::process::exit(1);
        }
    };

    if args.write_config {
        config.save_with_tutorial(&args.config)?;
        ui::print_success(&format!("配置文件已写入: {}", args.config));
        return Ok(());
    }

    if let Err(e) = logger::init(&config) {
        ui::print_warning(&format!("{}", e));
    }
    info!("配置文件路径: {}", args.config);
    info!("{}", config.get_summary());

    let job = match args.to_job(&config) {
        Ok(job) => job,
        Err(e) => {
            error!("创建下载任务失败: {}", e);
            ui::print_error(&format!("{}", e));
            std::process::exit(1);
        }
    };

    let progress = ProgressActor::new(args.quiet || args.json).start();
    let orchestrator = Orchestrator::new(AwcTransport::new(&config), FetchOptions::from_config(&config))
        .with_events(progress.clone().recipient());

    let result = orchestrator.run(&job).await;
    progress.send(Finish).await?;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            ui::print_error(&format!("{}", e));
            std::process::exit(1);
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", DownloadSummary(&report));
    }

    if report.is_complete() {
        if !args.json {
            ui::print_success(&format!("下载完成: {}", report.destination.display()));
        }
        Ok(())
    } else {
        ui::print_error(&format!(
            "下载不完整: {} 个分块失败，{} 缺失 {} 个范围",
            report.failed_chunks().count(),
            report.destination.display(),
            report.merge.missing_ranges.len()
        ));
        std::process::exit(EXIT_INCOMPLETE);
    }
}
