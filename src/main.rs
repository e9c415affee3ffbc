use anyhow::Result;
use clap::Parser;
use log::error;

use ghinstaller::cli::{self, Cmd, InstallArgs};
use ghinstaller::runners;

fn main() {
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    match rt.block_on(real_main()) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

async fn real_main() -> Result<i32> {
    let args = cli::Args::parse();

    match args.sub.unwrap_or(Cmd::Install(InstallArgs::default())) {
        Cmd::Install(install) => runners::run_install(install).await.map(|_| 0),
        Cmd::Scan { dir, config } => {
            let found = runners::run_scan(&dir, config.as_deref())?;
            Ok(if found { 0 } else { 1 })
        }
    }
}
