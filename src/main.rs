use casefile::prelude::*;
use clap::Parser;

use casefile::app::{LogConfig, execute, init_logging};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(&LogConfig::new(args.log_level, args.log_format)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    CliApp::new("casefile")
        .run(|mut stdout| async move {
            let report = execute(&args, &mut stdout).await?;
            Ok(report.status)
        })
        .await
}
