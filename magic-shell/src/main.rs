use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use magic_core::{LoginShellLocator, PtyBridge};
use tracing::{error, info};

use magic_shell::cli::Cli;
use magic_shell::logging::{self, LogTarget};
use magic_shell::telemetry::CommandTimer;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("magic-shell: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let target = logging::init(cli.log_file.as_deref());

    let config = cli.bridge_config(&LoginShellLocator)?;
    let mut bridge = PtyBridge::new(config);

    if cli.info {
        let info = serde_json::to_string_pretty(&bridge.shell_info()).context("cannot encode shell info")?;
        println!("{info}");
        return Ok(0);
    }

    if let LogTarget::File(path) = &target {
        info!("magic-shell {} logging to {}", env!("CARGO_PKG_VERSION"), path.display());
    }
    if cli.stage {
        info!("stage mode on");
    }

    bridge.subscribe(CommandTimer::new());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let code = runtime.block_on(bridge.run())?;
    Ok(code)
}
