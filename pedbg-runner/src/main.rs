//! P&E Micro debug probe runner - Main Entry Point

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};

use pedbg_runner::config::RunnerArgs;
use pedbg_runner::platform::{self, HostOs};
use pedbg_runner::selection::{Fixed, Prompt, RequireUnique, Resolver};
use pedbg_runner::{
    Action, Args, Config, DebugLauncher, DebugProbeBackend, NxpPeDebugProbe, PeDebugProbe,
    Result, SystemRunner,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting pedbg-runner v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command line args: {:?}", args);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let common = args.runner.common();
    let host = HostOs::current();
    let arch = platform::read_build_arch(&common.build_dir)?;
    let config = Config::from_args(common, host, arch)?;
    let action = common.action;

    match args.runner {
        RunnerArgs::Pedbg(pedbg) => {
            let backend = PeDebugProbe::new(pedbg.device, pedbg.sdk_path, pedbg.pemicro_plugin_path);
            execute(backend, config, action).await
        }
        RunnerArgs::NxpPedbg(nxp) => {
            let resolver: Box<dyn Resolver> = match nxp.select_plugin {
                Some(choice) => Box::new(Fixed(choice)),
                None if std::io::stdin().is_terminal() => Box::new(Prompt::stdio()),
                None => Box::new(RequireUnique),
            };
            let backend = NxpPeDebugProbe::new(
                nxp.soc_name,
                nxp.nxpide_path,
                nxp.pemicro_plugin_path,
                resolver,
            );
            execute(backend, config, action).await
        }
    }
}

async fn execute<B: DebugProbeBackend>(backend: B, config: Config, action: Action) -> Result<()> {
    let dry_run = config.dry_run;
    let mut launcher = DebugLauncher::new(backend, config, SystemRunner);

    if dry_run {
        let report = launcher.dry_run(action).await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    launcher.run(action).await
}

fn init_logging(args: &Args) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    if let Some(log_file) = &args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    debug!("Logging initialized with level: {}", args.log_level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pedbg_runner::config::{Args, RunnerArgs};

    #[test]
    fn test_args_parsing_log_options() {
        let args = Args::parse_from([
            "pedbg-runner",
            "--log-level", "debug",
            "--log-file", "/tmp/pedbg.log",
            "nxp_pedbg", "attach",
            "--soc-name", "S32K148",
        ]);
        assert_eq!(args.log_level, "debug");
        assert_eq!(args.log_file.unwrap().to_str().unwrap(), "/tmp/pedbg.log");
        assert!(matches!(args.runner, RunnerArgs::NxpPedbg(_)));
    }

    #[test]
    fn test_args_parsing_dry_run() {
        let args = Args::parse_from([
            "pedbg-runner", "pedbg", "debug",
            "--device", "X",
            "--pemicro-plugin-path", "/opt/pemicro",
            "--dry-run",
        ]);
        assert!(args.runner.common().dry_run);
    }
}
