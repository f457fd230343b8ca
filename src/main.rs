//! Aprendiz CLI
//!
//! # Usage
//!
//! ```bash
//! # Minimise Rosenbrock with an optimizer config
//! aprendiz rosenbrock sgd.yaml
//!
//! # Override iterations and keep the optimizer state
//! aprendiz rosenbrock sgd.yaml --iterations 500 --save-state state.json
//!
//! # Validate config
//! aprendiz validate sgd.yaml
//!
//! # One training step of the MNIST-shaped network
//! aprendiz check-net --seed 7
//! ```

use aprendiz::config::{
    apply_overrides, build_optimizer, load_config, run_rosenbrock, CheckNetArgs, Cli, Command,
    RosenbrockArgs, ValidateArgs,
};
use aprendiz::io::{save_state_dict, SaveConfig, StateFormat};
use aprendiz::nn::check_net;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };
    init_tracing(log_level);

    let result = match cli.command {
        Command::Rosenbrock(args) => run_rosenbrock_command(args, log_level),
        Command::Validate(args) => run_validate(args, log_level),
        Command::CheckNet(args) => run_check_net(args, log_level),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum LogLevel {
    Quiet,
    Normal,
    Verbose,
}

/// RUST_LOG wins over the flags when set
fn init_tracing(level: LogLevel) {
    let default = match level {
        LogLevel::Quiet => "error",
        LogLevel::Normal => "warn",
        LogLevel::Verbose => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn log(level: LogLevel, required: LogLevel, msg: &str) {
    if level != LogLevel::Quiet && (level == required || required == LogLevel::Normal) {
        println!("{msg}");
    }
}

fn run_rosenbrock_command(args: RosenbrockArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Aprendiz: Rosenbrock from {}", args.config.display()),
    );

    let mut spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    apply_overrides(&mut spec, &args);

    let run = run_rosenbrock(&spec).map_err(|e| format!("Optimization error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!(
            "Final point: ({:.6}, {:.6}) after {} iterations",
            run.point[0], run.point[1], run.iterations
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Loss: {:.6} -> {:.6}",
            run.initial_loss, run.final_loss
        ),
    );
    log(
        level,
        LogLevel::Verbose,
        &format!("  Distance to (1, 1): {:.6}", run.distance_to_minimum()),
    );

    if let Some(path) = &args.save_state {
        let format = StateFormat::from_path(path).map_err(|e| format!("State error: {e}"))?;
        save_state_dict(&run.state, path, &SaveConfig::new(format))
            .map_err(|e| format!("State error: {e}"))?;
        log(
            level,
            LogLevel::Normal,
            &format!("Optimizer state saved to {}", path.display()),
        );
    }

    Ok(())
}

fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(
        level,
        LogLevel::Normal,
        &format!("Validating config: {}", args.config.display()),
    );

    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    let groups = spec.optimizer.param_groups.len().max(1);
    let params = spec
        .optimizer
        .param_groups
        .iter()
        .flat_map(|g| g.params.iter())
        .max()
        .map_or(1, |&p| p + 1);
    let optimizer =
        build_optimizer(&spec.optimizer, params).map_err(|e| format!("Build error: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");
    log(
        level,
        LogLevel::Verbose,
        &format!("  Parameter groups: {groups}"),
    );
    log(level, LogLevel::Verbose, &optimizer.to_string());

    Ok(())
}

fn run_check_net(args: CheckNetArgs, level: LogLevel) -> Result<(), String> {
    let (before, after) =
        check_net(args.seed, args.lr).map_err(|e| format!("Network error: {e}"))?;

    log(
        level,
        LogLevel::Normal,
        &format!("Net loss: {before:.6} -> {after:.6} (seed {}, lr {})", args.seed, args.lr),
    );
    Ok(())
}
