mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{
    EXIT_ABORTED, EXIT_CONFIG_ERROR, EXIT_DEADLINE_EXCEEDED, EXIT_FAILURE, EXIT_STORE_ERROR,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use testbed_core::{install_signal_handler, ReconcileOptions};

#[derive(Debug, Parser)]
#[command(
    name = "testbed",
    version,
    about = "Configuration lifecycle manager for EC2 test clusters"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a configuration from the default template and TESTBED_EC2_* overrides.
    Init {
        /// Where to write the configuration. A temp path is chosen when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Load a configuration, apply overrides, re-validate, and save it.
    Finalize {
        /// Path to the configuration YAML file.
        config: PathBuf,
    },
    /// Print a saved configuration.
    Show {
        /// Path to the configuration YAML file.
        config: PathBuf,
    },
    /// Print SSH and SCP commands for every recorded instance.
    Ssh {
        /// Path to the configuration YAML file.
        config: PathBuf,
    },
    /// Apply the aws-auth ConfigMap so instances can join the cluster.
    ApplyNodeAuth {
        /// Path to the configuration YAML file.
        config: PathBuf,
        /// Give up after this long.
        #[arg(long, value_parser = humantime::parse_duration, default_value = "5m")]
        deadline: Duration,
        /// Pause before each attempt.
        #[arg(long, value_parser = humantime::parse_duration, default_value = "5s")]
        retry_delay: Duration,
        /// Upper bound for one kubectl call.
        #[arg(long, value_parser = humantime::parse_duration, default_value = "15s")]
        attempt_timeout: Duration,
    },
    /// List the built-in init script plugins.
    Plugins,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TESTBED_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Init { config } => commands::init::run(config.as_deref(), json_output),
        Commands::Finalize { config } => commands::finalize::run(&config, json_output),
        Commands::Show { config } => commands::show::run(&config, json_output),
        Commands::Ssh { config } => commands::ssh::run(&config, json_output),
        Commands::ApplyNodeAuth {
            config,
            deadline,
            retry_delay,
            attempt_timeout,
        } => {
            let interrupted = install_signal_handler();
            let stop = interrupted.child_token();
            commands::apply_node_auth::run(
                &config,
                ReconcileOptions {
                    retry_delay,
                    attempt_timeout,
                    deadline,
                },
                &stop,
                json_output,
            )
        }
        Commands::Plugins => commands::plugins::run(json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("config error:") {
        EXIT_CONFIG_ERROR
    } else if msg.starts_with("store error:") || msg.starts_with("config lock:") {
        EXIT_STORE_ERROR
    } else if msg.starts_with("aborted") {
        EXIT_ABORTED
    } else if msg.starts_with("deadline of") {
        EXIT_DEADLINE_EXCEEDED
    } else {
        EXIT_FAILURE
    }
}
