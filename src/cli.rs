use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "t-docker",
    version,
    about = "A terminal dashboard for local Docker containers."
)]
pub struct CliArgs {
    /// Docker-compatible binary used for listing and container actions
    #[arg(long)]
    pub docker_bin: Option<String>,

    /// Path to a YAML config file (overrides discovery)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Animation tick in milliseconds
    #[arg(long, default_value_t = 100)]
    pub tick_ms: u64,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the container list once and exit
    Ps,
}

#[cfg(test)]
mod tests {
    use super::{CliArgs, Command};
    use clap::Parser;

    #[test]
    fn defaults_start_the_dashboard() {
        let args = CliArgs::try_parse_from(["t-docker"]).expect("defaults");
        assert!(args.command.is_none());
        assert_eq!(args.tick_ms, 100);
        assert_eq!(args.log_filter, "info");
        assert!(args.docker_bin.is_none());
    }

    #[test]
    fn parses_ps_subcommand_with_overrides() {
        let args =
            CliArgs::try_parse_from(["t-docker", "--docker-bin", "podman", "ps"]).expect("ps");
        assert!(matches!(args.command, Some(Command::Ps)));
        assert_eq!(args.docker_bin.as_deref(), Some("podman"));
    }
}
