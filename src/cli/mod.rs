use clap::{Parser, Subcommand, ValueEnum};
use eyre::Result;

use crate::fan::Direction;

mod config;
mod run;
mod send;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate a configuration file and print the device summary
    Config {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    /// Supervise all configured devices and their auto timers until ctrl-c
    Run {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,
    },

    /// Issue a single command to one device
    Send {
        #[arg(short, long, default_value = "config.yaml")]
        config: String,

        #[arg(short, long)]
        device: String,

        #[command(subcommand)]
        action: SendAction,
    },
}

#[derive(Subcommand)]
pub enum SendAction {
    Power { on: bool },
    Speed { percent: u8 },
    Swing { on: bool },
    Direction { direction: DirectionArg },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
#[clap(rename_all = "kebab-case")]
pub enum DirectionArg {
    Clockwise,
    CounterClockwise,
}

pub async fn run() -> Result<()> {
    execute_command(Cli::parse().command).await
}

async fn execute_command(command: Command) -> Result<()> {
    match command {
        Command::Config { config } => self::config::read_and_print(&config).await,
        Command::Run { config } => self::run::launch(&config).await,

        Command::Send {
            config,
            device,
            action,
        } => self::send::issue(&config, &device, action).await,
    }
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Clockwise => Direction::Clockwise,
            DirectionArg::CounterClockwise => Direction::CounterClockwise,
        }
    }
}
