mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "protrl")]
#[command(about = "Train and run reinforcement learning agents for protein design", long_about = None)]
struct Cli {
    /// Log level of the fmt subscriber (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Seed of the global rng
    #[arg(long, global = true, default_value_t = 0)]
    seed: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the policy that picks the residue for a given position
    TrainMutation(TrainMutationArgs),
    /// Train the policy that picks the position to edit
    TrainPosition(TrainPositionArgs),
    /// Run the two trained policies against the oracle
    Design(DesignArgs),
    /// Compare mutation sources on randomly mutated wild types
    Evaluate(EvaluateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Cpu,
    Cuda,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggesterKind {
    Plm,
    Policy,
    Random,
}

#[derive(Args, Debug, Clone)]
pub struct OracleArgs {
    /// Protein target (GFP or AAV)
    #[arg(long, default_value = "GFP")]
    pub protein: String,

    /// Safetensors weights of the fitness oracle
    #[arg(long)]
    pub oracle_checkpoint: PathBuf,

    #[arg(long, value_enum, default_value_t = DeviceType::Cpu)]
    pub device: DeviceType,
}

#[derive(Args, Debug, Clone)]
pub struct TrainingArgs {
    #[arg(long, default_value_t = 100_000)]
    pub total_steps: usize,

    /// Steps per episode
    #[arg(long, default_value_t = 20)]
    pub max_steps: usize,

    /// Directory of the numbered and the final checkpoints
    #[arg(long, default_value = "checkpoints")]
    pub save_dir: PathBuf,

    /// Environment steps between checkpoints
    #[arg(long, default_value_t = 10_000)]
    pub save_freq: usize,

    /// JSON lines file of the episode metrics, logged through tracing when absent
    #[arg(long)]
    pub metrics: Option<PathBuf>,

    /// JSON file overriding the PPO hyper-parameters
    #[arg(long)]
    pub ppo_config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainMutationArgs {
    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub training: TrainingArgs,
}

#[derive(Args, Debug)]
pub struct TrainPositionArgs {
    #[command(flatten)]
    pub oracle: OracleArgs,

    #[command(flatten)]
    pub training: TrainingArgs,

    /// Where the residues written by the environment come from
    #[arg(long, value_enum, default_value_t = SuggesterKind::Plm)]
    pub suggester: SuggesterKind,

    /// Weights of the masked language model, for `--suggester plm`
    #[arg(long)]
    pub plm_checkpoint: Option<PathBuf>,

    /// Weights of a trained mutation policy, for `--suggester policy`
    #[arg(long)]
    pub mutation_policy: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DesignArgs {
    #[command(flatten)]
    pub oracle: OracleArgs,

    #[arg(long)]
    pub position_policy: PathBuf,

    #[arg(long)]
    pub mutation_policy: PathBuf,

    /// JSON file with the PPO hyper-parameters the policies were trained with
    #[arg(long)]
    pub ppo_config: Option<PathBuf>,

    #[arg(long, default_value_t = 10)]
    pub iterations: usize,

    /// Starting sequence, the wild type of the protein when absent
    #[arg(long)]
    pub start: Option<String>,

    /// Writes the trajectory as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub oracle: OracleArgs,

    #[arg(long, default_value_t = 100)]
    pub samples: usize,

    /// Random mutations applied to the wild type of every trial
    #[arg(long, default_value_t = 2)]
    pub mutations: usize,

    #[arg(long)]
    pub plm_checkpoint: Option<PathBuf>,

    #[arg(long)]
    pub mutation_policy: Option<PathBuf>,

    #[arg(long)]
    pub ppo_config: Option<PathBuf>,

    /// Writes the comparison report as JSON
    #[arg(long)]
    pub output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level: Level = cli
        .log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level {:?}", cli.log_level))?;
    tracing_subscriber::fmt().with_max_level(level).init();
    protrl_core::rng::set_seed(cli.seed);

    match cli.command {
        Command::TrainMutation(args) => commands::train_mutation(args),
        Command::TrainPosition(args) => commands::train_position(args, cli.seed),
        Command::Design(args) => commands::design(args),
        Command::Evaluate(args) => commands::evaluate(args, cli.seed),
    }
}
