use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use softsat_core::{
    minimize, seed_values, truth_values, ComputationGraph, DescentConfig, DEFAULT_MAX_DEPTH,
};
use softsat_dimacs::Cnf;

#[derive(Parser, Debug)]
#[command(name = "softsat")]
#[command(about = "Gradient-descent search over soft-logic clauses", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Minimize the clause cost and print each variable's truth value
    Solve {
        /// Program file: variable count, then one clause per line (stdin if omitted or '-')
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Read the input as DIMACS CNF
        #[arg(long)]
        dimacs: bool,

        /// Descent settings to start from; the flags below override them
        #[arg(short, long, value_enum, default_value = "default")]
        preset: Preset,

        /// Deepest gate nesting accepted in one clause
        #[arg(long = "max-depth", value_name = "DEPTH", default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Gradient step size
        #[arg(short = 'r', long = "learning-rate")]
        learning_rate: Option<f64>,

        /// Number of descent iterations
        #[arg(short = 'n', long)]
        iterations: Option<usize>,

        /// Initial values are drawn from [0, SCALE)
        #[arg(long = "init-scale", value_name = "SCALE")]
        init_scale: Option<f64>,

        /// Seed for the initial values (random if omitted)
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Convert a DIMACS CNF file into program text
    Dimacs {
        /// Input .cnf file (stdin if '-')
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Named descent settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Large steps, few iterations
    Quick,
    /// Step 0.1 for 4000 iterations
    Default,
    /// Small steps, many iterations
    Thorough,
}

impl Preset {
    fn config(self) -> DescentConfig {
        match self {
            Preset::Quick => DescentConfig::quick(),
            Preset::Default => DescentConfig::default(),
            Preset::Thorough => DescentConfig::thorough(),
        }
    }
}

/// Read a file, or stdin for `-` or no path.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

fn load_graph(path: Option<&Path>, dimacs: bool, max_depth: usize) -> Result<ComputationGraph> {
    let text = read_input(path)?;
    let graph = if dimacs {
        let cnf = Cnf::parse(&text).context("invalid DIMACS input")?;
        cnf.to_graph_with_max_depth(max_depth)?
    } else {
        ComputationGraph::from_program_with_max_depth(&text, max_depth)
            .context("invalid program")?
    };
    Ok(graph)
}

fn descent_config(
    preset: Preset,
    learning_rate: Option<f64>,
    iterations: Option<usize>,
    init_scale: Option<f64>,
) -> DescentConfig {
    let base = preset.config();
    DescentConfig::new(
        learning_rate.unwrap_or(base.learning_rate),
        iterations.unwrap_or(base.iterations),
        init_scale.unwrap_or(base.init_scale),
    )
}

fn format_values(truths: &[f64]) -> String {
    truths
        .iter()
        .enumerate()
        .map(|(i, t)| format!("${} = {:.6}\n", i, t))
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            file,
            dimacs,
            preset,
            max_depth,
            learning_rate,
            iterations,
            init_scale,
            seed,
        } => {
            let mut graph = load_graph(file.as_deref(), dimacs, max_depth)?;
            let config = descent_config(preset, learning_rate, iterations, init_scale);
            let seed = seed.unwrap_or_else(|| rand::thread_rng().next_u64());
            info!(
                "solving {} clauses over {} variables (seed {})",
                graph.clause_count(),
                graph.variable_count(),
                seed
            );

            let mut rng = StdRng::seed_from_u64(seed);
            let mut values = seed_values(graph.variable_count(), config.init_scale, &mut rng);
            let descent = minimize(&mut graph, &mut values, &config)?;
            info!(
                "final cost {:.6} after {} iterations",
                descent.cost, descent.iterations
            );

            print!("{}", format_values(&truth_values(&values)));
        }
        Commands::Dimacs { file } => {
            let text = read_input(Some(file.as_path()))?;
            let cnf = Cnf::parse(&text).context("invalid DIMACS input")?;
            print!("{}", cnf.to_program());
        }
    }

    Ok(())
}
