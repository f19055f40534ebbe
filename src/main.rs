use std::{
    fs,
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use kindle::bytecode::{self, ProgramBc, binary, disasm::print_bc, text};
use kindle::frontend::{lexer::Lexer, token_dumper::TokenDumper};
use kindle::runtime::{ConsoleInteraction, Vm, VmConfig};
use kindle::{compile_source, lang::Value};

#[derive(Parser, Debug)]
#[command(name = "kindle")]
#[command(about = "Compile and run Kindle programs on a stack bytecode VM", version)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    limits: Limits,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Limits {
    /// Abort after this many executed instructions
    #[arg(long, env = "KINDLE_MAX_STEPS", global = true)]
    max_steps: Option<usize>,

    /// Maximum nesting of function calls
    #[arg(long, env = "KINDLE_MAX_CALL_DEPTH", global = true)]
    max_call_depth: Option<usize>,
}

impl Limits {
    fn config(&self) -> VmConfig {
        let mut config = VmConfig {
            max_steps: self.max_steps,
            ..VmConfig::default()
        };
        if let Some(depth) = self.max_call_depth {
            config.max_call_depth = depth;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile source to bytecode
    Compile {
        #[arg(short, long)]
        source: PathBuf,

        #[arg(short, long, default_value = "output.byte")]
        output: PathBuf,

        /// Write the binary container instead of text
        #[arg(long)]
        binary: bool,
    },

    /// Execute a bytecode file (text or binary)
    Exec {
        #[arg(short, long)]
        bytecode: PathBuf,
    },

    /// Compile and execute source without writing bytecode
    Run {
        #[arg(short, long)]
        source: PathBuf,
    },

    /// Show the token stream of a source file
    Tokens {
        #[arg(short, long)]
        source: PathBuf,

        #[arg(long)]
        no_color: bool,

        #[arg(long)]
        pretty: bool,
    },

    /// Print a readable listing of a bytecode file
    Disasm {
        #[arg(short, long)]
        bytecode: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "kindle=debug",
            _ => "kindle=trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.limits.config();

    match cli.command {
        Command::Compile {
            source,
            output,
            binary: as_binary,
        } => {
            let bytecode = compile_file(&source)?;
            let contents = if as_binary {
                binary::to_bytes(&bytecode)?
            } else {
                text::write_text(&bytecode).into_bytes()
            };
            fs::write(&output, contents)
                .with_context(|| format!("cannot write '{}'", output.display()))?;
            info!(output = %output.display(), "wrote bytecode");
        }

        Command::Exec { bytecode } => {
            let program = load_bytecode(&bytecode)?;
            execute(&program, config)?;
        }

        Command::Run { source } => {
            let program = compile_file(&source)?;
            execute(&program, config)?;
        }

        Command::Tokens {
            source,
            no_color,
            pretty,
        } => {
            let text = read_source(&source)?;
            let tokens = Lexer::new(&text)
                .tokenize()
                .with_context(|| format!("in '{}'", source.display()))?;

            let mut dumper = TokenDumper::new();
            if no_color {
                dumper = dumper.no_color();
            }
            if pretty {
                dumper = dumper.pretty();
            }
            dumper.dump(&tokens);
        }

        Command::Disasm { bytecode } => {
            let program = load_bytecode(&bytecode)?;
            print_bc(&program);
        }
    }

    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read '{}'", path.display()))
}

fn compile_file(path: &Path) -> Result<ProgramBc> {
    let source = read_source(path)?;
    compile_source(&source).with_context(|| format!("in '{}'", path.display()))
}

fn load_bytecode(path: &Path) -> Result<ProgramBc> {
    let bytes = fs::read(path).with_context(|| format!("cannot read '{}'", path.display()))?;
    bytecode::load(&bytes).with_context(|| format!("in '{}'", path.display()))
}

fn execute(program: &ProgramBc, config: VmConfig) -> Result<()> {
    let mut vm = Vm::with_config(ConsoleInteraction, config);
    let result = vm.run(program)?;
    if result != Value::None {
        debug!(result = %result, "main returned");
    }
    Ok(())
}
