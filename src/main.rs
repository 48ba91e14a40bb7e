use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use rvlang::{Options, options::DEFAULT_STACK_BASE};

#[derive(Parser)]
#[command(name = "rvlangc")]
#[command(version)]
#[command(about = "Compile a program to register VM assembly", long_about = None)]
struct Cli {
  /// Source file; reads stdin when omitted or `-`
  #[arg(value_name = "FILE")]
  file: Option<PathBuf>,

  /// Write the output here instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,

  #[arg(long, value_enum, default_value_t = Emit::Asm)]
  emit: Emit,

  /// Fail when an expression needs more live registers than this
  #[arg(long)]
  max_registers: Option<u32>,

  /// Let `continue` run the step of a counted loop
  #[arg(long)]
  continue_runs_step: bool,

  /// Offset below which variables are allocated
  #[arg(long, default_value_t = DEFAULT_STACK_BASE)]
  stack_base: i32,

  /// Increase log verbosity (-v, -vv, -vvv)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
  Asm,
  Ast,
}

struct StderrLogger;

impl Log for StderrLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= log::max_level()
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      eprintln!("[{}] {}", record.level(), record.args());
    }
  }

  fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
  let level = match verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  };
  if log::set_logger(&LOGGER).is_ok() {
    log::set_max_level(level);
  }
}

fn read_source(file: Option<&PathBuf>) -> io::Result<String> {
  match file {
    Some(path) if path.as_os_str() != "-" => fs::read_to_string(path),
    _ => {
      let mut source = String::new();
      io::stdin().read_to_string(&mut source)?;
      Ok(source)
    }
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let source = match read_source(cli.file.as_ref()) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("{} cannot read input: {err}", "error:".red().bold());
      return ExitCode::FAILURE;
    }
  };
  let filename = cli
    .file
    .as_ref()
    .filter(|path| path.as_os_str() != "-")
    .map(|path| path.display().to_string());

  let options = Options {
    stack_base: cli.stack_base,
    max_registers: cli.max_registers,
    continue_runs_step: cli.continue_runs_step,
  };

  let result = rvlang::parse_program(&source).and_then(|program| match cli.emit {
    Emit::Ast => Ok(program.dump()),
    Emit::Asm => rvlang::compile_with(&program, &options),
  });

  let output = match result {
    Ok(output) => output,
    Err(err) => {
      let rendered = err.render(&source, filename.as_deref());
      let (headline, rest) = rendered.split_once('\n').unwrap_or((rendered.as_str(), ""));
      eprintln!("{}", headline.red().bold());
      eprint!("{rest}");
      return ExitCode::FAILURE;
    }
  };

  match &cli.output {
    Some(path) => {
      if let Err(err) = fs::write(path, output) {
        eprintln!("{} cannot write {}: {err}", "error:".red().bold(), path.display());
        return ExitCode::FAILURE;
      }
    }
    None => print!("{output}"),
  }
  ExitCode::SUCCESS
}
