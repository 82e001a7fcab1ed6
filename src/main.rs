// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::{io::{self, Write},
          path::{Path, PathBuf}};
use tracing::{error, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};
use tracklap::{chart, correlate, polyline, run_reports, save_directory,
               save_runs, track_points, ChartConfig, Encoding, JsonFile,
               JsonStore, Options, RecordTree, Result, Route, SaveOutcome,
               Source};


/// Correlate and export runs recorded by GPS sport watches.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Log progress; RUST_LOG takes precedence for everything else
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Print a GPX route for every bundle file
  Gpx {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
  /// Print map polyline data for every bundle file
  Gmap {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
  /// Print distance/altitude and time/distance chart URLs for every bundle
  /// file
  Gchart {
    #[arg(short, long, default_value_t = 1000)]
    width:             u32,
    #[arg(short = 'H', long, default_value_t = 300)]
    height:            u32,
    #[arg(short = 'p', long = "pix-per-data-point", default_value_t = 499.0)]
    pixels_per_sample: f64,
    #[arg(short, long = "encode-method", value_enum,
          default_value_t = Encoding::Extended)]
    encoding:          Encoding,
    #[arg(required = true)]
    files:             Vec<PathBuf>,
  },
  /// Correlate device query dumps and save one bundle file per run
  SaveRuns {
    /// Base directory; bundles go to <DIR>/<YYYY>/<MM>/
    #[arg(long, env = "TRACKLAP_SAVE_DIR")]
    dir:   Option<PathBuf>,
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
  /// Print a JSON summary of every run in device query dumps, keyed by
  /// start time
  Runs {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
  /// Pretty print the record tree of every file
  Dump {
    #[arg(required = true)]
    files: Vec<PathBuf>,
  },
}


fn init_logging(verbose: bool) {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  let filter = if verbose {
    filter.add_directive(LevelFilter::INFO.into())
  } else {
    filter
  };

  tracing_subscriber::fmt().with_env_filter(filter)
                           .with_writer(io::stderr)
                           .init();
}

/// Loads every file in turn and hands its tree to `f`. A file which can't be
/// loaded or processed is reported and skipped.
fn for_each_tree<F>(files: &[PathBuf], mut f: F)
  where F: FnMut(&Path, RecordTree) -> Result<()>
{
  for path in files {
    let result = JsonFile::new(path).load()
                                    .and_then(|tree| f(path, tree));
    if let Err(err) = result {
      error!(path = %path.display(), error = %err, "skipping file");
    }
  }
}

fn gpx(tree: RecordTree) -> Result<()> {
  let points = track_points(&tree)?;
  Route::from_points(points).write(io::stdout().lock(), Utc::now())?;
  Ok(())
}

fn gmap(path: &Path, tree: RecordTree) -> Result<()> {
  match polyline::encode(track_points(&tree)?) {
    Some(polyline) => print!("{}", polyline),
    None => warn!(path = %path.display(), "no track points with a fix"),
  }
  Ok(())
}

fn gchart(tree: RecordTree, config: &ChartConfig) -> Result<()> {
  print!("{}", chart::encode(&track_points(&tree)?, config));
  Ok(())
}

fn save(tree: RecordTree, base: &Path, options: &Options) -> Result<()> {
  for outcome in save_runs(&tree, &JsonStore, base, &Local, options)? {
    match outcome {
      SaveOutcome::Written(path) => println!("Wrote:   {}", path.display()),
      SaveOutcome::Skipped(path) => println!("Skipped: {}", path.display()),
      SaveOutcome::NoStartTime { .. } => {}
      SaveOutcome::Failed(err) => error!(error = %err, "bundle not saved"),
    }
  }
  Ok(())
}

fn runs(tree: RecordTree, options: &Options) -> Result<()> {
  let bundles = correlate(&tree, options)?;
  let mut stdout = io::stdout().lock();
  serde_json::to_writer_pretty(&mut stdout, &run_reports(&bundles))?;
  writeln!(stdout)?;
  Ok(())
}

fn dump(tree: RecordTree) -> Result<()> {
  let mut stdout = io::stdout().lock();
  serde_json::to_writer_pretty(&mut stdout, &tree.into_node())?;
  writeln!(stdout)?;
  Ok(())
}


fn main() -> Result<()> {
  color_eyre::install()?;
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match cli.command {
    Command::Gpx { files } => for_each_tree(&files, |_, tree| gpx(tree)),
    Command::Gmap { files } => for_each_tree(&files, gmap),
    Command::Gchart { width,
                      height,
                      pixels_per_sample,
                      encoding,
                      files, } => {
      let config = ChartConfig::new(width, height, pixels_per_sample, encoding);
      for_each_tree(&files, |_, tree| gchart(tree, &config))
    }
    Command::SaveRuns { dir, files } => {
      let base = save_directory(dir.as_deref());
      let options = Options::new(cli.verbose);
      for_each_tree(&files, |_, tree| save(tree, &base, &options))
    }
    Command::Runs { files } => {
      let options = Options::new(cli.verbose);
      for_each_tree(&files, |_, tree| runs(tree, &options))
    }
    Command::Dump { files } => for_each_tree(&files, |_, tree| dump(tree)),
  }

  Ok(())
}


#[cfg(test)]
mod tests {
  use super::*;
  use clap::CommandFactory;
  use pretty_assertions::assert_eq;


  #[test]
  fn cli_debug_assert_test() {
    Cli::command().debug_assert();
  }

  #[test]
  fn gchart_defaults_test() {
    let cli = Cli::try_parse_from(["tracklap", "gchart", "a.json"]).unwrap();
    match cli.command {
      Command::Gchart { width,
                        height,
                        pixels_per_sample,
                        encoding,
                        files, } => {
        let defaults = ChartConfig::default();
        assert_eq!(defaults,
                   ChartConfig::new(width, height, pixels_per_sample, encoding));
        assert_eq!(vec![PathBuf::from("a.json")], files);
      }
      command => panic!("unexpected command {:?}", command),
    }
  }

  #[test]
  fn gchart_arguments_test() {
    let cli = Cli::try_parse_from(["tracklap", "-v", "gchart", "-w", "640",
                                   "-H", "200", "-p", "10", "-e", "t",
                                   "a.json", "b.json"]).unwrap();
    assert_eq!(true, cli.verbose);
    match cli.command {
      Command::Gchart { width,
                        height,
                        pixels_per_sample,
                        encoding,
                        files, } => {
        assert_eq!((640, 200, 10.0, Encoding::Text),
                   (width, height, pixels_per_sample, encoding));
        assert_eq!(2, files.len());
      }
      command => panic!("unexpected command {:?}", command),
    }
  }

  #[test]
  fn save_runs_arguments_test() {
    let cli =
      Cli::try_parse_from(["tracklap", "save-runs", "--dir", "/tmp/runs",
                           "dump.json"]).unwrap();
    match cli.command {
      Command::SaveRuns { dir, files } => {
        assert_eq!(Some(PathBuf::from("/tmp/runs")), dir);
        assert_eq!(vec![PathBuf::from("dump.json")], files);
      }
      command => panic!("unexpected command {:?}", command),
    }

    assert!(Cli::try_parse_from(["tracklap", "gpx"]).is_err());

    let cli = Cli::try_parse_from(["tracklap", "runs", "dump.json"]).unwrap();
    match cli.command {
      Command::Runs { files } => {
        assert_eq!(vec![PathBuf::from("dump.json")], files)
      }
      command => panic!("unexpected command {:?}", command),
    }
  }
}
