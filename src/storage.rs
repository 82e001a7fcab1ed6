// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{bundle::{correlate, Bundle, Options},
            error::{Error, Result},
            node::RecordTree};
use chrono::{DateTime, TimeZone, Utc};
use std::{fmt,
          fs,
          io::{self, BufWriter, Write},
          path::{Path, PathBuf}};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};


/// Where a bundle which started at `start` is filed below `base`: the
/// directory `{base}/{YYYY}/{MM}` and the file name `{YYYYMMDDTHHMMSS}.{ext}`,
/// both in timezone `tz`.
pub fn bundle_path<Tz>(base: &Path,
                       start: DateTime<Utc>,
                       tz: &Tz,
                       ext: &str)
                       -> (PathBuf, String)
  where Tz: TimeZone,
        Tz::Offset: fmt::Display
{
  let local = start.with_timezone(tz);
  let dir = base.join(local.format("%Y").to_string())
                .join(local.format("%m").to_string());
  let filename = format!("{}.{}", local.format("%Y%m%dT%H%M%S"), ext);
  (dir, filename)
}

/// The base directory bundles are saved to.
///
/// An override which can't be resolved is reported and replaced by the
/// current directory, as is a missing one.
pub fn save_directory(override_dir: Option<&Path>) -> PathBuf {
  let current = PathBuf::from(".");
  match override_dir {
    Some(dir) => dir.canonicalize().unwrap_or_else(|err| {
                                     warn!(dir = %dir.display(),
                                           error = %err,
                                           "unusable save directory, using '.'");
                                     current
                                   }),
    None => current,
  }
}


/// What a [`Store`] did with a bundle.
#[derive(Clone, Debug, PartialEq)]
pub enum Persisted {
  Written(PathBuf),
  /// The file already existed and was left alone.
  Skipped(PathBuf),
}

impl Persisted {
  pub fn path(&self) -> &Path {
    match self {
      Self::Written(path) | Self::Skipped(path) => path,
    }
  }
}

/// Writes bundles to durable storage. Existing files are never overwritten.
pub trait Store {
  /// File extension of the files this store writes, without the dot.
  fn extension(&self) -> &str;

  fn persist(&self, bundle: &Bundle, filename: &str, dir: &Path)
             -> Result<Persisted>;
}


/// Stores bundles as JSON encoded record trees.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonStore;

fn persistence_error(path: &Path, err: impl fmt::Display) -> Error {
  Error::Persistence { path:   path.to_owned(),
                       reason: err.to_string(), }
}

impl Store for JsonStore {
  fn extension(&self) -> &str {
    "json"
  }

  fn persist(&self, bundle: &Bundle, filename: &str, dir: &Path)
             -> Result<Persisted> {
    fs::create_dir_all(dir).map_err(|err| persistence_error(dir, err))?;
    write_new(dir, dir.join(filename), |w| {
      serde_json::to_writer(w, bundle).map_err(io::Error::from)
    })
  }
}

/// Creates the file `path` in `dir` with what `write` produces.
///
/// The content goes to a temporary file in `dir` first, which is moved into
/// place only once it is complete, so a failed write leaves nothing behind.
/// An existing file at `path` is never replaced.
fn write_new<F>(dir: &Path, path: PathBuf, write: F) -> Result<Persisted>
  where F: FnOnce(&mut dyn Write) -> io::Result<()>
{
  if path.exists() {
    return Ok(Persisted::Skipped(path));
  }

  let mut file =
    NamedTempFile::new_in(dir).map_err(|err| persistence_error(&path, err))?;
  {
    let mut writer = BufWriter::new(file.as_file_mut());
    write(&mut writer).and_then(|_| writer.flush())
                      .map_err(|err| persistence_error(&path, err))?;
  }

  match file.persist_noclobber(&path) {
    Ok(_) => Ok(Persisted::Written(path)),
    Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
      Ok(Persisted::Skipped(path))
    }
    Err(err) => Err(persistence_error(&path, err.error).into()),
  }
}


/// Result of saving a single bundle.
#[derive(Clone, Debug, PartialEq)]
pub enum SaveOutcome {
  Written(PathBuf),
  Skipped(PathBuf),
  /// The run's first lap is missing, so there is nothing to derive a path
  /// from.
  NoStartTime { track_index: u32 },
  Failed(Error),
}

/// Correlates `tree` and hands every bundle to `store`, filed below `base` by
/// start time in timezone `tz`.
///
/// Only a tree which can't be correlated fails the call. Bundles which can't
/// be saved are reported in the returned outcomes, one per bundle, and don't
/// keep the others from being saved.
pub fn save_runs<S, Tz>(tree: &RecordTree,
                        store: &S,
                        base: &Path,
                        tz: &Tz,
                        options: &Options)
                        -> Result<Vec<SaveOutcome>>
  where S: Store + ?Sized,
        Tz: TimeZone,
        Tz::Offset: fmt::Display
{
  let bundles = correlate(tree, options)?;
  debug!(bundles = bundles.len(), base = %base.display(), "saving runs");

  Ok(bundles.iter()
            .map(|bundle| save_bundle(bundle, store, base, tz))
            .collect())
}

fn save_bundle<S, Tz>(bundle: &Bundle,
                      store: &S,
                      base: &Path,
                      tz: &Tz)
                      -> SaveOutcome
  where S: Store + ?Sized,
        Tz: TimeZone,
        Tz::Offset: fmt::Display
{
  let track_index = bundle.info().track_index();
  let start = match bundle.start_time() {
    Some(start) => start,
    None => {
      warn!(track = track_index, "run has no start time, not saving it");
      return SaveOutcome::NoStartTime { track_index };
    }
  };

  let (dir, filename) = bundle_path(base, start, tz, store.extension());
  match store.persist(bundle, &filename, &dir) {
    Ok(Persisted::Written(path)) => {
      info!(path = %path.display(), "bundle written");
      SaveOutcome::Written(path)
    }
    Ok(Persisted::Skipped(path)) => {
      debug!(path = %path.display(), "bundle exists, skipped");
      SaveOutcome::Skipped(path)
    }
    Err(report) => {
      warn!(track = track_index, error = %report, "unable to save bundle");
      let err = report.downcast::<Error>().unwrap_or_else(|report| {
                                            persistence_error(&dir.join(&filename),
                                                              report)
                                          });
      SaveOutcome::Failed(err)
    }
  }
}
