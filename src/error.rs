// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use std::{error, fmt, path::PathBuf, result};


/// tracklap's result type. Errors are `eyre::Report`s; the ones raised by this
/// crate carry an [`Error`] which callers can get back via `downcast_ref`.
pub type Result<T> = result::Result<T, eyre::Report>;


/// Failures surfaced by the library.
///
/// Record-shape anomalies (unknown variants, sentinel values) are not errors
/// and never show up here: those nodes or fields are simply skipped. What is
/// left are the conditions which abort the current call.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
  /// A list the correlation needs (runs, laps or tracks) is absent from the
  /// top level of the record tree, or is not a list.
  MissingTopLevelData { index: usize, name: &'static str },
  /// The collaborator producing the record tree failed. No partial tree.
  UpstreamUnavailable { source_name: String, reason: String },
  /// Writing a bundle failed for a reason other than the file existing.
  Persistence { path: PathBuf, reason: String },
  /// An encoded polyline could not be decoded.
  Decode { position: usize, reason: &'static str },
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::MissingTopLevelData { index, name } => {
        write!(f, "toplevel data missing element {} ({})", index, name)
      }
      Self::UpstreamUnavailable { source_name, reason } => {
        write!(f, "unable to load '{}': {}", source_name, reason)
      }
      Self::Persistence { path, reason } => {
        write!(f, "unable to write '{}': {}", path.display(), reason)
      }
      Self::Decode { position, reason } => {
        write!(f, "invalid polyline at offset {}: {}", position, reason)
      }
    }
  }
}

impl error::Error for Error {}
