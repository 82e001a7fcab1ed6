// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{error::{Error, Result},
            node::{Node, RecordTree}};
use getset::Getters;
use std::{fmt, fs, path::PathBuf};
use tracing::debug;


/// Produces record trees, e.g. from a device query or a file.
pub trait Source {
  /// Loads a complete record tree. On failure nothing is returned, not even
  /// the part of the tree which could be read.
  fn load(&self) -> Result<RecordTree>;
}


/// A record tree stored as a JSON encoded node.
#[derive(Clone, Debug, PartialEq, Getters)]
#[getset(get = "pub")]
pub struct JsonFile {
  path: PathBuf,
}

impl JsonFile {
  pub fn new<P: Into<PathBuf>>(path: P) -> Self {
    Self { path: path.into() }
  }

  fn unavailable(&self, reason: impl fmt::Display) -> Error {
    Error::UpstreamUnavailable { source_name: self.path.display().to_string(),
                                 reason:      reason.to_string(), }
  }
}

impl Source for JsonFile {
  /// Reads and parses the file.
  ///
  /// # Returns
  /// the tree on success; an `Error::UpstreamUnavailable` if the file can't
  /// be read or isn't a JSON document. Malformed records inside a valid
  /// document are skipped, not fatal.
  fn load(&self) -> Result<RecordTree> {
    let json =
      fs::read_to_string(&self.path).map_err(|err| self.unavailable(err))?;
    let node: Node =
      serde_json::from_str(&json).map_err(|err| self.unavailable(err))?;

    let tree = RecordTree::from(node);
    debug!(path = %self.path.display(), elements = tree.len(), "loaded tree");
    Ok(tree)
  }
}
