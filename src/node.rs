// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::record::{Lap,
                    MultisportRun,
                    Run,
                    SportRun,
                    TimedLap,
                    TrackHeader,
                    TrackPoint};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{fmt, slice};
use tracing::{trace, warn};


/// One node of a record tree as delivered by the device.
///
/// Every node carries exactly one payload: a fixed-layout record, or a nested
/// ordered list of nodes. Tags this crate has no use for deserialize into
/// `Unrecognized`, whatever their payload, and so do malformed records; both
/// are skipped by every consumer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Node {
  Run(Run),
  SportRun(SportRun),
  MultisportRun(MultisportRun),
  Lap(Lap),
  TimedLap(TimedLap),
  TrackPoint(TrackPoint),
  TrackHeader(TrackHeader),
  List(Vec<Node>),
  Unrecognized,
}

/// Wire shape of a node before its payload is interpreted.
#[derive(Deserialize)]
struct RawNode {
  #[serde(rename = "type")]
  kind: String,
  #[serde(default)]
  data: Value,
}

fn record<T, F>(kind: &str, data: Value, wrap: F) -> Node
  where T: DeserializeOwned,
        F: FnOnce(T) -> Node
{
  match serde_json::from_value(data) {
    Ok(payload) => wrap(payload),
    Err(err) => {
      warn!(kind, error = %err, "skipping malformed record");
      Node::Unrecognized
    }
  }
}

impl From<Value> for Node {
  /// Interprets an untyped node. Never fails: a node without a tag, or a
  /// record whose payload doesn't match its tag, becomes `Unrecognized` and
  /// its siblings are unaffected.
  fn from(value: Value) -> Self {
    let RawNode { kind, data } = match serde_json::from_value(value) {
      Ok(raw) => raw,
      Err(err) => {
        warn!(error = %err, "skipping node without a tag");
        return Self::Unrecognized;
      }
    };

    match kind.as_str() {
      "run" => record(&kind, data, Self::Run),
      "sport_run" => record(&kind, data, Self::SportRun),
      "multisport_run" => record(&kind, data, Self::MultisportRun),
      "lap" => record(&kind, data, Self::Lap),
      "timed_lap" => record(&kind, data, Self::TimedLap),
      "track_point" => record(&kind, data, Self::TrackPoint),
      "track_header" => record(&kind, data, Self::TrackHeader),
      "list" => match data {
        Value::Array(nodes) => {
          Self::List(nodes.into_iter().map(Self::from).collect())
        }
        _ => {
          warn!("skipping list node without a list payload");
          Self::Unrecognized
        }
      },
      _ => {
        trace!(kind = %kind, "unrecognized node");
        Self::Unrecognized
      }
    }
  }
}

impl<'de> Deserialize<'de> for Node {
  /// Fails only if the input isn't a JSON document at all.
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de>
  {
    Ok(Value::deserialize(deserializer)?.into())
  }
}

/// The tag of a [`Node`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
  Run,
  SportRun,
  MultisportRun,
  Lap,
  TimedLap,
  TrackPoint,
  TrackHeader,
  List,
  Unrecognized,
}

impl fmt::Display for Kind {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    let name = match self {
      Self::Run => "run",
      Self::SportRun => "sport run",
      Self::MultisportRun => "multisport run",
      Self::Lap => "lap",
      Self::TimedLap => "timed lap",
      Self::TrackPoint => "track point",
      Self::TrackHeader => "track header",
      Self::List => "list",
      Self::Unrecognized => "unrecognized",
    };
    write!(f, "{}", name)
  }
}

impl Node {
  pub fn kind(&self) -> Kind {
    match self {
      Self::Run(_) => Kind::Run,
      Self::SportRun(_) => Kind::SportRun,
      Self::MultisportRun(_) => Kind::MultisportRun,
      Self::Lap(_) => Kind::Lap,
      Self::TimedLap(_) => Kind::TimedLap,
      Self::TrackPoint(_) => Kind::TrackPoint,
      Self::TrackHeader(_) => Kind::TrackHeader,
      Self::List(_) => Kind::List,
      Self::Unrecognized => Kind::Unrecognized,
    }
  }

  pub fn as_list(&self) -> Option<&[Node]> {
    match self {
      Self::List(nodes) => Some(nodes),
      _ => None,
    }
  }

  pub fn as_track_point(&self) -> Option<&TrackPoint> {
    match self {
      Self::TrackPoint(point) => Some(point),
      _ => None,
    }
  }

  pub fn as_track_header(&self) -> Option<&TrackHeader> {
    match self {
      Self::TrackHeader(header) => Some(header),
      _ => None,
    }
  }

  /// Children of a list node; empty for every record node.
  pub fn children(&self) -> slice::Iter<'_, Node> {
    self.as_list().unwrap_or(&[]).iter()
  }
}


/// Owner of a whole record tree.
///
/// Everything derived from the tree (bundles, point sequences) borrows from it,
/// so the nodes live exactly as long as the tree does and are released once,
/// together, when it is dropped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordTree {
  nodes: Vec<Node>,
}

impl RecordTree {
  pub fn new(nodes: Vec<Node>) -> Self {
    Self { nodes }
  }

  /// The `idx`-th top-level element, `None` if there is no such element.
  pub fn nth_child(&self, idx: usize) -> Option<&Node> {
    self.nodes.get(idx)
  }

  pub fn iter(&self) -> slice::Iter<'_, Node> {
    self.nodes.iter()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// The tree as a single list node again, e.g. for printing.
  pub fn into_node(self) -> Node {
    Node::List(self.nodes)
  }
}

impl From<Node> for RecordTree {
  /// A top-level list node becomes the tree's children, any other node a tree
  /// with a single element.
  fn from(node: Node) -> Self {
    match node {
      Node::List(nodes) => Self { nodes },
      node => Self { nodes: vec![node] },
    }
  }
}

impl<'a> IntoIterator for &'a RecordTree {
  type IntoIter = slice::Iter<'a, Node>;
  type Item = &'a Node;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}
