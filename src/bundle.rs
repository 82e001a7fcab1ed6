// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::{error::{Error, Result},
            node::{Node, RecordTree},
            record::{TrackHeader, TrackPoint},
            view::{lap_index, lap_start_time, lap_totals, run_info, LapTotals,
                   RunInfo}};
use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use serde::{ser::SerializeSeq, Serialize, Serializer};
use std::{collections::BTreeMap, result};
use tracing::{debug, info, trace};


/// Logs correlation progress at `info` level if the caller asked for verbose
/// output, at `debug` level otherwise.
macro_rules! progress {
  ($options:expr, $($arg:tt)+) => {
    if $options.verbose() {
      info!($($arg)+)
    } else {
      debug!($($arg)+)
    }
  };
}


/// Settings threaded through a correlation call.
#[derive(Clone, Copy, Debug, Default, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Options {
  verbose: bool,
}

impl Options {
  pub fn new(verbose: bool) -> Self {
    Self { verbose }
  }
}


/// A lap of a bundle: the lap node in the tree plus what was read from it.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct LapView<'a> {
  node:       &'a Node,
  index:      u32,
  start_time: DateTime<Utc>,
  totals:     Option<LapTotals>,
}


/// The contiguous track points belonging to one run.
///
/// `marker` is the segment marker which opened the segment, `None` if no
/// marker with the run's track index exists. Points without a fix are not part
/// of the segment.
#[derive(Clone, Debug, Default, PartialEq, CopyGetters)]
pub struct Segment<'a> {
  #[getset(get_copy = "pub")]
  marker: Option<&'a Node>,
  points: Vec<&'a Node>,
}

impl<'a> Segment<'a> {
  pub fn header(&self) -> Option<&'a TrackHeader> {
    self.marker.and_then(Node::as_track_header)
  }

  pub fn points(&self) -> impl Iterator<Item = &'a TrackPoint> + '_ {
    self.points.iter().filter_map(|node| node.as_track_point())
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }
}

impl Serialize for Segment<'_> {
  /// Same layout as the track list on the device: marker first, then points.
  fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where S: Serializer
  {
    let len = self.points.len() + self.marker.map_or(0, |_| 1);
    let mut seq = serializer.serialize_seq(Some(len))?;
    if let Some(marker) = self.marker {
      seq.serialize_element(marker)?;
    }
    for point in &self.points {
      seq.serialize_element(point)?;
    }
    seq.end()
  }
}


/// A run with its laps and track segment, correlated from the three flat
/// lists of a device query.
///
/// All nodes are borrowed from the `RecordTree` the bundle was correlated
/// from; the tree can't be dropped while a bundle is alive.
#[derive(Clone, Debug, PartialEq, CopyGetters, Getters)]
pub struct Bundle<'a> {
  #[getset(get_copy = "pub")]
  run:        &'a Node,
  #[getset(get_copy = "pub")]
  info:       RunInfo,
  #[getset(get = "pub")]
  laps:       BTreeMap<u32, LapView<'a>>,
  #[getset(get = "pub")]
  segment:    Segment<'a>,
  #[getset(get_copy = "pub")]
  start_time: Option<DateTime<Utc>>,
}

impl<'a> Bundle<'a> {
  /// The run's track points, all of which have a fix.
  pub fn points(&self) -> Vec<&'a TrackPoint> {
    self.segment.points().collect()
  }
}

/// Wire shape of a list node, for serializing borrowed lists.
#[derive(Serialize)]
struct TaggedList<T> {
  #[serde(rename = "type")]
  kind: &'static str,
  data: T,
}

fn tagged_list<T: Serialize>(data: T) -> TaggedList<T> {
  TaggedList { kind: "list",
               data }
}

impl Serialize for Bundle<'_> {
  /// Serializes as a `[run, [laps...], [marker, points...]]` list node, the
  /// shape `view::track_points` and the encoders' tools read back.
  fn serialize<S>(&self, serializer: S) -> result::Result<S::Ok, S::Error>
    where S: Serializer
  {
    let laps: Vec<&Node> = self.laps.values().map(|lap| lap.node).collect();
    tagged_list((self.run, tagged_list(laps), tagged_list(&self.segment)))
      .serialize(serializer)
  }
}


fn toplevel_list<'a>(tree: &'a RecordTree,
                     index: usize,
                     name: &'static str)
                     -> Result<&'a [Node]> {
  Ok(tree.nth_child(index)
         .and_then(Node::as_list)
         .ok_or(Error::MissingTopLevelData { index, name })?)
}

/// Correlates runs, laps and track points into one bundle per run.
///
/// The tree must hold the runs, the laps and the track points as lists in
/// elements 0, 1 and 2; if one of them is missing the whole call fails with
/// `Error::MissingTopLevelData`. Anything below that is recovered from
/// locally: run nodes of unknown kind are skipped, runs without laps get an
/// empty lap map and runs without a track segment an empty segment.
pub fn correlate<'a>(tree: &'a RecordTree,
                     options: &Options)
                     -> Result<Vec<Bundle<'a>>> {
  let runs = toplevel_list(tree, 0, "runs")?;
  let laps = toplevel_list(tree, 1, "laps")?;
  let tracks = toplevel_list(tree, 2, "tracks")?;

  if options.verbose() {
    for lap in laps {
      match lap_index(lap) {
        Some(index) => info!(index, "lap"),
        None => info!(kind = %lap.kind(), "lap without index"),
      }
    }
  }

  Ok(runs.iter()
         .filter_map(|run| correlate_run(run, laps, tracks, options))
         .collect())
}

fn correlate_run<'a>(run: &'a Node,
                     laps: &'a [Node],
                     tracks: &'a [Node],
                     options: &Options)
                     -> Option<Bundle<'a>> {
  let info = match run_info(run) {
    Some(info) => info,
    None => {
      trace!(kind = %run.kind(), "skipping node in runs list");
      return None;
    }
  };
  progress!(options,
            track = info.track_index(),
            first_lap = info.first_lap(),
            last_lap = info.last_lap(),
            "run");

  let mut start_time = None;
  let mut run_laps = BTreeMap::new();
  for node in laps {
    let index = match lap_index(node) {
      Some(index) if info.covers(index) => index,
      _ => continue,
    };
    let lap_start = match lap_start_time(node) {
      Some(start) => start,
      None => continue,
    };
    progress!(options,
              lap = index,
              first_lap = info.first_lap(),
              last_lap = info.last_lap(),
              "lap falls within run");

    if index == info.first_lap() {
      start_time = Some(lap_start);
    }
    run_laps.insert(index,
                    LapView { node,
                              index,
                              start_time: lap_start,
                              totals: lap_totals(node) });
  }

  let segment = track_segment(tracks, info.track_index());
  if segment.marker.is_none() {
    debug!(track = info.track_index(), "no track segment for run");
  }

  Some(Bundle { run,
                info,
                laps: run_laps,
                segment,
                start_time })
}

/// Finds the track segment with index `track_index` in a flat track list.
///
/// The segment opens at the first marker with a matching index and closes at
/// the next marker, whatever its index. Points without a fix are dropped.
pub fn track_segment(tracks: &[Node], track_index: u32) -> Segment<'_> {
  let mut segment = Segment::default();

  for node in tracks {
    match node {
      Node::TrackHeader(header) => {
        if segment.marker.is_some() {
          break;
        }
        if header.index() == track_index {
          segment.marker = Some(node);
        }
      }
      _ if segment.marker.is_none() => {}
      Node::TrackPoint(point) if point.has_fix() => segment.points.push(node),
      Node::TrackPoint(_) => trace!("dropping track point without fix"),
      _ => trace!(kind = %node.kind(), "skipping node in track segment"),
    }
  }

  segment
}
