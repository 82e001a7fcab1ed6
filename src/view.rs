// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Variant-independent views onto record nodes.
//!
//! All functions here are total over the node variants: a node of the wrong
//! kind yields `None`, which callers treat as "skip this node".

use super::{error::{Error, Result},
            node::{Node, RecordTree},
            record::{device_time, Sport, TrackPoint}};
use chrono::{DateTime, Duration, Utc};
use getset::CopyGetters;


/// What the correlation needs to know about a run, whichever run record it
/// came from.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct RunInfo {
  track_index: u32,
  first_lap:   u32,
  last_lap:    u32,
  sport:       Option<Sport>,
  multisport:  Option<bool>,
}

impl RunInfo {
  /// `true` if `lap_index` lies within the run's inclusive lap range.
  pub fn covers(&self, lap_index: u32) -> bool {
    (self.first_lap..=self.last_lap).contains(&lap_index)
  }
}

/// Totals recorded by the richer lap records.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct LapTotals {
  duration:  Duration,
  distance:  f32,
  max_speed: f32,
}


pub fn run_info(node: &Node) -> Option<RunInfo> {
  let info = match node {
    Node::Run(run) => RunInfo { track_index: run.track_index(),
                                first_lap:   run.first_lap_index(),
                                last_lap:    run.last_lap_index(),
                                sport:       None,
                                multisport:  None, },
    Node::SportRun(run) => RunInfo { track_index: run.track_index(),
                                     first_lap:   run.first_lap_index(),
                                     last_lap:    run.last_lap_index(),
                                     sport:       Some(run.sport()),
                                     multisport:  None, },
    Node::MultisportRun(run) => {
      RunInfo { track_index: run.track_index(),
                first_lap:   run.first_lap_index(),
                last_lap:    run.last_lap_index(),
                sport:       Some(run.sport()),
                multisport:  Some(run.multisport()), }
    }
    _ => return None,
  };
  Some(info)
}

pub fn lap_index(node: &Node) -> Option<u32> {
  match node {
    Node::Lap(lap) => Some(lap.index()),
    Node::TimedLap(lap) => Some(lap.index()),
    _ => None,
  }
}

/// Start time of a lap, already shifted from the device epoch to UTC.
pub fn lap_start_time(node: &Node) -> Option<DateTime<Utc>> {
  match node {
    Node::Lap(lap) => Some(device_time(lap.start_time())),
    Node::TimedLap(lap) => Some(device_time(lap.start_time())),
    _ => None,
  }
}

/// Totals of a lap; only the richer lap record carries them.
pub fn lap_totals(node: &Node) -> Option<LapTotals> {
  match node {
    Node::TimedLap(lap) => {
      Some(LapTotals { duration:  Duration::milliseconds(i64::from(lap.total_time())
                                                         * 10),
                       distance:  lap.total_distance(),
                       max_speed: lap.max_speed(), })
    }
    _ => None,
  }
}


/// Track points with a fix from element 2 of a bundle-shaped tree, i.e. the
/// track list of a saved `[run, laps, track]` triple.
pub fn track_points(tree: &RecordTree) -> Result<Vec<&TrackPoint>> {
  let track = tree.nth_child(2)
                  .and_then(Node::as_list)
                  .ok_or(Error::MissingTopLevelData { index: 2,
                                                      name:  "tracks", })?;

  Ok(track.iter()
          .filter_map(Node::as_track_point)
          .filter(|point| point.has_fix())
          .collect())
}
