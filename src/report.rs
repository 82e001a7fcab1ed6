// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Self-contained summaries of correlated runs, for consumers which want
//! plain values instead of device records: absolute times, positions in
//! degrees, and optional readings left out rather than sentinel-valued.

use super::{bundle::{Bundle, LapView},
            record::{Sport, TrackPoint},
            service::Position};
use getset::{CopyGetters, Getters};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;


// RUNS -------------------------------------------------------------------- //
#[derive(Clone, Debug, PartialEq, CopyGetters, Getters, Serialize)]
pub struct RunReport {
  #[getset(get_copy = "pub")]
  track:      u32,
  #[getset(get_copy = "pub")]
  first_lap:  u32,
  #[getset(get_copy = "pub")]
  last_lap:   u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  #[getset(get_copy = "pub")]
  sport:      Option<Sport>,
  #[serde(skip_serializing_if = "Option::is_none")]
  #[getset(get_copy = "pub")]
  multisport: Option<bool>,
  /// Unix time the run's first lap started at.
  #[getset(get_copy = "pub")]
  start_time: Option<i64>,
  #[getset(get = "pub")]
  laps:       BTreeMap<u32, LapReport>,
  #[getset(get = "pub")]
  points:     Vec<PointReport>,
}


// LAPS -------------------------------------------------------------------- //
/// A lap's start (Unix time) and, where the device recorded them, its totals.
/// `duration` is in seconds.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct LapReport {
  start_time: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  duration:   Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  distance:   Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_speed:  Option<f32>,
}

impl<'a, 'b> From<&'a LapView<'b>> for LapReport {
  fn from(lap: &'a LapView<'b>) -> Self {
    let totals = lap.totals();
    Self { start_time: lap.start_time().timestamp(),
           duration:   totals.map(|t| {
                                   t.duration().num_milliseconds() as f64
                                   / 1000.0
                                 }),
           distance:   totals.map(|t| t.distance()),
           max_speed:  totals.map(|t| t.max_speed()), }
  }
}


// POINTS ------------------------------------------------------------------ //
/// A track point with a fix. `time` is Unix time; `cadence` is absent if no
/// cadence sensor was attached.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct PointReport {
  position:   Position,
  time:       i64,
  distance:   f32,
  altitude:   f32,
  heart_rate: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  cadence:    Option<u8>,
}

impl PointReport {
  /// `None` for points without a fix.
  pub fn from_track_point(point: &TrackPoint) -> Option<Self> {
    Some(Self { position:   point.position()?,
                time:       point.time().timestamp(),
                distance:   point.distance(),
                altitude:   point.altitude(),
                heart_rate: point.heart_rate(),
                cadence:    point.cadence(), })
  }
}


impl Bundle<'_> {
  pub fn report(&self) -> RunReport {
    let info = self.info();
    RunReport { track:      info.track_index(),
                first_lap:  info.first_lap(),
                last_lap:   info.last_lap(),
                sport:      info.sport(),
                multisport: info.multisport(),
                start_time: self.start_time().map(|start| start.timestamp()),
                laps:       self.laps()
                                .iter()
                                .map(|(&index, lap)| (index, lap.into()))
                                .collect(),
                points:     self.points()
                                .into_iter()
                                .filter_map(PointReport::from_track_point)
                                .collect(), }
  }
}

/// Reports of all `bundles`, keyed by their start time (Unix time).
///
/// Runs without a start time can't be keyed and are left out. Of two runs
/// starting at the same second the later one is kept.
pub fn run_reports(bundles: &[Bundle]) -> BTreeMap<i64, RunReport> {
  bundles.iter()
         .filter_map(|bundle| {
           let report = bundle.report();
           match report.start_time {
             Some(start) => Some((start, report)),
             None => {
               warn!(track = report.track, "run has no start time, not reported");
               None
             }
           }
         })
         .collect()
}


#[cfg(test)]
mod tests {
  use super::{super::{bundle::{correlate, Options},
                      node::{Node, RecordTree},
                      record::{Lap, MultisportRun, Run, TimedLap, TrackHeader,
                               NO_FIX, TIME_OFFSET}},
              *};
  use pretty_assertions::assert_eq;
  use serde_json::json;


  fn point_with_cadence(cadence: u8) -> TrackPoint {
    let mut point = TrackPoint::new(1 << 29, 1 << 28, 60);
    point.set_cadence(cadence);
    point
  }

  fn runs_tree() -> RecordTree {
    let mut point = TrackPoint::new(1 << 30, -(1 << 30), 10);
    point.set_distance(12.5)
         .set_altitude(300.0)
         .set_heart_rate(140)
         .set_cadence(90);

    RecordTree::new(vec![
      Node::List(vec![
        Node::MultisportRun(MultisportRun::new(0, 0, 1, Sport::Biking, true)),
        Node::Run(Run::new(1, 2, 2)),
        Node::Run(Run::new(2, 7, 7)),
      ]),
      Node::List(vec![Node::TimedLap(TimedLap::new(0, 0, 12_345, 1000.5, 8.25)),
                      Node::Lap(Lap::new(1, 200)),
                      Node::Lap(Lap::new(2, 500))]),
      Node::List(vec![Node::TrackHeader(TrackHeader::new(0)),
                      Node::TrackPoint(point),
                      Node::TrackPoint(TrackPoint::new(NO_FIX, NO_FIX, 20)),
                      Node::TrackHeader(TrackHeader::new(1)),
                      Node::TrackPoint(TrackPoint::new(0, 0, 500))]),
    ])
  }

  #[test]
  fn point_cadence_test() {
    let report =
      PointReport::from_track_point(&point_with_cadence(255)).unwrap();
    assert_eq!(None, report.cadence());
    let value = serde_json::to_value(report).unwrap();
    assert_eq!(None, value.get("cadence"));

    for &cadence in &[0, 87] {
      let report =
        PointReport::from_track_point(&point_with_cadence(cadence)).unwrap();
      assert_eq!(Some(&json!(cadence)),
                 serde_json::to_value(report).unwrap().get("cadence"));
    }

    let no_fix = TrackPoint::new(NO_FIX, 0, 0);
    assert_eq!(None, PointReport::from_track_point(&no_fix));
  }

  #[test]
  fn run_report_test() {
    let tree = runs_tree();
    let bundles = correlate(&tree, &Options::default()).unwrap();
    let report = bundles[0].report();

    assert_eq!((0, 0, 1), (report.track(), report.first_lap(), report.last_lap()));
    assert_eq!(Some(Sport::Biking), report.sport());
    assert_eq!(Some(true), report.multisport());
    assert_eq!(Some(TIME_OFFSET), report.start_time());

    assert_eq!(vec![&0, &1], report.laps().keys().collect::<Vec<_>>());
    assert_eq!(Some(123.45), report.laps()[&0].duration());
    assert_eq!(Some(8.25), report.laps()[&0].max_speed());
    assert_eq!(None, report.laps()[&1].duration());

    assert_eq!(1, report.points().len());
    let point = report.points()[0];
    assert_eq!(Position::new(90.0, -90.0), point.position());
    assert_eq!(TIME_OFFSET + 10, point.time());
    assert_eq!(Some(90), point.cadence());
  }

  #[test]
  fn run_report_json_test() {
    let tree = runs_tree();
    let bundles = correlate(&tree, &Options::default()).unwrap();

    assert_eq!(json!({
                 "track": 1,
                 "first_lap": 2,
                 "last_lap": 2,
                 "start_time": TIME_OFFSET + 500,
                 "laps": {"2": {"start_time": TIME_OFFSET + 500}},
                 "points": [{"position": {"lat": 0.0, "lon": 0.0},
                             "time": TIME_OFFSET + 500,
                             "distance": 0.0,
                             "altitude": 0.0,
                             "heart_rate": 0}]
               }),
               serde_json::to_value(bundles[1].report()).unwrap());
  }

  #[test]
  fn run_reports_test() {
    let tree = runs_tree();
    let bundles = correlate(&tree, &Options::default()).unwrap();
    assert_eq!(3, bundles.len());

    let reports = run_reports(&bundles);
    assert_eq!(vec![&TIME_OFFSET, &(TIME_OFFSET + 500)],
               reports.keys().collect::<Vec<_>>());
    assert_eq!(2, reports[&(TIME_OFFSET + 500)].first_lap());
  }
}
