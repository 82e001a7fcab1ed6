// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Correlates runs, laps and track points read from GPS sport watches and
//! exports the result as route documents, map polylines and chart series.

mod bundle;
pub mod chart;
mod error;
mod node;
pub mod polyline;
mod record;
mod report;
mod route;
mod service;
mod source;
mod storage;
mod view;

pub use bundle::{correlate, track_segment, Bundle, LapView, Options, Segment};
pub use chart::{Chart, ChartConfig, Encoding, Sample};
pub use error::{Error, Result};
pub use node::{Kind, Node, RecordTree};
pub use polyline::Polyline;
pub use record::{device_time, Lap, MultisportRun, Run, Sport, SportRun,
                 TimedLap, TrackHeader, TrackPoint, DEVICE_EPOCH, NO_CADENCE,
                 NO_FIX, TIME_OFFSET};
pub use report::{run_reports, LapReport, PointReport, RunReport};
pub use route::{Route, RoutePoint};
pub use service::{degrees_to_semicircles, semicircles_to_degrees, Bounds,
                  Position};
pub use source::{JsonFile, Source};
pub use storage::{bundle_path, save_directory, save_runs, JsonStore, Persisted,
                  SaveOutcome, Store};
pub use view::{lap_index, lap_start_time, lap_totals, run_info, track_points,
               LapTotals, RunInfo};
