// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use super::service::{semicircles_to_degrees, Position};
use chrono::{DateTime, Duration, TimeZone, Utc};
use getset::{CopyGetters, Setters};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};


/// Seconds between the Unix epoch and the device epoch (1989-12-31 00:00 UTC).
/// Device time values plus this offset give Unix time.
pub const TIME_OFFSET: i64 = 631_065_600;

/// Semicircle value meaning "no fix" on a coordinate.
pub const NO_FIX: i32 = 0x7fff_ffff;

/// Cadence value meaning "no cadence sensor".
pub const NO_CADENCE: u8 = 255;


lazy_static! {
  /// The device epoch as a UTC timestamp.
  pub static ref DEVICE_EPOCH: DateTime<Utc> =
    Utc.timestamp_opt(TIME_OFFSET, 0)
       .single()
       .expect("device epoch is a valid timestamp");
}


/// Converts a device timestamp into an absolute UTC time.
pub fn device_time(seconds: u32) -> DateTime<Utc> {
  *DEVICE_EPOCH + Duration::seconds(i64::from(seconds))
}


/// Sport classification carried by the richer run records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
  Running,
  Biking,
  Other,
}


// RUN RECORDS ------------------------------------------------------------- //
/// Plain run: which track and which (inclusive) range of laps belong to it.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct Run {
  track_index:     u32,
  first_lap_index: u32,
  last_lap_index:  u32,
}

impl Run {
  pub fn new(track_index: u32, first_lap_index: u32, last_lap_index: u32)
             -> Self {
    Self { track_index,
           first_lap_index,
           last_lap_index }
  }
}

/// Run which also records the sport it was recorded for.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct SportRun {
  track_index:     u32,
  first_lap_index: u32,
  last_lap_index:  u32,
  sport:           Sport,
}

impl SportRun {
  pub fn new(track_index: u32,
             first_lap_index: u32,
             last_lap_index: u32,
             sport: Sport)
             -> Self {
    Self { track_index,
           first_lap_index,
           last_lap_index,
           sport }
  }
}

/// Run of a multisport session; `multisport` is set for every leg but the
/// last one.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct MultisportRun {
  track_index:     u32,
  first_lap_index: u32,
  last_lap_index:  u32,
  sport:           Sport,
  multisport:      bool,
}

impl MultisportRun {
  pub fn new(track_index: u32,
             first_lap_index: u32,
             last_lap_index: u32,
             sport: Sport,
             multisport: bool)
             -> Self {
    Self { track_index,
           first_lap_index,
           last_lap_index,
           sport,
           multisport }
  }
}


// LAP RECORDS ------------------------------------------------------------- //
/// Lap with nothing but its index and device start time.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct Lap {
  index:      u32,
  start_time: u32,
}

impl Lap {
  pub fn new(index: u32, start_time: u32) -> Self {
    Self { index, start_time }
  }
}

/// Lap which also carries its totals. `total_time` is in hundredths of a
/// second, `total_distance` in metres, `max_speed` in metres per second.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct TimedLap {
  index:          u32,
  start_time:     u32,
  total_time:     u32,
  total_distance: f32,
  max_speed:      f32,
}

impl TimedLap {
  pub fn new(index: u32,
             start_time: u32,
             total_time: u32,
             total_distance: f32,
             max_speed: f32)
             -> Self {
    Self { index,
           start_time,
           total_time,
           total_distance,
           max_speed }
  }
}


// TRACK RECORDS ----------------------------------------------------------- //
fn no_cadence() -> u8 {
  NO_CADENCE
}

/// A single GPS sample. Positions are semicircles, `time` is device seconds.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Setters, Serialize,
         Deserialize)]
pub struct TrackPoint {
  #[getset(get_copy = "pub")]
  lat:        i32,
  #[getset(get_copy = "pub")]
  lon:        i32,
  #[serde(rename = "time")]
  #[getset(get_copy = "pub")]
  raw_time:   u32,
  #[serde(default)]
  #[getset(get_copy = "pub", set = "pub")]
  altitude:   f32,
  #[serde(default)]
  #[getset(get_copy = "pub", set = "pub")]
  distance:   f32,
  #[serde(default)]
  #[getset(get_copy = "pub", set = "pub")]
  heart_rate: u8,
  #[serde(default = "no_cadence")]
  #[getset(set = "pub")]
  cadence:    u8,
  #[serde(default)]
  #[getset(get_copy = "pub", set = "pub")]
  sensor:     bool,
}

impl TrackPoint {
  pub fn new(lat: i32, lon: i32, raw_time: u32) -> Self {
    Self { lat,
           lon,
           raw_time,
           altitude: 0.0,
           distance: 0.0,
           heart_rate: 0,
           cadence: NO_CADENCE,
           sensor: false }
  }

  /// `false` if either coordinate carries the "no fix" sentinel.
  pub fn has_fix(&self) -> bool {
    self.lat != NO_FIX && self.lon != NO_FIX
  }

  /// Position in degrees, or `None` without a fix.
  pub fn position(&self) -> Option<Position> {
    if !self.has_fix() {
      return None;
    }
    Some(Position::new(semicircles_to_degrees(self.lat),
                       semicircles_to_degrees(self.lon)))
  }

  /// Cadence, or `None` if no cadence sensor was attached.
  pub fn cadence(&self) -> Option<u8> {
    match self.cadence {
      NO_CADENCE => None,
      cadence => Some(cadence),
    }
  }

  /// Absolute time of the sample.
  pub fn time(&self) -> DateTime<Utc> {
    device_time(self.raw_time)
  }
}

/// Segment marker. Opens (and, by being the next marker, closes) a run of
/// track points in a flat points list.
#[derive(Clone, Debug, PartialEq, CopyGetters, Serialize, Deserialize)]
pub struct TrackHeader {
  #[getset(get_copy = "pub")]
  index:      u32,
  #[serde(default)]
  #[getset(get_copy = "pub")]
  display:    bool,
  #[serde(default)]
  identifier: String,
}

impl TrackHeader {
  pub fn new(index: u32) -> Self {
    Self { index,
           display: true,
           identifier: String::new() }
  }

  pub fn identifier(&self) -> &str {
    &self.identifier
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;


  #[test]
  fn device_time_test() {
    assert_eq!(TIME_OFFSET, DEVICE_EPOCH.timestamp());
    assert_eq!("1989-12-31T00:00:00+00:00", DEVICE_EPOCH.to_rfc3339());
    assert_eq!(TIME_OFFSET + 86_400, device_time(86_400).timestamp());
  }

  #[test]
  fn track_point_sentinel_test() {
    let point = TrackPoint::new(NO_FIX, NO_FIX, 10);
    assert_eq!(false, point.has_fix());
    assert_eq!(None, point.position());

    // one sentinel axis is just as unusable as two
    let point = TrackPoint::new(0, NO_FIX, 10);
    assert_eq!(None, point.position());

    let point = TrackPoint::new(1 << 30, -(1 << 30), 10);
    assert_eq!(Some(Position::new(90.0, -90.0)), point.position());
  }

  #[test]
  fn track_point_cadence_test() {
    let mut point = TrackPoint::new(0, 0, 0);
    assert_eq!(None, point.cadence());

    point.set_cadence(0);
    assert_eq!(Some(0), point.cadence());
    point.set_cadence(87);
    assert_eq!(Some(87), point.cadence());
    point.set_cadence(NO_CADENCE);
    assert_eq!(None, point.cadence());
  }

  #[test]
  fn track_point_serde_test() {
    let json = r#"{"lat": 5, "lon": 6, "time": 7}"#;
    let point: TrackPoint = serde_json::from_str(json).unwrap();
    assert_eq!(TrackPoint::new(5, 6, 7), point);
    assert_eq!(None, point.cadence());
  }
}
