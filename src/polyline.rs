// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Encoded polylines for map services.
//!
//! Follows Google's "Encoded Polyline Algorithm Format": coordinates in
//! 1e-5 degrees, delta coded, zigzag signed, split into 5 bit groups and
//! shifted into printable ASCII. A literal backslash is doubled so the result
//! can be pasted into a string literal as is.

use super::{error::{Error, Result},
            record::TrackPoint,
            service::{Bounds, Position}};
use getset::{CopyGetters, Getters};
use std::fmt;


/// Highest zoom level, rendered as `'P'`.
const MAX_LEVEL: u32 = 16;


/// Encoded path plus its key coordinates, all in degrees.
#[derive(Clone, Debug, PartialEq, CopyGetters, Getters)]
pub struct Polyline {
  #[getset(get = "pub")]
  points:     String,
  #[getset(get = "pub")]
  levels:     String,
  #[getset(get_copy = "pub")]
  start:      Position,
  #[getset(get_copy = "pub")]
  center:     Position,
  #[getset(get_copy = "pub")]
  south_west: Position,
  #[getset(get_copy = "pub")]
  north_east: Position,
}


fn fixed_point(degrees: f64) -> i64 {
  (degrees * 1e5).floor() as i64
}

fn zigzag(delta: i64) -> u64 {
  (delta.unsigned_abs() << 1) - u64::from(delta < 0)
}

fn unzigzag(value: u64) -> i64 {
  let magnitude = ((value >> 1) + (value & 1)) as i64;
  if value & 1 == 1 {
    -magnitude
  } else {
    magnitude
  }
}

fn push_value(out: &mut String, mut value: u64) {
  loop {
    let mut chunk = (value & 0x1f) as u8;
    value >>= 5;
    if value > 0 {
      chunk |= 0x20;
    }

    let c = char::from(chunk + 63);
    out.push(c);
    if c == '\\' {
      out.push('\\');
    }

    if value == 0 {
      break;
    }
  }
}

/// Zoom level of the `n`-th emitted point: the number of trailing one bits of
/// `n`, so "rounder" counters show up at coarser zoom levels.
fn level(n: u32) -> char {
  char::from(b'@' + n.trailing_ones().min(MAX_LEVEL) as u8)
}


/// Encodes the positions of `points` as a polyline.
///
/// Points without a fix are skipped, and so is every point which doesn't move
/// at 1e-5 degree resolution. Returns `None` if no point has a fix.
pub fn encode<'a, I>(points: I) -> Option<Polyline>
  where I: IntoIterator<Item = &'a TrackPoint>
{
  let mut encoded = String::new();
  let mut levels = String::new();
  let mut start = None;
  let mut bounds: Option<Bounds> = None;
  let mut last = (0, 0);
  let mut emitted = 0u32;

  for position in points.into_iter().filter_map(TrackPoint::position) {
    start.get_or_insert(position);
    match bounds.as_mut() {
      Some(bounds) => bounds.extend(position),
      None => bounds = Some(Bounds::new(position)),
    }

    let current = (fixed_point(position.lat()), fixed_point(position.lon()));
    let delta = (current.0 - last.0, current.1 - last.1);
    last = current;
    if delta == (0, 0) {
      continue;
    }

    push_value(&mut encoded, zigzag(delta.0));
    push_value(&mut encoded, zigzag(delta.1));
    levels.push(level(emitted));
    emitted = emitted.wrapping_add(1);
  }

  // endpoints must always be drawn
  if !levels.is_empty() {
    let end = levels.len() - 1;
    levels.replace_range(..1, "P");
    levels.replace_range(end.., "P");
  }

  let bounds = bounds?;
  Some(Polyline { points: encoded,
                  levels,
                  start: start?,
                  center: bounds.center(),
                  south_west: bounds.south_west(),
                  north_east: bounds.north_east() })
}


fn read_value(bytes: &[u8], pos: &mut usize) -> Result<u64> {
  let mut value = 0u64;
  let mut shift = 0;

  loop {
    let byte = *bytes.get(*pos)
                     .ok_or(Error::Decode { position: *pos,
                                            reason:   "truncated value", })?;
    if byte == b'\\' {
      if bytes.get(*pos + 1) != Some(&b'\\') {
        return Err(Error::Decode { position: *pos,
                                   reason:   "unescaped backslash", }.into());
      }
      *pos += 1;
    }
    if !(63..127).contains(&byte) {
      return Err(Error::Decode { position: *pos,
                                 reason:   "character out of range", }.into());
    }
    if shift > 60 {
      return Err(Error::Decode { position: *pos,
                                 reason:   "value too long", }.into());
    }
    *pos += 1;

    let chunk = u64::from(byte - 63);
    value |= (chunk & 0x1f) << shift;
    shift += 5;
    if chunk & 0x20 == 0 {
      return Ok(value);
    }
  }
}

/// Decodes an encoded polyline (as produced by [`encode`]) into positions.
pub fn decode(encoded: &str) -> Result<Vec<Position>> {
  let bytes = encoded.as_bytes();
  let mut positions = Vec::new();
  let (mut lat, mut lon) = (0i64, 0i64);
  let mut pos = 0;

  while pos < bytes.len() {
    lat += unzigzag(read_value(bytes, &mut pos)?);
    lon += unzigzag(read_value(bytes, &mut pos)?);
    positions.push(Position::new(lat as f64 / 1e5, lon as f64 / 1e5));
  }

  Ok(positions)
}


fn write_position(f: &mut fmt::Formatter,
                  tag: &str,
                  position: Position)
                  -> fmt::Result {
  writeln!(f,
           "  <{} lat=\"{:.6}\" lon=\"{:.6}\"/>",
           tag,
           position.lat(),
           position.lon())
}

impl fmt::Display for Polyline {
  /// Renders the `<gmap_data>` document consumed by map pages.
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    writeln!(f, "<gmap_data>")?;
    writeln!(f, " <coordinates>")?;
    write_position(f, "start", self.start)?;
    write_position(f, "center", self.center)?;
    write_position(f, "southwest", self.south_west)?;
    write_position(f, "northeast", self.north_east)?;
    writeln!(f, " </coordinates>")?;
    writeln!(f, " <polyline>")?;
    writeln!(f, "  <points>{}</points>", self.points)?;
    writeln!(f, "  <levels>{}</levels>", self.levels)?;
    writeln!(f, " </polyline>")?;
    writeln!(f, "</gmap_data>")
  }
}
