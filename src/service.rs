// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

use getset::CopyGetters;
use serde::Serialize;


/// Degrees per semicircle, i.e. 180 / 2^31.
const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / 2_147_483_648.0;


/// Converts a semicircle value as stored on the device into degrees.
pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
  f64::from(semicircles) * DEGREES_PER_SEMICIRCLE
}

/// Converts degrees into (rounded) semicircles.
pub fn degrees_to_semicircles(degrees: f64) -> i32 {
  (degrees / DEGREES_PER_SEMICIRCLE).round() as i32
}


/// Latitude/longitude pair in degrees.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct Position {
  lat: f64,
  lon: f64,
}

impl Position {
  pub fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }
}


/// Bounding box of a path, grown one position at a time.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Serialize)]
#[getset(get_copy = "pub")]
pub struct Bounds {
  south_west: Position,
  north_east: Position,
}

impl Bounds {
  /// Bounds covering exactly one position.
  pub fn new(position: Position) -> Self {
    Self { south_west: position,
           north_east: position }
  }

  /// Bounds of all `positions`, `None` if there are none.
  pub fn of<I>(positions: I) -> Option<Self>
    where I: IntoIterator<Item = Position>
  {
    let mut positions = positions.into_iter();
    let mut bounds = Self::new(positions.next()?);
    positions.for_each(|position| bounds.extend(position));
    Some(bounds)
  }

  pub fn extend(&mut self, position: Position) {
    let (sw, ne) = (&mut self.south_west, &mut self.north_east);
    sw.lat = sw.lat.min(position.lat);
    sw.lon = sw.lon.min(position.lon);
    ne.lat = ne.lat.max(position.lat);
    ne.lon = ne.lon.max(position.lon);
  }

  pub fn center(&self) -> Position {
    Position::new((self.south_west.lat + self.north_east.lat) / 2.0,
                  (self.south_west.lon + self.north_east.lon) / 2.0)
  }
}
