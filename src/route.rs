// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Route documents (GPX 1.0) built from track points.

use super::{record::TrackPoint,
            service::{Bounds, Position}};
use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use std::io;


const CREATOR: &str = concat!("tracklap ", env!("CARGO_PKG_VERSION"));

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";


#[derive(Clone, Copy, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct RoutePoint {
  lat:       f64,
  lon:       f64,
  elevation: f32,
  time:      DateTime<Utc>,
}

impl RoutePoint {
  /// `None` for points without a fix.
  pub fn from_track_point(point: &TrackPoint) -> Option<Self> {
    let position = point.position()?;
    Some(Self { lat:       position.lat(),
                lon:       position.lon(),
                elevation: point.altitude(),
                time:      point.time(), })
  }

  pub fn position(&self) -> Position {
    Position::new(self.lat, self.lon)
  }
}


#[derive(Clone, Debug, Default, PartialEq, CopyGetters, Getters)]
pub struct Route {
  #[getset(get = "pub")]
  points: Vec<RoutePoint>,
  #[getset(get_copy = "pub")]
  bounds: Option<Bounds>,
}

impl Route {
  /// Route over every point of `points` which has a fix, in order.
  pub fn from_points<'a, I>(points: I) -> Self
    where I: IntoIterator<Item = &'a TrackPoint>
  {
    let points: Vec<RoutePoint> = points.into_iter()
                                        .filter_map(RoutePoint::from_track_point)
                                        .collect();
    let bounds = Bounds::of(points.iter().map(RoutePoint::position));
    Self { points, bounds }
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Writes the route as a GPX 1.0 document. `generated_at` goes into the
  /// document's own `<time>` element.
  pub fn write<W>(&self, mut w: W, generated_at: DateTime<Utc>) -> io::Result<()>
    where W: io::Write
  {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, r#"<gpx version="1.0""#)?;
    writeln!(w, r#"creator="{}""#, CREATOR)?;
    writeln!(w, r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#)?;
    writeln!(w, r#"xmlns="http://www.topografix.com/GPX/1/0""#)?;
    writeln!(w,
             r#"xsi:schemaLocation="http://www.topografix.com/GPX/1/0 http://www.topografix.com/GPX/1/0/gpx.xsd">"#)?;
    writeln!(w, "<time>{}</time>", generated_at.format(TIME_FORMAT))?;

    if let Some(bounds) = self.bounds {
      let (sw, ne) = (bounds.south_west(), bounds.north_east());
      writeln!(w,
               r#"<bounds minlat="{:.6}" minlon="{:.6}" maxlat="{:.6}" maxlon="{:.6}" />"#,
               sw.lat(),
               sw.lon(),
               ne.lat(),
               ne.lon())?;
    }

    writeln!(w, "<rte>")?;
    for point in &self.points {
      writeln!(w,
               r#"  <rtept lat="{:.6}" lon="{:.6}">"#,
               point.lat,
               point.lon)?;
      writeln!(w, "    <ele>{:.6}</ele>", point.elevation)?;
      writeln!(w, "    <time>{}</time>", point.time.format(TIME_FORMAT))?;
      writeln!(w, "  </rtept>")?;
    }
    writeln!(w, "</rte>")?;
    writeln!(w, "</gpx>")
  }
}


#[cfg(test)]
mod tests {
  use super::{super::{record::NO_FIX, service::degrees_to_semicircles},
              *};
  use chrono::TimeZone;
  use pretty_assertions::assert_eq;


  fn point(lat: f64, lon: f64, time: u32, altitude: f32) -> TrackPoint {
    let mut point = TrackPoint::new(degrees_to_semicircles(lat),
                                    degrees_to_semicircles(lon),
                                    time);
    point.set_altitude(altitude);
    point
  }

  fn generated_at() -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000, 0).unwrap()
  }

  #[test]
  fn from_points_test() {
    let points = vec![point(10.0, 20.0, 0, 1.0),
                      TrackPoint::new(NO_FIX, NO_FIX, 30),
                      TrackPoint::new(degrees_to_semicircles(11.0), NO_FIX, 45),
                      point(10.001, 20.001, 60, 2.0)];
    let route = Route::from_points(&points);

    assert_eq!(2, route.len());
    assert_eq!(vec![0, 60],
               route.points()
                    .iter()
                    .map(|p| (p.time() - points[0].time()).num_seconds())
                    .collect::<Vec<_>>());

    let bounds = route.bounds().unwrap();
    assert!((bounds.north_east().lat() - 10.001).abs() < 1e-6);
    assert!((bounds.south_west().lon() - 20.0).abs() < 1e-6);
  }

  #[test]
  fn write_test() {
    let points = vec![point(10.0, 20.0, 0, 123.5),
                      TrackPoint::new(NO_FIX, NO_FIX, 30),
                      point(10.001, 20.001, 60, 124.0)];
    let mut out = Vec::new();
    Route::from_points(&points).write(&mut out, generated_at())
                               .unwrap();

    let expected = format!(r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.0"
creator="tracklap {}"
xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
xmlns="http://www.topografix.com/GPX/1/0"
xsi:schemaLocation="http://www.topografix.com/GPX/1/0 http://www.topografix.com/GPX/1/0/gpx.xsd">
<time>2020-09-13T12:26:40Z</time>
<bounds minlat="10.000000" minlon="20.000000" maxlat="10.001000" maxlon="20.001000" />
<rte>
  <rtept lat="10.000000" lon="20.000000">
    <ele>123.500000</ele>
    <time>1989-12-31T00:00:00Z</time>
  </rtept>
  <rtept lat="10.001000" lon="20.001000">
    <ele>124.000000</ele>
    <time>1989-12-31T00:01:00Z</time>
  </rtept>
</rte>
</gpx>
"#,
                           env!("CARGO_PKG_VERSION"));
    assert_eq!(expected, String::from_utf8(out).unwrap());
  }

  #[test]
  fn write_empty_test() {
    let mut out = Vec::new();
    Route::default().write(&mut out, generated_at()).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(!out.contains("<bounds"));
    assert!(out.contains("<rte>\n</rte>\n</gpx>\n"));
  }
}
