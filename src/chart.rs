// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Downsampled data series for the chart service.
//!
//! Valid track points are averaged in groups so that a chart of the
//! configured width gets roughly one sample per `pixels_per_sample` pixels.
//! The samples are scaled against each field's range and encoded either in
//! the service's "extended" two character encoding or as plain percentages.

use super::record::TrackPoint;
use getset::{CopyGetters, Getters, Setters};
use std::{convert::TryFrom, fmt};
use tracing::debug;


const CHART_URL: &str = "http://chart.apis.google.com/chart";

/// Values above this are treated as "no reading".
const MAX_READING: f64 = 1.0e24;

/// Alphabet of the extended encoding, one character per 6 bit group.
const EXTENDED_ALPHABET: &[u8; 64] =
  b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-.";

/// Largest value the extended encoding can represent.
const EXTENDED_MAX: f64 = 4095.0;


/// How sample values are written into the chart URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Encoding {
  /// Two characters per value, 12 bit resolution.
  #[value(alias = "e")]
  Extended,
  /// Percentages with one decimal, comma separated.
  #[value(alias = "t")]
  Text,
}


#[derive(Clone, Copy, Debug, PartialEq, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct ChartConfig {
  width:             u32,
  height:            u32,
  pixels_per_sample: f64,
  encoding:          Encoding,
}

impl ChartConfig {
  pub fn new(width: u32,
             height: u32,
             pixels_per_sample: f64,
             encoding: Encoding)
             -> Self {
    Self { width,
           height,
           pixels_per_sample,
           encoding }
  }
}

impl Default for ChartConfig {
  fn default() -> Self {
    Self::new(1000, 300, 499.0, Encoding::Extended)
  }
}


/// One averaged group of track points. `time` is in device seconds.
#[derive(Clone, Copy, Debug, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Sample {
  time:     f64,
  distance: f64,
  altitude: f64,
}

/// Smallest and largest reading of one field.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Range {
  min: f64,
  max: f64,
}

impl Range {
  fn of<I>(values: I) -> Self
    where I: IntoIterator<Item = f64>
  {
    values.into_iter()
          .fold(Self { min: f64::INFINITY,
                       max: f64::NEG_INFINITY, },
                |range, value| Self { min: range.min.min(value),
                                      max: range.max.max(value), })
  }

  fn span(&self) -> f64 {
    self.max - self.min
  }

  /// Means are mathematically inside the range but may drift out of it by
  /// rounding.
  fn clamp(&self, value: f64) -> f64 {
    value.max(self.min).min(self.max)
  }
}


#[derive(Clone, Debug, PartialEq, CopyGetters, Getters)]
pub struct Chart {
  #[getset(get = "pub")]
  samples:              Vec<Sample>,
  /// Number of valid points averaged into one sample.
  #[getset(get_copy = "pub")]
  per_sample:           usize,
  /// Valid points at the end which didn't fill a whole sample.
  #[getset(get_copy = "pub")]
  remainder:            usize,
  #[getset(get = "pub")]
  distance_vs_altitude: String,
  #[getset(get = "pub")]
  time_vs_distance:     String,
}

impl fmt::Display for Chart {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    writeln!(f, "{}", self.distance_vs_altitude)?;
    writeln!(f, "{}", self.time_vs_distance)
  }
}


fn is_reading(value: f32) -> bool {
  value.is_finite() && f64::from(value) <= MAX_READING
}

/// A point takes part in the chart if it has a fix and sane readings.
fn is_valid(point: &TrackPoint) -> bool {
  point.has_fix() && is_reading(point.altitude()) && is_reading(point.distance())
}

fn points_per_sample(valid: usize, config: &ChartConfig) -> usize {
  let samples = f64::from(config.width()) / config.pixels_per_sample();
  let per_sample = (valid as f64 / samples).ceil();
  if per_sample.is_finite() && per_sample >= 1.0 {
    per_sample as usize
  } else {
    1
  }
}

fn extended_digit(value: i64) -> char {
  match usize::try_from(value).ok()
                              .and_then(|idx| EXTENDED_ALPHABET.get(idx))
  {
    Some(&c) => char::from(c),
    None => '_',
  }
}

/// Extended encoding of `value` relative to `range`; `"__"` if it falls
/// outside of the representable range.
fn extended_value(value: f64, range: Range) -> String {
  let scaled = if range.span() > 0.0 {
    EXTENDED_MAX * (value - range.min) / range.span()
  } else {
    0.0
  };
  if !(0.0..=EXTENDED_MAX).contains(&scaled) {
    return "__".to_owned();
  }

  let scaled = scaled as i64;
  [extended_digit(scaled / 64), extended_digit(scaled % 64)].iter()
                                                            .collect()
}

/// Text encoding of `value`: percent of `range`, truncated to one decimal.
fn text_value(value: f64, range: Range) -> String {
  let percent = if range.span() > 0.0 {
    (1000.0 * (value - range.min) / range.span()).floor() / 10.0
  } else {
    0.0
  };
  format!("{:.1}", percent)
}

fn series<I>(values: I, range: Range, encoding: Encoding) -> String
  where I: Iterator<Item = f64>
{
  match encoding {
    Encoding::Extended => {
      values.map(|value| extended_value(range.clamp(value), range))
            .collect()
    }
    Encoding::Text => values.map(|value| text_value(range.clamp(value), range))
                            .collect::<Vec<_>>()
                            .join(","),
  }
}

fn chart_url(title: &str, config: &ChartConfig, x: &str, y: &str) -> String {
  let data = match config.encoding() {
    Encoding::Extended => format!("e:{},{}", x, y),
    Encoding::Text => format!("t:{}|{}", x, y),
  };
  format!("{}?cht=lxy&chtt={}&chs={}x{}&chd={}",
          CHART_URL,
          title,
          config.width(),
          config.height(),
          data)
}


/// Downsamples `points` and encodes them as two chart URLs.
pub fn encode(points: &[&TrackPoint], config: &ChartConfig) -> Chart {
  let valid: Vec<&TrackPoint> =
    points.iter().copied().filter(|point| is_valid(point)).collect();
  let per_sample = points_per_sample(valid.len(), config);

  let samples: Vec<Sample> =
    valid.chunks_exact(per_sample)
         .map(|group| {
           let (time, distance, altitude) =
             group.iter().fold((0.0f64, 0.0f64, 0.0f64), |(t, d, a), point| {
                           (t + f64::from(point.raw_time()),
                            d + f64::from(point.distance()),
                            a + f64::from(point.altitude()))
                         });
           let n = group.len() as f64;
           Sample { time:     time / n,
                    distance: distance / n,
                    altitude: altitude / n, }
         })
         .collect();
  let remainder = valid.len() % per_sample;

  debug!("charting {} of {} points, {} per sample, {} left over",
         valid.len(),
         points.len(),
         per_sample,
         remainder);

  let time_range = Range::of(valid.iter().map(|p| f64::from(p.raw_time())));
  let distance_range = Range::of(valid.iter().map(|p| f64::from(p.distance())));
  let altitude_range = Range::of(valid.iter().map(|p| f64::from(p.altitude())));

  let encoding = config.encoding();
  let time = series(samples.iter().map(Sample::time), time_range, encoding);
  let distance = series(samples.iter().map(Sample::distance),
                        distance_range,
                        encoding);
  let altitude = series(samples.iter().map(Sample::altitude),
                        altitude_range,
                        encoding);

  Chart { distance_vs_altitude: chart_url("Distance+vs.+Alt",
                                          config,
                                          &distance,
                                          &altitude),
          time_vs_distance: chart_url("Time+vs.+Distance",
                                      config,
                                      &time,
                                      &distance),
          samples,
          per_sample,
          remainder }
}


#[cfg(test)]
mod tests {
  use super::{super::record::NO_FIX, *};
  use pretty_assertions::assert_eq;
  use proptest::prelude::*;


  fn point(time: u32, distance: f32, altitude: f32) -> TrackPoint {
    let mut point = TrackPoint::new(1, 1, time);
    point.set_distance(distance);
    point.set_altitude(altitude);
    point
  }

  fn ramp() -> Vec<TrackPoint> {
    vec![point(0, 0.0, 10.0),
         point(10, 100.0, 10.0),
         point(20, 200.0, 20.0),
         point(30, 300.0, 20.0)]
  }

  #[test]
  fn chart_config_test() {
    let config = ChartConfig::default();
    assert_eq!(1000, config.width());
    assert_eq!(300, config.height());
    assert_eq!(499.0, config.pixels_per_sample());
    assert_eq!(Encoding::Extended, config.encoding());
  }

  #[test]
  fn extended_value_test() {
    let range = Range { min: 0.0,
                        max: 4095.0 };
    assert_eq!("AA", extended_value(0.0, range));
    assert_eq!("BA", extended_value(64.0, range));
    assert_eq!("..", extended_value(4095.0, range));
    assert_eq!("__", extended_value(4096.0, range));
    assert_eq!("__", extended_value(-1.0, range));

    let flat = Range { min: 5.0,
                       max: 5.0 };
    assert_eq!("AA", extended_value(5.0, flat));
  }

  #[test]
  fn text_value_test() {
    let range = Range { min: 0.0,
                        max: 30.0 };
    assert_eq!("16.6", text_value(5.0, range));
    assert_eq!("100.0", text_value(30.0, range));
    assert_eq!("0.0", text_value(1.0, Range { min: 1.0,
                                              max: 1.0, }));
  }

  #[test]
  fn is_reading_test() {
    assert!(is_reading(0.0));
    assert!(is_reading(-12.5));
    assert!(is_reading(1.0e23));
    assert!(!is_reading(1.0e25));
    assert!(!is_reading(f32::MAX));
    assert!(!is_reading(f32::INFINITY));
    assert!(!is_reading(f32::NAN));
  }

  #[test]
  fn encode_extended_test() {
    let points = ramp();
    let refs: Vec<&TrackPoint> = points.iter().collect();
    let chart = encode(&refs, &ChartConfig::default());

    assert_eq!(2, chart.per_sample());
    assert_eq!(0, chart.remainder());
    assert_eq!(vec![Sample { time:     5.0,
                             distance: 50.0,
                             altitude: 10.0, },
                    Sample { time:     25.0,
                             distance: 250.0,
                             altitude: 20.0, }],
               *chart.samples());
    assert_eq!("http://chart.apis.google.com/chart?cht=lxy\
                &chtt=Distance+vs.+Alt&chs=1000x300&chd=e:Kq1U,AA..",
               chart.distance_vs_altitude());
    assert_eq!("http://chart.apis.google.com/chart?cht=lxy\
                &chtt=Time+vs.+Distance&chs=1000x300&chd=e:Kq1U,Kq1U",
               chart.time_vs_distance());
  }

  #[test]
  fn encode_text_test() {
    let points = ramp();
    let refs: Vec<&TrackPoint> = points.iter().collect();
    let config = ChartConfig::new(640, 200, 320.0, Encoding::Text);
    let chart = encode(&refs, &config);

    assert_eq!("http://chart.apis.google.com/chart?cht=lxy\
                &chtt=Distance+vs.+Alt&chs=640x200&chd=t:16.6,83.3|0.0,100.0",
               chart.distance_vs_altitude());
    assert_eq!(format!("{}\n{}\n",
                       chart.distance_vs_altitude(),
                       chart.time_vs_distance()),
               chart.to_string());
  }

  #[test]
  fn encode_remainder_test() {
    let mut points = ramp();
    points.push(point(40, 400.0, 30.0));
    let refs: Vec<&TrackPoint> = points.iter().collect();
    let chart = encode(&refs, &ChartConfig::default());

    assert_eq!(3, chart.per_sample());
    assert_eq!(1, chart.samples().len());
    assert_eq!(2, chart.remainder());
  }

  #[test]
  fn encode_skips_invalid_test() {
    let mut points = ramp();
    points.push(TrackPoint::new(NO_FIX, 1, 50));
    points.push(TrackPoint::new(1, NO_FIX, 60));
    points.push(point(70, f32::NAN, 0.0));
    points.push(point(80, 0.0, 1.0e25));
    let refs: Vec<&TrackPoint> = points.iter().collect();
    let chart = encode(&refs, &ChartConfig::default());

    assert_eq!(2, chart.per_sample());
    assert_eq!(2, chart.samples().len());
    assert_eq!(0, chart.remainder());
    assert_eq!(25.0, chart.samples()[1].time());
  }

  #[test]
  fn encode_empty_test() {
    let chart = encode(&[], &ChartConfig::default());
    assert_eq!(1, chart.per_sample());
    assert_eq!(0, chart.remainder());
    assert!(chart.samples().is_empty());
    assert!(chart.distance_vs_altitude().ends_with("chd=e:,"));
  }

  proptest! {
    #[test]
    fn sample_accounting_test(count in 0usize..300,
                              width in 1u32..2000,
                              pixels in 1.0f64..1000.0) {
      let points: Vec<TrackPoint> =
        (0..count).map(|i| point(i as u32, i as f32, 100.0)).collect();
      let refs: Vec<&TrackPoint> = points.iter().collect();
      let config = ChartConfig::new(width, 100, pixels, Encoding::Extended);
      let chart = encode(&refs, &config);

      prop_assert!(chart.per_sample() >= 1);
      prop_assert!(chart.remainder() < chart.per_sample());
      prop_assert_eq!(count,
                      chart.samples().len() * chart.per_sample()
                      + chart.remainder());
    }
  }
}
