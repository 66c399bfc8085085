use std::collections::VecDeque;

use chrono::{Duration, NaiveDateTime};
use geo::{GeodesicDistance, Point};
use tracing::debug;

use crate::config::SplitterConfig;
use crate::trajectory::{Fix, Trajectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Lat/lon bounding box of the fixes in the detection window.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Bounds {
    fn of(fix: &Fix) -> Self {
        Self {
            min_lat: fix.latitude,
            max_lat: fix.latitude,
            min_lon: fix.longitude,
            max_lon: fix.longitude,
        }
    }

    fn from_fixes<'a>(fixes: impl IntoIterator<Item = &'a Fix>) -> Option<Self> {
        let mut iter = fixes.into_iter();
        let first = Self::of(iter.next()?);
        Some(iter.fold(first, |bounds, fix| bounds.extend(fix)))
    }

    fn extend(self, fix: &Fix) -> Self {
        Self {
            min_lat: self.min_lat.min(fix.latitude),
            max_lat: self.max_lat.max(fix.latitude),
            min_lon: self.min_lon.min(fix.longitude),
            max_lon: self.max_lon.max(fix.longitude),
        }
    }

    /// Geodesic length of the box diagonal in metres.
    fn diagonal(&self) -> f64 {
        let south_west = Point::new(self.min_lon, self.min_lat);
        let north_east = Point::new(self.max_lon, self.max_lat);
        south_west.geodesic_distance(&north_east)
    }
}

/// Finds the periods in which the vessel stayed within `max_diameter_m` for at least
/// `min_duration`.
#[derive(Debug, Clone, Copy)]
pub struct StopDetector {
    max_diameter_m: f64,
    min_duration: Duration,
}

impl StopDetector {
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            max_diameter_m: config.max_diameter_m,
            min_duration: config.min_duration(),
        }
    }

    pub fn stop_ranges(&self, trajectory: &Trajectory) -> Vec<TimeRange> {
        let mut stops = Vec::new();
        let mut window: VecDeque<Fix> = VecDeque::new();
        let mut bounds: Option<Bounds> = None;
        let mut stopped = false;
        let mut previously_stopped = false;

        for fix in trajectory.fixes() {
            window.push_back(*fix);

            let mut trimmed = false;
            if !stopped {
                while window.len() > 2 && span(&window) >= self.min_duration {
                    window.pop_front();
                    trimmed = true;
                }
            }

            bounds = match bounds {
                Some(current) if !trimmed => Some(current.extend(fix)),
                _ => Bounds::from_fixes(&window),
            };

            stopped = window.len() > 1
                && bounds.is_some_and(|b| b.diagonal() < self.max_diameter_m);

            if window.len() > 1 && !stopped && previously_stopped {
                let begin = window[0].time;
                let end = window[window.len() - 2].time;
                if end - begin >= self.min_duration {
                    stops.push(TimeRange::new(begin, end));
                    window.clear();
                    bounds = None;
                }
            }

            previously_stopped = stopped;
        }

        if stopped && span(&window) >= self.min_duration {
            stops.push(TimeRange::new(window[0].time, window[window.len() - 1].time));
        }

        debug!(trajectory = %trajectory.id, stops = stops.len(), "Detected stops");
        stops
    }
}

fn span(window: &VecDeque<Fix>) -> Duration {
    match (window.front(), window.back()) {
        (Some(first), Some(last)) => last.time - first.time,
        _ => Duration::zero(),
    }
}

/// Cuts a trajectory into the legs travelled between stops.
#[derive(Debug, Clone, Copy)]
pub struct StopSplitter {
    detector: StopDetector,
    min_length_m: f64,
}

impl StopSplitter {
    pub fn new(config: &SplitterConfig) -> Self {
        Self {
            detector: StopDetector::new(config),
            min_length_m: config.min_length_m,
        }
    }

    pub fn detector(&self) -> &StopDetector {
        &self.detector
    }

    /// Legs between stops, each at least two fixes long and `min_length_m` metres long.
    pub fn split(&self, trajectory: &Trajectory) -> Vec<Trajectory> {
        let stops = self.detector.stop_ranges(trajectory);
        let legs: Vec<Trajectory> = ranges_between_stops(trajectory, &stops)
            .into_iter()
            .filter_map(|range| trajectory.segment_between(range.start, range.end))
            .filter(|leg| leg.length() >= self.min_length_m)
            .collect();
        debug!(
            trajectory = %trajectory.id,
            stops = stops.len(),
            legs = legs.len(),
            "Split trajectory at stops"
        );
        legs
    }
}

/// Complement of `stops` within the trajectory's time span. Stop boundaries are shared with
/// the neighbouring legs.
pub fn ranges_between_stops(trajectory: &Trajectory, stops: &[TimeRange]) -> Vec<TimeRange> {
    let start = trajectory.start_time();
    let end = trajectory.end_time();

    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return vec![TimeRange::new(start, end)];
    };

    let mut ranges = Vec::with_capacity(stops.len() + 1);
    if start < first.start {
        ranges.push(TimeRange::new(start, first.start));
    }
    for pair in stops.windows(2) {
        ranges.push(TimeRange::new(pair[0].end, pair[1].start));
    }
    if last.end < end {
        ranges.push(TimeRange::new(last.end, end));
    }
    ranges
}
