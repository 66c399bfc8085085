use chrono::{NaiveDateTime, Timelike};
use geo::{GeodesicDistance, HaversineBearing, Point};

/// One timestamped position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
}

impl Fix {
    pub fn new(time: NaiveDateTime, latitude: f64, longitude: f64) -> Self {
        Self {
            time,
            latitude,
            longitude,
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Geodesic (WGS84) distance in metres.
    pub fn distance_to(&self, other: &Fix) -> f64 {
        self.point().geodesic_distance(&other.point())
    }
}

/// Time-ordered track of at least two fixes.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub id: String,
    fixes: Vec<Fix>,
}

impl Trajectory {
    /// Sorts the fixes by time and keeps the first fix of any repeated timestamp.
    /// Returns `None` when fewer than two fixes remain.
    pub fn new(id: impl Into<String>, mut fixes: Vec<Fix>) -> Option<Self> {
        fixes.sort_by_key(|fix| fix.time);
        fixes.dedup_by_key(|fix| fix.time);
        if fixes.len() < 2 {
            return None;
        }
        Some(Self {
            id: id.into(),
            fixes,
        })
    }

    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.fixes[0].time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.fixes[self.fixes.len() - 1].time
    }

    pub fn duration_s(&self) -> f64 {
        (self.end_time() - self.start_time()).num_microseconds().unwrap_or(i64::MAX) as f64
            / 1_000_000.0
    }

    /// Sum of geodesic distances between consecutive fixes, in metres.
    pub fn length(&self) -> f64 {
        self.fixes
            .windows(2)
            .map(|pair| pair[0].distance_to(&pair[1]))
            .sum()
    }

    /// Initial compass bearing from the first to the last fix, in degrees within `[0, 360)`.
    pub fn direction(&self) -> f64 {
        let first = self.fixes[0].point();
        let last = self.fixes[self.fixes.len() - 1].point();
        normalize_degrees(first.haversine_bearing(last))
    }

    /// Fixes with `start <= time <= end` as a new trajectory named `<id>_<start>`.
    pub fn segment_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Option<Trajectory> {
        let from = self.fixes.partition_point(|fix| fix.time < start);
        let to = self.fixes.partition_point(|fix| fix.time <= end);
        if to <= from || to - from < 2 {
            return None;
        }
        Some(Trajectory {
            id: format!("{}_{}", self.id, format_segment_time(start)),
            fixes: self.fixes[from..to].to_vec(),
        })
    }

    pub fn to_wkt(&self) -> String {
        let coords: Vec<String> = self
            .fixes
            .iter()
            .map(|fix| format!("{} {}", fix.longitude, fix.latitude))
            .collect();
        format!("LINESTRING ({})", coords.join(", "))
    }
}

pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// `%Y-%m-%d %H:%M:%S`, followed by `.ffffff` when the time has a sub-second part.
pub fn format_segment_time(time: NaiveDateTime) -> String {
    if time.nanosecond() == 0 {
        time.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        time.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(seconds: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 12)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(seconds as i64)
    }

    #[test]
    fn sorts_and_deduplicates_fixes() {
        let traj = Trajectory::new(
            "boat",
            vec![
                Fix::new(at(2), 48.0, -4.0),
                Fix::new(at(0), 48.0, -4.1),
                Fix::new(at(2), 49.0, -4.0),
            ],
        )
        .unwrap();
        assert_eq!(traj.fixes().len(), 2);
        assert_eq!(traj.start_time(), at(0));
        assert_eq!(traj.fixes()[1].latitude, 48.0);
    }

    #[test]
    fn single_fix_is_not_a_trajectory() {
        assert!(Trajectory::new("boat", vec![Fix::new(at(0), 48.0, -4.0)]).is_none());
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km_due_north() {
        let traj = Trajectory::new(
            "boat",
            vec![Fix::new(at(0), 48.0, -4.0), Fix::new(at(60), 49.0, -4.0)],
        )
        .unwrap();
        assert!((traj.length() - 111_200.0).abs() < 300.0, "{}", traj.length());
        assert!(traj.direction() < 1e-9);
        assert_eq!(traj.duration_s(), 60.0);
    }

    #[test]
    fn westward_direction_is_270() {
        let traj = Trajectory::new(
            "boat",
            vec![Fix::new(at(0), 0.0, 1.0), Fix::new(at(60), 0.0, 0.0)],
        )
        .unwrap();
        assert!((traj.direction() - 270.0).abs() < 1e-6);
    }

    #[test]
    fn segment_ids_carry_start_time() {
        let traj = Trajectory::new(
            "Enora",
            (0..5).map(|s| Fix::new(at(s), 48.0, -4.0 + s as f64 * 1e-4)).collect(),
        )
        .unwrap();
        let segment = traj.segment_between(at(1), at(3)).unwrap();
        assert_eq!(segment.id, "Enora_2023-06-12 10:00:01");
        assert_eq!(segment.fixes().len(), 3);
        assert!(traj.segment_between(at(4), at(9)).is_none());

        let half = at(1) + chrono::Duration::milliseconds(500);
        assert_eq!(format_segment_time(half), "2023-06-12 10:00:01.500000");
    }

    #[test]
    fn writes_wkt_linestring() {
        let traj = Trajectory::new(
            "boat",
            vec![Fix::new(at(0), 48.5, -4.25), Fix::new(at(1), 48.75, -4.0)],
        )
        .unwrap();
        assert_eq!(traj.to_wkt(), "LINESTRING (-4.25 48.5, -4 48.75)");
    }
}
