//! Fitness ranking for a group of vehicles.
//!
//! Progress is measured as the polar angle of the vehicle around the track
//! center, so no distance field is needed and any closed loop works. The
//! angle only proxies true progress: it cannot tell a vehicle that drove
//! backwards from one that drove forwards to the same spot.

use std::cmp::Ordering;
use std::f32::consts::TAU;

use crate::compute::{Track, Vehicle};

/// Everything the comparator looks at for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitnessRecord {
    /// Slot of the vehicle within its group.
    pub index: usize,
    pub finished: bool,
    /// Simulated finish time. Only meaningful when `finished`.
    pub finish_time: f32,
    /// Polar angle around the track center, unwrapped past the half lap.
    pub progress: f32,
}

impl FitnessRecord {
    pub fn from_vehicle(index: usize, vehicle: &Vehicle, track: &Track) -> Self {
        Self {
            index,
            finished: vehicle.finished,
            finish_time: vehicle.time,
            progress: progress_angle(vehicle, track),
        }
    }
}

/// Polar angle of the vehicle in a `[-1, 1]²` frame centered on the track.
///
/// Vehicles past the half lap with a negative angle get `θ + 2π` so the
/// value keeps growing around the loop instead of wrapping.
pub fn progress_angle(vehicle: &Vehicle, track: &Track) -> f32 {
    let px = 2.0 * vehicle.x / track.width() as f32 - 1.0;
    let py = 1.0 - 2.0 * vehicle.y / track.height() as f32;
    let theta = py.atan2(px);
    if vehicle.half_lap && theta < 0.0 {
        theta + TAU
    } else {
        theta
    }
}

/// Strict total order over records. `Less` means `a` ranks ahead of `b`.
///
/// Finished beats unfinished, faster finish beats slower, larger progress
/// beats smaller. Anything still tied falls back to the lower slot index.
pub fn compare(a: &FitnessRecord, b: &FitnessRecord) -> Ordering {
    let by_outcome = match (a.finished, b.finished) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => a.finish_time.total_cmp(&b.finish_time),
        (false, false) => b.progress.total_cmp(&a.progress),
    };
    by_outcome.then(a.index.cmp(&b.index))
}

/// Sort records best first and return their indices.
pub fn rank_records(records: &[FitnessRecord]) -> Vec<usize> {
    let mut sorted = records.to_vec();
    sorted.sort_by(compare);
    sorted.into_iter().map(|r| r.index).collect()
}

/// Rank a group's vehicles best first.
pub fn rank_vehicles(vehicles: &[Vehicle], track: &Track) -> Vec<usize> {
    let records: Vec<FitnessRecord> = vehicles
        .iter()
        .enumerate()
        .map(|(i, v)| FitnessRecord::from_vehicle(i, v, track))
        .collect();
    rank_records(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StartPose;
    use proptest::prelude::*;

    fn finished(index: usize, time: f32) -> FitnessRecord {
        FitnessRecord {
            index,
            finished: true,
            finish_time: time,
            progress: 0.0,
        }
    }

    fn running(index: usize, progress: f32) -> FitnessRecord {
        FitnessRecord {
            index,
            finished: false,
            finish_time: 0.0,
            progress,
        }
    }

    #[test]
    fn test_mixed_group_ranking() {
        let records = [
            finished(0, 10.0),
            running(1, 1.0),
            finished(2, 5.0),
            running(3, 2.0),
        ];
        assert_eq!(rank_records(&records), vec![2, 0, 3, 1]);
    }

    #[test]
    fn test_ties_break_on_index() {
        let records = [running(2, 1.0), running(0, 1.0), running(1, 1.0)];
        assert_eq!(rank_records(&records), vec![0, 1, 2]);
    }

    #[test]
    fn test_progress_angle_frame() {
        let track = Track::open(200, 100).unwrap();
        let mut vehicle = Vehicle::at_start(&StartPose::default());

        // Right of center: angle 0.
        vehicle.x = 150.0;
        vehicle.y = 50.0;
        assert!(progress_angle(&vehicle, &track).abs() < 1e-6);

        // Above center: +π/2 (screen y grows downwards).
        vehicle.x = 100.0;
        vehicle.y = 0.0;
        assert!((progress_angle(&vehicle, &track) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);

        // Below center before and after the half lap.
        vehicle.y = 100.0;
        let before = progress_angle(&vehicle, &track);
        assert!(before < 0.0);
        vehicle.half_lap = true;
        let after = progress_angle(&vehicle, &track);
        assert!((after - (before + TAU)).abs() < 1e-5);
    }

    #[test]
    fn test_rank_vehicles_prefers_half_lap() {
        let track = Track::open(200, 100).unwrap();
        let start = StartPose::default();
        let mut early = Vehicle::at_start(&start);
        early.x = 150.0;
        early.y = 40.0;
        let mut late = Vehicle::at_start(&start);
        late.x = 150.0;
        late.y = 60.0;
        late.half_lap = true;

        assert_eq!(rank_vehicles(&[early, late], &track), vec![1, 0]);
    }

    fn record() -> impl Strategy<Value = (bool, f32, f32)> {
        (any::<bool>(), 0.0f32..100.0, -3.2f32..10.0)
    }

    proptest! {
        #[test]
        fn proptest_ranking_is_consistent(raw in proptest::collection::vec(record(), 1..40)) {
            let records: Vec<FitnessRecord> = raw
                .iter()
                .enumerate()
                .map(|(index, &(finished, finish_time, progress))| FitnessRecord {
                    index,
                    finished,
                    finish_time,
                    progress,
                })
                .collect();

            let ranking = rank_records(&records);
            let mut seen = ranking.clone();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..records.len()).collect::<Vec<_>>());

            for pair in ranking.windows(2) {
                let (a, b) = (&records[pair[0]], &records[pair[1]]);
                prop_assert_eq!(compare(a, b), Ordering::Less);
                prop_assert!(a.finished || !b.finished);
                if a.finished && b.finished {
                    prop_assert!(a.finish_time <= b.finish_time);
                }
                if !a.finished && !b.finished {
                    prop_assert!(a.progress >= b.progress);
                }
            }
        }

        #[test]
        fn proptest_compare_antisymmetric(a in record(), b in record(), i in 0usize..10, j in 0usize..10) {
            let ra = FitnessRecord { index: i, finished: a.0, finish_time: a.1, progress: a.2 };
            let rb = FitnessRecord { index: j, finished: b.0, finish_time: b.1, progress: b.2 };
            prop_assert_eq!(compare(&ra, &rb), compare(&rb, &ra).reverse());
            if i != j {
                prop_assert_ne!(compare(&ra, &rb), Ordering::Equal);
            }
        }
    }
}
