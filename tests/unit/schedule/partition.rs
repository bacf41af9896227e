use super::*;

#[test]
fn sixteen_samples_over_four_workers() {
    assert_eq!(partition_samples(16, 4).unwrap(), vec![4, 4, 4, 4]);
}

#[test]
fn ten_samples_over_four_workers() {
    let counts = partition_samples(10, 4).unwrap();
    assert_eq!(counts, vec![3, 3, 2, 2]);
}

#[test]
fn sample_partition_sums_exactly_and_is_balanced() {
    for total in 1..=64u32 {
        for workers in 1..=12usize {
            let counts = partition_samples(total, workers).unwrap();
            assert_eq!(counts.len(), workers);
            assert_eq!(counts.iter().sum::<u32>(), total, "S={total} N={workers}");
            let max = *counts.iter().max().unwrap();
            let min = *counts.iter().min().unwrap();
            assert!(max - min <= 1, "S={total} N={workers}: {counts:?}");
        }
    }
}

#[test]
fn more_workers_than_samples_skips_empty_slots() {
    let counts = partition_samples(3, 5).unwrap();
    assert_eq!(counts, vec![1, 1, 1, 0, 0]);
    let units = sample_units(&counts);
    assert_eq!(units.len(), 3);
    assert_eq!(
        units[2],
        (WorkerId(2), WorkUnit::SamplePartition { sample_count: 1 })
    );
}

#[test]
fn zero_workers_is_rejected() {
    assert!(matches!(
        partition_samples(4, 0),
        Err(RaypoolError::Validation(_))
    ));
}

#[test]
fn hundred_by_thirty_seven_with_strip_four() {
    let strips = partition_scanlines(100, 37, 4).unwrap();
    assert_eq!(strips.len(), 10);
    assert_eq!(strips[9], Region::new(0, 36, 100, 1));
    assert!(strips[..9].iter().all(|s| s.height == 4 && s.width == 100));
}

#[test]
fn strips_are_disjoint_and_cover_every_row() {
    for height in 0..=50u32 {
        for strip in 1..=9u32 {
            let strips = partition_scanlines(7, height, strip).unwrap();
            let mut covered = vec![0u32; height as usize];
            for s in &strips {
                assert!(s.height >= 1 && s.height <= strip);
                assert_eq!((s.x, s.width), (0, 7));
                for y in s.y..s.bottom() {
                    covered[y as usize] += 1;
                }
            }
            assert!(covered.iter().all(|&c| c == 1), "H={height} h={strip}");
            for (i, a) in strips.iter().enumerate() {
                for b in &strips[i + 1..] {
                    assert!(!a.overlaps(*b));
                }
            }
        }
    }
}

#[test]
fn single_strip_when_taller_than_image() {
    assert_eq!(
        partition_scanlines(2, 2, 16).unwrap(),
        vec![Region::full(2, 2)]
    );
}

#[test]
fn zero_strip_height_is_rejected() {
    assert!(partition_scanlines(4, 4, 0).is_err());
}
