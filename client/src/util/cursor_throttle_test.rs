use super::*;

fn at(x: f64) -> Cursor {
    Cursor { x, y: 0.0 }
}

#[test]
fn default_interval_is_forty_millis() {
    let throttle = CursorThrottle::default();
    assert_eq!(throttle.min_interval, Duration::from_millis(40));
}

#[test]
fn first_sample_goes_out_immediately() {
    let mut throttle = CursorThrottle::default();
    assert_eq!(throttle.sample_at(Instant::now(), at(1.0)), Some(at(1.0)));
    assert!(!throttle.has_pending());
}

#[test]
fn burst_is_bounded_to_one_per_interval() {
    let mut throttle = CursorThrottle::new(Duration::from_millis(40));
    let start = Instant::now();
    let sent = (0..100u32)
        .filter_map(|ms| throttle.sample_at(start + Duration::from_millis(u64::from(ms)), at(f64::from(ms))))
        .count();
    // 0, 40, 80
    assert_eq!(sent, 3);
}

#[test]
fn trailing_flush_delivers_resting_position() {
    let mut throttle = CursorThrottle::new(Duration::from_millis(40));
    let start = Instant::now();
    assert!(throttle.sample_at(start, at(1.0)).is_some());
    assert!(throttle.sample_at(start + Duration::from_millis(5), at(2.0)).is_none());
    assert!(throttle.sample_at(start + Duration::from_millis(10), at(3.0)).is_none());

    assert!(throttle.flush_at(start + Duration::from_millis(20)).is_none());
    assert_eq!(throttle.next_flush_in_at(start + Duration::from_millis(20)), Some(Duration::from_millis(20)));
    assert_eq!(throttle.flush_at(start + Duration::from_millis(40)), Some(at(3.0)));
    assert!(throttle.flush_at(start + Duration::from_millis(200)).is_none());
}

#[test]
fn flush_without_pending_is_none() {
    let mut throttle = CursorThrottle::default();
    assert!(throttle.flush_at(Instant::now()).is_none());
    assert!(throttle.next_flush_in_at(Instant::now()).is_none());
}

#[test]
fn reset_clears_pending_and_timing() {
    let mut throttle = CursorThrottle::new(Duration::from_secs(60));
    let start = Instant::now();
    throttle.sample_at(start, at(1.0));
    throttle.sample_at(start, at(2.0));
    throttle.reset();
    assert!(!throttle.has_pending());
    assert_eq!(throttle.sample_at(start, at(3.0)), Some(at(3.0)));
}
