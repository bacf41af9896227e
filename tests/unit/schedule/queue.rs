use super::*;
use crate::foundation::core::Region;

fn strips(n: u32) -> WorkQueue {
    WorkQueue::new((0..n).map(|y| WorkUnit::Region(Region::new(0, y, 4, 1))))
}

#[test]
fn pops_in_fifo_order() {
    let mut q = strips(3);
    assert_eq!(q.pop_next(), Some(WorkUnit::Region(Region::new(0, 0, 4, 1))));
    assert_eq!(q.pop_next(), Some(WorkUnit::Region(Region::new(0, 1, 4, 1))));
    assert_eq!(q.len(), 1);
    q.pop_next();
    assert!(q.is_empty());
    assert_eq!(q.pop_next(), None);
}

#[test]
fn take_returns_front_units() {
    let mut q = strips(5);
    let got = q.take(2).unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[1], WorkUnit::Region(Region::new(0, 1, 4, 1)));
    assert_eq!(q.len(), 3);
}

#[test]
fn take_beyond_length_is_a_dispatch_error() {
    let mut q = strips(2);
    let err = q.take(3).unwrap_err();
    assert!(matches!(err, RaypoolError::Dispatch(_)));
    assert_eq!(q.len(), 2, "failed take must not consume units");
}
