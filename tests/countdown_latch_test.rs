use muduo_queue::CountdownLatch;
use std::thread;
use std::time::Duration;

#[test]
fn test_wait_for_all() {
    let latch = CountdownLatch::new(3);
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let latch = latch.clone();
            thread::spawn(move || latch.countdown())
        })
        .collect();
    latch.wait();
    assert_eq!(latch.count(), 0);
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_wait_timeout() {
    let latch = CountdownLatch::new(2);
    latch.countdown();
    assert!(!latch.wait_timeout(Duration::from_millis(20)));
    assert_eq!(latch.count(), 1);

    let other = latch.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        other.countdown();
    });
    assert!(latch.wait_timeout(Duration::from_secs(10)));
    handle.join().unwrap();
}

#[test]
fn test_countdown_saturates() {
    let latch = CountdownLatch::new(1);
    latch.countdown();
    latch.countdown();
    assert_eq!(latch.count(), 0);
    latch.wait();
    assert!(latch.wait_timeout(Duration::MAX));
}

#[test]
fn test_zero_count_does_not_wait() {
    let latch = CountdownLatch::new(0);
    latch.wait();
    assert!(latch.wait_timeout(Duration::ZERO));
}
