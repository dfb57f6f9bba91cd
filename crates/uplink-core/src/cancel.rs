use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

pub type CancelFlag = Arc<AtomicBool>;

pub fn new_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

pub fn is_cancelled(cancel: &CancelFlag) -> bool {
    cancel.load(Ordering::Relaxed)
}

pub fn cancel(flag: &CancelFlag) {
    flag.store(true, Ordering::Relaxed);
}

/// Sleep for `duration` in short slices, returning early once `cancel` is set.
///
/// Returns `false` when the sleep was interrupted.
pub fn cancel_sleep(cancel: &CancelFlag, duration: Duration) -> bool {
    let start = Instant::now();
    let slice = Duration::from_millis(100);
    loop {
        if is_cancelled(cancel) {
            return false;
        }
        let elapsed = start.elapsed();
        if elapsed >= duration {
            return true;
        }
        std::thread::sleep(slice.min(duration - elapsed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_completes_without_cancel() {
        let flag = new_flag();
        let start = Instant::now();
        assert!(cancel_sleep(&flag, Duration::from_millis(150)));
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn test_sleep_returns_early_when_cancelled() {
        let flag = new_flag();
        let remote = Arc::clone(&flag);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            cancel(&remote);
        });

        let start = Instant::now();
        assert!(!cancel_sleep(&flag, Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_zero_duration() {
        let flag = new_flag();
        assert!(cancel_sleep(&flag, Duration::ZERO));
        cancel(&flag);
        assert!(!cancel_sleep(&flag, Duration::ZERO));
    }
}
