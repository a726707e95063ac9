use catalog::DelayRange;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Blocking pause between requests to the search site.
pub trait Pacing {
    fn pause(&self);
}

impl<T: Pacing + ?Sized> Pacing for &T {
    fn pause(&self) {
        (**self).pause()
    }
}

/// Uniformly random pauses drawn from a validated [`DelayRange`].
#[derive(Debug, Clone)]
pub struct Pacer {
    range: DelayRange,
}

impl Pacer {
    pub fn new(range: DelayRange) -> Self {
        Self { range }
    }

    pub fn next_delay(&self) -> Duration {
        let (min, max) = (self.range.min(), self.range.max());
        let secs = if max > min {
            rand::rng().random_range(min..=max)
        } else {
            min
        };
        Duration::from_secs_f64(secs)
    }
}

impl Pacing for Pacer {
    fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        debug!("Waiting {:.2}s", delay.as_secs_f64());
        std::thread::sleep(delay);
    }
}
