use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Wall-clock timer for one named phase of a request.
pub struct Timer {
    name: String,
    started: Option<DateTime<Utc>>,
    elapsed: Option<Duration>,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        Timer {
            name: name.to_owned(),
            started: None,
            elapsed: None,
        }
    }

    pub fn new_start(name: &str) -> Self {
        let mut t = Timer::new(name);
        t.start();
        t
    }

    pub fn start(&mut self) {
        info!("{}: starting", self.name);

        self.started = Some(Utc::now());
        self.elapsed = None;
    }

    /// Stop the timer and return the elapsed milliseconds.
    pub fn stop(&mut self) -> i64 {
        match self.started.take() {
            None => debug!("{}: not running!", self.name),
            Some(started) => {
                let d = Utc::now() - started;
                self.elapsed = Some(d);
                info!("{} duration: {} msec", self.name, d.num_milliseconds());
            }
        }

        self.millis()
    }

    /// Milliseconds measured by the last `stop`, 0 if none.
    pub fn millis(&self) -> i64 {
        self.elapsed.map_or(0, |d| d.num_milliseconds())
    }
}
