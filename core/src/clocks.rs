// Registrar
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Sources of the current time.
//!
//! Records carry creation and modification timestamps, and these come from a `Clock` injected
//! into the drivers so that tests can control the passing of time.

use time::OffsetDateTime;

/// Generic definition of a clock.
pub trait Clock {
    /// Returns the current UTC time, truncated to microseconds.
    fn now_utc(&self) -> OffsetDateTime;
}

/// Drops the sub-microsecond part of `ts`.
///
/// Microseconds are the finest resolution that PostgreSQL timestamps can hold.  All timestamps
/// handed out by clocks go through this so that a value reads back exactly as it was written,
/// no matter which database stores it.
pub fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    let extra_nanos = ts.nanosecond() % 1000;
    ts - time::Duration::nanoseconds(i64::from(extra_nanos))
}

/// Clock implementation that uses the system clock.
#[derive(Clone, Default)]
pub struct SystemClock {}

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        truncate_to_micros(OffsetDateTime::now_utc())
    }
}

/// Test utilities.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A clock that stays frozen at a given instant until told otherwise.
    pub struct SettableClock {
        /// Instant returned by `now_utc`, already truncated to microseconds.
        now: Mutex<OffsetDateTime>,
    }

    impl SettableClock {
        /// Creates a new clock frozen at `now`.
        pub fn new(now: OffsetDateTime) -> Self {
            Self { now: Mutex::new(truncate_to_micros(now)) }
        }

        /// Moves the clock to `now`.
        pub fn set(&self, now: OffsetDateTime) {
            *self.now.lock().unwrap() = truncate_to_micros(now);
        }

        /// Moves the clock forward by `delta`.
        pub fn advance(&self, delta: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = truncate_to_micros(*now + delta);
        }
    }

    impl Clock for SettableClock {
        fn now_utc(&self) -> OffsetDateTime {
            *self.now.lock().unwrap()
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_truncate_to_micros() {
        assert_eq!(
            datetime!(2024-09-01 08:00:00.123456 UTC),
            truncate_to_micros(datetime!(2024-09-01 08:00:00.123456999 UTC))
        );
        assert_eq!(
            datetime!(1969-12-31 23:59:59.5 UTC),
            truncate_to_micros(datetime!(1969-12-31 23:59:59.500000001 UTC))
        );
    }

    #[test]
    fn test_systemclock_is_monotonic_enough() {
        let clock = SystemClock::default();
        let now1 = clock.now_utc();
        let now2 = clock.now_utc();
        assert!(now1.unix_timestamp() > 0);
        assert!(now2 >= now1);
    }

    #[test]
    fn test_systemclock_microsecond_resolution() {
        let now = SystemClock::default().now_utc();
        assert_eq!(0, now.nanosecond() % 1000);
    }
}
