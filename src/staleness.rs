//! Cache freshness policy

use chrono::{DateTime, Utc};

/// Default allowed age before a re-scrape
pub const DEFAULT_MAX_AGE_HOURS: f64 = 24.0;

/// An entity that records when it was last scraped
pub trait Scraped {
    fn last_scraped_at(&self) -> Option<DateTime<Utc>>;
}

/// Whether an entity last scraped at `last` is due, judged at `now`
///
/// Never-scraped entities are always due. Otherwise the age is compared
/// in fractional hours and an age equal to the limit counts as stale.
pub fn needs_scraping_at(last: Option<DateTime<Utc>>, max_age_hours: f64, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(at) => {
            let age_hours = (now - at).num_milliseconds() as f64 / 3_600_000.0;
            age_hours >= max_age_hours
        }
    }
}

/// Whether `entity` is older than `max_age_hours` right now
pub fn needs_scraping<E: Scraped + ?Sized>(entity: &E, max_age_hours: f64) -> bool {
    needs_scraping_at(entity.last_scraped_at(), max_age_hours, Utc::now())
}

impl<T: Scraped> Scraped for Option<T> {
    fn last_scraped_at(&self) -> Option<DateTime<Utc>> {
        self.as_ref().and_then(Scraped::last_scraped_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct Stamp(Option<DateTime<Utc>>);

    impl Scraped for Stamp {
        fn last_scraped_at(&self) -> Option<DateTime<Utc>> {
            self.0
        }
    }

    #[test]
    fn test_never_scraped_is_stale() {
        assert!(needs_scraping(&Stamp(None), DEFAULT_MAX_AGE_HOURS));
        assert!(needs_scraping(&Stamp(None), f64::MAX));
    }

    #[test]
    fn test_25_hours_against_24_and_48() {
        let entity = Stamp(Some(Utc::now() - Duration::hours(25)));
        assert!(needs_scraping(&entity, 24.0));
        assert!(!needs_scraping(&entity, 48.0));
    }

    #[test]
    fn test_fractional_hours_and_boundary() {
        let now = Utc::now();
        let ninety_minutes = Some(now - Duration::minutes(90));
        assert!(needs_scraping_at(ninety_minutes, 1.5, now));
        assert!(!needs_scraping_at(ninety_minutes, 1.6, now));
        assert!(needs_scraping_at(ninety_minutes, 1.0, now));
    }

    #[test]
    fn test_non_increasing_in_max_age() {
        let now = Utc::now();
        for age_minutes in [0i64, 1, 59, 60, 61, 1439, 1440, 1441, 10_000] {
            let last = Some(now - Duration::minutes(age_minutes));
            let mut previous = true;
            for max_age in [0.0, 0.5, 1.0, 12.0, 24.0, 24.01, 48.0, 1000.0] {
                let due = needs_scraping_at(last, max_age, now);
                assert!(previous || !due, "flipped back to stale at {max_age}h");
                previous = due;
            }
        }
    }

    #[test]
    fn test_option_wrapper() {
        let missing: Option<Stamp> = None;
        assert!(needs_scraping(&missing, 24.0));
        let fresh = Some(Stamp(Some(Utc::now())));
        assert!(!needs_scraping(&fresh, 24.0));
    }
}
