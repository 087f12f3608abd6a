//! Wall-clock boundary — the only timezone-aware code in the crate.
//!
//! Closure timestamps are parsed and compared as naive civil time, matching
//! how the announcement template renders them. The conversion from a real
//! instant to civil time in the configured zone happens here and nowhere
//! else.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// The current instant as naive civil time in the given zone.
pub fn now_in(tz: Tz) -> NaiveDateTime {
    civil_time(Utc::now(), tz)
}

/// Convert an instant to naive civil time in the given zone.
pub fn civil_time(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Short date for the dated results line in documents, e.g. `6/25/18`.
pub fn short_date(tz: Tz) -> String {
    now_in(tz).format("%-m/%-d/%y").to_string()
}
