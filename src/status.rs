//! Deadline status for course materials. Dates are compared as calendar days
//! in the author's zone, since that is how students read a due date.

use crate::post::Post;
use chrono::{DateTime, Duration, FixedOffset, Months, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::fmt;

/// Where a post stands relative to its deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The post has no deadline.
    None,
    Future,
    DueToday,
    Expired,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Status::None => "-",
            Status::Future => "open",
            Status::DueToday => "due today",
            Status::Expired => "expired",
        })
    }
}

/// The deadline used for [`status`]: the explicit one, or one month after
/// publication.
pub fn effective_deadline(post: &Post) -> DateTime<Utc> {
    post.deadline.unwrap_or_else(|| {
        post.published
            .checked_add_months(Months::new(1))
            .unwrap_or(post.published)
    })
}

/// Computes the [`Status`] of `post` at `now`, reading calendar days in `tz`.
pub fn status(post: &Post, now: DateTime<Utc>, tz: FixedOffset) -> Status {
    if post.no_deadline {
        return Status::None;
    }

    let deadline = effective_deadline(post).with_timezone(&tz).date_naive();
    let today = now.with_timezone(&tz).date_naive();

    // The deadline lasts until the start of the following day.
    let next_day = tz
        .from_local_datetime(&deadline.and_time(NaiveTime::MIN))
        .single()
        .map(|midnight| (midnight + Duration::days(1)).with_timezone(&Utc));

    match next_day {
        Some(next_day) if next_day <= now => Status::Expired,
        _ if deadline == today => Status::DueToday,
        _ => Status::Future,
    }
}
