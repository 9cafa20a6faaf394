//! Decides whether a [`Post`] is publishable given "now" and an optional
//! publication [`Window`].

use crate::post::Post;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::{debug, info};

/// The span during which posts are eligible. Both ends are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// Returns true once `now` is past the end of the window.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }
}

/// Why a post was held back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Draft,

    /// Published after `now`.
    Scheduled { now: DateTime<Utc> },

    /// Published before the window opened.
    BeforeStart { start: DateTime<Utc> },

    /// Published after the window closed.
    AfterEnd { end: DateTime<Utc> },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Rejection::Draft => write!(f, "draft"),
            Rejection::Scheduled { .. } => write!(f, "scheduled for the future"),
            Rejection::BeforeStart { .. } => write!(f, "before term start"),
            Rejection::AfterEnd { .. } => write!(f, "past term end"),
        }
    }
}

/// The decision for one post.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Applies the rules in order, stopping at the first failure: drafts are
/// rejected, then posts published after `now`, then posts outside `window`.
pub fn evaluate(post: &Post, now: DateTime<Utc>, window: Option<&Window>) -> Verdict {
    if post.draft {
        return Verdict::Rejected(Rejection::Draft);
    }
    if post.published > now {
        return Verdict::Rejected(Rejection::Scheduled { now });
    }
    if let Some(window) = window {
        if post.published < window.start {
            return Verdict::Rejected(Rejection::BeforeStart {
                start: window.start,
            });
        }
        if post.published > window.end {
            return Verdict::Rejected(Rejection::AfterEnd { end: window.end });
        }
    }
    Verdict::Accepted
}

/// Like [`evaluate`], but logs rejections along with the instants that were
/// compared.
pub fn accept(post: &Post, now: DateTime<Utc>, window: Option<&Window>) -> bool {
    let verdict = evaluate(post, now, window);
    match verdict {
        Verdict::Accepted => {
            debug!(slug = %post.slug, published = %post.published.to_rfc3339(), "accepted");
        }
        Verdict::Rejected(rejection) => {
            let compared = match rejection {
                Rejection::Draft => None,
                Rejection::Scheduled { now } => Some(now),
                Rejection::BeforeStart { start } => Some(start),
                Rejection::AfterEnd { end } => Some(end),
            };
            info!(
                slug = %post.slug,
                published = %post.published.to_rfc3339(),
                against = %compared.map(|t| t.to_rfc3339()).unwrap_or_default(),
                "rejected: {}",
                rejection
            );
        }
    }
    verdict.is_accepted()
}
