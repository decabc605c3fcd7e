//! Retention classification: turning a tag and its resolved state into a
//! keep, delete, or skip decision.
//!
//! Classification is pure and runs on data already in hand. The cheap
//! name-based checks come first so that protected and special tags never
//! cost a network round trip; age checks run last and only when a digest
//! and a creation date were both resolved.

use crate::digest::Digest;
use crate::resolve::ResolvedImage;
use chrono::NaiveDateTime;


/// Tags that are never deleted and never resolved, regardless of
/// configuration. These name build infrastructure rather than releases.
pub const SPECIAL_TAGS: [&str; 3] = ["buildcache", "latest", "cache"];

/// Why a tag could not be evaluated against the retention window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvableCause {
    /// The tag no longer exists upstream, or the registry supplied no
    /// digest for it
    Missing,
    /// No creation date could be recovered from any source
    NoDate,
}

/// The outcome of classifying one tag.
///
/// `Delete` is the only variant that authorizes action, and it carries the
/// digest to delete and the evidence behind the decision. A tag that is
/// missing a digest or a date can only ever be skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The tag matched the protection rules
    KeepProtected {
        tag: String,
        /// The matching pattern, when protection came from a substring
        /// match rather than an exact one
        pattern: Option<String>,
    },
    /// The tag is younger than the retention window
    KeepRecent {
        tag: String,
        created_at: NaiveDateTime,
        age_days: i64,
    },
    /// The tag is older than the retention window
    Delete {
        tag: String,
        digest: Digest,
        created_at: NaiveDateTime,
        age_days: i64,
    },
    /// The tag names build infrastructure and is never touched
    SkipSpecial { tag: String },
    /// The tag could not be evaluated
    SkipUnresolvable { tag: String, cause: UnresolvableCause },
}

/// The retention rule set for a run.
///
/// # Examples
///
/// ```
/// use libsweep::policy::RetentionPolicy;
///
/// let policy = RetentionPolicy::new(30)
///     .with_protected_tags(vec!["stable".to_string()])
///     .with_protected_patterns(vec!["release".to_string()]);
/// assert_eq!(policy.days_to_keep, 30);
/// ```
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Tags kept on exact match
    pub protected_tags: Vec<String>,
    /// Tags kept on case-insensitive substring match
    pub protected_patterns: Vec<String>,
    /// Age in days below which tags are kept
    pub days_to_keep: i64,
}

impl RetentionPolicy {
    /// Creates a policy with the given retention window and no protections.
    pub fn new(days_to_keep: i64) -> Self {
        Self {
            protected_tags: Vec::new(),
            protected_patterns: Vec::new(),
            days_to_keep,
        }
    }

    /// Sets the exact-match protected tags.
    pub fn with_protected_tags(mut self, tags: Vec<String>) -> Self {
        self.protected_tags = tags;
        self
    }

    /// Sets the substring protection patterns.
    pub fn with_protected_patterns(mut self, patterns: Vec<String>) -> Self {
        self.protected_patterns = patterns;
        self
    }

    /// Classifies one tag.
    ///
    /// Checks run in a fixed order and the first match is final: exact
    /// protection, pattern protection, the special-tag set, digest and date
    /// presence, then age against the cutoff. The cutoff is `now` minus the
    /// retention window; a tag created exactly at the cutoff is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use libsweep::policy::{Decision, RetentionPolicy};
    ///
    /// let policy = RetentionPolicy::new(30);
    /// let now = NaiveDate::from_ymd_opt(2024, 1, 1)
    ///     .unwrap()
    ///     .and_hms_opt(0, 0, 0)
    ///     .unwrap();
    ///
    /// let decision = policy.classify("latest", None, now);
    /// assert!(matches!(decision, Decision::SkipSpecial { .. }));
    /// ```
    pub fn classify(
        &self,
        tag: &str,
        resolved: Option<&ResolvedImage>,
        now: NaiveDateTime,
    ) -> Decision {
        if self.protected_tags.iter().any(|protected| protected == tag) {
            return Decision::KeepProtected {
                tag: tag.to_string(),
                pattern: None,
            };
        }

        let lowered = tag.to_lowercase();
        if let Some(pattern) = self
            .protected_patterns
            .iter()
            .find(|pattern| lowered.contains(&pattern.to_lowercase()))
        {
            return Decision::KeepProtected {
                tag: tag.to_string(),
                pattern: Some(pattern.clone()),
            };
        }

        if SPECIAL_TAGS.contains(&tag) {
            return Decision::SkipSpecial {
                tag: tag.to_string(),
            };
        }

        let Some(digest) = resolved.and_then(|image| image.digest.clone()) else {
            return Decision::SkipUnresolvable {
                tag: tag.to_string(),
                cause: UnresolvableCause::Missing,
            };
        };

        let Some(created_at) = resolved.and_then(|image| image.created_at) else {
            return Decision::SkipUnresolvable {
                tag: tag.to_string(),
                cause: UnresolvableCause::NoDate,
            };
        };

        let cutoff = now - chrono::Duration::days(self.days_to_keep);
        let age_days = (now - created_at).num_days();

        if created_at < cutoff {
            Decision::Delete {
                tag: tag.to_string(),
                digest,
                created_at,
                age_days,
            }
        } else {
            Decision::KeepRecent {
                tag: tag.to_string(),
                created_at,
                age_days,
            }
        }
    }
}
