//! Commit message parsing.
//!
//! A commit references a task with `pt:<id>`. Status keywords anywhere in
//! the message decide what happens to the referenced tasks:
//!
//! - `completed`, `done` mark a task completed
//! - `progress`, `working` mark it in progress
//! - `blocked` marks it blocked
//!
//! When every keyword in the message implies the same status, that status
//! applies to every reference. Otherwise each keyword binds to the nearest
//! reference by character distance. A keyword equally close to two
//! references makes both of them ambiguous, as does a reference bound to two
//! different statuses. Ambiguous references are only logged.

use crate::models::StatusIntent;
use crate::{Error, Result};
use regex::{CaptureMatches, Regex};
use std::iter::Peekable;
use std::sync::LazyLock;

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pt:(\d+)").expect("marker regex is valid"));

static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(completed|done|progress|working|blocked)\b")
        .expect("keyword regex is valid")
});

/// A task reference extracted from a commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskReference {
    pub task_id: i64,
    /// `None` means log the commit without changing the task.
    pub intent: Option<StatusIntent>,
}

/// Byte range of a match within the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Gap in bytes between two non-overlapping spans.
    fn distance(self, other: Span) -> usize {
        if other.start >= self.end {
            other.start - self.end
        } else {
            self.start.saturating_sub(other.end)
        }
    }
}

/// A status keyword occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyword {
    pub intent: StatusIntent,
    pub span: Span,
}

/// How one reference resolves against the message's keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    LogOnly,
    Apply(StatusIntent),
    Ambiguous,
}

/// Scan a commit message for task references.
///
/// Keywords are collected up front; references are produced lazily as the
/// iterator is driven. The iterator yields `Err(Error::ParseAmbiguous)` for a
/// reference whose keywords conflict; it never yields any other error.
pub fn parse_commit_message(message: &str) -> TaskReferences<'_> {
    let keywords = KEYWORD_RE
        .find_iter(message)
        .filter_map(|m| {
            StatusIntent::from_keyword(m.as_str()).map(|intent| Keyword {
                intent,
                span: Span {
                    start: m.start(),
                    end: m.end(),
                },
            })
        })
        .collect();

    TaskReferences {
        markers: Markers {
            captures: MARKER_RE.captures_iter(message),
        }
        .peekable(),
        keywords,
        previous: None,
    }
}

/// Lazy sequence of task references in one message.
pub struct TaskReferences<'m> {
    markers: Peekable<Markers<'m>>,
    keywords: Vec<Keyword>,
    previous: Option<Span>,
}

impl Iterator for TaskReferences<'_> {
    type Item = Result<TaskReference>;

    fn next(&mut self) -> Option<Self::Item> {
        let (task_id, current) = self.markers.next()?;
        let next = self.markers.peek().map(|(_, span)| *span);
        let previous = self.previous.replace(current);

        let item = match resolve_intent(&self.keywords, previous, current, next) {
            Resolution::LogOnly => Ok(TaskReference {
                task_id,
                intent: None,
            }),
            Resolution::Apply(intent) => Ok(TaskReference {
                task_id,
                intent: Some(intent),
            }),
            Resolution::Ambiguous => Err(Error::ParseAmbiguous { task_id }),
        };
        Some(item)
    }
}

/// `pt:<digits>` occurrences. IDs that do not fit in an `i64` are skipped.
struct Markers<'m> {
    captures: CaptureMatches<'static, 'm>,
}

impl Iterator for Markers<'_> {
    type Item = (i64, Span);

    fn next(&mut self) -> Option<Self::Item> {
        for caps in self.captures.by_ref() {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if let Ok(task_id) = digits.as_str().parse::<i64>() {
                let span = Span {
                    start: whole.start(),
                    end: whole.end(),
                };
                return Some((task_id, span));
            }
        }
        None
    }
}

/// Decide the intent for the reference at `current`.
///
/// `previous` and `next` are the neighbouring references, if any. A keyword's
/// nearest reference is always one of the two references around it, so the
/// neighbours are enough to tell whether `current` wins a keyword.
pub fn resolve_intent(
    keywords: &[Keyword],
    previous: Option<Span>,
    current: Span,
    next: Option<Span>,
) -> Resolution {
    let Some(first) = keywords.first() else {
        return Resolution::LogOnly;
    };
    if keywords.iter().all(|k| k.intent == first.intent) {
        return Resolution::Apply(first.intent);
    }

    let mut bound: Option<StatusIntent> = None;
    for keyword in keywords {
        let own = current.distance(keyword.span);
        // The other reference on the keyword's side of `current`, unless the
        // keyword lies past it.
        let rival = if keyword.span.start >= current.end {
            match next {
                Some(n) if keyword.span.start >= n.end => continue,
                other => other,
            }
        } else {
            match previous {
                Some(p) if keyword.span.end <= p.start => continue,
                other => other,
            }
        };

        if let Some(rival) = rival {
            let theirs = rival.distance(keyword.span);
            if own == theirs {
                return Resolution::Ambiguous;
            }
            if own > theirs {
                continue;
            }
        }
        match bound {
            Some(intent) if intent != keyword.intent => return Resolution::Ambiguous,
            _ => bound = Some(keyword.intent),
        }
    }

    bound.map_or(Resolution::LogOnly, Resolution::Apply)
}
