//! Turning repeated listing polls into a lazy, infinite comment stream.
//!
//! Reddit has no push feed for new comments, so the stream polls the
//! newest-comments listing, drops anything already seen and hands out the
//! rest oldest-first. Polls are at least [`MIN_POLL_INTERVAL`] apart, empty
//! polls back off exponentially and transient fetch errors are retried a
//! few times before the stream gives up.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::comment::Comment;
use crate::error::Result;
use crate::platform::CommentStream;

/// How many comments to request per poll (the listing maximum)
pub const POLL_LIMIT: usize = 100;

/// How many comment ids to remember for de-duplication
pub const SEEN_CAPACITY: usize = 301;

/// Shortest gap between two polls, busy or not
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Longest gap between two empty polls
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(16);

/// Retries of a transiently failing poll before the stream ends
pub const FETCH_RETRIES: u32 = 3;

/// Something that can list the newest comments of a subscription target
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Newest comments first, at most `limit` of them
    async fn newest_comments(&self, target: &str, limit: usize) -> Result<Vec<Comment>>;
}

/// Exponential delay between empty polls
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    /// The delay to wait now; doubles the next one up to `max`
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL)
    }
}

/// Insertion-ordered set that forgets its oldest entries past `capacity`
#[derive(Debug)]
pub struct SeenSet {
    capacity: usize,
    order: VecDeque<String>,
    members: HashSet<String>,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    /// Record `id`; returns false if it was already present
    pub fn insert(&mut self, id: &str) -> bool {
        if self.members.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.members.insert(id.to_string());
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// A [`CommentStream`] backed by polling a [`CommentSource`]
pub struct PollingStream<S: CommentSource> {
    source: S,
    target: String,
    skip_existing: bool,
    primed: bool,
    /// Creation time of the newest comment present at subscription
    watermark: Option<DateTime<Utc>>,
    seen: SeenSet,
    pending: VecDeque<Comment>,
    backoff: Backoff,
    min_interval: Duration,
    last_poll: Option<Instant>,
}

impl<S: CommentSource> PollingStream<S> {
    pub fn new(source: S, target: impl Into<String>, skip_existing: bool) -> Self {
        Self::with_backoff(source, target, skip_existing, Backoff::default())
    }

    pub fn with_backoff(
        source: S,
        target: impl Into<String>,
        skip_existing: bool,
        backoff: Backoff,
    ) -> Self {
        Self {
            source,
            target: target.into(),
            skip_existing,
            primed: false,
            watermark: None,
            seen: SeenSet::new(SEEN_CAPACITY),
            pending: VecDeque::new(),
            backoff,
            min_interval: MIN_POLL_INTERVAL,
            last_poll: None,
        }
    }

    /// Wait until the previous poll is at least `min_interval` ago
    async fn pace(&mut self) {
        if let Some(last) = self.last_poll {
            tokio::time::sleep_until(last + self.min_interval).await;
        }
        self.last_poll = Some(Instant::now());
    }

    /// One poll, retrying transient failures with doubling delays
    async fn fetch(&mut self) -> Result<Vec<Comment>> {
        let mut retry = Backoff::default();
        let mut attempt = 0;
        loop {
            self.pace().await;
            match self.source.newest_comments(&self.target, POLL_LIMIT).await {
                Ok(batch) => return Ok(batch),
                Err(e) if e.is_transient() && attempt < FETCH_RETRIES => {
                    attempt += 1;
                    let delay = retry.next_delay();
                    warn!(
                        "Polling r/{} failed: {} (retry {}/{} in {:?})",
                        self.target, e, attempt, FETCH_RETRIES, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Merge one poll's results, queueing comments not seen before.
    /// Returns how many were queued.
    fn absorb(&mut self, newest_first: Vec<Comment>) -> usize {
        let priming = !self.primed && self.skip_existing;
        self.primed = true;

        if priming {
            self.watermark = newest_first.iter().map(|c| c.created).max();
            for comment in &newest_first {
                self.seen.insert(&comment.id);
            }
            debug!(
                "Skipping {} existing comment(s) in r/{}",
                newest_first.len(),
                self.target
            );
            return 0;
        }

        let mut queued = 0;
        for comment in newest_first.into_iter().rev() {
            if !self.seen.insert(&comment.id) {
                continue;
            }
            // Same-second comments outside the priming batch count as existing
            if let Some(watermark) = self.watermark {
                if comment.created <= watermark {
                    trace!("Dropping comment {} older than subscription", comment.id);
                    continue;
                }
            }
            self.pending.push_back(comment);
            queued += 1;
        }
        queued
    }
}

#[async_trait]
impl<S: CommentSource> CommentStream for PollingStream<S> {
    async fn next_comment(&mut self) -> Result<Option<Comment>> {
        loop {
            if let Some(comment) = self.pending.pop_front() {
                return Ok(Some(comment));
            }

            let batch = self.fetch().await?;

            if self.absorb(batch) > 0 {
                self.backoff.reset();
            } else {
                let delay = self.backoff.next_delay();
                trace!("No new comments, polling again in {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BotError;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn comment(id: &str, created: i64) -> Comment {
        Comment {
            id: id.to_string(),
            body: format!("body of {}", id),
            author: Some("someone".to_string()),
            channel: "rust".to_string(),
            created: DateTime::from_timestamp(created, 0).unwrap(),
        }
    }

    /// Source that replays scripted polls, then fails
    #[derive(Clone)]
    struct ScriptedSource {
        polls: Arc<Mutex<VecDeque<Result<Vec<Comment>>>>>,
        targets: Arc<Mutex<Vec<String>>>,
        polled_at: Arc<Mutex<Vec<Instant>>>,
    }

    impl ScriptedSource {
        fn new(polls: Vec<Vec<Comment>>) -> Self {
            Self::with_results(polls.into_iter().map(Ok).collect())
        }

        fn with_results(results: Vec<Result<Vec<Comment>>>) -> Self {
            Self {
                polls: Arc::new(Mutex::new(results.into())),
                targets: Arc::new(Mutex::new(Vec::new())),
                polled_at: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn poll_count(&self) -> usize {
            self.targets.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommentSource for ScriptedSource {
        async fn newest_comments(&self, target: &str, limit: usize) -> Result<Vec<Comment>> {
            assert_eq!(limit, POLL_LIMIT);
            self.targets.lock().unwrap().push(target.to_string());
            self.polled_at.lock().unwrap().push(Instant::now());
            self.polls
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(BotError::ApiResponse("script exhausted".to_string())))
        }
    }

    fn unavailable() -> BotError {
        BotError::Unavailable("503 Service Unavailable".to_string())
    }

    async fn drain<S: CommentSource>(stream: &mut PollingStream<S>) -> (Vec<String>, BotError) {
        let mut ids = Vec::new();
        loop {
            match stream.next_comment().await {
                Ok(Some(c)) => ids.push(c.id),
                Ok(None) => unreachable!("polling stream never closes"),
                Err(e) => return (ids, e),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_existing_ignores_first_poll() {
        let source = ScriptedSource::new(vec![
            vec![comment("b", 200), comment("a", 100)],
            vec![comment("c", 300), comment("b", 200), comment("a", 100)],
        ]);
        let mut stream = PollingStream::new(source.clone(), "rust+chess", true);

        let (ids, err) = drain(&mut stream).await;
        assert_eq!(ids, vec!["c"]);
        assert!(matches!(err, BotError::ApiResponse(_)));
        assert!(source.targets.lock().unwrap().iter().all(|t| t == "rust+chess"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_skip_existing_first_poll_is_yielded_oldest_first() {
        let source = ScriptedSource::new(vec![vec![
            comment("c", 300),
            comment("b", 200),
            comment("a", 100),
        ]]);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let (ids, _) = drain(&mut stream).await;
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_listed_older_comment_is_never_yielded() {
        let source = ScriptedSource::new(vec![
            vec![comment("b", 200)],
            // "a" predates the subscription but only shows up now
            vec![comment("c", 300), comment("b", 200), comment("a", 100)],
        ]);
        let mut stream = PollingStream::new(source.clone(), "all", true);

        let (ids, _) = drain(&mut stream).await;
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicates_across_polls_are_dropped() {
        let source = ScriptedSource::new(vec![
            vec![],
            vec![comment("a", 100)],
            vec![comment("b", 200), comment("a", 100)],
            vec![comment("b", 200)],
        ]);
        let mut stream = PollingStream::new(source.clone(), "all", true);

        let (ids, _) = drain(&mut stream).await;
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_second_comment_missing_from_first_poll_is_dropped() {
        let source = ScriptedSource::new(vec![
            vec![comment("b", 200)],
            vec![comment("c", 300), comment("x", 200), comment("b", 200)],
        ]);
        let mut stream = PollingStream::new(source.clone(), "all", true);

        let (ids, _) = drain(&mut stream).await;
        assert_eq!(ids, vec!["c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_polls_back_off_exponentially() {
        let source = ScriptedSource::new(vec![vec![], vec![], vec![], vec![comment("a", 1)]]);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let start = Instant::now();
        let first = stream.next_comment().await.unwrap().unwrap();
        assert_eq!(first.id, "a");
        // 2s + 4s + 8s of waiting after the three empty polls
        assert_eq!(start.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_polls_stay_a_minimum_interval_apart() {
        let polls = (0..5)
            .map(|i| vec![comment(&format!("c{}", i), 100 + i)])
            .collect();
        let source = ScriptedSource::new(polls);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let start = Instant::now();
        for _ in 0..5 {
            stream.next_comment().await.unwrap().unwrap();
        }

        assert_eq!(source.poll_count(), 5);
        assert_eq!(start.elapsed(), MIN_POLL_INTERVAL * 4);
        let polled_at = source.polled_at.lock().unwrap().clone();
        for pair in polled_at.windows(2) {
            assert!(pair[1] - pair[0] >= MIN_POLL_INTERVAL);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_with_backoff() {
        let source = ScriptedSource::with_results(vec![
            Err(unavailable()),
            Err(unavailable()),
            Ok(vec![comment("a", 100)]),
        ]);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let start = Instant::now();
        let first = stream.next_comment().await.unwrap().unwrap();

        assert_eq!(first.id, "a");
        assert_eq!(source.poll_count(), 3);
        // 2s then 4s between the attempts
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_when_retries_run_out() {
        let mut results: Vec<Result<Vec<Comment>>> =
            (0..=FETCH_RETRIES).map(|_| Err(unavailable())).collect();
        results.push(Ok(vec![comment("late", 100)]));
        let source = ScriptedSource::with_results(results);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let (ids, err) = drain(&mut stream).await;

        assert!(ids.is_empty());
        assert!(matches!(err, BotError::Unavailable(_)));
        assert_eq!(source.poll_count(), FETCH_RETRIES as usize + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_reset_after_a_successful_poll() {
        let source = ScriptedSource::with_results(vec![
            Err(unavailable()),
            Ok(vec![comment("a", 100)]),
            Err(unavailable()),
            Err(unavailable()),
            Err(unavailable()),
            Ok(vec![comment("b", 200)]),
        ]);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let (ids, _) = drain(&mut stream).await;
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let source = ScriptedSource::with_results(vec![
            Err(BotError::ApiResponse("404 Not Found".to_string())),
            Ok(vec![comment("a", 100)]),
        ]);
        let mut stream = PollingStream::new(source.clone(), "all", false);

        let (ids, err) = drain(&mut stream).await;

        assert!(ids.is_empty());
        assert!(matches!(err, BotError::ApiResponse(_)));
        assert_eq!(source.poll_count(), 1);
    }

    #[test]
    fn test_backoff_caps_and_resets() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4));
        let delays: Vec<u64> = (0..5).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 4, 4]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_seen_set_forgets_oldest() {
        let mut seen = SeenSet::new(2);
        assert!(seen.insert("a"));
        assert!(seen.insert("b"));
        assert!(!seen.insert("a"));
        assert!(seen.insert("c"));

        assert_eq!(seen.len(), 2);
        assert!(!seen.contains("a"));
        assert!(seen.contains("b"));
        assert!(seen.contains("c"));
    }
}
