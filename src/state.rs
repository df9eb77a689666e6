/// Counters for one monitor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    /// Comments received from the stream
    pub comments_seen: u64,
    /// Comments skipped because the bot wrote them
    pub self_authored: u64,
    /// Comments whose body matched the trigger
    pub matched: u64,
    /// Replies the platform accepted
    pub replies_sent: u64,
    /// Replies that failed for any reason
    pub replies_failed: u64,
}

impl std::fmt::Display for MonitorStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} comment(s) seen, {} own skipped, {} matched, {} replied, {} failed",
            self.comments_seen,
            self.self_authored,
            self.matched,
            self.replies_sent,
            self.replies_failed
        )
    }
}
