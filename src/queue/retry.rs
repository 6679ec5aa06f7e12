use chrono::Duration;

/// Escalating delays between unanswered call attempts, indexed by attempt number.
const SCHEDULE_MINUTES: [i64; 5] = [10, 30, 60, 4 * 60, 24 * 60];

const CEILING_HOURS: i64 = 24;

/// The longest we ever wait between attempts.
pub fn ceiling() -> Duration {
    Duration::hours(CEILING_HOURS)
}

/// Delay before the next call attempt.
///
/// Attempt 1 waits 10 minutes, then 30 minutes, 1 hour, 4 hours and 24 hours.
/// Anything past attempt 5, or attempt 0, sits at the 24 hour ceiling.
pub fn next_delay(attempt: u32) -> Duration {
    attempt
        .checked_sub(1)
        .and_then(|idx| SCHEDULE_MINUTES.get(idx as usize))
        .map_or_else(ceiling, |minutes| Duration::minutes(*minutes))
}
