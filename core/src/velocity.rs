//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: chunkvault — zero-trust chunked content sharing.
//

//! Seek-pattern classification from a sliding window of recent byte-range
//! reads. Feeds the prefetch manager's choice of how far ahead to fetch.

use std::collections::VecDeque;
use std::time::Instant;

/// Maximum number of recent range requests retained per asset.
const WINDOW_SIZE: usize = 5;

/// A floor on the elapsed time between two requests, so two reads arriving
/// effectively back-to-back (same millisecond, or even the same instant on
/// a fast local filesystem) don't produce a division by a near-zero
/// duration and an absurd velocity.
const MIN_TIME_DELTA_SECS: f64 = 0.001;

/// The seek pattern inferred from the two most recent range requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPattern {
    /// Reading forward at a typical playback/processing pace.
    Sequential,
    /// Reading forward much faster than playback pace (scrubbing ahead).
    ForwardScrub,
    /// Reading forward slower than typical pace.
    SlowForward,
    /// The new request starts before the previous one did.
    BackwardJump,
}

struct RangeRequest {
    offset: u64,
    at: Instant,
}

/// Tracks a bounded window of recent range requests for one asset and
/// classifies the most recent transition between them.
pub struct VelocityDetector {
    window: VecDeque<RangeRequest>,
    /// Bytes/second above which forward motion counts as scrubbing.
    scrub_threshold: f64,
    /// Bytes/second below which forward motion counts as slow.
    slow_threshold: f64,
}

impl VelocityDetector {
    pub fn new() -> Self {
        Self::with_thresholds(10_000_000.0, 1_000_000.0)
    }

    pub fn with_thresholds(scrub_threshold: f64, slow_threshold: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
            scrub_threshold,
            slow_threshold,
        }
    }

    /// Record a new range request starting at `offset` and return the
    /// classified pattern, if at least two requests are on record.
    pub fn on_range_request(&mut self, offset: u64) -> Option<SeekPattern> {
        self.on_range_request_at(offset, Instant::now())
    }

    /// Same as [`Self::on_range_request`] but with an injectable clock, for
    /// deterministic tests.
    pub fn on_range_request_at(&mut self, offset: u64, at: Instant) -> Option<SeekPattern> {
        self.window.push_back(RangeRequest { offset, at });
        while self.window.len() > WINDOW_SIZE {
            self.window.pop_front();
        }
        self.detect_pattern()
    }

    fn detect_pattern(&self) -> Option<SeekPattern> {
        if self.window.len() < 2 {
            return None;
        }
        let prev = &self.window[self.window.len() - 2];
        let curr = &self.window[self.window.len() - 1];

        if curr.offset < prev.offset {
            return Some(SeekPattern::BackwardJump);
        }

        let byte_delta = (curr.offset - prev.offset) as f64;
        let time_delta = curr.at.saturating_duration_since(prev.at).as_secs_f64().max(MIN_TIME_DELTA_SECS);
        let velocity = byte_delta / time_delta;

        Some(if velocity >= self.scrub_threshold {
            SeekPattern::ForwardScrub
        } else if velocity <= self.slow_threshold {
            SeekPattern::SlowForward
        } else {
            SeekPattern::Sequential
        })
    }
}

impl Default for VelocityDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn single_request_has_no_pattern_yet() {
        let mut d = VelocityDetector::new();
        assert_eq!(d.on_range_request(0), None);
    }

    #[test]
    fn backward_offset_is_backward_jump() {
        let mut d = VelocityDetector::new();
        let t0 = Instant::now();
        d.on_range_request_at(10_000, t0);
        let pattern = d.on_range_request_at(1_000, t0 + Duration::from_millis(10));
        assert_eq!(pattern, Some(SeekPattern::BackwardJump));
    }

    #[test]
    fn fast_forward_motion_is_scrub() {
        let mut d = VelocityDetector::new();
        let t0 = Instant::now();
        d.on_range_request_at(0, t0);
        // 8 MiB in 100ms => ~84 MB/s, comfortably above the 10 MB/s default.
        let pattern = d.on_range_request_at(8 * 1024 * 1024, t0 + Duration::from_millis(100));
        assert_eq!(pattern, Some(SeekPattern::ForwardScrub));
    }

    #[test]
    fn slow_forward_motion_is_slow_forward() {
        let mut d = VelocityDetector::new();
        let t0 = Instant::now();
        d.on_range_request_at(0, t0);
        // 1 KiB in 1s => 1 KiB/s, below the 1 MB/s default.
        let pattern = d.on_range_request_at(1024, t0 + Duration::from_secs(1));
        assert_eq!(pattern, Some(SeekPattern::SlowForward));
    }

    #[test]
    fn moderate_forward_motion_is_sequential() {
        let mut d = VelocityDetector::new();
        let t0 = Instant::now();
        d.on_range_request_at(0, t0);
        // 2 MiB in 1s => ~2.1 MB/s, between the two default thresholds.
        let pattern = d.on_range_request_at(2 * 1024 * 1024, t0 + Duration::from_secs(1));
        assert_eq!(pattern, Some(SeekPattern::Sequential));
    }

    #[test]
    fn worked_examples_from_the_design_notes_classify_as_specified() {
        // Four requests one second apart from a common baseline, matching
        // the end-byte deltas called out as worked examples: +50MB is a
        // scrub, +2MB is sequential, +0.1MB is slow, -5MB is a backward jump.
        let t0 = Instant::now();
        let one_sec_later = t0 + Duration::from_secs(1);

        let mut scrub = VelocityDetector::new();
        scrub.on_range_request_at(0, t0);
        assert_eq!(scrub.on_range_request_at(50_000_000, one_sec_later), Some(SeekPattern::ForwardScrub));

        let mut sequential = VelocityDetector::new();
        sequential.on_range_request_at(0, t0);
        assert_eq!(sequential.on_range_request_at(2_000_000, one_sec_later), Some(SeekPattern::Sequential));

        let mut slow = VelocityDetector::new();
        slow.on_range_request_at(0, t0);
        assert_eq!(slow.on_range_request_at(100_000, one_sec_later), Some(SeekPattern::SlowForward));

        let mut backward = VelocityDetector::new();
        backward.on_range_request_at(10_000_000, t0);
        assert_eq!(backward.on_range_request_at(5_000_000, one_sec_later), Some(SeekPattern::BackwardJump));
    }

    #[test]
    fn near_simultaneous_requests_do_not_explode_velocity() {
        let mut d = VelocityDetector::new();
        let t0 = Instant::now();
        d.on_range_request_at(0, t0);
        // Same instant: time delta floored at 1ms, so velocity is large but finite.
        let pattern = d.on_range_request_at(1_000_000, t0);
        assert_eq!(pattern, Some(SeekPattern::ForwardScrub));
    }

    #[test]
    fn window_is_bounded() {
        let mut d = VelocityDetector::new();
        let t0 = Instant::now();
        for i in 0..20u64 {
            d.on_range_request_at(i * 1024, t0 + Duration::from_millis(i * 10));
        }
        assert!(d.window.len() <= WINDOW_SIZE);
    }
}
