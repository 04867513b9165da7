// Timestamp normalization - strictly increasing pts/dts per output stream

/// Running maximum of one timestamp field of one stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampCursor {
    last: Option<i64>,
}

impl TimestampCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last value handed out, if any
    pub fn last(&self) -> Option<i64> {
        self.last
    }

    /// Emit `candidate` if it moves forward, otherwise one tick past the last emitted value.
    ///
    /// A missing candidate counts as a regression. Returns the emitted value and
    /// whether it differs from the candidate.
    pub fn advance(&mut self, candidate: Option<i64>) -> (i64, bool) {
        let emitted = match (self.last, candidate) {
            (None, Some(value)) => value,
            (None, None) => 0,
            (Some(last), Some(value)) if value > last => value,
            (Some(last), _) => last.saturating_add(1),
        };
        self.last = Some(emitted);
        (emitted, candidate != Some(emitted))
    }
}

/// The pts and dts cursors of one output stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamTimestamps {
    pts: TimestampCursor,
    dts: TimestampCursor,
    adjusted: u64,
}

impl StreamTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize one packet's timestamps; each field is handled independently
    pub fn normalize(&mut self, pts: Option<i64>, dts: Option<i64>) -> (i64, i64) {
        let (pts, pts_changed) = self.pts.advance(pts);
        let (dts, dts_changed) = self.dts.advance(dts);
        self.adjusted += u64::from(pts_changed) + u64::from(dts_changed);
        (pts, dts)
    }

    /// How many individual pts/dts values were rewritten so far
    pub fn adjusted(&self) -> u64 {
        self.adjusted
    }

    pub fn last_pts(&self) -> Option<i64> {
        self.pts.last()
    }

    pub fn last_dts(&self) -> Option<i64> {
        self.dts.last()
    }
}
