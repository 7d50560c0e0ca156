/// Orders overlapping read requests.
///
/// Each request takes a number from [`issue`](Self::issue). When its response
/// arrives, [`settle`](Self::settle) says whether it may be applied: only a
/// response newer than everything settled so far wins. Failed requests are
/// settled too, so an older success arriving after a newer failure is still
/// discarded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RequestSequence {
    issued: u64,
    settled: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Record that request `seq` completed. Returns `true` if it is the
    /// newest completion so far.
    pub fn settle(&mut self, seq: u64) -> bool {
        if seq > self.settled {
            self.settled = seq;
            true
        } else {
            false
        }
    }

    /// `true` until the most recently issued request settles.
    pub fn is_busy(&self) -> bool {
        self.settled < self.issued
    }

    pub fn latest(&self) -> u64 {
        self.issued
    }

    pub fn settled(&self) -> u64 {
        self.settled
    }
}
