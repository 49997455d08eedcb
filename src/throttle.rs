/// Lets an action through at most once per interval of wrapping milliseconds.
///
/// Nothing has run yet, so the first [`ready`](Self::ready) check always passes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Throttle {
    interval_ms: u32,
    last_ms: Option<u32>,
}

impl Throttle {
    pub(crate) const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    pub(crate) fn ready(&self, now_ms: u32) -> bool {
        self.last_ms
            .is_none_or(|last_ms| now_ms.wrapping_sub(last_ms) >= self.interval_ms)
    }

    pub(crate) const fn mark(&mut self, now_ms: u32) {
        self.last_ms = Some(now_ms);
    }
}
