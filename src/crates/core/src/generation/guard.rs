use std::sync::atomic::{AtomicU64, Ordering};

const NO_OWNER: u64 = 0;

/// Monotonic generation tokens with a single active owner.
///
/// Tokens only ever increase. Every asynchronous commit compares its token with
/// the current owner, so a superseded attempt can never write over a newer one.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    issued: AtomicU64,
    owner: AtomicU64,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token and make it the owner. Fails with the current owner's token.
    pub fn acquire(&self) -> Result<u64, u64> {
        let token = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.owner
            .compare_exchange(NO_OWNER, token, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| token)
    }

    pub fn owner(&self) -> Option<u64> {
        match self.owner.load(Ordering::SeqCst) {
            NO_OWNER => None,
            token => Some(token),
        }
    }

    pub fn is_current(&self, token: u64) -> bool {
        token != NO_OWNER && self.owner.load(Ordering::SeqCst) == token
    }

    /// Give up ownership if `token` still holds it.
    pub fn release(&self, token: u64) -> bool {
        self.owner
            .compare_exchange(token, NO_OWNER, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Revoke whichever token owns the session, returning it.
    pub fn invalidate(&self) -> Option<u64> {
        match self.owner.swap(NO_OWNER, Ordering::SeqCst) {
            NO_OWNER => None,
            token => Some(token),
        }
    }
}
