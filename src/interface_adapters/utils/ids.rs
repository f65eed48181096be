use std::sync::{
    OnceLock,
    atomic::{AtomicU64, Ordering},
};

use crate::domain::ClientId;

// Ids are serialized as JSON numbers; browsers only hold integers below 2^53 exactly.
const JS_SAFE_MAX: u64 = (1 << 53) - 1;

fn counter() -> &'static AtomicU64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    // Random start so ids do not reveal how many clients joined before.
    COUNTER.get_or_init(|| AtomicU64::new(u64::from(rand::random::<u32>()) + 1))
}

/// Returns a process-unique, increasing identifier for a connection.
pub fn next_id() -> u64 {
    counter().fetch_add(1, Ordering::Relaxed) & JS_SAFE_MAX
}

pub fn next_client_id() -> ClientId {
    ClientId(next_id())
}
