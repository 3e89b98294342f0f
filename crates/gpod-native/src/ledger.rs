//! Live-allocation ledger
//!
//! Every record, list node, string and pixel buffer handed out by this crate
//! is registered here together with the thread that created it. Frees go
//! through [`release`], which refuses addresses it has never seen (or has
//! already seen freed) instead of handing them to the allocator a second
//! time. Counters are per thread so concurrently running tests do not see
//! each other's allocations.
//!
//! Each registration also gets a generation number that is never reused, so
//! a caller holding an address can tell whether it still names the same
//! allocation after the allocator has recycled it.

use parking_lot::Mutex;
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::thread::{self, ThreadId};
use tracing::error;

/// Category of a tracked allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocKind {
    Record(&'static str),
    ListNode,
    String,
    Error,
    Pixbuf,
}

#[derive(Debug)]
struct Entry {
    kind: AllocKind,
    owner: ThreadId,
    generation: u64,
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn ledger() -> &'static Mutex<HashMap<usize, Entry>> {
    static LEDGER: OnceLock<Mutex<HashMap<usize, Entry>>> = OnceLock::new();
    LEDGER.get_or_init(|| Mutex::new(HashMap::new()))
}

thread_local! {
    static REJECTED: Cell<usize> = const { Cell::new(0) };
}

/// Register a fresh allocation.
pub(crate) fn register(addr: usize, kind: AllocKind) {
    if addr == 0 {
        return;
    }
    let previous = ledger().lock().insert(
        addr,
        Entry {
            kind,
            owner: thread::current().id(),
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        },
    );
    if let Some(stale) = previous {
        // The allocator reused an address we never saw freed.
        error!(addr, ?stale.kind, "ledger entry overwritten");
    }
}

/// Forget an allocation before it is freed.
///
/// Returns `false` when the address is unknown; the caller must then skip
/// the real free.
pub(crate) fn release(addr: usize, kind: AllocKind) -> bool {
    if addr == 0 {
        return false;
    }
    match ledger().lock().remove(&addr) {
        Some(entry) => {
            if entry.kind != kind {
                error!(addr, expected = ?kind, found = ?entry.kind, "free with mismatched kind");
            }
            true
        }
        None => {
            REJECTED.with(|r| r.set(r.get() + 1));
            error!(addr, ?kind, "free of unknown or already freed address");
            false
        }
    }
}

/// Whether `addr` is currently a live allocation.
pub fn is_live(addr: usize) -> bool {
    ledger().lock().contains_key(&addr)
}

/// Generation of the live allocation at `addr`, or `None` once it is freed.
pub fn generation(addr: usize) -> Option<u64> {
    ledger().lock().get(&addr).map(|e| e.generation)
}

/// Number of live allocations created by the calling thread.
pub fn live_allocations() -> usize {
    let me = thread::current().id();
    ledger().lock().values().filter(|e| e.owner == me).count()
}

/// Number of live allocations of one kind created by the calling thread.
pub fn live_allocations_of(kind: AllocKind) -> usize {
    let me = thread::current().id();
    ledger()
        .lock()
        .values()
        .filter(|e| e.owner == me && e.kind == kind)
        .count()
}

/// Number of frees the calling thread attempted on unknown addresses.
pub fn rejected_frees() -> usize {
    REJECTED.with(|r| r.get())
}

#[no_mangle]
pub extern "C" fn itdb_debug_live_allocations() -> usize {
    live_allocations()
}

#[no_mangle]
pub extern "C" fn itdb_debug_rejected_frees() -> usize {
    rejected_frees()
}
