//! Unix signal handling for a long-running `kg serve` process.
//!
//! spec.md §4.C: "SIGHUP -> reload configuration without restart... does
//! not re-open derived store. SIGTERM -> flush dirty set, close store,
//! exit." This module only raises flags from the signal handler context
//! (the one thing safe to do inside a signal handler); the daemon loop in
//! `kg-executor::daemon` polls them and does the actual reload/shutdown
//! work on a normal thread.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Flags set by the signal handlers, polled by the daemon's main loop.
#[derive(Clone)]
pub struct SignalFlags {
    pub term: Arc<AtomicBool>,
    pub hup: Arc<AtomicBool>,
}

impl SignalFlags {
    /// Take and clear the SIGTERM flag.
    pub fn take_term(&self) -> bool {
        self.term.swap(false, std::sync::atomic::Ordering::AcqRel)
    }

    /// Take and clear the SIGHUP flag.
    pub fn take_hup(&self) -> bool {
        self.hup.swap(false, std::sync::atomic::Ordering::AcqRel)
    }
}

/// Register `SIGTERM`/`SIGHUP` handlers that flip an [`AtomicBool`] each.
/// Safe to call once per process; a second call re-registers onto fresh
/// flags (the prior ones simply stop being updated).
pub fn install() -> std::io::Result<SignalFlags> {
    let term = Arc::new(AtomicBool::new(false));
    let hup = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, term.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGHUP, hup.clone())?;
    Ok(SignalFlags { term, hup })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_start_clear_and_take_clears_them() {
        let flags = SignalFlags { term: Arc::new(AtomicBool::new(true)), hup: Arc::new(AtomicBool::new(false)) };
        assert!(flags.take_term());
        assert!(!flags.take_term());
        assert!(!flags.take_hup());
    }
}
