//! Tagged slot states for the connection pool
//!
//! A slot is always in exactly one state; the connection object travels
//! with the state transitions (`Idle` owns it, `InFlight` means the
//! outstanding request future owns it). This replaces the free/busy map
//! pair a dynamic language would use, and makes "in both sets" or "in
//! neither set" unrepresentable.

/// One logical connection in the pool, identified by its index
#[derive(Debug)]
pub enum Slot<C> {
    /// Connect still outstanding
    Connecting,
    /// Ready for dispatch, owns the connection
    Idle(C),
    /// Request outstanding; the request future owns the connection
    InFlight,
    /// Connect failed; permanently excluded from dispatch
    Failed,
    /// Closed during finish
    Closed,
}

impl<C> Slot<C> {
    /// Connecting -> Idle. Returns false (and leaves the slot alone) if
    /// the slot was not connecting.
    #[must_use]
    pub fn connected(&mut self, conn: C) -> bool {
        match self {
            Slot::Connecting => {
                *self = Slot::Idle(conn);
                true
            }
            _ => false,
        }
    }

    /// Idle -> InFlight, handing the connection to the caller
    pub fn begin_flight(&mut self) -> Option<C> {
        match std::mem::replace(self, Slot::InFlight) {
            Slot::Idle(conn) => Some(conn),
            other => {
                // Not idle: put the original state back
                *self = other;
                None
            }
        }
    }

    /// InFlight -> Idle, taking the connection back from a completion
    #[must_use]
    pub fn land(&mut self, conn: C) -> bool {
        match self {
            Slot::InFlight => {
                *self = Slot::Idle(conn);
                true
            }
            _ => false,
        }
    }

    /// Idle -> Closed, surrendering the connection for closing
    pub fn take_for_close(&mut self) -> Option<C> {
        match std::mem::replace(self, Slot::Closed) {
            Slot::Idle(conn) => Some(conn),
            Slot::InFlight => None, // outstanding request owns it; dropped, not awaited
            other => {
                *self = other;
                None
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Slot::Idle(_))
    }

    /// State name for log lines
    pub fn state_name(&self) -> &'static str {
        match self {
            Slot::Connecting => "connecting",
            Slot::Idle(_) => "idle",
            Slot::InFlight => "in-flight",
            Slot::Failed => "failed",
            Slot::Closed => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut slot: Slot<u32> = Slot::Connecting;

        assert!(slot.connected(1));
        assert!(slot.is_idle());

        let conn = slot.begin_flight().unwrap();
        assert!(matches!(slot, Slot::InFlight));

        assert!(slot.land(conn));
        assert!(slot.is_idle());

        assert_eq!(slot.take_for_close(), Some(1));
        assert!(matches!(slot, Slot::Closed));
    }

    #[test]
    fn test_begin_flight_requires_idle() {
        let mut slot: Slot<u32> = Slot::Connecting;
        assert!(slot.begin_flight().is_none());
        assert!(matches!(slot, Slot::Connecting));

        let mut slot: Slot<u32> = Slot::Failed;
        assert!(slot.begin_flight().is_none());
        assert!(matches!(slot, Slot::Failed));
    }

    #[test]
    fn test_land_requires_in_flight() {
        let mut slot: Slot<u32> = Slot::Idle(1);
        assert!(!slot.land(2));
        // Original connection untouched
        assert_eq!(slot.begin_flight(), Some(1));
    }

    #[test]
    fn test_close_skips_in_flight() {
        let mut slot: Slot<u32> = Slot::InFlight;
        assert_eq!(slot.take_for_close(), None);
        assert!(matches!(slot, Slot::Closed));
    }
}
