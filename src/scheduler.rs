//! Debounced auto-connect scheduling
//!
//! When a preferred sink connects on another profile, the A2DP connection is
//! attempted only after a delay. At most one pending attempt exists per device:
//! scheduling again for the same device moves its deadline instead of adding a
//! second attempt, so near-simultaneous triggers collapse into one.

use embassy_time::{Duration, Instant};
use heapless::{FnvIndexMap, Vec};

use crate::{BluetoothAddress, SinkError, constants::MAX_SINK_DEVICES};

/// Pending auto-connect attempts keyed by device
#[derive(Debug)]
pub struct AutoConnectScheduler {
    pending: FnvIndexMap<BluetoothAddress, Instant, MAX_SINK_DEVICES>,
    delay: Duration,
}

impl AutoConnectScheduler {
    /// Create an empty scheduler firing `delay` after each trigger
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            pending: FnvIndexMap::new(),
            delay,
        }
    }

    /// Schedule (or reschedule) an attempt for `address`, returning its deadline
    ///
    /// # Errors
    /// Returns [`SinkError::TableFull`] if too many devices are already pending.
    pub fn schedule(
        &mut self,
        address: BluetoothAddress,
        now: Instant,
    ) -> Result<Instant, SinkError> {
        let deadline = now + self.delay;
        self.pending
            .insert(address, deadline)
            .map_err(|_| SinkError::TableFull)?;
        Ok(deadline)
    }

    /// Whether an attempt is pending for `address`
    #[must_use]
    pub fn is_pending(&self, address: &BluetoothAddress) -> bool {
        self.pending.contains_key(address)
    }

    /// Earliest pending deadline
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every device whose deadline is at or before `now`
    pub fn take_due(&mut self, now: Instant) -> Vec<BluetoothAddress, MAX_SINK_DEVICES> {
        let due: Vec<BluetoothAddress, MAX_SINK_DEVICES> = self
            .pending
            .iter()
            .filter(|&(_, &deadline)| deadline <= now)
            .map(|(&address, _)| address)
            .collect();
        for address in &due {
            self.pending.remove(address);
        }
        due
    }

    /// Number of pending attempts
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// No attempt is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE_A: BluetoothAddress = BluetoothAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    const DEVICE_B: BluetoothAddress = BluetoothAddress::new([0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB]);

    fn scheduler() -> AutoConnectScheduler {
        AutoConnectScheduler::new(Duration::from_millis(6000))
    }

    #[test]
    fn test_schedule_sets_deadline_after_delay() {
        let mut scheduler = scheduler();
        let deadline = scheduler
            .schedule(DEVICE_A, Instant::from_millis(1000))
            .unwrap();

        assert_eq!(deadline, Instant::from_millis(7000));
        assert!(scheduler.is_pending(&DEVICE_A));
        assert_eq!(scheduler.next_deadline(), Some(deadline));
    }

    #[test]
    fn test_reschedule_replaces_pending_attempt() {
        let mut scheduler = scheduler();
        scheduler.schedule(DEVICE_A, Instant::from_millis(0)).unwrap();
        scheduler
            .schedule(DEVICE_A, Instant::from_millis(2000))
            .unwrap();

        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next_deadline(), Some(Instant::from_millis(8000)));
        assert!(scheduler.take_due(Instant::from_millis(6000)).is_empty());
        assert_eq!(
            scheduler.take_due(Instant::from_millis(8000)).as_slice(),
            &[DEVICE_A]
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_take_due_only_returns_expired_devices() {
        let mut scheduler = scheduler();
        scheduler.schedule(DEVICE_A, Instant::from_millis(0)).unwrap();
        scheduler
            .schedule(DEVICE_B, Instant::from_millis(3000))
            .unwrap();

        assert!(scheduler.take_due(Instant::from_millis(5999)).is_empty());
        assert_eq!(
            scheduler.take_due(Instant::from_millis(6000)).as_slice(),
            &[DEVICE_A]
        );
        assert_eq!(scheduler.next_deadline(), Some(Instant::from_millis(9000)));
        assert!(scheduler.take_due(Instant::from_millis(6000)).is_empty());
        assert_eq!(
            scheduler.take_due(Instant::from_millis(9000)).as_slice(),
            &[DEVICE_B]
        );
    }

    #[test]
    fn test_schedule_fails_when_full() {
        let mut scheduler = scheduler();
        for i in 0..MAX_SINK_DEVICES {
            let address = BluetoothAddress::new([0, 0, 0, 0, 0, i as u8]);
            scheduler.schedule(address, Instant::from_millis(0)).unwrap();
        }

        assert_eq!(
            scheduler.schedule(DEVICE_B, Instant::from_millis(0)),
            Err(SinkError::TableFull)
        );
        // An already-pending device can still be rescheduled
        let first = BluetoothAddress::new([0, 0, 0, 0, 0, 0]);
        assert!(scheduler.schedule(first, Instant::from_millis(10)).is_ok());
    }
}
