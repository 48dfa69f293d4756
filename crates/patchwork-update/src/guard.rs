#![forbid(unsafe_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use parking_lot::Mutex;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::trace;

use crate::{UpdateError, UpdateResult};

/// Serializes writers of a version root against retention.
///
/// Package-producing tasks hold a shared lease for their whole run;
/// retention holds the exclusive lease. Independently, every task registers
/// the root-level names it writes (output directory, staging file) so that
/// two tasks never target the same name, and the baseline version it reads.
/// Retention never deletes a name that is written or read in flight.
#[derive(Default)]
pub(crate) struct VersionRootGuard {
    lease: Arc<RwLock<()>>,
    in_flight: Mutex<Claims>,
}

#[derive(Default)]
struct Claims {
    written: HashSet<String>,
    /// Baselines may be shared by several tasks.
    read: HashMap<String, usize>,
}

/// Registration of in-flight names; released on drop.
pub(crate) struct InFlight {
    guard: Arc<VersionRootGuard>,
    names: Vec<String>,
    baseline: Option<String>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let mut claims = self.guard.in_flight.lock();
        for name in &self.names {
            claims.written.remove(name);
        }
        if let Some(baseline) = &self.baseline {
            match claims.read.get_mut(baseline) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    claims.read.remove(baseline);
                }
                None => {}
            }
        }
        trace!(names = ?self.names, baseline = ?self.baseline, "in-flight names released");
    }
}

impl VersionRootGuard {
    /// Claim `names` for writing and pin `baseline` for reading, atomically.
    ///
    /// Fails if any name is already claimed for reading or writing, or if the
    /// baseline is being written; nothing is claimed then.
    pub(crate) fn register(
        self: &Arc<Self>,
        names: Vec<String>,
        baseline: Option<String>,
    ) -> UpdateResult<InFlight> {
        let mut claims = self.in_flight.lock();
        let taken = names
            .iter()
            .find(|n| claims.written.contains(*n) || claims.read.contains_key(*n))
            .or_else(|| baseline.as_ref().filter(|b| claims.written.contains(*b)));
        if let Some(taken) = taken {
            return Err(UpdateError::TaskConflict {
                name: taken.clone(),
            });
        }
        claims.written.extend(names.iter().cloned());
        if let Some(baseline) = &baseline {
            *claims.read.entry(baseline.clone()).or_default() += 1;
        }
        drop(claims);
        trace!(names = ?names, baseline = ?baseline, "in-flight names registered");
        Ok(InFlight {
            guard: Arc::clone(self),
            names,
            baseline,
        })
    }

    /// Every name written or read by a task in flight.
    pub(crate) fn in_flight(&self) -> Vec<String> {
        let claims = self.in_flight.lock();
        let mut names: Vec<String> = claims
            .written
            .iter()
            .chain(claims.read.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub(crate) async fn shared(&self) -> OwnedRwLockReadGuard<()> {
        Arc::clone(&self.lease).read_owned().await
    }

    pub(crate) async fn exclusive(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.lease).write_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn duplicate_names_conflict_until_released() {
        let guard = Arc::new(VersionRootGuard::default());
        let first = guard.register(vec!["h1".into(), "h1.ppk".into()], None).unwrap();

        let err = guard.register(vec!["h1".into()], None).err().unwrap();
        assert!(matches!(err, UpdateError::TaskConflict { name } if name == "h1"));
        assert!(guard.register(vec!["h2".into()], None).is_ok());

        drop(first);
        assert!(guard.register(vec!["h1".into()], None).is_ok());
    }

    #[test]
    fn failed_registration_claims_nothing() {
        let guard = Arc::new(VersionRootGuard::default());
        let _held = guard.register(vec!["b".into()], None).unwrap();
        assert!(guard.register(vec!["a".into(), "b".into()], Some("h0".into())).is_err());
        assert_eq!(guard.in_flight(), vec!["b".to_string()]);
    }

    #[test]
    fn readers_and_writers_of_a_version_exclude_each_other() {
        let guard = Arc::new(VersionRootGuard::default());
        let diff = guard
            .register(vec!["h2".into(), "h1_h2.ppk.patch".into()], Some("h1".into()))
            .unwrap();

        let err = guard
            .register(vec!["h1".into(), "h1.ppk".into()], None)
            .err()
            .unwrap();
        assert!(matches!(err, UpdateError::TaskConflict { name } if name == "h1"));

        let err = guard
            .register(vec!["h3".into(), "h2_h3.ppk.patch".into()], Some("h2".into()))
            .err()
            .unwrap();
        assert!(matches!(err, UpdateError::TaskConflict { name } if name == "h2"));
        assert_eq!(guard.in_flight(), vec!["h1", "h1_h2.ppk.patch", "h2"]);

        drop(diff);
        assert!(guard.register(vec!["h1".into(), "h1.ppk".into()], None).is_ok());
    }

    #[test]
    fn shared_baseline_stays_pinned_until_last_reader() {
        let guard = Arc::new(VersionRootGuard::default());
        let a = guard.register(vec!["h2".into()], Some("h1".into())).unwrap();
        let b = guard.register(vec!["h3".into()], Some("h1".into())).unwrap();
        assert_eq!(guard.in_flight(), vec!["h1", "h2", "h3"]);

        drop(a);
        assert_eq!(guard.in_flight(), vec!["h1", "h3"]);
        drop(b);
        assert!(guard.in_flight().is_empty());
    }

    #[tokio::test]
    async fn exclusive_waits_for_shared() {
        let guard = Arc::new(VersionRootGuard::default());
        let shared = guard.shared().await;

        let g = Arc::clone(&guard);
        let waiter = tokio::spawn(async move {
            let _x = g.exclusive().await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(shared);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
