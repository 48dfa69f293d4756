#![forbid(unsafe_code)]

/// Events emitted while an update artifact is being transferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    /// Transfer progress for the task identified by `hash`.
    ///
    /// Within one task `received` never decreases, and the last `Progress`
    /// event carries `received == total`.
    Progress {
        hash: String,
        received: u64,
        total: u64,
    },
}

impl DownloadEvent {
    /// Integer percentage, rounded half up. `None` when the total is unknown (zero).
    #[must_use]
    pub fn percent(&self) -> Option<u64> {
        match self {
            Self::Progress {
                received, total, ..
            } => percent_of(*received, *total),
        }
    }
}

/// Integer percentage of `received / total`, rounded half up.
#[must_use]
pub fn percent_of(received: u64, total: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    let scaled = u128::from(received) * 200 + u128::from(total);
    let pct = scaled / (u128::from(total) * 2);
    Some(u64::try_from(pct).unwrap_or(u64::MAX))
}
