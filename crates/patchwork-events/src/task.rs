#![forbid(unsafe_code)]

/// Lifecycle events of update tasks.
///
/// `kind` is the stable label of the task type (e.g. `"full"`, `"retention"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Started { hash: String, kind: &'static str },
    /// Transfer finished; the artifact is being unpacked / patched.
    Applying { hash: String, kind: &'static str },
    Succeeded { hash: String, kind: &'static str },
    Failed {
        hash: String,
        kind: &'static str,
        error: String,
    },
}

impl TaskEvent {
    #[must_use]
    pub fn hash(&self) -> &str {
        match self {
            Self::Started { hash, .. }
            | Self::Applying { hash, .. }
            | Self::Succeeded { hash, .. }
            | Self::Failed { hash, .. } => hash,
        }
    }

    /// `true` for `Succeeded` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}
