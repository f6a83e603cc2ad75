use thiserror::Error;

/// Why a single correlation pass could not run. Always recoverable: the
/// controller keeps the previously published results and tries again later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("{source_name} snapshot is unavailable")]
    Unavailable { source_name: &'static str },

    #[error("{source_name} snapshot is malformed: {reason}")]
    Malformed {
        source_name: &'static str,
        reason: String,
    },
}

impl SnapshotError {
    pub(crate) fn malformed(source_name: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            source_name,
            reason: reason.into(),
        }
    }
}

/// Errors that stop the ready check subsystem from starting at all.
#[derive(Debug, Error)]
pub enum ReadyCheckError {
    /// The host could not find a data source the core reads from.
    #[error(
        "unable to locate the {source_name} data source; the host layout has probably changed"
    )]
    HostSignatureMissing { source_name: String },

    #[error("unable to start the ready check timer runtime")]
    SchedulerUnavailable {
        #[source]
        source: std::io::Error,
    },
}
