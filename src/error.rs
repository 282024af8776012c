// src/error.rs
use reqwest::StatusCode;

/// Failures surfaced by the client and the trackers. A tracker never swallows
/// one of these: any variant aborts the poll cycle in progress and leaves
/// watermarks at their last committed value.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upstream returned a non-success status for a feed or REST endpoint.
    #[error("upstream request to {url} failed with status {status}")]
    Fetch { url: String, status: StatusCode },

    /// A referenced member id could not be resolved, not even lazily.
    #[error("couldn't resolve member {member_id}")]
    MemberResolution {
        member_id: u32,
        #[source]
        source: Option<Box<Error>>,
    },

    /// Upstream payload is missing expected fields or carries values we
    /// can't interpret (dates, governing-capacity codes, feed items).
    #[error("malformed upstream data: {0}")]
    Malformed(String),

    /// A user-supplied storage implementation failed.
    #[error("storage backend error")]
    Storage(#[source] anyhow::Error),

    /// A registered listener failed while handling an update.
    #[error("listener error")]
    Listener(#[source] anyhow::Error),

    #[error("http transport error")]
    Http(#[from] reqwest::Error),

    #[error("feed xml error")]
    Xml(#[from] quick_xml::DeError),

    #[error("json decode error")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
