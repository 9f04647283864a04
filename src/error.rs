use thiserror::Error;

/// Terminal failure causes for a channel-selection run. Any of these ends
/// the invocation as a unit; there is no per-dwell retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcsError {
    #[error("driver lacks off-channel TX support")]
    OffchannelTxUnsupported,

    #[error("acs_num_req_surveys must be at least 1")]
    InvalidConfig,

    #[error("initial scan request refused by driver")]
    ScanRequest,

    #[error("off-channel request on {freq} MHz refused by driver")]
    RocRequest { freq: u32 },

    #[error("off-channel on {freq} MHz failed with driver status {status}")]
    RocEvent { freq: u32, status: i32 },

    #[error("failed to get any survey data for {freq} MHz")]
    SurveyDump { freq: u32 },

    #[error("{freq} MHz does not match any configured channel")]
    UnknownFreq { freq: u32 },

    #[error("survey cursor {idx} out of bounds for {num} channels")]
    CursorOutOfBounds { idx: usize, num: usize },

    #[error("unable to survey any channel")]
    NothingSurveyed,

    #[error("survey data was collected but no usable channel remains")]
    NoUsableChannel,

    #[error("channel walk issued no dwell in pass {pass}")]
    PassUnderrun { pass: u32 },

    #[error("bring-up rejected the selected channel")]
    BringUp,
}
