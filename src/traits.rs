use anyhow::Result;

use crate::iface::Interface;
use crate::status::ChanStatus;
use crate::survey::SurveyMeasurement;

/// Driver can transmit while off its operating channel. Required for
/// remain-on-channel dwells.
pub const DRV_OFFCHANNEL_TX: u32 = 0x01;

/// Parameters for the initial kick scan. An empty frequency list scans all
/// supported frequencies.
#[derive(Debug, Clone, Default)]
pub struct ScanParams {
    pub freqs: Vec<u32>,
}

#[cfg_attr(test, mockall::automock)]
pub trait WifiDriver {
    /// Capability bitfield; only `DRV_OFFCHANNEL_TX` is consulted here.
    fn flags(&self) -> u32;

    /// Request a scan. Completion is delivered asynchronously via
    /// `AcsEngine::notify_scan_complete`.
    fn scan(&mut self, params: &ScanParams) -> Result<()>;

    /// Park the radio on `freq` for `duration_ms`. Produces two
    /// asynchronous events: started (`notify_acs_roc`) and cancelled/ended
    /// (`notify_acs_roc_cancel`), each carrying a driver status where 0
    /// means success.
    fn remain_on_channel(&mut self, freq: u32, duration_ms: u32) -> Result<()>;

    /// Dump the survey measurements collected on `freq` since the last dump.
    fn survey_freq(&mut self, freq: u32) -> Result<Vec<SurveyMeasurement>>;
}

#[cfg_attr(test, mockall::automock)]
pub trait BringUp {
    /// Invoked once the ideal channel has been written to
    /// `iface.conf.channel`. Returning `Valid` continues AP setup on that
    /// channel; anything else fails the selection.
    fn acs_completed(&mut self, iface: &Interface) -> ChanStatus;
}
