//! Survey-driven channel selection controller.
//!
//! The engine walks the interface's channel list with remain-on-channel
//! dwells, pulls a survey dump after each dwell, and once the required
//! number of passes is complete scores every usable channel against the
//! quietest observed noise floor and hands the winner to bring-up.
//!
//! All progress is event-driven: the owning loop forwards driver callbacks
//! into the `notify_*` hooks and the engine advances its state machine
//! synchronously within each call. Between events the only persisted
//! continuation is the state plus the walk cursor on the interface.

use log::{debug, error, info, warn};

use crate::error::AcsError;
use crate::iface::Interface;
use crate::scoring;
use crate::status::{AcsState, ChanStatus};
use crate::traits::{BringUp, ScanParams, WifiDriver, DRV_OFFCHANNEL_TX};

/// Outcome of advancing the off-channel walk.
enum WalkStatus {
    /// A dwell was issued; wait for the ROC events.
    Pending,
    /// No channel remains in this pass.
    Complete,
}

pub struct AcsEngine<D: WifiDriver, B: BringUp> {
    driver: D,
    bring_up: B,
    iface: Interface,
    state: AcsState,
    last_error: Option<AcsError>,
}

impl<D: WifiDriver, B: BringUp> AcsEngine<D, B> {
    pub fn new(driver: D, bring_up: B, iface: Interface) -> Self {
        AcsEngine {
            driver,
            bring_up,
            iface,
            state: AcsState::Idle,
            last_error: None,
        }
    }

    pub fn state(&self) -> AcsState {
        self.state
    }

    pub fn iface(&self) -> &Interface {
        &self.iface
    }

    /// Cause of the most recent failure, cleared by `acs_init`.
    pub fn last_error(&self) -> Option<&AcsError> {
        self.last_error.as_ref()
    }

    /// Start a channel selection. `Acs` means the decision is in progress
    /// and will complete through the bring-up callback; `Invalid` is an
    /// immediate failure.
    pub fn acs_init(&mut self) -> ChanStatus {
        info!("automatic channel selection started, this may take a bit");
        self.last_error = None;

        self.state = AcsState::Sanity;
        if let Err(err) = self.sanity_check() {
            self.fail(err);
            return ChanStatus::Invalid;
        }

        match self.start_initial_scan() {
            Ok(()) => {
                self.state = AcsState::InitialScan;
                ChanStatus::Acs
            }
            Err(err) => {
                self.fail(err);
                ChanStatus::Invalid
            }
        }
    }

    fn sanity_check(&self) -> Result<(), AcsError> {
        if self.driver.flags() & DRV_OFFCHANNEL_TX == 0 {
            return Err(AcsError::OffchannelTxUnsupported);
        }
        self.iface.conf.validate()
    }

    fn start_initial_scan(&mut self) -> Result<(), AcsError> {
        debug!("initial scan just to kick off the hw a bit");
        if let Err(e) = self.driver.scan(&ScanParams::default()) {
            debug!("driver refused initial scan: {e:#}");
            return Err(AcsError::ScanRequest);
        }
        Ok(())
    }

    /// Driver scan-completion hook. Resets all survey state and issues the
    /// first dwell of the first pass.
    pub fn notify_scan_complete(&mut self) {
        if self.state != AcsState::InitialScan {
            debug!("ignoring scan completion in state {:?}", self.state);
            return;
        }

        debug!(
            "using survey based algorithm (acs_num_req_surveys={} acs_roc_duration_ms={})",
            self.iface.conf.acs_num_req_surveys, self.iface.conf.acs_roc_duration_ms
        );
        self.iface.cleanup();
        self.state = AcsState::Surveying;

        match self.study_next_freq() {
            Ok(WalkStatus::Pending) => {}
            Ok(WalkStatus::Complete) => self.fail(AcsError::PassUnderrun { pass: 1 }),
            Err(err) => self.fail(err),
        }
    }

    /// ROC-started hook: we went off-channel. Informational unless the
    /// driver reports failure.
    pub fn notify_acs_roc(&mut self, freq: u32, _duration: u32, status: i32) {
        if self.state != AcsState::Surveying {
            debug!("ignoring ROC start for {} MHz in state {:?}", freq, self.state);
            return;
        }
        if status != 0 {
            self.fail(AcsError::RocEvent { freq, status });
            return;
        }
        debug!("off-channel on freq {} MHz", freq);
        // the completed/cancelled event arrives separately
    }

    /// ROC-ended hook: we are back on-channel. Pulls the survey dump for
    /// the dwelled frequency and advances the walk.
    pub fn notify_acs_roc_cancel(&mut self, freq: u32, _duration: u32, status: i32) {
        if self.state != AcsState::Surveying {
            debug!("ignoring ROC end for {} MHz in state {:?}", freq, self.state);
            return;
        }
        if status != 0 {
            self.fail(AcsError::RocEvent { freq, status });
            return;
        }
        if let Err(err) = self.roc_next(freq) {
            self.fail(err);
        }
    }

    fn roc_next(&mut self, freq: u32) -> Result<(), AcsError> {
        let surveys = match self.driver.survey_freq(freq) {
            Ok(surveys) => surveys,
            Err(e) => {
                debug!("survey dump for {} MHz failed: {e:#}", freq);
                return Err(AcsError::SurveyDump { freq });
            }
        };
        self.iface.record_surveys(freq, surveys)?;

        debug!("going to next channel");
        self.iface.off_channel_freq_idx += 1;

        match self.study_next_freq()? {
            WalkStatus::Pending => Ok(()),
            WalkStatus::Complete => self.study_complete(),
        }
    }

    /// Advance the walk: issue a dwell on the first non-disabled channel at
    /// or after the cursor. The cursor is left pointing at the dwelled
    /// channel and only moves on in `roc_next`, so a failed dwell never
    /// skips a channel.
    fn study_next_freq(&mut self) -> Result<WalkStatus, AcsError> {
        let num = self.iface.num_channels();
        let idx = self.iface.off_channel_freq_idx;
        if idx > num {
            return Err(AcsError::CursorOutOfBounds { idx, num });
        }

        for i in idx..num {
            let (freq, disabled) = {
                let chan = &self.iface.channels[i];
                (chan.freq, chan.is_disabled())
            };
            if disabled {
                continue;
            }

            if let Err(e) = self
                .driver
                .remain_on_channel(freq, self.iface.conf.acs_roc_duration_ms)
            {
                debug!("off-channel request on {} MHz refused: {e:#}", freq);
                return Err(AcsError::RocRequest { freq });
            }
            self.iface.off_channel_freq_idx = i;
            return Ok(WalkStatus::Pending);
        }

        if self.iface.chans_surveyed == 0 {
            return Err(AcsError::NothingSurveyed);
        }
        Ok(WalkStatus::Complete)
    }

    /// A full pass over the channel list finished. Either restart the walk
    /// for the next pass or move on to selection and handoff.
    fn study_complete(&mut self) -> Result<(), AcsError> {
        self.state = AcsState::PassComplete;
        self.iface.acs_num_completed_surveys += 1;
        debug!(
            "survey pass {}/{} complete",
            self.iface.acs_num_completed_surveys, self.iface.conf.acs_num_req_surveys
        );

        if self.iface.acs_num_completed_surveys < self.iface.conf.acs_num_req_surveys {
            self.iface.off_channel_freq_idx = 0;
            self.state = AcsState::Surveying;
            return match self.study_next_freq()? {
                WalkStatus::Pending => Ok(()),
                // every channel vanished mid-sweep; fail instead of looping
                WalkStatus::Complete => Err(AcsError::PassUnderrun {
                    pass: self.iface.acs_num_completed_surveys + 1,
                }),
            };
        }

        self.state = AcsState::Deciding;
        if self.iface.chans_surveyed == 0 {
            return Err(AcsError::NothingSurveyed);
        }

        let Some(idx) = scoring::find_ideal_chan(&mut self.iface) else {
            return Err(AcsError::NoUsableChannel);
        };
        let (chan, freq, factor) = {
            let ideal = &self.iface.channels[idx];
            (ideal.chan, ideal.freq, ideal.survey_interference_factor)
        };
        info!(
            "ideal channel: {} ({} MHz), average interference factor {:.6}",
            chan, freq, factor
        );

        // Only the primary channel is written; the secondary channel for
        // 40 MHz operation stays whatever the operator configured.
        self.iface.conf.channel = chan;

        self.state = AcsState::Handoff;
        match self.bring_up.acs_completed(&self.iface) {
            ChanStatus::Valid => {
                self.iface.cleanup();
                self.state = AcsState::Done;
                Ok(())
            }
            other => {
                warn!("bring-up returned {:?} for channel {}", other, chan);
                Err(AcsError::BringUp)
            }
        }
    }

    fn fail(&mut self, err: AcsError) {
        error!("channel selection failed: {}", err);
        self.iface.cleanup();
        self.last_error = Some(err);
        self.state = AcsState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelRecord, CHAN_DISABLED};
    use crate::config::IfaceConfig;
    use crate::survey::SurveyMeasurement;
    use crate::traits::{MockBringUp, MockWifiDriver};
    use anyhow::anyhow;
    use mockall::predicate::*;

    fn test_iface(channels: Vec<ChannelRecord>, passes: u32) -> Interface {
        let conf = IfaceConfig {
            acs_num_req_surveys: passes,
            acs_roc_duration_ms: 100,
            channel: 0,
        };
        Interface::new(channels, conf)
    }

    fn survey(time: u64, busy: u64, tx: u64, nf: i8) -> SurveyMeasurement {
        SurveyMeasurement {
            channel_time: time,
            channel_time_busy: busy,
            channel_time_tx: tx,
            nf,
        }
    }

    #[test]
    fn test_init_fails_without_offchannel_tx() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(0u32);

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        assert_eq!(engine.acs_init(), ChanStatus::Invalid);
        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(
            engine.last_error(),
            Some(&AcsError::OffchannelTxUnsupported)
        );
    }

    #[test]
    fn test_init_fails_on_invalid_config() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 0);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        assert_eq!(engine.acs_init(), ChanStatus::Invalid);
        assert_eq!(engine.last_error(), Some(&AcsError::InvalidConfig));
    }

    #[test]
    fn test_init_fails_when_scan_refused() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver
            .expect_scan()
            .times(1)
            .returning(|_| Err(anyhow!("busy")));

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        assert_eq!(engine.acs_init(), ChanStatus::Invalid);
        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(engine.last_error(), Some(&AcsError::ScanRequest));
    }

    #[test]
    fn test_roc_request_refusal_fails_the_run() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver.expect_scan().returning(|_| Ok(()));
        driver
            .expect_remain_on_channel()
            .with(eq(2412u32), eq(100u32))
            .times(1)
            .returning(|_, _| Err(anyhow!("no airtime")));

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        assert_eq!(engine.acs_init(), ChanStatus::Acs);
        assert_eq!(engine.state(), AcsState::InitialScan);

        engine.notify_scan_complete();
        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(
            engine.last_error(),
            Some(&AcsError::RocRequest { freq: 2412 })
        );
    }

    #[test]
    fn test_roc_event_failure_fails_the_run() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver.expect_scan().returning(|_| Ok(()));
        driver
            .expect_remain_on_channel()
            .times(1)
            .returning(|_, _| Ok(()));

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        engine.acs_init();
        engine.notify_scan_complete();
        assert_eq!(engine.state(), AcsState::Surveying);

        engine.notify_acs_roc(2412, 100, -5);
        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(
            engine.last_error(),
            Some(&AcsError::RocEvent {
                freq: 2412,
                status: -5
            })
        );
        assert_eq!(engine.iface().chans_surveyed, 0);
    }

    #[test]
    fn test_disabled_channel_never_dwelled() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver.expect_scan().returning(|_| Ok(()));
        // the only dwell the mock allows is on channel 6
        driver
            .expect_remain_on_channel()
            .with(eq(2437u32), eq(100u32))
            .times(1)
            .returning(|_, _| Ok(()));
        driver
            .expect_survey_freq()
            .with(eq(2437u32))
            .times(1)
            .returning(|_| Ok(vec![survey(1000, 100, 0, -90)]));

        let mut bring_up = MockBringUp::new();
        bring_up
            .expect_acs_completed()
            .withf(|iface: &Interface| iface.conf.channel == 6)
            .times(1)
            .returning(|_| ChanStatus::Valid);

        let iface = test_iface(
            vec![
                ChannelRecord::with_flags(1, 2412, CHAN_DISABLED),
                ChannelRecord::new(6, 2437),
            ],
            1,
        );
        let mut engine = AcsEngine::new(driver, bring_up, iface);

        assert_eq!(engine.acs_init(), ChanStatus::Acs);
        engine.notify_scan_complete();
        engine.notify_acs_roc(2437, 100, 0);
        engine.notify_acs_roc_cancel(2437, 100, 0);

        assert_eq!(engine.state(), AcsState::Done);
        assert_eq!(engine.iface().conf.channel, 6);
    }

    #[test]
    fn test_failed_survey_dump_fails_the_run() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver.expect_scan().returning(|_| Ok(()));
        driver
            .expect_remain_on_channel()
            .times(1)
            .returning(|_, _| Ok(()));
        driver
            .expect_survey_freq()
            .times(1)
            .returning(|_| Err(anyhow!("firmware wedged")));

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        engine.acs_init();
        engine.notify_scan_complete();
        engine.notify_acs_roc_cancel(2412, 100, 0);

        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(
            engine.last_error(),
            Some(&AcsError::SurveyDump { freq: 2412 })
        );
    }

    #[test]
    fn test_bring_up_rejection_fails_the_run() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver.expect_scan().returning(|_| Ok(()));
        driver
            .expect_remain_on_channel()
            .times(1)
            .returning(|_, _| Ok(()));
        driver
            .expect_survey_freq()
            .times(1)
            .returning(|_| Ok(vec![survey(1000, 100, 0, -90)]));

        let mut bring_up = MockBringUp::new();
        bring_up
            .expect_acs_completed()
            .times(1)
            .returning(|_| ChanStatus::Invalid);

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, bring_up, iface);

        engine.acs_init();
        engine.notify_scan_complete();
        engine.notify_acs_roc_cancel(2412, 100, 0);

        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(engine.last_error(), Some(&AcsError::BringUp));
        // the channel write-back sticks even though bring-up rejected it;
        // the survey state is gone
        assert!(engine.iface().channels[0].survey_list.is_empty());
    }

    #[test]
    fn test_stray_events_are_ignored() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);

        let iface = test_iface(vec![ChannelRecord::new(1, 2412)], 1);
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        engine.notify_acs_roc(2412, 100, 0);
        engine.notify_acs_roc_cancel(2412, 100, 0);
        engine.notify_scan_complete();
        assert_eq!(engine.state(), AcsState::Idle);
    }

    #[test]
    fn test_all_channels_disabled_is_nothing_surveyed() {
        let mut driver = MockWifiDriver::new();
        driver.expect_flags().return_const(DRV_OFFCHANNEL_TX);
        driver.expect_scan().returning(|_| Ok(()));

        let iface = test_iface(
            vec![
                ChannelRecord::with_flags(1, 2412, CHAN_DISABLED),
                ChannelRecord::with_flags(6, 2437, CHAN_DISABLED),
            ],
            1,
        );
        let mut engine = AcsEngine::new(driver, MockBringUp::new(), iface);

        engine.acs_init();
        engine.notify_scan_complete();
        assert_eq!(engine.state(), AcsState::Failed);
        assert_eq!(engine.last_error(), Some(&AcsError::NothingSurveyed));
    }
}
