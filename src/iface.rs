use log::warn;

use crate::channel::ChannelRecord;
use crate::config::IfaceConfig;
use crate::error::AcsError;
use crate::survey::SurveyMeasurement;

/// Per-interface state consumed and mutated by channel selection. Owned by
/// the AP's event loop for the lifetime of the interface; the engine only
/// touches the survey accumulators, the walk counters and `conf.channel`.
#[derive(Debug, Clone)]
pub struct Interface {
    /// Ordered channel table of the current hardware mode.
    pub channels: Vec<ChannelRecord>,
    pub conf: IfaceConfig,
    /// Cursor into `channels` for the off-channel walk.
    pub off_channel_freq_idx: usize,
    /// Channels that produced survey data in the current invocation.
    pub chans_surveyed: u32,
    /// Full passes finished so far.
    pub acs_num_completed_surveys: u32,
    /// Reference noise floor: minimum `min_nf` across surveyed channels,
    /// 0 when nothing has been surveyed yet.
    pub lowest_nf: i8,
}

impl Interface {
    pub fn new(channels: Vec<ChannelRecord>, conf: IfaceConfig) -> Self {
        Interface {
            channels,
            conf,
            off_channel_freq_idx: 0,
            chans_surveyed: 0,
            acs_num_completed_surveys: 0,
            lowest_nf: 0,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_index_by_freq(&self, freq: u32) -> Option<usize> {
        self.channels.iter().position(|c| c.freq == freq)
    }

    /// Deposit a survey dump for `freq` into the matching channel record.
    /// Returns the number of measurements accepted; rows with inconsistent
    /// time counters are dropped.
    pub fn record_surveys(
        &mut self,
        freq: u32,
        surveys: Vec<SurveyMeasurement>,
    ) -> Result<usize, AcsError> {
        let idx = self
            .channel_index_by_freq(freq)
            .ok_or(AcsError::UnknownFreq { freq })?;

        let was_empty = self.channels[idx].survey_list.is_empty();
        let mut accepted = 0;
        for survey in surveys {
            if !survey.is_valid() {
                warn!("dropping inconsistent survey on {} MHz: {:?}", freq, survey);
                continue;
            }
            self.channels[idx].push_survey(survey);
            accepted += 1;
        }

        if accepted > 0 {
            if was_empty {
                self.chans_surveyed += 1;
            }
            self.update_lowest_nf();
        }
        Ok(accepted)
    }

    fn update_lowest_nf(&mut self) {
        self.lowest_nf = self
            .channels
            .iter()
            .filter(|c| c.survey_count > 0)
            .map(|c| c.min_nf)
            .min()
            .unwrap_or(0);
    }

    /// Reset every per-channel accumulator and all walk counters so a later
    /// invocation starts clean. Safe to call any number of times.
    pub fn cleanup(&mut self) {
        for chan in &mut self.channels {
            chan.clear_surveys();
        }
        self.chans_surveyed = 0;
        self.off_channel_freq_idx = 0;
        self.acs_num_completed_surveys = 0;
        self.lowest_nf = 0;
    }
}
