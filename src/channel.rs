use crate::survey::SurveyMeasurement;

/// Channel is administratively disabled: never dwelled on, never selected.
pub const CHAN_DISABLED: u32 = 0x01;

/// One entry in the AP's mode description, together with the survey
/// accumulator filled during channel selection.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    /// Channel number.
    pub chan: u8,
    /// Center frequency in MHz.
    pub freq: u32,
    pub flags: u32,
    pub survey_list: Vec<SurveyMeasurement>,
    pub survey_count: u32,
    /// Minimum noise floor seen across `survey_list`, 0 when unknown.
    pub min_nf: i8,
    /// Average interference factor, written during selection.
    pub survey_interference_factor: f64,
}

impl ChannelRecord {
    pub fn new(chan: u8, freq: u32) -> Self {
        ChannelRecord {
            chan,
            freq,
            flags: 0,
            survey_list: Vec::new(),
            survey_count: 0,
            min_nf: 0,
            survey_interference_factor: 0.0,
        }
    }

    pub fn with_flags(chan: u8, freq: u32, flags: u32) -> Self {
        ChannelRecord {
            flags,
            ..ChannelRecord::new(chan, freq)
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.flags & CHAN_DISABLED != 0
    }

    /// Append a measurement, keeping `survey_count` and `min_nf` current.
    pub fn push_survey(&mut self, survey: SurveyMeasurement) {
        if self.survey_list.is_empty() || survey.nf < self.min_nf {
            self.min_nf = survey.nf;
        }
        self.survey_list.push(survey);
        self.survey_count += 1;
    }

    /// Drop all accumulated survey state.
    pub fn clear_surveys(&mut self) {
        self.survey_list.clear();
        self.survey_count = 0;
        self.min_nf = 0;
        self.survey_interference_factor = 0.0;
    }
}
