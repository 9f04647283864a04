use log::debug;

use crate::channel::ChannelRecord;
use crate::iface::Interface;
use crate::survey::SurveyMeasurement;

/// Interference factor of a single survey against the reference noise
/// floor `nf_ref` (the quietest `min_nf` across all surveyed channels):
///
///   log2( (busy - tx) / (time - tx) * 2^(nf - nf_ref) )
///
/// Higher busy fraction and a noisier local floor both raise the factor.
/// The caller guarantees `time > tx` (see `SurveyMeasurement::is_valid`).
pub fn survey_interference_factor(survey: &SurveyMeasurement, nf_ref: i8) -> f64 {
    let busy = (survey.channel_time_busy - survey.channel_time_tx) as f64;
    let active = (survey.channel_time - survey.channel_time_tx) as f64;
    let nf_delta = f64::from(i32::from(survey.nf) - i32::from(nf_ref));
    (busy / active * nf_delta.exp2()).log2()
}

/// Average interference factor over the channel's surveys. Stored on the
/// record and returned.
pub fn chan_interference_factor(chan: &mut ChannelRecord, nf_ref: i8) -> f64 {
    let mut sum = 0.0;
    for (i, survey) in chan.survey_list.iter().enumerate() {
        let factor = survey_interference_factor(survey, nf_ref);
        debug!(
            "\tsurvey_id: {}\tchan_min_nf: {}\tsurvey_interference_factor: {}",
            i + 1,
            chan.min_nf,
            factor
        );
        sum += factor;
    }
    chan.survey_interference_factor = sum / f64::from(chan.survey_count);
    chan.survey_interference_factor
}

/// Usable for selection: the channel has survey data and is not disabled.
pub fn usable_chan(chan: &ChannelRecord) -> bool {
    chan.survey_count > 0 && !chan.survey_list.is_empty() && !chan.is_disabled()
}

/// Index of the usable channel with the lowest average interference
/// factor, or None when no channel is usable. Strict comparison, so the
/// first-seen minimum wins ties.
pub fn find_ideal_chan(iface: &mut Interface) -> Option<usize> {
    let nf_ref = iface.lowest_nf;
    let mut ideal: Option<(usize, f64)> = None;

    for idx in 0..iface.channels.len() {
        if !usable_chan(&iface.channels[idx]) {
            continue;
        }

        debug!(
            "survey analysis for channel {} ({} MHz)",
            iface.channels[idx].chan, iface.channels[idx].freq
        );
        let factor = chan_interference_factor(&mut iface.channels[idx], nf_ref);
        debug!("\tchannel survey interference factor average: {}", factor);

        match ideal {
            Some((_, best)) if factor >= best => {}
            _ => ideal = Some((idx, factor)),
        }
    }

    ideal.map(|(idx, _)| idx)
}
