use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wifi_acs::channel::ChannelRecord;
use wifi_acs::config::IfaceConfig;
use wifi_acs::engine::AcsEngine;
use wifi_acs::iface::Interface;
use wifi_acs::status::{AcsState, ChanStatus};
use wifi_acs::survey::SurveyMeasurement;
use wifi_acs::traits::{BringUp, ScanParams, WifiDriver, DRV_OFFCHANNEL_TX};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a simulated survey-driven channel selection")]
struct Args {
    /// Number of full survey passes
    #[arg(long, default_value_t = 3)]
    passes: u32,

    /// Off-channel dwell per channel in milliseconds
    #[arg(long, default_value_t = 50)]
    dwell_ms: u32,

    /// 2.4 GHz channels to consider
    #[arg(long, value_delimiter = ',', default_value = "1,6,11")]
    channels: Vec<u8>,
}

/// Simulated radio: answers dwell requests immediately and synthesises a
/// fixed busy profile per channel so a full selection can run without
/// hardware. Shared with the event pump below, the way a real driver and
/// its event source share the device.
#[derive(Default)]
struct SimRadio {
    pending_roc: VecDeque<(u32, u32)>,
    scan_pending: bool,
}

#[derive(Clone)]
struct SimDriver(Rc<RefCell<SimRadio>>);

impl SimDriver {
    /// Deterministic per-channel air profile.
    fn synth_survey(freq: u32) -> SurveyMeasurement {
        let chan = (freq - 2407) / 5;
        SurveyMeasurement {
            channel_time: 10_000,
            channel_time_busy: u64::from(chan * 731 % 9000),
            channel_time_tx: 0,
            nf: -95 + (chan % 5) as i8,
        }
    }
}

impl WifiDriver for SimDriver {
    fn flags(&self) -> u32 {
        DRV_OFFCHANNEL_TX
    }

    fn scan(&mut self, _params: &ScanParams) -> Result<()> {
        self.0.borrow_mut().scan_pending = true;
        Ok(())
    }

    fn remain_on_channel(&mut self, freq: u32, duration_ms: u32) -> Result<()> {
        self.0.borrow_mut().pending_roc.push_back((freq, duration_ms));
        Ok(())
    }

    fn survey_freq(&mut self, freq: u32) -> Result<Vec<SurveyMeasurement>> {
        Ok(vec![Self::synth_survey(freq)])
    }
}

struct LoggingBringUp;

impl BringUp for LoggingBringUp {
    fn acs_completed(&mut self, iface: &Interface) -> ChanStatus {
        info!("bringing up the AP on channel {}", iface.conf.channel);
        ChanStatus::Valid
    }
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    let channels = args
        .channels
        .iter()
        .map(|&chan| ChannelRecord::new(chan, 2407 + 5 * u32::from(chan)))
        .collect();
    let conf = IfaceConfig {
        acs_num_req_surveys: args.passes,
        acs_roc_duration_ms: args.dwell_ms,
        channel: 0,
    };

    let radio = Rc::new(RefCell::new(SimRadio::default()));
    let mut engine = AcsEngine::new(
        SimDriver(radio.clone()),
        LoggingBringUp,
        Interface::new(channels, conf),
    );

    match engine.acs_init() {
        ChanStatus::Acs => {}
        other => bail!("channel selection refused to start: {:?}", other),
    }

    // Replay the radio's events in FIFO order until the engine terminates.
    while !engine.state().is_terminal() {
        let scan_done = {
            let mut r = radio.borrow_mut();
            std::mem::take(&mut r.scan_pending)
        };
        if scan_done {
            engine.notify_scan_complete();
            continue;
        }

        let Some((freq, duration)) = radio.borrow_mut().pending_roc.pop_front() else {
            break;
        };
        engine.notify_acs_roc(freq, duration, 0);
        engine.notify_acs_roc_cancel(freq, duration, 0);
    }

    match engine.state() {
        AcsState::Done => {
            println!("selected channel {}", engine.iface().conf.channel);
            Ok(())
        }
        state => bail!(
            "channel selection ended in {:?}: {}",
            state,
            engine
                .last_error()
                .map(ToString::to_string)
                .unwrap_or_else(|| "no error recorded".into())
        ),
    }
}
