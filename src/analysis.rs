use crate::config::Config;
use crate::model::{Frame, SirState};
use crate::stats::{Accumulator, TimeSeries};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::Serialize;
use serde_value::Value;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, frame: &Frame) -> Result<()>;
    fn report(&self) -> Result<Value>;
}

fn tagged_report<T: Serialize>(name: &str, report: &T) -> Result<Value> {
    let mut map = BTreeMap::new();
    map.insert(
        Value::String(name.to_string()),
        serde_value::to_value(report).context("failed to build report value")?,
    );
    Ok(Value::Map(map))
}

const SIR_STATES: [SirState; 3] = [
    SirState::Susceptible,
    SirState::Infectious,
    SirState::Recovered,
];

/// Population fraction in each SIR state, accumulated over frames.
pub struct SirFractions {
    acc_vec: Vec<Accumulator>,
}

impl SirFractions {
    pub fn new() -> Self {
        let mut acc_vec = Vec::new();
        acc_vec.resize_with(SIR_STATES.len(), Accumulator::new);
        Self { acc_vec }
    }
}

impl Obs for SirFractions {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let n_wlk = frame.sir_vec.len();
        if n_wlk == 0 {
            return Ok(());
        }

        for (acc, state) in self.acc_vec.iter_mut().zip(SIR_STATES) {
            let count = frame.sir_vec.iter().filter(|&&sir| sir == state).count();
            acc.add(count as f64 / n_wlk as f64);
        }
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        let reports: Vec<_> = self.acc_vec.iter().map(|acc| acc.report()).collect();
        tagged_report("sir_fractions", &reports)
    }
}

/// Infectious count over time (the epidemic curve).
pub struct Prevalence {
    time_series: TimeSeries,
}

impl Prevalence {
    pub fn new() -> Self {
        Self {
            time_series: TimeSeries::new(),
        }
    }
}

impl Obs for Prevalence {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        self.time_series.push(frame.n_inf as f64);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        tagged_report("prevalence", &self.time_series.report())
    }
}

/// Population-mean degree of infection, accumulated over frames.
pub struct MeanDeg {
    acc: Accumulator,
}

impl MeanDeg {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for MeanDeg {
    fn update(&mut self, frame: &Frame) -> Result<()> {
        let n_wlk = frame.deg_vec.len();
        if n_wlk == 0 {
            return Ok(());
        }

        let deg_sum: f64 = frame.deg_vec.iter().sum();
        self.acc.add(deg_sum / n_wlk as f64);
        Ok(())
    }

    fn report(&self) -> Result<Value> {
        tagged_report("mean_deg", &self.acc.report())
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let mut obs_ptr_vec: Vec<Box<dyn Obs>> = Vec::new();
        obs_ptr_vec.push(Box::new(SirFractions::new()));
        obs_ptr_vec.push(Box::new(Prevalence::new()));
        obs_ptr_vec.push(Box::new(MeanDeg::new()));
        Self { cfg, obs_ptr_vec }
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.saves_per_file {
            let frame: Frame = decode::from_read(&mut reader).context("failed to read frame")?;
            for obs in &mut self.obs_ptr_vec {
                obs.update(&frame).context("failed to update observable")?;
            }
        }
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let mut reports = Vec::new();
        if let Some(label) = &self.cfg.output.label {
            reports.push(tagged_report("label", label)?);
        }
        for obs in &self.obs_ptr_vec {
            reports.push(obs.report().context("failed to report observable")?);
        }

        encode::write(&mut writer, &reports).context("failed to serialize reports")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
