use crate::fixed::{clamp_i8, clamp_u8};

/// Quantized output of one season phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseResult {
    pub rainfall: Vec<u8>,
    pub humidity: Vec<u8>,
    pub wind_u: Vec<i8>,
    pub wind_v: Vec<i8>,
    pub current_u: Vec<i8>,
    pub current_v: Vec<i8>,
}

/// Seasonal means and half-ranges across all phases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeasonalSummary {
    pub rainfall: Vec<u8>,
    pub humidity: Vec<u8>,
    pub rainfall_amplitude: Vec<u8>,
    pub humidity_amplitude: Vec<u8>,
    pub wind_u: Vec<i8>,
    pub wind_v: Vec<i8>,
    pub current_u: Vec<i8>,
    pub current_v: Vec<i8>,
}

/// Running sum and range of one byte channel.
#[derive(Clone, Debug)]
struct Channel {
    sum: Vec<u32>,
    min: Vec<u8>,
    max: Vec<u8>,
}

impl Channel {
    fn new(size: usize) -> Self {
        Self {
            sum: vec![0; size],
            min: vec![u8::MAX; size],
            max: vec![u8::MIN; size],
        }
    }

    fn absorb(&mut self, values: &[u8]) {
        for (i, &value) in values.iter().enumerate() {
            self.sum[i] += u32::from(value);
            self.min[i] = self.min[i].min(value);
            self.max[i] = self.max[i].max(value);
        }
    }

    fn mean(&self, count: u32) -> Vec<u8> {
        self.sum
            .iter()
            .map(|&s| clamp_u8(f64::from(s) / f64::from(count)))
            .collect()
    }

    fn amplitude(&self) -> Vec<u8> {
        self.min
            .iter()
            .zip(&self.max)
            .map(|(&lo, &hi)| clamp_u8(f64::from(hi.saturating_sub(lo)) / 2.0))
            .collect()
    }
}

fn absorb_signed(sum: &mut [i32], values: &[i8]) {
    for (slot, &value) in sum.iter_mut().zip(values) {
        *slot += i32::from(value);
    }
}

fn mean_signed(sum: &[i32], count: u32) -> Vec<i8> {
    sum.iter()
        .map(|&s| clamp_i8(f64::from(s) / f64::from(count)))
        .collect()
}

/// Accumulator for the seasonal fold. Absorbing phases only adds, takes
/// minima and takes maxima, so the summary does not depend on phase order.
#[derive(Clone, Debug)]
struct Accumulator {
    count: u32,
    rainfall: Channel,
    humidity: Channel,
    wind_u: Vec<i32>,
    wind_v: Vec<i32>,
    current_u: Vec<i32>,
    current_v: Vec<i32>,
}

impl Accumulator {
    fn new(size: usize) -> Self {
        Self {
            count: 0,
            rainfall: Channel::new(size),
            humidity: Channel::new(size),
            wind_u: vec![0; size],
            wind_v: vec![0; size],
            current_u: vec![0; size],
            current_v: vec![0; size],
        }
    }

    fn absorb(mut self, phase: &PhaseResult) -> Self {
        self.count += 1;
        self.rainfall.absorb(&phase.rainfall);
        self.humidity.absorb(&phase.humidity);
        absorb_signed(&mut self.wind_u, &phase.wind_u);
        absorb_signed(&mut self.wind_v, &phase.wind_v);
        absorb_signed(&mut self.current_u, &phase.current_u);
        absorb_signed(&mut self.current_v, &phase.current_v);
        self
    }

    fn finish(self, size: usize) -> SeasonalSummary {
        if self.count == 0 {
            return SeasonalSummary {
                rainfall: vec![0; size],
                humidity: vec![0; size],
                rainfall_amplitude: vec![0; size],
                humidity_amplitude: vec![0; size],
                wind_u: vec![0; size],
                wind_v: vec![0; size],
                current_u: vec![0; size],
                current_v: vec![0; size],
            };
        }
        SeasonalSummary {
            rainfall: self.rainfall.mean(self.count),
            humidity: self.humidity.mean(self.count),
            rainfall_amplitude: self.rainfall.amplitude(),
            humidity_amplitude: self.humidity.amplitude(),
            wind_u: mean_signed(&self.wind_u, self.count),
            wind_v: mean_signed(&self.wind_v, self.count),
            current_u: mean_signed(&self.current_u, self.count),
            current_v: mean_signed(&self.current_v, self.count),
        }
    }
}

/// Fold the phase results into seasonal means and amplitudes
/// (`round((max - min) / 2)`), clamped into their storage domains.
pub fn summarize(phases: &[PhaseResult], size: usize) -> SeasonalSummary {
    phases
        .iter()
        .fold(Accumulator::new(size), Accumulator::absorb)
        .finish(size)
}
