use serde::{Deserialize, Serialize};

/// Discrete epidemiological state of a walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SirState {
    Susceptible,
    Infectious,
    Recovered,
}

impl SirState {
    /// Classify a degree of infection.
    ///
    /// Requires `tau_inf < tau_rec` (validated on the configuration); the
    /// order of the checks matters at the window boundaries.
    pub fn from_deg(deg: f64, tau_inf: f64, tau_rec: f64) -> Self {
        if deg <= 0.0 {
            Self::Susceptible
        } else if (1.0 - tau_inf / tau_rec) <= deg && deg <= 1.0 {
            Self::Infectious
        } else {
            Self::Recovered
        }
    }
}

/// Random walker carrying its full position and infection history.
///
/// All three histories are seeded at construction, grow by exactly one entry
/// per time step, and are never empty.
#[derive(Serialize, Deserialize)]
pub struct Walker {
    pos_hist: Vec<(i32, i32)>,

    deg_hist: Vec<f64>,

    sir_hist: Vec<SirState>,
}

impl Walker {
    pub fn new(x: i32, y: i32, deg: f64, tau_inf: f64, tau_rec: f64) -> Self {
        Self {
            pos_hist: vec![(x, y)],
            deg_hist: vec![deg],
            sir_hist: vec![SirState::from_deg(deg, tau_inf, tau_rec)],
        }
    }

    pub fn pos(&self) -> (i32, i32) {
        self.pos_hist[self.pos_hist.len() - 1]
    }

    pub fn deg(&self) -> f64 {
        self.deg_hist[self.deg_hist.len() - 1]
    }

    pub fn sir(&self) -> SirState {
        self.sir_hist[self.sir_hist.len() - 1]
    }

    pub fn pos_hist(&self) -> &[(i32, i32)] {
        &self.pos_hist
    }

    pub fn deg_hist(&self) -> &[f64] {
        &self.deg_hist
    }

    pub fn sir_hist(&self) -> &[SirState] {
        &self.sir_hist
    }

    /// Move by `(dx, dy)`, folding any boundary overshoot back inside.
    pub fn update_pos(&mut self, dx: i32, dy: i32, half_width: i32) {
        let (x, y) = self.pos();
        let x_new = x + dx;
        let y_new = y + dy;
        if x_new.abs() <= half_width && y_new.abs() <= half_width {
            self.pos_hist.push((x_new, y_new));
        } else {
            // Single-bounce reflection by the excess; only valid while the
            // step radius stays well below the half width.
            self.pos_hist
                .push((reflect(x_new, half_width), reflect(y_new, half_width)));
        }
    }

    /// Let the infection decay by `change` and append the derived state.
    pub fn change_deg(&mut self, change: f64, tau_inf: f64, tau_rec: f64) {
        let deg = self.deg() - change;
        self.deg_hist.push(deg);
        self.sir_hist.push(SirState::from_deg(deg, tau_inf, tau_rec));
    }

    /// Reset the degree of infection to 1.0 and append the derived state.
    pub fn become_infected(&mut self, tau_inf: f64, tau_rec: f64) {
        self.deg_hist.push(1.0);
        self.sir_hist
            .push(SirState::from_deg(1.0, tau_inf, tau_rec));
    }
}

// Coordinates within the boundary map to themselves.
fn reflect(coord: i32, half_width: i32) -> i32 {
    (half_width - (half_width - coord.abs()).abs()) * coord.signum()
}

#[derive(Serialize, Deserialize)]
pub struct State {
    pub wlk_vec: Vec<Walker>,

    pub n_inf_hist: Vec<usize>,

    pub new_inf_hist: Vec<usize>,
}

impl State {
    /// Snapshot of the population at the current time step.
    pub fn frame(&self) -> Frame {
        Frame {
            step: self.n_inf_hist.len() - 1,
            pos_vec: self.wlk_vec.iter().map(Walker::pos).collect(),
            deg_vec: self.wlk_vec.iter().map(Walker::deg).collect(),
            sir_vec: self.wlk_vec.iter().map(Walker::sir).collect(),
            n_inf: self.n_inf_hist[self.n_inf_hist.len() - 1],
            new_inf: self.new_inf_hist[self.new_inf_hist.len() - 1],
        }
    }
}

/// Per-save trajectory record consumed by the analysis layer.
#[derive(Serialize, Deserialize)]
pub struct Frame {
    pub step: usize,

    pub pos_vec: Vec<(i32, i32)>,

    pub deg_vec: Vec<f64>,

    pub sir_vec: Vec<SirState>,

    pub n_inf: usize,

    pub new_inf: usize,
}
