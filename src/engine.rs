use crate::config::Config;
use crate::model::{SirState, State, Walker};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::{Bernoulli, Uniform};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation engine.
///
/// Holds the configuration, current state, and random number generator,
/// and provides methods to initialize, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    state: State,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with the given configuration and a random initial state.
    ///
    /// Walker positions are drawn uniformly on the lattice. The first
    /// `n_wlk - n_inf` walkers (in construction order) start at degree 0
    /// (Susceptible) and the remaining `n_inf` at degree 1.0 (Infectious).
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let mut rng = match cfg.init.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let half_width = cfg.model.half_width;
        let pos_dist = Uniform::new_inclusive(-half_width, half_width)?;

        let mut wlk_vec = Vec::with_capacity(cfg.init.n_wlk);
        for i_wlk in 0..cfg.init.n_wlk {
            let x = pos_dist.sample(&mut rng);
            let y = pos_dist.sample(&mut rng);
            // Integer division; the divisor is positive because the config
            // requires `n_inf < n_wlk`.
            let deg = (i_wlk / (cfg.init.n_wlk - cfg.init.n_inf)) as f64;
            wlk_vec.push(Walker::new(x, y, deg, cfg.model.tau_inf, cfg.model.tau_rec));
        }

        let n_inf_init = wlk_vec
            .iter()
            .filter(|wlk| wlk.sir() == SirState::Infectious)
            .count();

        // No walker is newly infected at initialization.
        let state = State {
            wlk_vec,
            n_inf_hist: vec![n_inf_init],
            new_inf_hist: vec![0],
        };

        Ok(Self { cfg, state, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Perform the simulation and save the resulting frames to a binary file.
    pub fn perform_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        for i_save in 0..self.cfg.output.saves_per_file {
            for _ in 0..self.cfg.output.steps_per_save {
                self.perform_step().context("failed to perform step")?;
            }

            encode::write(&mut writer, &self.state.frame()).context("failed to serialize frame")?;

            let progress = 100.0 * (i_save + 1) as f64 / self.cfg.output.saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later; the random stream
    /// continues exactly where it left off.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    /// Advance the simulation by one time step.
    ///
    /// Randomness is consumed in a fixed order: two displacement draws per
    /// walker in population order, then one transmission trial per
    /// susceptible walker, cells and walkers both in insertion order.
    pub fn perform_step(&mut self) -> Result<()> {
        // Move every walker.
        self.move_walkers().context("failed to move walkers")?;

        // Group walkers by the cell they landed on.
        let cell_map = self.group_by_cell();

        // Apply the transmission and progression laws within each cell.
        self.update_infections(&cell_map)
            .context("failed to update infections")?;

        Ok(())
    }

    fn move_walkers(&mut self) -> Result<()> {
        let max_step = self.cfg.model.max_step;
        let move_dist = Uniform::new_inclusive(-max_step, max_step)?;

        for wlk in &mut self.state.wlk_vec {
            let dx = move_dist.sample(&mut self.rng);
            let dy = move_dist.sample(&mut self.rng);
            wlk.update_pos(dx, dy, self.cfg.model.half_width);
        }

        Ok(())
    }

    fn group_by_cell(&self) -> IndexMap<(i32, i32), Vec<usize>> {
        let mut cell_map: IndexMap<(i32, i32), Vec<usize>> = IndexMap::new();
        for (i_wlk, wlk) in self.state.wlk_vec.iter().enumerate() {
            cell_map.entry(wlk.pos()).or_default().push(i_wlk);
        }
        cell_map
    }

    fn update_infections(&mut self, cell_map: &IndexMap<(i32, i32), Vec<usize>>) -> Result<()> {
        let tau_inf = self.cfg.model.tau_inf;
        let tau_rec = self.cfg.model.tau_rec;
        let deg_change = 1.0 / tau_inf;

        let mut n_inf = 0;
        let mut new_inf = 0;

        for i_wlk_cell in cell_map.values() {
            // Partition the cell by current state; infectious and recovered
            // walkers decay regardless of what else the cell holds.
            let mut i_wlk_sus = Vec::new();
            let mut n_inf_cell: i32 = 0;
            for &i_wlk in i_wlk_cell {
                match self.state.wlk_vec[i_wlk].sir() {
                    SirState::Susceptible => i_wlk_sus.push(i_wlk),
                    SirState::Infectious => {
                        n_inf_cell += 1;
                        self.state.wlk_vec[i_wlk].change_deg(deg_change, tau_inf, tau_rec);
                    }
                    SirState::Recovered => {
                        self.state.wlk_vec[i_wlk].change_deg(deg_change, tau_inf, tau_rec);
                    }
                }
            }
            n_inf += n_inf_cell as usize;

            if n_inf_cell == 0 {
                // No infectious neighbor: the transmission probability is
                // exactly zero and no trial is drawn.
                for &i_wlk in &i_wlk_sus {
                    self.state.wlk_vec[i_wlk].change_deg(deg_change, tau_inf, tau_rec);
                }
                continue;
            }

            // Each infectious walker in the cell independently transmits
            // with probability `prob_trans`.
            let prob = 1.0 - (1.0 - self.cfg.model.prob_trans).powi(n_inf_cell);
            let trans_dist = Bernoulli::new(prob)?;
            for &i_wlk in &i_wlk_sus {
                if trans_dist.sample(&mut self.rng) {
                    self.state.wlk_vec[i_wlk].become_infected(tau_inf, tau_rec);
                    new_inf += 1;
                } else {
                    self.state.wlk_vec[i_wlk].change_deg(deg_change, tau_inf, tau_rec);
                }
            }
        }

        self.state.n_inf_hist.push(n_inf);
        self.state.new_inf_hist.push(new_inf);

        Ok(())
    }
}
