use crate::analysis::{Analyzer, RunSummary};
use crate::config::Config;
use crate::controller::{Checkpoint, Controller};
use crate::model::Status;
use crate::stats::StatsRecord;
use anyhow::{Context, Result, bail};
use glob::glob;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let rng = match self.cfg.init.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };
        let ctl = Controller::initialize(self.cfg.model.clone(), rng)
            .context("failed to initialize controller")?;

        self.run_segment(run_idx, 0, ctl)
    }

    pub fn resume_run(&self, run_idx: usize) -> Result<()> {
        let file_idx = self
            .count_trajectory_files(run_idx)
            .context("failed to count trajectory files")?;

        let checkpoint_file = self.checkpoint_file(run_idx);
        let ckpt: Checkpoint = read_file(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        if ckpt.cfg() != &self.cfg.model {
            bail!("checkpoint config differs from the current config");
        }
        let ctl = Controller::from_checkpoint(ckpt).context("failed to restore controller")?;
        log::info!("loaded {checkpoint_file:?}");

        self.run_segment(run_idx, file_idx, ctl)
    }

    fn run_segment(&self, run_idx: usize, file_idx: usize, mut ctl: Controller) -> Result<()> {
        let n_prev = if file_idx == 0 { 0 } else { ctl.history().len() };

        ctl.set_running(true);
        let ticks_per_file = self.cfg.output.ticks_per_file;
        for i_tick in 0..ticks_per_file {
            if self.cfg.output.stop_when_extinct && ctl.is_extinct() {
                log::info!("epidemic extinct at time {}", ctl.time());
                break;
            }
            if !ctl.tick() {
                break;
            }

            if (i_tick + 1) % (ticks_per_file / 10).max(1) == 0 {
                let progress = 100.0 * (i_tick + 1) as f64 / ticks_per_file as f64;
                log::info!(
                    "completed {progress:06.2}% (S {} I {} R {})",
                    ctl.count(Status::Susceptible),
                    ctl.count(Status::Infected),
                    ctl.count(Status::Recovered)
                );
            }
        }

        let trajectory_file = self.trajectory_file(run_idx, file_idx);
        write_file(&trajectory_file, &ctl.history()[n_prev..])
            .with_context(|| format!("failed to save {trajectory_file:?}"))?;
        log::info!("saved {trajectory_file:?}");

        let checkpoint_file = self.checkpoint_file(run_idx);
        write_file(&checkpoint_file, &ctl.checkpoint())
            .with_context(|| format!("failed to save {checkpoint_file:?}"))?;

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let mut analyzer = Analyzer::new();

        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let n_files = self
                .count_trajectory_files(run_idx)
                .context("failed to count trajectory files")?;

            let mut history = Vec::new();
            for file_idx in 0..n_files {
                let trajectory_file = self.trajectory_file(run_idx, file_idx);
                let records: Vec<StatsRecord> = read_file(&trajectory_file)
                    .with_context(|| format!("failed to load {trajectory_file:?}"))?;
                history.extend(records);
            }

            let summary = RunSummary::from_history(&history)
                .with_context(|| format!("failed to summarize run {run_idx}"))?;
            log::info!("run {run_idx}: {summary:?}");
            analyzer.add_run(&summary);

            write_file(self.results_file(run_idx), &summary).context("failed to save results")?;
        }

        let report = analyzer.report();
        log::info!("{report:#?}");
        write_file(self.sim_dir.join("results.msgpack"), &report)
            .context("failed to save results")?;

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let run_dir = self.run_dir(run_idx);
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        let results_file = self.sim_dir.join("results.msgpack");
        if results_file.exists() {
            fs::remove_file(&results_file)
                .with_context(|| format!("failed to remove {results_file:?}"))?;
        }

        Ok(())
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn count_trajectory_files(&self, run_idx: usize) -> Result<usize> {
        let pattern = self.run_dir(run_idx).join("trajectory-*.msgpack");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob trajectory files")?
            .filter_map(Result::ok)
            .count();
        Ok(count)
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn trajectory_file(&self, run_idx: usize, file_idx: usize) -> PathBuf {
        self.run_dir(run_idx)
            .join(format!("trajectory-{file_idx:04}.msgpack"))
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.msgpack")
    }
}

fn write_file<P: AsRef<Path>, T: Serialize + ?Sized>(file: P, value: &T) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);
    encode::write(&mut writer, value).context("failed to serialize value")?;
    writer.flush().context("failed to flush writer stream")?;
    Ok(())
}

fn read_file<P: AsRef<Path>, T: DeserializeOwned>(file: P) -> Result<T> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    let value = decode::from_read(&mut reader).context("failed to deserialize value")?;
    Ok(value)
}
