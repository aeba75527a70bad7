use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use log::{info, warn};

use crate::config::Config;
use crate::errors::Result;
use crate::level::Levels;
use crate::processor::Processor;
use crate::scheduler::Scheduler;
use crate::ssh::SshClient;

/// The top-level driver. Construction resolves the configuration and fails
/// fast on ambiguous input; [`Driver::execute`] does the remote work.
pub struct Driver {
    pub conf: Config,
    pub levels: Levels,
    output_dir: PathBuf,
    t0: Instant,
}

impl Driver {
    pub fn new(conf: Config) -> Result<Self> {
        let levels = Levels::resolve(&conf)?;
        if !conf.fine {
            warn!("not using a fine grid for geometry optimization jobs");
        }
        if !conf.scan_rotors {
            warn!(
                "not running rotor scans; geometries may keep uncorrected \
                 dihedral angles"
            );
        }
        let output_dir = PathBuf::from("Projects").join(&conf.project);
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            conf,
            levels,
            output_dir,
            t0: Instant::now(),
        })
    }

    /// Run the whole project: schedule every species' jobs, process the
    /// results, and write the summary. Returns the per-species status map.
    pub fn execute(&self) -> Result<HashMap<String, String>> {
        self.log_header();
        for species in &self.conf.species {
            info!("considering species: {}", species.label);
        }
        for rxn in &self.conf.reactions {
            info!("considering reaction: {}", rxn.label);
        }
        let server = &self.conf.servers[&self.conf.server];
        let ssh = SshClient::connect(&self.conf.server, server)?;
        let mut scheduler =
            Scheduler::new(&self.conf, &self.levels, ssh, &self.output_dir);
        scheduler.run()?;

        let summary = Processor::new(
            &self.conf.project,
            &scheduler.output,
            self.levels.model_chemistry.as_deref(),
            self.conf.use_bac,
        )
        .process();
        fs::write(self.output_dir.join("summary.txt"), &summary)?;

        self.log_summary(&scheduler.output);
        self.log_footer();
        Ok(scheduler.output)
    }

    fn log_summary(&self, output: &HashMap<String, String>) {
        info!("all jobs terminated. project summary:");
        let mut labels: Vec<_> = output.keys().collect();
        labels.sort();
        for label in labels {
            let status = &output[label];
            if status == "converged" {
                info!("species {label} converged successfully");
            } else {
                info!("species {label} failed with: {status}");
            }
        }
    }

    fn log_header(&self) {
        info!(
            "qcflow execution initiated at {}",
            Local::now().format("%a %b %e %T %Y")
        );
        info!("starting project {}", self.conf.project);
    }

    fn log_footer(&self) {
        let s = self.t0.elapsed().as_secs();
        let (h, m, s) = (s / 3600, (s % 3600) / 60, s % 60);
        info!("total execution time: {h:02}:{m:02}:{s:02}");
        info!(
            "qcflow execution terminated at {}",
            Local::now().format("%a %b %e %T %Y")
        );
    }
}
