use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{thread, time};

use log::{info, warn};

use crate::config::{Config, Server};
use crate::errors::{Error, Result};
use crate::job::{Job, JobType};
use crate::level::Levels;
use crate::queue::{ClusterSoft, JobStatus};
use crate::species::Species;
use crate::ssh::SshClient;

/// The job sequence every species walks through, built once from the
/// resolved levels. Calculation types without a level are skipped; a
/// composite method replaces the opt and sp steps; `fine` repeats the
/// optimization on a fine integration grid.
pub fn sequence(levels: &Levels, fine: bool) -> Vec<(JobType, String)> {
    let mut seq = Vec::new();
    if let Some(l) = &levels.conformer {
        seq.push((JobType::Conformer, l.clone()));
    }
    if let Some(c) = &levels.composite {
        seq.push((JobType::Composite, c.clone()));
    } else if let Some(l) = &levels.opt {
        seq.push((JobType::Opt, l.clone()));
        if fine {
            seq.push((JobType::Fine, l.clone()));
        }
    }
    if let Some(l) = &levels.freq {
        seq.push((JobType::Freq, l.clone()));
    }
    if levels.composite.is_none() {
        if let Some(l) = &levels.sp {
            seq.push((JobType::Sp, l.clone()));
        }
    }
    if let Some(l) = &levels.scan {
        seq.push((JobType::Scan, l.clone()));
    }
    seq
}

/// Owns the species list and the job lifecycle: submits each species' jobs in
/// sequence, polls the queue, and records per-species outcomes.
pub struct Scheduler<'a> {
    conf: &'a Config,
    server: &'a Server,
    levels: &'a Levels,
    ssh: SshClient,
    /// local directory input copies and retrieved outputs land in
    output_dir: PathBuf,
    /// per-species result: "converged" or a message naming the failed job
    pub output: HashMap<String, String>,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        conf: &'a Config,
        levels: &'a Levels,
        ssh: SshClient,
        output_dir: &Path,
    ) -> Self {
        let server = &conf.servers[&conf.server];
        Self {
            conf,
            server,
            levels,
            ssh,
            output_dir: output_dir.to_path_buf(),
            output: HashMap::new(),
        }
    }

    /// Drive every species through its job sequence. Blocks until all
    /// sequences have converged or errored.
    pub fn run(&mut self) -> Result<()> {
        let seq = sequence(self.levels, self.conf.fine);
        if seq.is_empty() {
            return Err(Error::Input(String::from(
                "no calculation types are enabled",
            )));
        }
        let mut cur_jobs = Vec::new();
        for species in &self.conf.species {
            let (job_type, level) = seq[0].clone();
            let mut job = Job::new(species.label.clone(), job_type, level, 0);
            self.submit(&mut job)?;
            cur_jobs.push(job);
        }
        loop {
            let mut finished = 0;
            let mut still_active = Vec::new();
            for mut job in cur_jobs {
                let status = self.ssh.check_job_status(job.job_id)?;
                match status {
                    JobStatus::Done => {
                        finished += 1;
                        info!("{} (job {}) finished", job.name(), job.job_id);
                        self.retrieve_output(&job);
                        if job.index + 1 < seq.len() {
                            let (job_type, level) = seq[job.index + 1].clone();
                            let mut next = Job::new(
                                job.species.clone(),
                                job_type,
                                level,
                                job.index + 1,
                            );
                            self.submit(&mut next)?;
                            still_active.push(next);
                        } else {
                            self.output.insert(
                                job.species.clone(),
                                String::from("converged"),
                            );
                        }
                    }
                    JobStatus::Errored => {
                        warn!(
                            "{} (job {}) errored on {}",
                            job.name(),
                            job.job_id,
                            self.conf.server
                        );
                        // clear the errored entry out of the queue
                        self.ssh.delete_job(job.job_id)?;
                        self.output.insert(
                            job.species.clone(),
                            format!(
                                "{} job errored on {}",
                                job.job_type, self.conf.server
                            ),
                        );
                    }
                    JobStatus::Running | JobStatus::Queued => {
                        job.status = status;
                        still_active.push(job);
                    }
                }
            }
            cur_jobs = still_active;
            if cur_jobs.is_empty() {
                return Ok(());
            }
            if finished == 0 {
                info!("{} jobs remaining", cur_jobs.len());
                thread::sleep(time::Duration::from_secs(
                    self.conf.sleep_int as u64,
                ));
            }
        }
    }

    fn remote_dir(&self, job: &Job) -> String {
        format!(
            "{}/{}/{}",
            self.server.work_dir,
            self.conf.project,
            job.name()
        )
    }

    /// Write the job's control file and submit script, upload both, and
    /// submit. Local copies stay in the project directory.
    fn submit(&self, job: &mut Job) -> Result<()> {
        let species = self
            .conf
            .species
            .iter()
            .find(|s| s.label == job.species)
            .ok_or_else(|| {
                Error::Input(format!("unknown species '{}'", job.species))
            })?;
        let dir = self.remote_dir(job);
        self.ssh.send_command(&format!("mkdir -p {dir}"))?;

        let name = job.name();
        let input = job_input(species, job);
        let local_input = self.output_dir.join(format!("{name}.inp"));
        std::fs::write(&local_input, &input)?;
        self.ssh.upload_file(&local_input, &format!("{dir}/{name}.inp"))?;

        let script = submit_script(self.server, job);
        let local_script = self.output_dir.join(format!("{name}.sh"));
        std::fs::write(&local_script, &script)?;
        self.ssh
            .upload_file(&local_script, &format!("{dir}/{name}.sh"))?;

        job.job_id = self.ssh.submit_job(&dir, &format!("{name}.sh"))?;
        job.status = JobStatus::Queued;
        info!("submitted {name} as job {} at {}", job.job_id, job.level);
        Ok(())
    }

    /// Pull the finished job's output file down for post-processing. A
    /// missing output file is worth a warning but should not kill the run.
    fn retrieve_output(&self, job: &Job) {
        let name = job.name();
        let remote = format!("{}/{name}.out", self.remote_dir(job));
        let local = self.output_dir.join(format!("{name}.out"));
        if let Err(e) = self.ssh.download_file(&remote, &local) {
            warn!("failed to retrieve output for {name}: {e}");
        }
    }
}

/// The control file handed to the server's qc command. The wrapper on the
/// server translates it into real program input; the quantum chemistry
/// itself stays opaque here.
fn job_input(species: &Species, job: &Job) -> String {
    format!(
        "job_type = {}
level = {}
charge = {}
multiplicity = {}

{}
",
        job.job_type,
        job.level,
        species.charge,
        species.multiplicity,
        species.geometry.trim()
    )
}

fn submit_script(server: &Server, job: &Job) -> String {
    let name = job.name();
    let qc = &server.qc_command;
    match server.cluster_soft {
        ClusterSoft::Slurm => format!(
            "#!/bin/bash
#SBATCH --job-name={name}
#SBATCH --ntasks=1
#SBATCH -o {name}.out
#SBATCH --no-requeue
{qc} {name}.inp
"
        ),
        ClusterSoft::Sge => format!(
            "#!/bin/bash
#$ -N {name}
#$ -cwd
#$ -o {name}.out
#$ -j y
{qc} {name}.inp
"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::defaults;

    fn levels() -> Levels {
        Levels {
            conformer: Some(defaults::CONFORMER.to_string()),
            opt: Some(defaults::OPT.to_string()),
            freq: Some(defaults::FREQ.to_string()),
            sp: Some(defaults::SP.to_string()),
            scan: Some(defaults::SCAN.to_string()),
            composite: None,
            model_chemistry: Some(defaults::SP.to_string()),
        }
    }

    #[test]
    fn test_full_sequence() {
        let got: Vec<JobType> =
            sequence(&levels(), true).into_iter().map(|(t, _)| t).collect();
        let want = vec![
            JobType::Conformer,
            JobType::Opt,
            JobType::Fine,
            JobType::Freq,
            JobType::Sp,
            JobType::Scan,
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_composite_replaces_opt_and_sp() {
        let levels = Levels {
            composite: Some("cbs-qb3".to_string()),
            opt: None,
            sp: None,
            conformer: None,
            scan: None,
            freq: Some(defaults::FREQ_FOR_COMPOSITE.to_string()),
            model_chemistry: Some("cbs-qb3".to_string()),
        };
        let got: Vec<JobType> =
            sequence(&levels, true).into_iter().map(|(t, _)| t).collect();
        assert_eq!(got, vec![JobType::Composite, JobType::Freq]);
    }

    #[test]
    fn test_no_fine_grid() {
        let got: Vec<JobType> =
            sequence(&levels(), false).into_iter().map(|(t, _)| t).collect();
        assert!(!got.contains(&JobType::Fine));
    }

    #[test]
    fn test_submit_scripts() {
        let job = Job::new(
            "propene".to_string(),
            JobType::Opt,
            defaults::OPT.to_string(),
            0,
        );
        let server = Server {
            address: "pharos.mit.edu".to_string(),
            user: "alongd".to_string(),
            key: "/home/alongd/.ssh/id_rsa".to_string(),
            cluster_soft: ClusterSoft::Sge,
            work_dir: "runs/qcflow".to_string(),
            qc_command: "qcwrap".to_string(),
        };
        let script = submit_script(&server, &job);
        assert!(script.contains("#$ -N a_propene_opt"));
        assert!(script.contains("qcwrap a_propene_opt.inp"));
        let server = Server {
            cluster_soft: ClusterSoft::Slurm,
            ..server
        };
        let script = submit_script(&server, &job);
        assert!(script.contains("#SBATCH --job-name=a_propene_opt"));
    }

    #[test]
    fn test_job_input_carries_the_geometry() {
        let species = Species {
            label: "h2".to_string(),
            geometry: "H 0.0 0.0 0.0\nH 0.0 0.0 0.74".to_string(),
            charge: 0,
            multiplicity: 1,
            is_ts: false,
        };
        let job = Job::new(
            "h2".to_string(),
            JobType::Sp,
            defaults::SP.to_string(),
            0,
        );
        let got = job_input(&species, &job);
        assert!(got.contains("job_type = sp"));
        assert!(got.contains("H 0.0 0.0 0.74"));
    }
}
