use std::fmt;

use serde::Deserialize;

/// The state of a single remote job, derived from one line of the cluster's
/// queue-status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Errored,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Errored => "errored",
        };
        write!(f, "{s}")
    }
}

/// The queue software running on a cluster. Command strings and status codes
/// differ between schedulers, so every server block in the input file names
/// its software.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSoft {
    /// Sun/Open Grid Engine (qstat/qsub/qdel)
    Sge,
    /// Slurm (squeue/sbatch/scancel)
    Slurm,
}

impl ClusterSoft {
    /// the command listing the user's jobs currently in the queue
    pub fn status_command(&self, user: &str) -> String {
        match self {
            ClusterSoft::Sge => format!("qstat -u {user}"),
            ClusterSoft::Slurm => format!("squeue -u {user}"),
        }
    }

    pub fn submit_command(&self) -> &'static str {
        match self {
            ClusterSoft::Sge => "qsub",
            ClusterSoft::Slurm => "sbatch",
        }
    }

    pub fn delete_command(&self, job_id: u64) -> String {
        match self {
            ClusterSoft::Sge => format!("qdel {job_id}"),
            ClusterSoft::Slurm => format!("scancel {job_id}"),
        }
    }

    /// index of the whitespace-delimited state field in a queue-status line.
    /// qstat reports `job-ID prior name user state ...` and squeue reports
    /// `JOBID PARTITION NAME USER ST ...`, so both land on field 4
    pub(crate) fn state_field(&self) -> usize {
        match self {
            ClusterSoft::Sge => 4,
            ClusterSoft::Slurm => 4,
        }
    }

    /// index of the job-name field in a queue-status line
    pub(crate) fn name_field(&self) -> usize {
        match self {
            ClusterSoft::Sge => 2,
            ClusterSoft::Slurm => 2,
        }
    }

    /// status codes reported for jobs that have not started yet
    fn queued_codes(&self) -> &'static [&'static str] {
        match self {
            ClusterSoft::Sge => &["qw", "hqw", "hRwq"],
            ClusterSoft::Slurm => &["PD", "CF", "S"],
        }
    }

    /// status codes reported for jobs the scheduler has flagged as failed
    /// while leaving them in the queue
    fn error_codes(&self) -> &'static [&'static str] {
        match self {
            ClusterSoft::Sge => &["e", "Eqw", "Ehqw", "EhRqw"],
            ClusterSoft::Slurm => &["F", "NF", "BF", "CA", "TO", "OOM"],
        }
    }
}

/// Determine the status of `job_id` from the output of
/// [`ClusterSoft::status_command`].
///
/// The leading whitespace-delimited field of each line must equal the decimal
/// form of `job_id` exactly; a query for 82682 matches neither 582682 nor
/// 5826820. The first matching line wins, since job ids are unique per queue
/// snapshot. A job absent from the queue has finished normally, so the
/// fallback is [`JobStatus::Done`]. For jobs still in the queue, the state
/// code is checked against the scheduler's error and queued code sets; any
/// other code on a queued line means the job is running.
pub fn parse_job_status(
    soft: ClusterSoft,
    job_id: u64,
    stdout: &str,
) -> JobStatus {
    let id = job_id.to_string();
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.first() != Some(&id.as_str()) {
            continue;
        }
        let Some(&code) = fields.get(soft.state_field()) else {
            // a truncated line for our id still means the job is in the queue
            return JobStatus::Running;
        };
        if soft.error_codes().contains(&code) {
            return JobStatus::Errored;
        }
        if soft.queued_codes().contains(&code) {
            return JobStatus::Queued;
        }
        return JobStatus::Running;
    }
    JobStatus::Done
}

#[cfg(test)]
mod tests {
    use super::*;

    const QSTAT: &str = "\
job-ID  prior   name       user         state submit/start at     queue                          slots ja-task-ID
-----------------------------------------------------------------------------------------------------------------
 582682 0.45451 a9654      alongd       e     04/17/2019 16:22:14 long5@node93.cluster              48
 588334 0.45451 pf1005a    alongd       r     05/07/2019 16:24:31 long3@node67.cluster              48
 588345 0.45451 a14121     alongd       r     05/08/2019 02:11:42 long3@node69.cluster              48    ";

    #[test]
    fn test_status_in_stdout() {
        let got = parse_job_status(ClusterSoft::Sge, 588345, QSTAT);
        assert_eq!(got, JobStatus::Running);
        let got = parse_job_status(ClusterSoft::Sge, 582682, QSTAT);
        assert_eq!(got, JobStatus::Errored);
        let got = parse_job_status(ClusterSoft::Sge, 582600, QSTAT);
        assert_eq!(got, JobStatus::Done);
    }

    /// the id field must match exactly, not as a substring
    #[test]
    fn test_exact_id_match() {
        let got = parse_job_status(ClusterSoft::Sge, 82682, QSTAT);
        assert_eq!(got, JobStatus::Done);
        let got = parse_job_status(ClusterSoft::Sge, 5826820, QSTAT);
        assert_eq!(got, JobStatus::Done);
    }

    #[test]
    fn test_queued_code() {
        let stdout = "\
 600001 0.00000 a600001    alongd       qw    05/09/2019 08:00:00                                   48
 600002 0.00000 a600002    alongd       Eqw   05/09/2019 08:00:00                                   48";
        let got = parse_job_status(ClusterSoft::Sge, 600001, stdout);
        assert_eq!(got, JobStatus::Queued);
        let got = parse_job_status(ClusterSoft::Sge, 600002, stdout);
        assert_eq!(got, JobStatus::Errored);
    }

    #[test]
    fn test_slurm_codes() {
        let stdout = "\
             JOBID PARTITION     NAME     USER ST       TIME  NODES NODELIST(REASON)
            433001     batch a_propen   alongd  R    2:05:12      1 node044
            433002     batch a_butano   alongd PD       0:00      1 (Priority)
            433003     batch a_pentan   alongd  F       0:00      1 (NonZeroExitCode)";
        let got = parse_job_status(ClusterSoft::Slurm, 433001, stdout);
        assert_eq!(got, JobStatus::Running);
        let got = parse_job_status(ClusterSoft::Slurm, 433002, stdout);
        assert_eq!(got, JobStatus::Queued);
        let got = parse_job_status(ClusterSoft::Slurm, 433003, stdout);
        assert_eq!(got, JobStatus::Errored);
        let got = parse_job_status(ClusterSoft::Slurm, 433004, stdout);
        assert_eq!(got, JobStatus::Done);
    }

    /// an unrecognized state code on a line still in the queue counts as
    /// running, not as an error
    #[test]
    fn test_unknown_code_is_running() {
        let stdout =
            " 612000 0.51000 a612000    alongd       t     05/10/2019 12:00:00";
        let got = parse_job_status(ClusterSoft::Sge, 612000, stdout);
        assert_eq!(got, JobStatus::Running);
    }
}
