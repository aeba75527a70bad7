use std::fmt;

use crate::queue::JobStatus;

/// every qcflow job name on a cluster starts with this, so stray jobs from an
/// aborted run can be found and deleted in bulk
pub const NAME_PREFIX: &str = "a_";

/// The calculation types a species walks through. The order of the sequence
/// is decided by [`crate::scheduler::sequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    /// refined conformer search after force-field filtering
    Conformer,
    /// a composite protocol standing in for opt+sp
    Composite,
    /// geometry optimization
    Opt,
    /// optimization refined on a fine integration grid
    Fine,
    /// harmonic frequencies
    Freq,
    /// single point energy
    Sp,
    /// hindered rotor scan
    Scan,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            JobType::Conformer => "conformer",
            JobType::Composite => "composite",
            JobType::Opt => "opt",
            JobType::Fine => "fine",
            JobType::Freq => "freq",
            JobType::Sp => "sp",
            JobType::Scan => "scan",
        };
        write!(f, "{s}")
    }
}

/// One remote calculation for one species.
#[derive(Debug, Clone)]
pub struct Job {
    /// label of the species this job belongs to
    pub species: String,
    pub job_type: JobType,
    /// level of theory the job runs at
    pub level: String,
    /// scheduler-assigned id, set on submission
    pub job_id: u64,
    pub status: JobStatus,
    /// position in the species' job sequence
    pub index: usize,
}

impl Job {
    pub fn new(
        species: String,
        job_type: JobType,
        level: String,
        index: usize,
    ) -> Self {
        Self {
            species,
            job_type,
            level,
            job_id: 0,
            status: JobStatus::Queued,
            index,
        }
    }

    /// job name on the cluster, unique per species and job type
    pub fn name(&self) -> String {
        format!("{NAME_PREFIX}{}_{}", self.species, self.job_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_carries_the_prefix() {
        let job = Job::new(
            "propene".to_string(),
            JobType::Opt,
            "wb97x-d3/6-311+g(3df,2p)".to_string(),
            0,
        );
        assert_eq!(job.name(), "a_propene_opt");
        assert!(job.name().starts_with(NAME_PREFIX));
    }
}
