use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::{Error, Result};
use crate::queue::ClusterSoft;
use crate::species::{self, Reaction, Species};

fn default_true() -> bool {
    true
}

fn default_sleep() -> usize {
    30
}

fn default_work_dir() -> String {
    String::from("runs/qcflow")
}

fn default_qc_command() -> String {
    String::from("qcwrap")
}

/// One `[servers.<name>]` block in the input file: a cluster reachable over
/// SSH with key-pair authentication.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    /// hostname to connect to; a `:port` suffix is honored, port 22 otherwise
    pub address: String,

    /// user name on the cluster
    pub user: String,

    /// path to the local private key used for authentication
    pub key: String,

    /// queue software running on the cluster
    pub cluster_soft: ClusterSoft,

    /// remote directory under which per-job directories are created
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// the command submit scripts invoke to run one calculation; the quantum
    /// chemistry program itself is a black box behind this wrapper
    #[serde(default = "default_qc_command")]
    pub qc_command: String,
}

/// The project configuration, deserialized from a TOML input file and
/// validated once at startup. Level-of-theory fields are free-form here;
/// [`crate::level::Levels::resolve`] turns them into concrete levels.
#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    /// project name, used to name the output directory
    pub project: String,

    /// combined level-of-theory spec: either a composite method like
    /// "cbs-qb3" or sp//geometry like
    /// "ccsd(t)-f12/cc-pvtz-f12//wb97x-d3/6-311++g(3df,3pd)". overrides the
    /// individual level fields below
    #[serde(default)]
    pub level_of_theory: String,

    /// level for refined conformer searches (after force-field filtering)
    #[serde(default)]
    pub conformer_level: String,

    /// composite method, when not given through `level_of_theory`
    #[serde(default)]
    pub composite_method: String,

    /// level for geometry optimizations
    #[serde(default)]
    pub opt_level: String,

    /// level for frequency calculations
    #[serde(default)]
    pub freq_level: String,

    /// level for single point calculations
    #[serde(default)]
    pub sp_level: String,

    /// level for rotor scans
    #[serde(default)]
    pub scan_level: String,

    /// model chemistry label for empirical energy corrections; inferred from
    /// the sp level when left out
    #[serde(default)]
    pub model_chemistry: String,

    /// whether to refine optimizations on a fine grid (spawns an additional
    /// job per species)
    #[serde(default = "default_true")]
    pub fine: bool,

    /// whether to search for conformers before optimizing
    #[serde(default = "default_true")]
    pub generate_conformers: bool,

    /// whether to run rotor scans
    #[serde(default = "default_true")]
    pub scan_rotors: bool,

    /// whether bond additivity corrections are applied downstream; when set,
    /// an unresolvable model chemistry is a startup error
    #[serde(default = "default_true")]
    pub use_bac: bool,

    /// seconds to sleep between polling iterations when no jobs finished on
    /// the previous iteration
    #[serde(default = "default_sleep")]
    pub sleep_int: usize,

    /// name of the server jobs are dispatched to; must match a key of
    /// `servers`
    pub server: String,

    /// servers jobs can be dispatched to, keyed by name
    pub servers: HashMap<String, Server>,

    /// the species to characterize
    pub species: Vec<Species>,

    /// reactions between the species above
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Config {
    /// Load and validate a config file. Any inconsistency is reported here,
    /// before a connection is opened.
    pub fn load(filename: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(filename)?;
        let conf: Config = toml::from_str(&contents).map_err(|e| {
            Error::Input(format!("failed to parse {filename}: {e}"))
        })?;
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<()> {
        if self.project.is_empty() {
            return Err(Error::Input(String::from("project must be named")));
        }
        if !self.servers.contains_key(&self.server) {
            return Err(Error::Input(format!(
                "server '{}' has no [servers.{}] block",
                self.server, self.server
            )));
        }
        if self.species.is_empty() {
            return Err(Error::Input(String::from(
                "at least one species is required",
            )));
        }
        species::validate(&self.species, &self.reactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_full() {
        let got = Config::load("test_files/test.toml").unwrap();
        let want = Config {
            project: "propene_thermo".to_string(),
            level_of_theory:
                "ccsd(t)-f12/cc-pvtz-f12//wb97x-d3/6-311++g(3df,3pd)"
                    .to_string(),
            conformer_level: String::new(),
            composite_method: String::new(),
            opt_level: String::new(),
            freq_level: String::new(),
            sp_level: String::new(),
            scan_level: "b3lyp/6-311+g(d,p)".to_string(),
            model_chemistry: String::new(),
            fine: true,
            generate_conformers: false,
            scan_rotors: true,
            use_bac: true,
            sleep_int: 60,
            server: "pharos".to_string(),
            servers: HashMap::from([(
                "pharos".to_string(),
                Server {
                    address: "pharos.mit.edu".to_string(),
                    user: "alongd".to_string(),
                    key: "/home/alongd/.ssh/id_rsa".to_string(),
                    cluster_soft: ClusterSoft::Sge,
                    work_dir: "runs/qcflow".to_string(),
                    qc_command: "qcwrap".to_string(),
                },
            )]),
            species: vec![Species {
                label: "propene".to_string(),
                geometry: "C -1.2713 -0.2294 0.0000
C 0.0608 0.4330 0.0000
C 1.2113 -0.2297 0.0000
H -1.2176 -1.3193 0.0031
H -1.8452 0.0912 -0.8789
H -1.8432 0.0843 0.8848
H 0.0730 1.5219 -0.0002
H 2.1572 0.3058 0.0000
H 1.2575 -1.3172 0.0003"
                    .to_string(),
                charge: 0,
                multiplicity: 1,
                is_ts: false,
            }],
            reactions: Vec::new(),
        };
        assert_eq!(got, want);
    }

    #[test]
    fn test_unknown_server_is_an_error() {
        let toml = r#"
project = "p"
server = "nonexistent"
[servers.other]
address = "host"
user = "u"
key = "/k"
cluster_soft = "slurm"
[[species]]
label = "h2"
geometry = "H 0.0 0.0 0.0\nH 0.0 0.0 0.74"
"#;
        let conf: Config = toml::from_str(toml).unwrap();
        assert!(conf.validate().is_err());
    }
}
