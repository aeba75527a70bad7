use std::collections::HashMap;
use std::fmt::Write;

use log::info;

/// Aggregates scheduler output into a project summary for the downstream
/// thermochemistry step. The actual thermodynamic and kinetic parameter
/// fitting happens outside qcflow; this only collects what it needs.
pub struct Processor<'a> {
    project: &'a str,
    /// per-species status map from the scheduler
    output: &'a HashMap<String, String>,
    model_chemistry: Option<&'a str>,
    use_bac: bool,
}

impl<'a> Processor<'a> {
    pub fn new(
        project: &'a str,
        output: &'a HashMap<String, String>,
        model_chemistry: Option<&'a str>,
        use_bac: bool,
    ) -> Self {
        Self {
            project,
            output,
            model_chemistry,
            use_bac,
        }
    }

    /// Render the project summary. Species are listed in sorted order so the
    /// summary is stable across runs.
    pub fn process(&self) -> String {
        info!("processing results for project {}", self.project);
        let mut out = String::new();
        let _ = writeln!(out, "project: {}", self.project);
        let _ = writeln!(
            out,
            "model chemistry: {} (bond additivity corrections {})",
            self.model_chemistry.unwrap_or("none"),
            if self.use_bac { "on" } else { "off" },
        );
        let _ = writeln!(out);
        let mut labels: Vec<_> = self.output.keys().collect();
        labels.sort();
        for label in labels {
            let _ = writeln!(out, "{label}: {}", self.output[label]);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        let output = HashMap::from([
            ("propene".to_string(), "converged".to_string()),
            ("butanol".to_string(), "opt job errored on pharos".to_string()),
        ]);
        let got = Processor::new(
            "propene_thermo",
            &output,
            Some("ccsd(t)-f12/cc-pvtz-f12"),
            true,
        )
        .process();
        assert!(got.contains("project: propene_thermo"));
        assert!(got.contains("propene: converged"));
        assert!(got.contains("butanol: opt job errored on pharos"));
        // sorted output: butanol before propene
        assert!(got.find("butanol").unwrap() < got.find("propene:").unwrap());
    }
}
