use log::{info, warn};

use crate::config::Config;
use crate::errors::{Error, Result};

/// levels of theory applied when the user does not choose their own
pub mod defaults {
    pub const CONFORMER: &str = "b97-d3/6-311+g(d,p)";
    pub const OPT: &str = "wb97x-d3/6-311+g(3df,2p)";
    pub const FREQ: &str = "wb97x-d3/6-311+g(3df,2p)";
    /// frequencies after a composite job run at a cheaper companion level
    pub const FREQ_FOR_COMPOSITE: &str = "b3lyp/cbsb7";
    pub const SP: &str = "ccsd(t)-f12/cc-pvtz-f12";
    pub const SCAN: &str = "b3lyp/6-311+g(d,p)";
}

/// model chemistries with bond additivity corrections available downstream
static BAC_CHEMISTRIES: &[&str] = &[
    "cbs-qb3",
    "cbs-qb3-paraskevas",
    "ccsd(t)-f12/cc-pvdz-f12",
    "ccsd(t)-f12/cc-pvtz-f12",
    "ccsd(t)-f12/cc-pvqz-f12",
    "b3lyp/cbsb7",
    "b3lyp/6-311g(2d,d,p)",
    "b3lyp/6-311+g(3df,2p)",
    "b3lyp/6-31g**",
];

/// sp levels conventionally written without the `-f12` basis suffix; the
/// model chemistry is the level with the suffix restored
static F12_IMPLIED: &[&str] = &[
    "ccsd(t)-f12/cc-pvdz",
    "ccsd(t)-f12/cc-pvtz",
    "ccsd(t)-f12/cc-pvqz",
];

/// model chemistries with only atom energy corrections available; usable as
/// long as bond additivity corrections were not requested
static AEC_CHEMISTRIES: &[&str] = &[
    "m06-2x/cc-pvtz",
    "g3",
    "m08so/mg3s*",
    "klip_1",
    "klip_2",
    "klip_3",
    "klip_2_cc",
    "ccsd(t)-f12/cc-pvdz-f12_h-tz",
    "ccsd(t)-f12/cc-pvdz-f12_h-qz",
    "ccsd(t)-f12/cc-pvdz-f12",
    "ccsd(t)-f12/cc-pvtz-f12",
    "ccsd(t)-f12/cc-pvqz-f12",
    "ccsd(t)-f12/cc-pcvdz-f12",
    "ccsd(t)-f12/cc-pcvtz-f12",
    "ccsd(t)-f12/cc-pcvqz-f12",
    "ccsd(t)-f12/cc-pvtz-f12(-pp)",
    "ccsd(t)/aug-cc-pvtz(-pp)",
    "ccsd(t)-f12/aug-cc-pvdz",
    "ccsd(t)-f12/aug-cc-pvtz",
    "ccsd(t)-f12/aug-cc-pvqz",
    "b-ccsd(t)-f12/cc-pvdz-f12",
    "b-ccsd(t)-f12/cc-pvtz-f12",
    "b-ccsd(t)-f12/cc-pvqz-f12",
    "b-ccsd(t)-f12/cc-pcvdz-f12",
    "b-ccsd(t)-f12/cc-pcvtz-f12",
    "b-ccsd(t)-f12/cc-pcvqz-f12",
    "b-ccsd(t)-f12/aug-cc-pvdz",
    "b-ccsd(t)-f12/aug-cc-pvtz",
    "b-ccsd(t)-f12/aug-cc-pvqz",
    "mp2_rmp2_pvdz",
    "mp2_rmp2_pvtz",
    "mp2_rmp2_pvqz",
    "ccsd-f12/cc-pvdz-f12",
    "ccsd(t)-f12/cc-pvdz-f12_noscale",
    "g03_pbepbe_6-311++g_d_p",
    "fci/cc-pvdz",
    "fci/cc-pvtz",
    "fci/cc-pvqz",
    "bmk/cbsb7",
    "bmk/6-311g(2d,d,p)",
    "b3lyp/6-31g**",
    "b3lyp/6-311+g(3df,2p)",
    "mrci+davidson/aug-cc-pv(t+d)z",
];

/// The concrete levels of theory for one project, resolved once at startup
/// and immutable afterward. `None` means the corresponding calculation type
/// is skipped. All levels are lowercased on resolution.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Levels {
    pub conformer: Option<String>,
    pub opt: Option<String>,
    pub freq: Option<String>,
    pub sp: Option<String>,
    pub scan: Option<String>,
    /// a named multi-step protocol like cbs-qb3 standing in for separate
    /// opt/freq/sp levels
    pub composite: Option<String>,
    /// label used to look up empirical energy corrections downstream
    pub model_chemistry: Option<String>,
}

fn given(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_lowercase())
    }
}

impl Levels {
    /// Resolve the level-of-theory settings in `conf`, applying each
    /// precedence rule in turn:
    ///
    /// 1. a combined `level_of_theory` splits on `//` into sp and geometry
    ///    levels, is a composite method if it has no `/` at all, or applies
    ///    uniformly to opt/freq/sp with exactly one `/`;
    /// 2. otherwise each level may be set individually, falling back to the
    ///    [`defaults`];
    /// 3. the model chemistry, if not given, is inferred from the sp level.
    ///
    /// Ambiguous input fails here, before any job is scheduled.
    pub fn resolve(conf: &Config) -> Result<Self> {
        let mut lvl = Levels {
            model_chemistry: given(&conf.model_chemistry),
            ..Self::default()
        };
        if let Some(spec) = given(&conf.level_of_theory) {
            lvl.apply_combined(&spec, conf)?;
        } else {
            lvl.apply_individual(conf);
        }
        lvl.resolve_conformer(conf);
        lvl.resolve_scan(conf);
        lvl.resolve_model_chemistry(conf)?;
        Ok(lvl)
    }

    /// rule 1: a combined sp//geometry, uniform, or composite specification
    fn apply_combined(&mut self, spec: &str, conf: &Config) -> Result<()> {
        if spec.matches("//").count() > 1 {
            return Err(Error::Input(format!(
                "level of theory should either be a composite method (like \
                 cbs-qb3) or of the form sp//geometry, e.g., \
                 ccsd(t)-f12/avtz//wb97x-d3/6-311++g**. got: {spec}"
            )));
        }
        if !conf.composite_method.is_empty()
            && !conf.composite_method.eq_ignore_ascii_case(spec)
        {
            return Err(Error::Input(String::from(
                "specify either composite_method or level_of_theory, not both",
            )));
        }
        if !spec.contains('/') {
            info!("using composite method {spec}");
            self.composite = Some(spec.to_string());
            self.freq = Some(defaults::FREQ_FOR_COMPOSITE.to_string());
            info!(
                "using default level {} for frequency calculations after \
                 composite jobs",
                defaults::FREQ_FOR_COMPOSITE
            );
        } else if let Some((sp, geom)) = spec.split_once("//") {
            self.opt = Some(geom.to_string());
            self.freq = Some(geom.to_string());
            self.sp = Some(sp.to_string());
            info!("using {geom} for geometry optimizations");
            info!("using {geom} for frequency calculations");
            info!("using {sp} for single point calculations");
        } else {
            // a single method/basis level; running an sp after an opt at the
            // same level is redundant but harmless
            self.opt = Some(spec.to_string());
            self.freq = Some(spec.to_string());
            self.sp = Some(spec.to_string());
            info!("using {spec} for geometry optimizations");
            info!("using {spec} for frequency calculations");
            info!("using {spec} for single point calculations");
        }
        Ok(())
    }

    /// rule 2: individual levels with documented defaults
    fn apply_individual(&mut self, conf: &Config) {
        self.composite = given(&conf.composite_method);
        if let Some(composite) = &self.composite {
            info!("using composite method {composite}");
        }

        if let Some(opt) = given(&conf.opt_level) {
            info!("using {opt} for geometry optimizations");
            self.opt = Some(opt);
        } else if self.composite.is_none() {
            info!(
                "using default level {} for geometry optimizations",
                defaults::OPT
            );
            self.opt = Some(defaults::OPT.to_string());
        }

        if let Some(freq) = given(&conf.freq_level) {
            info!("using {freq} for frequency calculations");
            self.freq = Some(freq);
        } else if self.composite.is_none() {
            if let Some(opt) = given(&conf.opt_level) {
                info!(
                    "using user-defined opt level {opt} for frequency \
                     calculations as well"
                );
                self.freq = Some(opt);
            } else {
                info!(
                    "using default level {} for frequency calculations",
                    defaults::FREQ
                );
                self.freq = Some(defaults::FREQ.to_string());
            }
        } else {
            info!(
                "using default level {} for frequency calculations after \
                 composite jobs",
                defaults::FREQ_FOR_COMPOSITE
            );
            self.freq = Some(defaults::FREQ_FOR_COMPOSITE.to_string());
        }

        if let Some(sp) = given(&conf.sp_level) {
            info!("using {sp} for single point calculations");
            self.sp = Some(sp);
        } else if self.composite.is_none() {
            info!(
                "using default level {} for single point calculations",
                defaults::SP
            );
            self.sp = Some(defaults::SP.to_string());
        }
    }

    fn resolve_conformer(&mut self, conf: &Config) {
        if let Some(level) = given(&conf.conformer_level) {
            info!("using {level} for refined conformer searches");
            self.conformer = Some(level);
        } else if conf.generate_conformers {
            info!(
                "using default level {} for refined conformer searches",
                defaults::CONFORMER
            );
            self.conformer = Some(defaults::CONFORMER.to_string());
        }
    }

    fn resolve_scan(&mut self, conf: &Config) {
        if let Some(level) = given(&conf.scan_level) {
            info!("using {level} for rotor scans");
            self.scan = Some(level);
        } else if conf.scan_rotors {
            info!(
                "using default level {} for rotor scans",
                defaults::SCAN
            );
            self.scan = Some(defaults::SCAN.to_string());
        }
    }

    /// rule 3: model chemistry, explicit or inferred from the sp level
    fn resolve_model_chemistry(&mut self, conf: &Config) -> Result<()> {
        if let Some(mc) = &self.model_chemistry {
            if !BAC_CHEMISTRIES.contains(&mc.as_str()) {
                warn!(
                    "no bond additivity corrections available for model \
                     chemistry {mc}; thermodynamic parameters may be \
                     inaccurate unless atom energy corrections are supplied"
                );
            }
            info!("using {mc} as model chemistry for energy corrections");
            return Ok(());
        }
        if let Some(composite) = &self.composite {
            if composite == "cbs-qb3" {
                info!(
                    "using {composite} as model chemistry for energy \
                     corrections"
                );
                self.model_chemistry = Some(composite.clone());
                return Ok(());
            }
            if conf.use_bac {
                return Err(Error::Input(format!(
                    "could not determine the model chemistry for composite \
                     method {composite}; either disable use_bac or give \
                     model_chemistry explicitly"
                )));
            }
            return Ok(());
        }
        let Some(sp) = &self.sp else { return Ok(()) };
        // normalize the f12a/f12b ansatz spellings before the lookups
        let sp = sp.replace("f12a", "f12").replace("f12b", "f12");
        if F12_IMPLIED.contains(&sp.as_str()) {
            let mc = format!("{sp}-f12");
            warn!("using model chemistry {mc} based on sp level {sp}");
            self.model_chemistry = Some(mc);
        } else if BAC_CHEMISTRIES.contains(&sp.as_str()) {
            info!("using {sp} as model chemistry for energy corrections");
            self.model_chemistry = Some(sp);
        } else if conf.use_bac {
            return Err(Error::Input(String::from(
                "could not determine an appropriate model chemistry for \
                 energy corrections; either disable use_bac or give \
                 model_chemistry explicitly",
            )));
        } else if AEC_CHEMISTRIES.contains(&sp.as_str()) {
            info!("using {sp} as model chemistry for energy corrections");
            self.model_chemistry = Some(sp);
        }
        Ok(())
    }
}
