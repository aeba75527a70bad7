use std::collections::HashSet;

use serde::Deserialize;

use crate::errors::{Error, Result};

fn default_multiplicity() -> usize {
    1
}

/// A chemical species, either a stable well or a transition state. Species
/// are deserialized straight from `[[species]]` tables in the input file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Species {
    /// unique label, used to name jobs and report results
    pub label: String,

    /// initial geometry in xyz format, one `El x y z` line per atom
    pub geometry: String,

    /// net charge. 0 for neutral, +1 for a cation, -1 for an anion, and so on
    #[serde(default)]
    pub charge: isize,

    /// spin multiplicity, 2S+1
    #[serde(default = "default_multiplicity")]
    pub multiplicity: usize,

    /// whether this species is a transition state
    #[serde(default)]
    pub is_ts: bool,
}

/// A labeled reaction between species from the species list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reaction {
    pub label: String,

    /// labels of reactant species, each of which must appear in the species
    /// list
    pub reactants: Vec<String>,

    /// labels of product species, each of which must appear in the species
    /// list
    pub products: Vec<String>,
}

/// Reject malformed species and reaction lists before any remote work is
/// attempted: empty or duplicate labels, empty or unparseable geometries,
/// zero multiplicities, and reactions referencing unknown species.
pub fn validate(species: &[Species], reactions: &[Reaction]) -> Result<()> {
    let mut seen = HashSet::new();
    for s in species {
        if s.label.is_empty() {
            return Err(Error::Input(String::from(
                "every species must have a non-empty label",
            )));
        }
        if s.label.contains(char::is_whitespace) {
            return Err(Error::Input(format!(
                "species label '{}' contains whitespace",
                s.label
            )));
        }
        if !seen.insert(s.label.as_str()) {
            return Err(Error::Input(format!(
                "duplicate species label '{}'",
                s.label
            )));
        }
        if s.multiplicity == 0 {
            return Err(Error::Input(format!(
                "species '{}' has multiplicity 0",
                s.label
            )));
        }
        validate_geometry(s)?;
    }
    for r in reactions {
        if r.label.is_empty() {
            return Err(Error::Input(String::from(
                "every reaction must have a non-empty label",
            )));
        }
        for side in [&r.reactants, &r.products] {
            for label in side {
                if !seen.contains(label.as_str()) {
                    return Err(Error::Input(format!(
                        "reaction '{}' references unknown species '{label}'",
                        r.label
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_geometry(s: &Species) -> Result<()> {
    let lines: Vec<&str> = s
        .geometry
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(Error::Input(format!(
            "species '{}' has an empty geometry",
            s.label
        )));
    }
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let coords_ok = fields.len() == 4
            && fields[1..].iter().all(|f| f.parse::<f64>().is_ok());
        if !coords_ok {
            return Err(Error::Input(format!(
                "species '{}' has a malformed geometry line: '{line}'",
                s.label
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string;

    fn propene() -> Species {
        Species {
            label: "propene".to_string(),
            geometry: "C -1.2713 -0.2294 0.0000
C 0.0608 0.4330 0.0000
H -1.2176 -1.3193 0.0031"
                .to_string(),
            charge: 0,
            multiplicity: 1,
            is_ts: false,
        }
    }

    #[test]
    fn test_valid_input() {
        let species = [propene()];
        assert!(validate(&species, &[]).is_ok());
    }

    #[test]
    fn test_duplicate_label() {
        let species = [propene(), propene()];
        assert!(validate(&species, &[]).is_err());
    }

    #[test]
    fn test_missing_label() {
        let species = [Species {
            label: String::new(),
            ..propene()
        }];
        assert!(validate(&species, &[]).is_err());
    }

    #[test]
    fn test_malformed_geometry() {
        let species = [Species {
            geometry: "C one two three".to_string(),
            ..propene()
        }];
        assert!(validate(&species, &[]).is_err());
    }

    #[test]
    fn test_reaction_with_unknown_species() {
        let species = [propene()];
        let rxns = [Reaction {
            label: "r1".to_string(),
            reactants: string!["propene"],
            products: string!["propanol"],
        }];
        assert!(validate(&species, &rxns).is_err());
    }
}
