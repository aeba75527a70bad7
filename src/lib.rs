//! qcflow automates quantum chemistry calculations (conformer searches,
//! geometry optimizations, frequencies, single points, rotor scans) for
//! chemical species, dispatching jobs to remote compute clusters over SSH and
//! collecting results for thermochemistry post-processing. The quantum
//! chemistry itself runs in external programs on the servers; qcflow only
//! orchestrates them.

pub mod config;
pub mod driver;
pub mod errors;
pub mod job;
pub mod level;
pub mod logging;
pub mod processor;
pub mod queue;
pub mod scheduler;
pub mod species;
pub mod ssh;

pub use errors::{Error, Result};

/// from [StackOverflow](https://stackoverflow.com/a/45145246)
#[macro_export]
macro_rules! string {
    // match a list of expressions separated by comma:
    ($($str:expr),*) => ({
        // create a Vec with this list of expressions,
        // calling String::from on each:
        vec![$(String::from($str),)*] as Vec<String>
    });
}
