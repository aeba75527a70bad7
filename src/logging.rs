use std::fs::File;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Target};
use log::{Level, LevelFilter};

use crate::errors::Result;

/// Build the process logger once, explicitly, from the binary. Library code
/// only emits through the `log` facade and never touches logging
/// configuration; the sink (console or file) and the level are chosen here.
///
/// Records are formatted as `Level: message`, with the level prefix dropped
/// for info and below to keep the log readable.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = Builder::new();
    builder.filter_level(level).format(|buf, record| {
        let prefix = match record.level() {
            Level::Error => "Error: ",
            Level::Warn => "Warning: ",
            Level::Info | Level::Debug | Level::Trace => "",
        };
        writeln!(buf, "{prefix}{}", record.args())
    });
    match log_file {
        Some(path) => {
            builder.target(Target::Pipe(Box::new(File::create(path)?)));
        }
        None => {
            // everything goes to stdout rather than stderr
            builder.target(Target::Stdout);
        }
    }
    builder.init();
    Ok(())
}
