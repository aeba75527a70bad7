use std::path::PathBuf;

use clap::Parser;
use log::error;

use qcflow::config::Config;
use qcflow::driver::Driver;
use qcflow::job::NAME_PREFIX;
use qcflow::ssh::SshClient;
use qcflow::{logging, Error};

/// automated quantum chemistry over remote cluster queues
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
struct Args {
    /// input file
    #[arg(value_parser, default_value_t = String::from("qcflow.toml"))]
    infile: String,

    /// Log debug output in addition to info and above. Defaults to false.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Write the log to this file instead of the console.
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Delete every qcflow job on the named server and exit. Useful after
    /// terminating a run that left jobs behind.
    #[arg(long, value_name = "SERVER")]
    delete_all: Option<String>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = logging::init(args.verbose, args.log_file.as_deref()) {
        eprintln!("failed to initialize logging: {e}");
        std::process::exit(1);
    }
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> qcflow::Result<()> {
    let conf = Config::load(&args.infile)?;
    if let Some(name) = &args.delete_all {
        let server = conf.servers.get(name).ok_or_else(|| {
            Error::Input(format!("server '{name}' has no [servers.{name}] block"))
        })?;
        let ssh = SshClient::connect(name, server)?;
        ssh.delete_all_jobs(NAME_PREFIX)?;
        return Ok(());
    }
    let driver = Driver::new(conf)?;
    driver.execute()?;
    Ok(())
}
