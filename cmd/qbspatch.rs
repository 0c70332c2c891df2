#![forbid(unsafe_code)]
use std::cell::RefCell;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use std::process;
use std::rc::Rc;

use bytes::Bytes;
use clap::Parser;
use qbsdiff_async::{Config, Error, Host};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "qbspatch",
    version,
    about = "rebuild a file from bsdiff control, diff and extra streams",
    long_about = None,
)]
struct BspatchArgs {
    /// reference file
    #[clap(value_name = "REFERENCE")]
    reference_path: PathBuf,

    /// prefix of PREFIX.ctrl, PREFIX.diff and PREFIX.extra
    #[clap(value_name = "PREFIX")]
    prefix: PathBuf,

    /// target file ("-" for stdout)
    #[clap(value_name = "TARGET")]
    target_path: String,

    /// length of the rebuilt file
    #[clap(short = 'n', long = "length", value_name = "LENGTH")]
    length: u32,

    /// worker threads (0 for one per cpu)
    #[clap(short = 'j', value_name = "JOBS", default_value_t = 1)]
    jobs: usize,

    /// verbose logging (repeat for more)
    #[clap(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = BspatchArgs::parse();
    init_logging(args.verbose);
    if let Err(e) = execute(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn execute(args: BspatchArgs) -> Result<(), Error> {
    // setup inputs
    let reference = fs::read(&args.reference_path)?;
    let control = read_stream(&args.prefix, "ctrl")?;
    let diff = read_stream(&args.prefix, "diff")?;
    let extra = read_stream(&args.prefix, "extra")?;
    debug!(
        reference = reference.len(),
        control = control.len(),
        diff = diff.len(),
        extra = extra.len(),
        "inputs loaded"
    );

    // patch on the worker pool
    let host = Host::with_config(Config::new().workers(args.jobs))?;
    let slot = Rc::new(RefCell::new(None));
    let sink = slot.clone();
    host.patch_with(
        args.length as usize,
        Bytes::from(reference),
        Bytes::from(control),
        Bytes::from(diff),
        Bytes::from(extra),
        move |result| *sink.borrow_mut() = Some(result),
    );
    host.run();

    let result = slot.borrow_mut().take();
    let current = match result {
        Some(Ok(current)) => current,
        Some(Err(e)) => return Err(Error::Callback(e)),
        None => {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "patch was never delivered",
            )))
        }
    };

    // write output
    if args.target_path == "-" {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        out.write_all(&current[..])?;
        out.flush()?;
    } else {
        fs::write(&args.target_path, &current[..])?;
    }
    Ok(())
}

fn read_stream(prefix: &Path, ext: &str) -> io::Result<Vec<u8>> {
    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    fs::read(path)
}
