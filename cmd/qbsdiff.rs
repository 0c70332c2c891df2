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
use qbsdiff_async::{Config, DiffOutput, Error, Host};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "qbsdiff",
    version,
    about = "compute bsdiff control, diff and extra streams",
    long_about = None,
)]
struct BsdiffArgs {
    /// current file ("-" for stdin)
    #[clap(value_name = "CURRENT")]
    current_path: String,

    /// reference file ("-" for stdin)
    #[clap(value_name = "REFERENCE")]
    reference_path: String,

    /// output prefix for PREFIX.ctrl, PREFIX.diff and PREFIX.extra
    #[clap(value_name = "PREFIX")]
    prefix: PathBuf,

    /// worker threads (0 for one per cpu)
    #[clap(short = 'j', value_name = "JOBS", default_value_t = 0)]
    jobs: usize,

    /// skip small matches
    #[clap(short = 's', value_name = "SMALL", default_value_t = 12)]
    small: usize,

    /// verbose logging (repeat for more)
    #[clap(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = BsdiffArgs::parse();
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

fn execute(args: BsdiffArgs) -> Result<(), Error> {
    if args.current_path == "-" && args.reference_path == "-" {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "current and reference could not be stdin at the same time",
        )));
    }
    let current = read_input(&args.current_path)?;
    let reference = read_input(&args.reference_path)?;
    debug!(current = current.len(), reference = reference.len(), "inputs loaded");

    let config = Config::new().workers(args.jobs).small_match(args.small);
    let host = Host::with_config(config)?;

    let slot = Rc::new(RefCell::new(None));
    let sink = slot.clone();
    let length = current.len();
    host.diff_with(Bytes::from(current), Bytes::from(reference), move |result| {
        *sink.borrow_mut() = Some(result);
    });
    host.run();

    let result = slot.borrow_mut().take();
    let DiffOutput {
        control,
        diff,
        extra,
    } = match result {
        Some(Ok(out)) => out,
        Some(Err(e)) => return Err(Error::Callback(e)),
        None => {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "diff was never delivered",
            )))
        }
    };

    write_stream(&args.prefix, "ctrl", &control[..])?;
    write_stream(&args.prefix, "diff", &diff[..])?;
    write_stream(&args.prefix, "extra", &extra[..])?;
    info!(
        control = control.len(),
        diff = diff.len(),
        extra = extra.len(),
        "streams written"
    );
    println!("{}", length);
    Ok(())
}

fn read_input(path: &str) -> io::Result<Vec<u8>> {
    let mut data;
    if path == "-" {
        data = Vec::new();
        io::stdin().read_to_end(&mut data)?;
    } else {
        data = fs::read(path)?;
    }
    data.shrink_to_fit();
    Ok(data)
}

fn write_stream(prefix: &Path, ext: &str, data: &[u8]) -> io::Result<()> {
    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    fs::write(path, data)
}
