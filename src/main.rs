use std::fs;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug};

use wirecheck::{CompileError, Environment, Position, compile, execute};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server under test, as host:port
    #[arg(value_name = "ADDR")]
    addr: String,

    /// Scripts to run, in order, each on a fresh connection
    #[arg(value_name = "SCRIPT", required = true)]
    scripts: Vec<PathBuf>,

    /// Also log statements and assignments
    #[arg(short, long)]
    verbose: bool,

    /// Give up connecting after this many seconds
    #[arg(long, value_name = "SECS")]
    connect_timeout: Option<u64>,

    /// Give up waiting for a line after this many seconds
    #[arg(long, value_name = "SECS")]
    read_timeout: Option<u64>,

    /// Compile the scripts and report errors without connecting
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    for path in &args.scripts {
        if let Err(err) = run_script(&args, path) {
            eprintln!("{}: error: {err:#}", path.display());
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

fn run_script(args: &Args, path: &Path) -> Result<()> {
    let source = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let script = match compile(&source) {
        Ok(script) => script,
        Err(err) => {
            report_diagnostics(path, &source, &err);
            bail!("{}", summarize(&err));
        }
    };
    if args.check {
        return Ok(());
    }

    let mut stream = connect(&args.addr, args.connect_timeout)?;
    stream
        .set_read_timeout(args.read_timeout.map(Duration::from_secs))
        .context("failed to set read timeout")?;

    debug!("running {} against {}", path.display(), args.addr);
    let mut env = Environment::new(&mut stream);
    execute(&script, &mut env)?;
    debug!("{} passed", path.display());
    Ok(())
}

fn connect(addr: &str, timeout: Option<u64>) -> Result<TcpStream> {
    let Some(secs) = timeout else {
        return TcpStream::connect(addr).with_context(|| format!("failed to connect to {addr}"));
    };

    let mut last_err = None;
    let candidates = addr
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve {addr}"))?;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, Duration::from_secs(secs)) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    match last_err {
        Some(err) => Err(err).with_context(|| format!("failed to connect to {addr}")),
        None => bail!("{addr} did not resolve to any address"),
    }
}

/// Print each diagnostic as `file:line:col: message`.
fn report_diagnostics(path: &Path, source: &[u8], err: &CompileError) {
    for diag in err.diagnostics() {
        let pos = Position::from_offset(source, diag.offset);
        eprintln!("{}:{pos}: {}", path.display(), diag.message);
    }
}

fn summarize(err: &CompileError) -> String {
    let (count, kind) = match err {
        CompileError::Lexical(diags) => (diags.len(), "lexical"),
        CompileError::Syntax(diags) => (diags.len(), "syntax"),
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {kind} error{plural}")
}
