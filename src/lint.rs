use std::io::Read;
use std::path::Path;
use std::process::{Command,ExitStatus,Stdio};
use std::thread::{self,JoinHandle};
use std::time::{Duration,Instant};
use tracing::debug;
use crate::loader::Format;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/** Result of checking one file */
#[derive(PartialEq,Clone,Debug)]
pub enum LintOutcome {
    /** The linter ran and found nothing */
    Passed,
    /** The linter ran and rejected the file, or could not complete */
    Failed { linter: String, detail: String },
    /** No linter for this format is installed */
    Unavailable { linter: String }
}

/**
 * Syntax checking for a configuration file. Only `Failed` stops a
 * comparison; `Unavailable` is reported as a warning.
 */
pub trait Validator {
    fn validate(&self, path: &Path, format: Format) -> LintOutcome;
}

/** A linter program and the arguments placed before the file name */
#[derive(Clone,Debug)]
struct LinterCommand {
    program: String,
    args: Vec<String>
}

impl LinterCommand {
    fn new(program: &str, args: &[&str]) -> LinterCommand {
        LinterCommand{program: program.to_string(), args: args.iter().map(|a| a.to_string()).collect()}
    }
}

/** Runs `yamllint` or `jsonlint` found on the search path */
#[derive(Clone,Debug)]
pub struct ExternalLinter {
    yaml: LinterCommand,
    json: LinterCommand,
    timeout: Duration
}

impl ExternalLinter {
    pub fn new(timeout: Duration) -> ExternalLinter {
        ExternalLinter {
            yaml: LinterCommand::new("yamllint",&[]),
            json: LinterCommand::new("jsonlint",&["-q"]),
            timeout
        }
    }

    fn command(&self, format: Format) -> &LinterCommand {
        match format {
            Format::Yaml => &self.yaml,
            Format::Json => &self.json
        }
    }
}

impl Default for ExternalLinter {
    fn default() -> ExternalLinter {
        ExternalLinter::new(DEFAULT_TIMEOUT)
    }
}

impl Validator for ExternalLinter {
    fn validate(&self, path: &Path, format: Format) -> LintOutcome {
        let cmd = self.command(format);
        let linter = cmd.program.clone();
        let binary = match which::which(&cmd.program) {
            Ok(binary) => binary,
            Err(_)     => return LintOutcome::Unavailable{linter}
        };
        debug!(linter = %binary.display(), file = %path.display(), "running linter");
        let mut command = Command::new(&binary);
        command.args(&cmd.args).arg(path);
        match run_with_timeout(command,self.timeout) {
            Err(e) => LintOutcome::Failed{detail: format!("could not run {}: {}",linter,e), linter},
            Ok(None) => LintOutcome::Failed{
                detail: format!("{} did not finish within {} seconds",linter,self.timeout.as_secs_f32()),
                linter
            },
            Ok(Some(run)) if run.status.success() => {
                debug!(linter = %linter, stdout = %run.stdout.trim_end(), "linter passed");
                LintOutcome::Passed
            },
            Ok(Some(run)) => LintOutcome::Failed{detail: run.failure_detail(), linter}
        }
    }
}

struct Finished {
    status: ExitStatus,
    stdout: String,
    stderr: String
}

impl Finished {
    /** stderr verbatim, else stdout (yamllint reports there), else the status */
    fn failure_detail(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.clone()
        } else if !self.stdout.trim().is_empty() {
            self.stdout.clone()
        } else {
            match self.status.code() {
                Some(code) => format!("exited with status {}",code),
                None       => "terminated by a signal".to_string()
            }
        }
    }
}

/** Run to completion, or kill the child and return None after `timeout` */
fn run_with_timeout(mut command: Command, timeout: Duration) -> std::io::Result<Option<Finished>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    };
    Ok(Some(Finished {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default()
    }))
}

/** Read a pipe to the end on its own thread so the child never blocks on it */
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
