//! Side effects on the local machine: external programs and files.
//!
//! Every capability comes as a trait with a real implementation and an in-memory one that records
//! what was asked of it.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};
use tracing::{info, warn};

use crate::errors::RadarDataErr;

/// A fully described external program run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Program to start.
    pub program: String,
    /// Arguments, passed as is, no shell involved.
    pub args: Vec<String>,
    /// Working directory, the current one if `None`.
    pub current_dir: Option<PathBuf>,
    /// Append standard output to this file instead of capturing it.
    pub stdout_log: Option<PathBuf>,
    /// Append standard error to this file instead of capturing it.
    pub stderr_log: Option<PathBuf>,
}

impl Invocation {
    /// Invocation of `program` without arguments.
    pub fn new(program: &str) -> Self {
        Invocation {
            program: program.to_owned(),
            ..Invocation::default()
        }
    }

    /// Add one argument.
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run from `dir`.
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Send standard output and error to the end of these files.
    pub fn append_output_to(mut self, stdout_log: &Path, stderr_log: &Path) -> Self {
        self.stdout_log = Some(stdout_log.to_path_buf());
        self.stderr_log = Some(stderr_log.to_path_buf());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(ref dir) = self.current_dir {
            write!(f, "cd {} && ", dir.display())?;
        }

        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }

        if let Some(ref out) = self.stdout_log {
            write!(f, " >> {}", out.display())?;
        }
        if let Some(ref err) = self.stderr_log {
            write!(f, " 2>> {}", err.display())?;
        }

        Ok(())
    }
}

/// What a program run left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal.
    pub status: Option<i32>,
    /// Captured standard output and error, interleaved as stdout then stderr.
    pub output: String,
}

impl CommandOutput {
    /// Did the program exit with code 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs to completion.
pub trait CommandRunner {
    /// Run and wait for the program.
    fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, RadarDataErr>;
}

/// Runs programs with `std::process`.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, RadarDataErr> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args).stdin(Stdio::null());

        if let Some(ref dir) = invocation.current_dir {
            command.current_dir(dir);
        }
        if let Some(ref out) = invocation.stdout_log {
            command.stdout(open_for_append(out)?);
        }
        if let Some(ref err) = invocation.stderr_log {
            command.stderr(open_for_append(err)?);
        }

        let result = command.output()?;

        let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&result.stderr));

        Ok(CommandOutput {
            status: result.status.code(),
            output,
        })
    }
}

fn open_for_append(path: &Path) -> Result<std::fs::File, RadarDataErr> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Records invocations and pretends they all succeeded.
#[derive(Debug, Default)]
pub struct FakeCommandRunner {
    /// Every invocation, in order.
    pub invocations: Vec<Invocation>,
    /// Output handed back for a given program, success with no output otherwise.
    pub outputs: BTreeMap<String, CommandOutput>,
}

impl CommandRunner for FakeCommandRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<CommandOutput, RadarDataErr> {
        self.invocations.push(invocation.clone());

        Ok(self
            .outputs
            .get(&invocation.program)
            .cloned()
            .unwrap_or(CommandOutput {
                status: Some(0),
                output: String::new(),
            }))
    }
}

/// Run `invocation`, narrating it and its output in the log.
pub(crate) fn run_logged(
    runner: &mut dyn CommandRunner,
    invocation: &Invocation,
) -> Result<CommandOutput, RadarDataErr> {
    info!("Running : {}", invocation);

    let output = runner.run(invocation)?;

    if !output.output.trim().is_empty() {
        info!("{}", output.output.trim_end());
    }
    if !output.success() {
        warn!(
            "{} exited with status {:?}, its output is used anyway",
            invocation.program, output.status
        );
    }

    Ok(output)
}

/// File operations used while ingesting and converting tiles.
pub trait FileOps {
    /// Is there a regular file at `path`.
    fn is_file(&self, path: &Path) -> bool;

    /// Copy `from` to `to`, replacing `to`.
    fn copy(&mut self, from: &Path, to: &Path) -> Result<(), RadarDataErr>;

    /// Move `from` to `to`, creating the folders leading to `to` first.
    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), RadarDataErr>;
}

/// The local file system.
#[derive(Debug, Default)]
pub struct LocalFiles;

impl FileOps for LocalFiles {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn copy(&mut self, from: &Path, to: &Path) -> Result<(), RadarDataErr> {
        info!("Copying {} to {}", from.display(), to.display());
        std::fs::copy(from, to)?;
        Ok(())
    }

    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), RadarDataErr> {
        create_folder_if_needed(to)?;

        if let Err(err) = std::fs::rename(from, to) {
            // Scratch storage is usually another file system, rename cannot cross it.
            if err.kind() == std::io::ErrorKind::NotFound {
                return Err(err.into());
            }
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)?;
        }

        info!("Moving {} to {}", from.display(), to.display());
        Ok(())
    }
}

/// Create the folder that will hold `file_path`.
pub fn create_folder_if_needed(file_path: &Path) -> Result<(), RadarDataErr> {
    if let Some(dir) = file_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            std::fs::create_dir_all(dir)?;
            info!("Creating folder : {}", dir.display());
        }
    }

    Ok(())
}

/// One recorded file operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileOp {
    /// A copy from, to.
    Copy(PathBuf, PathBuf),
    /// A move from, to.
    Move(PathBuf, PathBuf),
}

/// A pretend file system: a set of existing paths and a journal of operations.
#[derive(Debug, Default)]
pub struct InMemoryFiles {
    /// Paths that exist.
    pub files: HashSet<PathBuf>,
    /// Every copy and move, in order.
    pub operations: Vec<FileOp>,
}

impl InMemoryFiles {
    /// Start with `files` existing.
    pub fn with_files<P: AsRef<Path>>(files: &[P]) -> Self {
        InMemoryFiles {
            files: files.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            operations: vec![],
        }
    }
}

impl FileOps for InMemoryFiles {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    fn copy(&mut self, from: &Path, to: &Path) -> Result<(), RadarDataErr> {
        self.operations
            .push(FileOp::Copy(from.to_path_buf(), to.to_path_buf()));
        self.files.insert(to.to_path_buf());
        Ok(())
    }

    fn move_file(&mut self, from: &Path, to: &Path) -> Result<(), RadarDataErr> {
        self.operations
            .push(FileOp::Move(from.to_path_buf(), to.to_path_buf()));
        self.files.remove(from);
        self.files.insert(to.to_path_buf());
        Ok(())
    }
}

/// Appends lines to log files.
pub trait FileAppender {
    /// Append `data` and a new line at the end of `path`.
    fn append_file(&mut self, path: &Path, data: &str) -> Result<(), RadarDataErr>;
}

/// Appends to real files.
#[derive(Debug, Default)]
pub struct RealFileAppender;

impl FileAppender for RealFileAppender {
    fn append_file(&mut self, path: &Path, data: &str) -> Result<(), RadarDataErr> {
        create_folder_if_needed(path)?;
        let mut file = open_for_append(path)?;
        writeln!(file, "{}", data)?;
        Ok(())
    }
}

/// Keeps appended lines per path.
#[derive(Debug, Default)]
pub struct InMemoryFileAppender {
    /// Lines appended to each path.
    pub files: BTreeMap<PathBuf, Vec<String>>,
}

impl FileAppender for InMemoryFileAppender {
    fn append_file(&mut self, path: &Path, data: &str) -> Result<(), RadarDataErr> {
        self.files
            .entry(path.to_path_buf())
            .or_default()
            .push(data.to_owned());
        Ok(())
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_invocation_display() {
        let invocation = Invocation::new("poetry")
            .arg("run")
            .arg("python")
            .current_dir(Path::new("/opt/project"))
            .append_output_to(Path::new("/var/log/out.log"), Path::new("/var/log/err.log"));

        assert_eq!(
            invocation.to_string(),
            "cd /opt/project && poetry run python >> /var/log/out.log 2>> /var/log/err.log"
        );
    }

    #[test]
    fn test_create_folder_if_needed() {
        let tmp = TempDir::new("radar-data-test-io").unwrap();
        let sub_dir = tmp.path().join("a").join("b");

        assert!(!sub_dir.is_dir());
        create_folder_if_needed(&sub_dir.join("file.txt")).unwrap();
        assert!(sub_dir.is_dir());

        // Existing folders are fine.
        create_folder_if_needed(&sub_dir.join("file.txt")).unwrap();
    }

    #[test]
    fn test_local_move_creates_folders() {
        let tmp = TempDir::new("radar-data-test-io").unwrap();
        let from = tmp.path().join("scratch.tif");
        let to = tmp.path().join("2000").join("06").join("15").join("tile.tif");
        std::fs::write(&from, b"raster").unwrap();

        let mut files = LocalFiles;
        files.move_file(&from, &to).unwrap();

        assert!(!files.is_file(&from));
        assert!(files.is_file(&to));
        assert_eq!(std::fs::read(&to).unwrap(), b"raster");
    }

    #[test]
    fn test_local_move_missing_source() {
        let tmp = TempDir::new("radar-data-test-io").unwrap();
        let mut files = LocalFiles;

        assert!(files
            .move_file(&tmp.path().join("nope"), &tmp.path().join("dest"))
            .is_err());
    }

    #[test]
    fn test_real_file_appender() {
        let tmp = TempDir::new("radar-data-test-io").unwrap();
        let log = tmp.path().join("logs").join("radar.log");

        let mut appender = RealFileAppender;
        appender.append_file(&log, "first").unwrap();
        appender.append_file(&log, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&log).unwrap(), "first\nsecond\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_real_command_runner() {
        let mut runner = RealCommandRunner;

        let output = runner
            .run(&Invocation::new("sh").arg("-c").arg("echo out; echo err 1>&2"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.output, "out\nerr\n");

        let output = runner
            .run(&Invocation::new("sh").arg("-c").arg("exit 3"))
            .unwrap();
        assert_eq!(output.status, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_real_command_runner_appends_to_logs() {
        let tmp = TempDir::new("radar-data-test-io").unwrap();
        let out = tmp.path().join("out.log");
        let err = tmp.path().join("err.log");
        std::fs::write(&out, "before\n").unwrap();

        let mut runner = RealCommandRunner;
        runner
            .run(
                &Invocation::new("sh")
                    .arg("-c")
                    .arg("echo out; echo err 1>&2")
                    .append_output_to(&out, &err),
            )
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out).unwrap(), "before\nout\n");
        assert_eq!(std::fs::read_to_string(&err).unwrap(), "err\n");
    }

    #[test]
    fn test_in_memory_files() {
        let mut files = InMemoryFiles::with_files(&["/a"]);

        files.copy(Path::new("/a"), Path::new("/b")).unwrap();
        files.move_file(Path::new("/b"), Path::new("/c")).unwrap();

        assert!(files.is_file(Path::new("/a")));
        assert!(!files.is_file(Path::new("/b")));
        assert!(files.is_file(Path::new("/c")));
        assert_eq!(files.operations.len(), 2);
    }
}
