use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Work performed against the mounted tree once the service is ready.
pub trait MountAction {
    fn perform(&mut self, mountpoint: &Path) -> Result<()>;
}

impl<F> MountAction for F
where
    F: FnMut(&Path) -> Result<()>,
{
    fn perform(&mut self, mountpoint: &Path) -> Result<()> {
        self(mountpoint)
    }
}

/// Runs an external command with the mount point as its working directory.
///
/// A relative `program` is looked up inside the mounted tree, so the default
/// entry `test-0.sh` resolves to `<mountpoint>/test-0.sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandAction {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandAction {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds an action from `[program, args...]`.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program, args.to_vec()))
    }

    pub fn resolve(&self, mountpoint: &Path) -> PathBuf {
        if self.program.is_absolute() {
            self.program.clone()
        } else {
            mountpoint.join(&self.program)
        }
    }
}

impl MountAction for CommandAction {
    fn perform(&mut self, mountpoint: &Path) -> Result<()> {
        let program = self.resolve(mountpoint);
        tracing::info!("Running {} {:?}", program.display(), self.args);
        let status = Command::new(&program)
            .args(&self.args)
            .current_dir(mountpoint)
            .status()
            .with_context(|| format!("Failed to run {}", program.display()))?;
        if !status.success() {
            bail!("{} exited with status: {status}", program.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn sh(script: &str) -> CommandAction {
        CommandAction::new("/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn test_relative_program_resolves_into_mount() {
        let action = CommandAction::new("test-0.sh", vec![]);
        assert_eq!(
            action.resolve(Path::new("/var/lib/mountrun/mnt")),
            PathBuf::from("/var/lib/mountrun/mnt/test-0.sh")
        );
        let action = CommandAction::new("/usr/bin/env", vec![]);
        assert_eq!(action.resolve(Path::new("/mnt")), PathBuf::from("/usr/bin/env"));
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["bin/app".to_string(), "--flag".to_string()];
        let action = CommandAction::from_argv(&argv).unwrap();
        assert_eq!(action.program, PathBuf::from("bin/app"));
        assert_eq!(action.args, vec!["--flag".to_string()]);
        assert!(CommandAction::from_argv(&[]).is_none());
    }

    #[test]
    fn test_command_runs_inside_mountpoint() {
        let tmp = tempdir().unwrap();
        let mut action = sh("pwd > cwd.txt");
        action.perform(tmp.path()).unwrap();
        let cwd = fs::read_to_string(tmp.path().join("cwd.txt")).unwrap();
        assert_eq!(
            Path::new(cwd.trim()).canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_failing_command_is_an_error() {
        let tmp = tempdir().unwrap();
        let err = sh("exit 3").perform(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("exited with status"));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let tmp = tempdir().unwrap();
        let mut action = CommandAction::new("test-0.sh", vec![]);
        assert!(action.perform(tmp.path()).is_err());
    }

    #[test]
    fn test_closure_action() {
        let mut seen = None;
        let mut action = |mountpoint: &Path| {
            seen = Some(mountpoint.to_path_buf());
            Ok::<(), anyhow::Error>(())
        };
        action.perform(Path::new("/mnt")).unwrap();
        assert_eq!(seen, Some(PathBuf::from("/mnt")));
    }
}
