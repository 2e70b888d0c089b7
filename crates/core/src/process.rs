//! 외부 프로세스 실행 추상화
//!
//! [`CommandRunner`] trait은 `docker compose`, `ansible-playbook`, 테스트 엔진 등
//! 외부 명령 호출을 추상화합니다. 테스트에서는 mock 구현으로 교체합니다.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tracing::debug;

use crate::error::ProcessError;

/// 실행할 외부 명령
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// 추가 환경변수 (부모 프로세스 환경 위에 덧붙임)
    pub envs: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
    /// `true`면 stdout/stderr를 수집하고, `false`면 부모의 stdio를 상속합니다.
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn captured(mut self) -> Self {
        self.capture = true;
        self
    }

    /// 환경변수 값을 조회합니다.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.envs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// 외부 명령 실행 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// 종료 코드 (시그널로 종료된 경우 128 + 시그널 번호)
    pub exit_code: i32,
    /// 수집된 stdout (수집하지 않은 경우 빈 문자열)
    pub stdout: String,
    /// 수집된 stderr (수집하지 않은 경우 빈 문자열)
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout 뒤에 stderr를 이어 붙인 텍스트
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// 외부 명령 실행 trait
pub trait CommandRunner: Send + Sync + 'static {
    /// 명령을 실행하고 종료될 때까지 기다립니다.
    ///
    /// 0이 아닌 종료 코드는 에러가 아니라 [`CommandOutput::exit_code`]로 전달됩니다.
    /// 프로세스를 생성할 수 없는 경우에만 에러를 반환합니다.
    fn run(
        &self,
        spec: &CommandSpec,
    ) -> impl Future<Output = Result<CommandOutput, ProcessError>> + Send;
}

/// `tokio::process` 기반 실제 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        debug!(command = %spec, capture = spec.capture, "running external command");

        let mut command = tokio::process::Command::new(&spec.program);
        command.kill_on_drop(true);
        command.args(&spec.args);
        command.envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if let Some(dir) = &spec.current_dir {
            command.current_dir(dir);
        }

        if spec.capture {
            command.stdin(Stdio::null());
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
            let output = command.output().await.map_err(|e| spawn_error(spec, e))?;
            Ok(CommandOutput {
                exit_code: exit_code_of(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let mut child = command.spawn().map_err(|e| spawn_error(spec, e))?;
            let status = child.wait().await.map_err(|e| ProcessError::Wait {
                program: spec.program.clone(),
                reason: e.to_string(),
            })?;
            Ok(CommandOutput {
                exit_code: exit_code_of(status),
                ..Default::default()
            })
        }
    }
}

fn spawn_error(spec: &CommandSpec, err: std::io::Error) -> ProcessError {
    ProcessError::Spawn {
        program: spec.program.clone(),
        reason: err.to_string(),
    }
}

#[cfg(unix)]
fn exit_code_of(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builder_and_display() {
        let spec = CommandSpec::new("docker")
            .arg("compose")
            .args(["ps", "-a"])
            .env("FOO", "bar")
            .captured();
        assert_eq!(spec.to_string(), "docker compose ps -a");
        assert_eq!(spec.env_value("FOO"), Some("bar"));
        assert!(spec.capture);
    }

    #[test]
    fn combined_output_joins_streams() {
        let out = CommandOutput {
            exit_code: 0,
            stdout: "a".to_owned(),
            stderr: "b\n".to_owned(),
        };
        assert_eq!(out.combined(), "a\nb\n");
        assert!(out.success());
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let err = SystemCommandRunner
            .run(&CommandSpec::new("autoe2e-definitely-not-a-real-binary").captured())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let out = SystemCommandRunner
            .run(
                &CommandSpec::new("sh")
                    .args(["-c", "echo out; echo err >&2; exit 3"])
                    .captured(),
            )
            .await
            .unwrap();
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn passes_extra_env_and_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        let out = SystemCommandRunner
            .run(
                &CommandSpec::new("sh")
                    .args(["-c", "echo \"$AUTOE2E_PROBE\"; pwd"])
                    .env("AUTOE2E_PROBE", "hello")
                    .current_dir(tmp.path())
                    .captured(),
            )
            .await
            .unwrap();
        let mut lines = out.stdout.lines();
        assert_eq!(lines.next(), Some("hello"));
        let cwd = lines.next().unwrap_or_default();
        let expected = tmp.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(cwd).canonicalize().unwrap(), expected);
    }
}
