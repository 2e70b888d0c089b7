//! 단위 테스트용 CommandRunner mock

use std::sync::Mutex;

use autoe2e_core::error::ProcessError;
use autoe2e_core::process::{CommandOutput, CommandRunner, CommandSpec};

enum Reply {
    Output(CommandOutput),
    SpawnFailure,
}

/// 호출된 명령을 기록하고, 명령 문자열에 포함된 부분 문자열로 응답을 고릅니다.
///
/// 첫 번째로 일치하는 규칙이 사용되며, 일치하는 규칙이 없으면 종료 코드 0을 반환합니다.
#[derive(Default)]
pub struct RecordingRunner {
    rules: Vec<(String, Reply)>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit(self, needle: &str, exit_code: i32) -> Self {
        self.with_output(needle, exit_code, "")
    }

    pub fn with_output(mut self, needle: &str, exit_code: i32, stdout: &str) -> Self {
        self.rules.push((
            needle.to_owned(),
            Reply::Output(CommandOutput {
                exit_code,
                stdout: stdout.to_owned(),
                stderr: String::new(),
            }),
        ));
        self
    }

    pub fn with_spawn_failure(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_owned(), Reply::SpawnFailure));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.calls.lock().unwrap().push(spec.clone());
        let line = spec.to_string();
        match self.rules.iter().find(|(needle, _)| line.contains(needle.as_str())) {
            Some((_, Reply::Output(out))) => Ok(out.clone()),
            Some((_, Reply::SpawnFailure)) => Err(ProcessError::Spawn {
                program: spec.program.clone(),
                reason: "No such file or directory (os error 2)".to_owned(),
            }),
            None => Ok(CommandOutput::default()),
        }
    }
}
