//! Scripted rclone stand-in for unit tests

use crate::runner::{ToolOutput, ToolRunner};
use artifacts_core::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::sync::Mutex;

type Responder = dyn Fn(&str, &[String]) -> ToolOutput + Send + Sync;

/// Records every invocation and answers from a closure
pub(crate) struct ScriptedRunner {
    responder: Box<Responder>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRunner {
    /// The responder sees the arguments without the leading `--config <file>`
    pub fn new(responder: impl Fn(&str, &[String]) -> ToolOutput + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call exactly as the session issued it
    pub fn raw_calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    /// Every call with the session's `--config <file>` prefix removed
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.raw_calls()
            .into_iter()
            .map(|(command, args)| {
                let args = strip_config(&args).to_vec();
                (command, args)
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.raw_calls().into_iter().map(|(command, _)| command).collect()
    }
}

fn strip_config(args: &[String]) -> &[String] {
    match args {
        [flag, _, rest @ ..] if flag == "--config" => rest,
        _ => args,
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, command: &str, args: &[OsString]) -> Result<ToolOutput> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), args.clone()));
        Ok((self.responder)(command, strip_config(&args)))
    }
}

/// Successful output carrying `stdout`
pub(crate) fn ok(stdout: &str) -> ToolOutput {
    ToolOutput::new(0, stdout, "")
}

/// Failed output carrying `stderr`
pub(crate) fn fail(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput::new(code, "", stderr)
}
