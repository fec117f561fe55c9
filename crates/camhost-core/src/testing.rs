//! 测试用的假宿主机：记录命令、模拟下载与 systemctl

use crate::error::Result;
use crate::host::{CommandOutput, CommandSpec, Host};
use crate::input::Prompt;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct FakeHost {
    uid: u32,
    tools: HashSet<String>,
    downloads: HashMap<String, Vec<u8>>,
    responses: Vec<(String, CommandOutput)>,
    one_shot: Mutex<VecDeque<(String, CommandOutput)>>,
    commands: Mutex<Vec<CommandSpec>>,
}

impl FakeHost {
    pub fn with_uid(uid: u32) -> Self {
        Self {
            uid,
            ..Self::default()
        }
    }

    pub fn root() -> Self {
        Self::with_uid(0)
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    /// 注册一个可下载的 URL
    pub fn with_download(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.downloads.insert(url.into(), body);
        self
    }

    /// 命令行以 `prefix` 开头时返回固定结果（先注册者优先）
    pub fn respond(mut self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        self.responses.push((prefix.into(), output));
        self
    }

    /// 只生效一次的响应，优先于 [`FakeHost::respond`]
    pub fn respond_once(self, prefix: impl Into<String>, output: CommandOutput) -> Self {
        if let Ok(mut queue) = self.one_shot.lock() {
            queue.push_back((prefix.into(), output));
        }
        self
    }

    pub fn fail(self, prefix: impl Into<String>, code: i32, stderr: &str) -> Self {
        self.respond(
            prefix,
            CommandOutput {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
        )
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|c| c.iter().map(CommandSpec::display).collect())
            .unwrap_or_default()
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.commands().iter().position(|c| c.starts_with(prefix))
    }

    fn simulate_download(&self, spec: &CommandSpec) -> Option<CommandOutput> {
        let is_transfer = matches!(spec.program.as_str(), "curl" | "wget" | "fetch")
            || (spec.program == "busybox" && spec.args.first().map(String::as_str) == Some("wget"));
        if !is_transfer {
            return None;
        }
        let url = spec.args.last()?;
        let dest = spec
            .args
            .windows(2)
            .find(|w| w[0] == "-o" || w[0] == "-O")
            .map(|w| PathBuf::from(&w[1]))?;
        match self.downloads.get(url) {
            Some(body) => match std::fs::write(&dest, body) {
                Ok(()) => Some(CommandOutput::default()),
                Err(e) => Some(CommandOutput {
                    code: 1,
                    stderr: e.to_string(),
                    ..CommandOutput::default()
                }),
            },
            None => Some(CommandOutput {
                code: 22,
                stderr: format!("404 Not Found: {url}"),
                ..CommandOutput::default()
            }),
        }
    }
}

#[async_trait]
impl Host for FakeHost {
    async fn effective_uid(&self) -> Result<u32> {
        Ok(self.uid)
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        self.tools
            .contains(name)
            .then(|| PathBuf::from("/usr/bin").join(name))
    }

    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        if let Ok(mut cmds) = self.commands.lock() {
            cmds.push(spec.clone());
        }
        let line = spec.display();
        if let Ok(mut queue) = self.one_shot.lock()
            && let Some(idx) = queue.iter().position(|(p, _)| line.starts_with(p.as_str()))
            && let Some((_, out)) = queue.remove(idx)
        {
            return Ok(out);
        }
        if let Some((_, out)) = self.responses.iter().find(|(p, _)| line.starts_with(p.as_str())) {
            return Ok(out.clone());
        }
        if let Some(out) = self.simulate_download(spec) {
            return Ok(out);
        }
        if line.starts_with("systemctl is-active") {
            return Ok(CommandOutput {
                code: 0,
                stdout: "active\n".into(),
                stderr: String::new(),
            });
        }
        Ok(CommandOutput::default())
    }
}

/// 按顺序回放预设输入的 [`Prompt`]
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    pub interactive: bool,
    pub answers: VecDeque<String>,
    pub questions: Vec<String>,
    pub notices: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interactive: true,
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// 无交互输入流
    pub fn closed() -> Self {
        Self::default()
    }
}

impl Prompt for ScriptedPrompt {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        self.questions.push(question.to_string());
        self.answers.pop_front()
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}
