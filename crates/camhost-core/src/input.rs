//! 连接地址解析：命令行参数 > 环境变量 > 交互式输入

use crate::error::{CoreError, Result};

/// 交互输入抽象；终端实现位于 CLI，测试中使用脚本化实现
pub trait Prompt {
    /// 是否存在可交互的输入流
    fn is_interactive(&self) -> bool;

    /// 读取一行；输入流关闭时返回 None
    fn ask(&mut self, question: &str) -> Option<String>;

    /// 输出一条提示（例如输入不合法）
    fn notice(&mut self, message: &str);

    /// 是/否确认，默认否。输入流关闭时返回 None
    fn confirm(&mut self, question: &str) -> Option<bool> {
        let answer = self.ask(&format!("{question} (y/N)"))?;
        Some(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes" | "true"
        ))
    }
}

/// 地址来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    Flag,
    Env,
    Prompt,
}

impl std::fmt::Display for UrlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            UrlSource::Flag => "command line",
            UrlSource::Env => "environment",
            UrlSource::Prompt => "prompt",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    pub url: String,
    pub source: UrlSource,
}

pub struct UrlResolver<'a> {
    prefix: &'a str,
    max_attempts: u32,
}

impl<'a> UrlResolver<'a> {
    pub fn new(prefix: &'a str, max_attempts: u32) -> Self {
        Self {
            prefix,
            max_attempts: max_attempts.max(1),
        }
    }

    /// 校验地址：必须以固定前缀开头且不为空；返回去掉首尾空白后的值
    pub fn validate(&self, value: &str) -> Result<String> {
        let v = value.trim();
        let Some(rest) = v.strip_prefix(self.prefix) else {
            return Err(CoreError::invalid_input(format!(
                "camera URL must start with {}",
                self.prefix
            )));
        };
        if rest.is_empty() {
            return Err(CoreError::invalid_input(format!(
                "camera URL has nothing after {}",
                self.prefix
            )));
        }
        if v.chars().any(char::is_control) {
            return Err(CoreError::invalid_input(
                "camera URL contains control characters",
            ));
        }
        Ok(v.to_string())
    }

    /// 按优先级解析。参数或环境变量不合法时继续尝试下一来源，
    /// 交互输入最多尝试 `max_attempts` 次。
    pub fn resolve(
        &self,
        flag: Option<&str>,
        env: Option<&str>,
        prompt: &mut dyn Prompt,
    ) -> Result<ResolvedUrl> {
        for (value, source) in [(flag, UrlSource::Flag), (env, UrlSource::Env)] {
            let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match self.validate(value) {
                Ok(url) => {
                    tracing::debug!(%source, "camera URL resolved");
                    return Ok(ResolvedUrl { url, source });
                }
                Err(e) => {
                    tracing::warn!(%source, "ignoring camera URL: {e}");
                    prompt.notice(&format!("Ignoring camera URL from {source}: {e}"));
                }
            }
        }

        if !prompt.is_interactive() {
            return Err(CoreError::NotInteractive {
                what: "camera URL".into(),
            });
        }

        let question = format!("Camera URL ({}...)", self.prefix);
        for attempt in 1..=self.max_attempts {
            let Some(answer) = prompt.ask(&question) else {
                return Err(CoreError::NotInteractive {
                    what: "camera URL".into(),
                });
            };
            match self.validate(&answer) {
                Ok(url) => {
                    return Ok(ResolvedUrl {
                        url,
                        source: UrlSource::Prompt,
                    });
                }
                Err(e) => {
                    tracing::debug!(attempt, "rejected camera URL");
                    prompt.notice(&format!("{e} ({attempt}/{})", self.max_attempts));
                }
            }
        }

        Err(CoreError::InputExhausted {
            what: "camera URL".into(),
            attempts: self.max_attempts,
        })
    }
}
