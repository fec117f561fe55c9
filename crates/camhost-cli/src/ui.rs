use camhost_core::input::Prompt;
use camhost_core::install::{InstallReporter, InstallStep};
use console::{Emoji, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufRead, IsTerminal, StdinLock, Write};
use std::time::Duration;

pub struct Symbols;
impl Symbols {
    pub const SUCCESS: Emoji<'static, 'static> = Emoji("✔", "+");
    pub const ERROR: Emoji<'static, 'static> = Emoji("✖", "x");
    pub const WARNING: Emoji<'static, 'static> = Emoji("⚠", "!");
    pub const INFO: Emoji<'static, 'static> = Emoji("ℹ", "i");
    pub const ARROW: Emoji<'static, 'static> = Emoji("➜", ">");
    pub const STEP: Emoji<'static, 'static> = Emoji("⚡", "*");
}

pub fn print_header(title: &str) {
    println!();
    println!("{} {}", Symbols::STEP, style(title).bold().underlined());
    println!();
}

pub fn print_status(message: &str, success: bool) {
    if success {
        println!("  {} {}", style(Symbols::SUCCESS).green(), message);
    } else {
        println!("  {} {}", style(Symbols::ERROR).red(), message);
    }
}

pub fn print_warning(message: &str) {
    println!("  {} {}", style(Symbols::WARNING).yellow(), message);
}

pub fn print_info(message: &str) {
    println!("  {} {}", style(Symbols::INFO).blue(), message);
}

pub fn print_next_step(message: &str) {
    println!("  {} {}", style(Symbols::ARROW).cyan(), message);
}

pub fn log_detail(key: &str, value: &str) {
    println!("    {}: {}", style(key).dim(), value);
}

pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("  {spinner:.blue} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// 终端交互输入。提问写到 stderr，从 stdin 读取；stdin 不是终端时视为不可交互
pub struct TermPrompt<R> {
    reader: R,
    interactive: bool,
}

impl TermPrompt<StdinLock<'static>> {
    pub fn stdin() -> Self {
        let stdin = std::io::stdin();
        let interactive = stdin.is_terminal();
        Self::new(stdin.lock(), interactive)
    }
}

impl<R: BufRead> TermPrompt<R> {
    pub fn new(reader: R, interactive: bool) -> Self {
        Self {
            reader,
            interactive,
        }
    }
}

impl<R: BufRead> Prompt for TermPrompt<R> {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        eprintln!("  {} {}", style("?").blue(), question);
        eprint!("  {} ", style(Symbols::ARROW).cyan());
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn notice(&mut self, message: &str) {
        eprintln!("  {} {}", style(Symbols::WARNING).yellow(), message);
    }
}

/// 安装进度：耗时步骤用 spinner，可能提问的步骤直接输出
#[derive(Default)]
pub struct StepReporter {
    spinner: Option<ProgressBar>,
    current: Option<InstallStep>,
}

impl StepReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 流程失败时标记当前步骤
    pub fn abort(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        if let Some(step) = self.current.take() {
            print_status(step.label(), false);
        }
    }

    fn interactive_step(step: InstallStep) -> bool {
        matches!(step, InstallStep::ResolveUrl | InstallStep::CheckExisting)
    }
}

impl InstallReporter for StepReporter {
    fn started(&mut self, step: InstallStep) {
        self.current = Some(step);
        if !Self::interactive_step(step) && std::io::stdout().is_terminal() {
            self.spinner = Some(create_spinner(step.label()));
        }
    }

    fn finished(&mut self, step: InstallStep, detail: &str) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
        self.current = None;
        if detail.is_empty() {
            print_status(step.label(), true);
        } else {
            print_status(&format!("{} {}", step.label(), style(format!("({detail})")).dim()), true);
        }
    }
}

impl Drop for StepReporter {
    fn drop(&mut self) {
        if let Some(pb) = self.spinner.take() {
            pb.finish_and_clear();
        }
    }
}
