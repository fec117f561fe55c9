//! systemd 服务单元描述与渲染
//!
//! 所有写入单元文件的值都经过转义：`%` 说明符、`$` 变量展开、
//! 引号与空白都不会改变单元的含义，包含换行的值直接拒绝。

use crate::error::{CoreError, Result};
use crate::host::is_executable;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub name: String,
    pub description: String,
    pub exec_start: PathBuf,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    /// systemd Restart= 策略
    pub restart: String,
    /// None 表示以 root 运行
    pub user: Option<String>,
}

impl ServiceUnit {
    /// 渲染为单元文件内容
    pub fn render(&self) -> Result<String> {
        let mut exec = quote_exec_arg(&self.exec_start.to_string_lossy())?;
        for a in &self.args {
            exec.push(' ');
            exec.push_str(&quote_exec_arg(a)?);
        }

        let mut s = String::new();
        let _ = writeln!(s, "[Unit]");
        let _ = writeln!(s, "Description={}", escape_value(&self.description)?);
        let _ = writeln!(s, "After=network-online.target");
        let _ = writeln!(s, "Wants=network-online.target");
        let _ = writeln!(s);
        let _ = writeln!(s, "[Service]");
        let _ = writeln!(s, "Type=simple");
        if let Some(user) = &self.user {
            let user = escape_value(user)?;
            let _ = writeln!(s, "User={user}");
        }
        let _ = writeln!(
            s,
            "WorkingDirectory={}",
            escape_value(&self.working_directory.to_string_lossy())?
        );
        let _ = writeln!(s, "ExecStart={exec}");
        let _ = writeln!(s, "Restart={}", escape_value(&self.restart)?);
        let _ = writeln!(s, "RestartSec=3s");
        let _ = writeln!(s, "StandardOutput=journal");
        let _ = writeln!(s, "StandardError=journal");
        let _ = writeln!(s);
        let _ = writeln!(s, "[Install]");
        let _ = writeln!(s, "WantedBy=multi-user.target");
        Ok(s)
    }

    /// 激活前检查：ExecStart 指向的文件必须存在且可执行
    pub fn ensure_executable(&self) -> Result<()> {
        if !self.exec_start.is_absolute() {
            return Err(CoreError::invalid_input(format!(
                "ExecStart must be an absolute path: {}",
                self.exec_start.display()
            )));
        }
        if !is_executable(&self.exec_start) {
            return Err(CoreError::File {
                path: self.exec_start.clone(),
                message: "service executable is missing or not executable".into(),
            });
        }
        Ok(())
    }
}

fn reject_control(value: &str) -> Result<()> {
    if value.chars().any(char::is_control) {
        return Err(CoreError::invalid_input(format!(
            "unit value contains control characters: {value:?}"
        )));
    }
    Ok(())
}

/// 普通键值：转义 `%`
pub fn escape_value(value: &str) -> Result<String> {
    reject_control(value)?;
    Ok(value.replace('%', "%%"))
}

/// ExecStart 的单个参数
pub fn quote_exec_arg(arg: &str) -> Result<String> {
    reject_control(arg)?;
    if arg.is_empty() {
        return Ok("\"\"".to_string());
    }
    let needs_quotes = arg
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | ';'));

    let mut out = String::with_capacity(arg.len() + 2);
    if needs_quotes {
        out.push('"');
    }
    for c in arg.chars() {
        match c {
            '%' => out.push_str("%%"),
            '$' => out.push_str("$$"),
            '\\' if needs_quotes => out.push_str("\\\\"),
            '"' if needs_quotes => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    if needs_quotes {
        out.push('"');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    fn unit(user: Option<&str>) -> ServiceUnit {
        ServiceUnit {
            name: "camhost".into(),
            description: "camhost stream server (go2rtc)".into(),
            exec_start: PathBuf::from("/opt/camhost/go2rtc"),
            args: vec!["-config".into(), "/opt/camhost/go2rtc.json".into()],
            working_directory: PathBuf::from("/opt/camhost"),
            restart: "always".into(),
            user: user.map(String::from),
        }
    }

    #[test]
    fn renders_dedicated_user_unit() {
        let text = unit(Some("camhost")).render().unwrap();
        assert!(text.contains("ExecStart=/opt/camhost/go2rtc -config /opt/camhost/go2rtc.json\n"));
        assert!(text.contains("WorkingDirectory=/opt/camhost\n"));
        assert!(text.contains("User=camhost\n"));
        assert!(!text.contains("Group="));
        assert!(text.contains("Restart=always\n"));
        assert!(text.ends_with("WantedBy=multi-user.target\n"));
    }

    #[test]
    fn root_unit_has_no_user_lines() {
        let text = unit(None).render().unwrap();
        assert!(!text.contains("User="));
        assert!(!text.contains("Group="));
    }

    #[test]
    fn exec_args_are_quoted_and_escaped() {
        assert_eq!(quote_exec_arg("/opt/cam host/bin").unwrap(), "\"/opt/cam host/bin\"");
        assert_eq!(quote_exec_arg(r#"a"b"#).unwrap(), r#""a\"b""#);
        assert_eq!(quote_exec_arg(r"a\b").unwrap(), r#""a\\b""#);
        assert_eq!(quote_exec_arg("50%").unwrap(), "50%%");
        assert_eq!(quote_exec_arg("$HOME").unwrap(), "$$HOME");
        assert_eq!(quote_exec_arg("").unwrap(), "\"\"");
    }

    #[test]
    fn newlines_cannot_inject_directives() {
        let mut u = unit(None);
        u.description = "x\nExecStartPre=/bin/rm -rf /".into();
        assert!(u.render().is_err());

        let mut u = unit(None);
        u.args.push("a\nb".into());
        assert!(u.render().is_err());
    }

    #[test]
    fn percent_in_working_directory() {
        let mut u = unit(None);
        u.working_directory = PathBuf::from("/srv/100%cams");
        assert!(u.render().unwrap().contains("WorkingDirectory=/srv/100%%cams\n"));
    }

    #[test]
    fn executable_invariant() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("go2rtc");
        let mut u = unit(None);
        u.exec_start = bin.clone();
        assert!(u.ensure_executable().is_err());

        std::fs::write(&bin, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(u.ensure_executable().is_err());

        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        u.ensure_executable().unwrap();

        u.exec_start = PathBuf::from("go2rtc");
        assert!(u.ensure_executable().is_err());
    }
}
