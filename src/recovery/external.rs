//! Strategies that delegate to programs installed on the host

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::command::{failure_reason, find_executable, run_with_timeout};
use super::{Recovered, RecoveryContext, RecoveryStrategy, StrategyError};
use crate::encoding::{TEXT_FILE_ENCODINGS, decode_lossy};

const OFFICE_CANDIDATES: &[&str] = &[
    "libreoffice",
    "soffice",
    "/usr/bin/libreoffice",
    "/usr/bin/soffice",
    "/usr/local/bin/libreoffice",
    "/usr/local/bin/soffice",
    "/opt/libreoffice/program/soffice",
    "/snap/bin/libreoffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
];

/// Headless LibreOffice `--convert-to docx`.
#[derive(Debug, Clone, Default)]
pub struct OfficeSuite {
    extra_paths: Vec<PathBuf>,
}

impl OfficeSuite {
    pub fn new(extra_paths: Vec<PathBuf>) -> Self {
        Self { extra_paths }
    }

    fn discover(&self) -> Option<PathBuf> {
        self.extra_paths
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .or_else(|| OFFICE_CANDIDATES.iter().find_map(|c| find_executable(c)))
    }
}

impl RecoveryStrategy for OfficeSuite {
    fn name(&self) -> &'static str {
        "office_suite"
    }

    fn attempt(&self, path: &Path, ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        let program = self.discover().ok_or(StrategyError::Unavailable)?;

        let outdir = ctx.temp_dir.join(format!("convert_{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&outdir)?;

        let args: [&OsStr; 6] = [
            OsStr::new("--headless"),
            OsStr::new("--convert-to"),
            OsStr::new("docx"),
            OsStr::new("--outdir"),
            outdir.as_os_str(),
            path.as_os_str(),
        ];
        let result = run_with_timeout(&program, args, ctx.conversion_timeout).and_then(|output| {
            let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
            let converted = outdir.join(format!("{stem}.docx"));
            if !output.status.success() || !converted.is_file() {
                return Err(StrategyError::Failed(failure_reason(&output)));
            }
            Ok(std::fs::read(converted)?)
        });

        let _ = std::fs::remove_dir_all(&outdir);
        Ok(Recovered::package("LibreOffice", result?))
    }
}

/// Word COM automation through PowerShell. Windows only.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutomationBridge;

impl AutomationBridge {
    fn script(input: &Path, output: &Path) -> String {
        let quote = |p: &Path| p.display().to_string().replace('\'', "''");
        format!(
            "$ErrorActionPreference = 'Stop'; \
             $word = New-Object -ComObject Word.Application; \
             $word.Visible = $false; \
             try {{ \
               $doc = $word.Documents.Open('{}', $false, $true); \
               $doc.SaveAs2('{}', 16); \
               $doc.Close($false) \
             }} finally {{ $word.Quit() }}",
            quote(input),
            quote(output)
        )
    }
}

impl RecoveryStrategy for AutomationBridge {
    fn name(&self) -> &'static str {
        "platform_automation"
    }

    fn attempt(&self, path: &Path, ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        if !cfg!(windows) {
            return Err(StrategyError::Unavailable);
        }
        let shell = find_executable("powershell").ok_or(StrategyError::Unavailable)?;

        std::fs::create_dir_all(&ctx.temp_dir)?;
        let absolute = std::fs::canonicalize(path)?;
        let target = ctx
            .temp_dir
            .join(format!("automation_{}.docx", Uuid::new_v4().simple()));
        let script = Self::script(&absolute, &target);

        let output = run_with_timeout(
            &shell,
            ["-NoProfile", "-NonInteractive", "-Command", script.as_str()],
            ctx.conversion_timeout,
        )?;
        if !output.status.success() || !target.is_file() {
            return Err(StrategyError::Failed(failure_reason(&output)));
        }

        let bytes = std::fs::read(&target)?;
        let _ = std::fs::remove_file(&target);
        Ok(Recovered::package("Microsoft Word", bytes))
    }
}

#[derive(Debug, Clone, Copy)]
enum ToolOutput {
    Stdout,
    /// The tool writes to a file given as its last argument.
    File,
}

#[derive(Debug, Clone)]
struct TextTool {
    program: &'static str,
    flags: &'static [&'static str],
    output: ToolOutput,
}

/// Single-purpose `.doc` text extractors, tried in a fixed order.
#[derive(Debug, Clone)]
pub struct TextTools {
    tools: Vec<TextTool>,
}

impl TextTools {
    pub fn standard() -> Self {
        Self {
            tools: vec![
                TextTool {
                    program: "antiword",
                    flags: &[],
                    output: ToolOutput::Stdout,
                },
                TextTool {
                    program: "catdoc",
                    flags: &["-w"],
                    output: ToolOutput::Stdout,
                },
                TextTool {
                    program: "wvText",
                    flags: &[],
                    output: ToolOutput::File,
                },
            ],
        }
    }

    fn run_tool(
        tool: &TextTool,
        program: &Path,
        path: &Path,
        ctx: &RecoveryContext,
    ) -> Result<String, StrategyError> {
        let mut args: Vec<OsString> = tool.flags.iter().map(OsString::from).collect();
        args.push(path.as_os_str().to_owned());

        let bytes = match tool.output {
            ToolOutput::Stdout => {
                let output = run_with_timeout(program, &args, ctx.tool_timeout)?;
                if !output.status.success() {
                    return Err(StrategyError::Failed(failure_reason(&output)));
                }
                output.stdout
            }
            ToolOutput::File => {
                std::fs::create_dir_all(&ctx.temp_dir)?;
                let target = ctx
                    .temp_dir
                    .join(format!("{}_{}.txt", tool.program, Uuid::new_v4().simple()));
                args.push(target.as_os_str().to_owned());
                let output = run_with_timeout(program, &args, ctx.tool_timeout);
                let bytes = std::fs::read(&target);
                let _ = std::fs::remove_file(&target);
                let output = output?;
                if !output.status.success() {
                    return Err(StrategyError::Failed(failure_reason(&output)));
                }
                bytes?
            }
        };

        Ok(decode_lossy(&bytes, TEXT_FILE_ENCODINGS))
    }
}

impl RecoveryStrategy for TextTools {
    fn name(&self) -> &'static str {
        "text_tools"
    }

    fn attempt(&self, path: &Path, ctx: &RecoveryContext) -> Result<Recovered, StrategyError> {
        let mut last_error = StrategyError::Unavailable;

        for tool in &self.tools {
            let Some(program) = find_executable(tool.program) else {
                continue;
            };
            match Self::run_tool(tool, &program, path, ctx) {
                Ok(text) if text.trim().chars().count() >= ctx.min_tool_output => {
                    return Ok(Recovered::text(tool.program, text));
                }
                Ok(_) => last_error = StrategyError::NoText,
                Err(err) => last_error = err,
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automation_script_escapes_quotes() {
        let script = AutomationBridge::script(Path::new("C:/it's.doc"), Path::new("C:/out.docx"));
        assert!(script.contains("'C:/it''s.doc'"));
        assert!(script.contains("SaveAs2('C:/out.docx', 16)"));
    }

    #[test]
    fn text_tools_keep_fixed_order() {
        let names: Vec<_> = TextTools::standard()
            .tools
            .iter()
            .map(|t| t.program)
            .collect();
        assert_eq!(names, ["antiword", "catdoc", "wvText"]);
    }
}
