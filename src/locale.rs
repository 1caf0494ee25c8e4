use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Chinese,
    English,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Chinese => "zh",
            Language::English => "en",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePreference {
    #[default]
    Auto,
    #[serde(alias = "zh")]
    Chinese,
    #[serde(alias = "en")]
    English,
}

impl LanguagePreference {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(LanguagePreference::Auto),
            "zh" | "cn" | "chinese" => Some(LanguagePreference::Chinese),
            "en" | "english" => Some(LanguagePreference::English),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("no locale variable is set (checked {checked})")]
    Unset { checked: String },
}

pub trait LocaleDetector {
    fn detect(&self) -> Result<Language, LocaleError>;
}

const LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Reads the POSIX locale variables in precedence order.
#[derive(Debug, Default)]
pub struct EnvLocaleDetector;

impl LocaleDetector for EnvLocaleDetector {
    fn detect(&self) -> Result<Language, LocaleError> {
        let value = LOCALE_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
            .ok_or_else(|| LocaleError::Unset {
                checked: LOCALE_VARS.join(", "),
            })?;
        Ok(language_from_tag(&value))
    }
}

pub fn language_from_tag(tag: &str) -> Language {
    let tag = tag.trim().to_ascii_lowercase();
    if tag.starts_with("zh") || tag.starts_with("chinese") {
        Language::Chinese
    } else {
        Language::English
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelection {
    pub language: Language,
    /// Set when detection failed and the primary language was used instead.
    pub detection_warning: Option<String>,
}

pub fn select_language(
    preference: LanguagePreference,
    detector: &dyn LocaleDetector,
) -> LanguageSelection {
    let language = match preference {
        LanguagePreference::Chinese => Language::Chinese,
        LanguagePreference::English => Language::English,
        LanguagePreference::Auto => match detector.detect() {
            Ok(language) => language,
            Err(err) => {
                // Detection failure falls back to the primary language, not English.
                return LanguageSelection {
                    language: Language::Chinese,
                    detection_warning: Some(format!(
                        "系统语言检测警告: {err}，默认使用中文显示"
                    )),
                };
            }
        },
    };
    LanguageSelection {
        language,
        detection_warning: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    DetectingMods,
    ErrorDirNotFound,
    ConfirmDirExists,
    JsonError,
    PermissionError,
    ProcessFail,
    TableHeaderIndex,
    TableHeaderModName,
    TableHeaderStatus,
    StatusEnabled,
    StatusTurnedOn,
    StatusError,
    StatusWarning,
    StatusErrorDetail,
    ModUnknown,
    ModFormatError,
    ModPermissionError,
    ModProcessFail,
    ResultAllEnabled,
    ResultModified,
    ResultNoFiles,
    ResultNoModified,
    PressEnterClose,
    ProgramError,
    ConsoleTitle,
    AuthorDesc,
}

pub const AUTHOR: &str = "JangFullmoon";

fn zh(key: MessageKey) -> &'static str {
    match key {
        MessageKey::DetectingMods => "正在检测Mod开启情况...",
        MessageKey::ErrorDirNotFound => "错误：未找到Mod目录",
        MessageKey::ConfirmDirExists => "请确认inZOI/Mods文件夹是否存在于“Documents”目录下",
        MessageKey::JsonError => "JSON格式错误: {file_path}",
        MessageKey::PermissionError => "权限不足: {file_path}",
        MessageKey::ProcessFail => "处理文件失败 {file_path}: {error_msg}",
        MessageKey::TableHeaderIndex => "序号",
        MessageKey::TableHeaderModName => "Mod名称",
        MessageKey::TableHeaderStatus => "状态",
        MessageKey::StatusEnabled => "已开启",
        MessageKey::StatusTurnedOn => "开启",
        MessageKey::StatusError => "错误",
        MessageKey::StatusWarning => "警告",
        MessageKey::StatusErrorDetail => "错误: {error_msg}",
        MessageKey::ModUnknown => "未知Mod ({dir_name})",
        MessageKey::ModFormatError => "格式错误 ({dir_name})",
        MessageKey::ModPermissionError => "权限不足 ({dir_name})",
        MessageKey::ModProcessFail => "处理失败 ({dir_name})",
        MessageKey::ResultAllEnabled => "共检测到 {total} 个Mod，Mod均已开启，无需修改。",
        MessageKey::ResultModified => {
            "共检测到 {total} 个Mod，操作完成！本次共修改 {modified} 个Mod。"
        }
        MessageKey::ResultNoFiles => "未找到任何Mod配置文件",
        MessageKey::ResultNoModified => "操作完成！共修改 {modified} 个mod配置文件。",
        MessageKey::PressEnterClose => "按回车键关闭窗口……",
        MessageKey::ProgramError => "程序执行出错: {error_msg}",
        MessageKey::ConsoleTitle => "inZOI Mod 启用工具",
        MessageKey::AuthorDesc => "inZOI Mod 启用工具",
    }
}

fn en(key: MessageKey) -> &'static str {
    match key {
        MessageKey::DetectingMods => "Detecting Mod activation status...",
        MessageKey::ErrorDirNotFound => "Error: Mod directory not found",
        MessageKey::ConfirmDirExists => {
            "Please confirm if the inZOI/Mods folder exists in the 'Documents' directory"
        }
        MessageKey::JsonError => "JSON format error: {file_path}",
        MessageKey::PermissionError => "Permission denied: {file_path}",
        MessageKey::ProcessFail => "Failed to process file {file_path}: {error_msg}",
        MessageKey::TableHeaderIndex => "No.",
        MessageKey::TableHeaderModName => "Mod Name",
        MessageKey::TableHeaderStatus => "Status",
        MessageKey::StatusEnabled => "Already Enabled",
        MessageKey::StatusTurnedOn => "Enabled",
        MessageKey::StatusError => "Error",
        MessageKey::StatusWarning => "Warning",
        MessageKey::StatusErrorDetail => "Error: {error_msg}",
        MessageKey::ModUnknown => "Unknown Mod ({dir_name})",
        MessageKey::ModFormatError => "Format Error ({dir_name})",
        MessageKey::ModPermissionError => "Permission Denied ({dir_name})",
        MessageKey::ModProcessFail => "Process Failed ({dir_name})",
        MessageKey::ResultAllEnabled => {
            "Detected {total} Mods in total, all Mods are already enabled, no modifications needed."
        }
        MessageKey::ResultModified => {
            "Detected {total} Mods in total, operation completed! Modified {modified} Mods this time."
        }
        MessageKey::ResultNoFiles => "No Mod configuration files found",
        MessageKey::ResultNoModified => {
            "Operation completed! Modified {modified} Mod configuration files in total."
        }
        MessageKey::PressEnterClose => "Press Enter to close the window...",
        MessageKey::ProgramError => "Program execution error: {error_msg}",
        MessageKey::ConsoleTitle => "inZOI Mod Enable Tools",
        MessageKey::AuthorDesc => "inZOI Mod Enable Tools",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Messages {
    language: Language,
}

impl Messages {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn template(&self, key: MessageKey) -> &'static str {
        match self.language {
            Language::Chinese => zh(key),
            Language::English => en(key),
        }
    }

    pub fn text(&self, key: MessageKey) -> String {
        self.template(key).to_string()
    }

    /// Substitutes `{name}` placeholders; unknown placeholders are left as-is.
    pub fn format(&self, key: MessageKey, args: &[(&str, &str)]) -> String {
        let mut out = self.template(key).to_string();
        for (name, value) in args {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }
}
