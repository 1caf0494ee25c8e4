use crate::{
    config::{self, AppConfig},
    inzoi::{self, LocateError},
    locale::{select_language, EnvLocaleDetector, LanguagePreference, MessageKey, Messages},
    logging::{self, Verbosity},
    manifest,
    report::{self, Console, Tone},
};
use anyhow::{bail, Result};
use crossterm::{execute, terminal};
use std::{
    io::{self, IsTerminal, Write},
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

const DEFAULT_WIDTH: u16 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    mods_dir: Option<PathBuf>,
    language: Option<LanguagePreference>,
    format: OutputFormat,
    no_wait: bool,
    verbosity: Verbosity,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            mods_dir: None,
            language: None,
            format: OutputFormat::Text,
            no_wait: false,
            verbosity: Verbosity::Normal,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CliAction {
    Run(CliOptions),
    Help,
    Version,
}

pub fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match parse_args(&args)? {
        CliAction::Help => {
            print_help();
            Ok(())
        }
        CliAction::Version => {
            println!("inzoi-mod-enabler v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliAction::Run(options) => run_scan(options),
    }
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" | "help" => return Ok(CliAction::Help),
            "--version" | "-V" | "version" => return Ok(CliAction::Version),
            "--mods-dir" => {
                let Some(value) = iter.next() else {
                    bail!("--mods-dir requires a path");
                };
                options.mods_dir = Some(PathBuf::from(value));
            }
            value if value.starts_with("--mods-dir=") => {
                options.mods_dir = Some(PathBuf::from(value.trim_start_matches("--mods-dir=")));
            }
            "--lang" => {
                let Some(value) = iter.next() else {
                    bail!("--lang requires a value");
                };
                options.language = Some(parse_language(value)?);
            }
            value if value.starts_with("--lang=") => {
                options.language = Some(parse_language(value.trim_start_matches("--lang="))?);
            }
            "--format" => {
                let Some(value) = iter.next() else {
                    bail!("--format requires a value");
                };
                options.format = parse_format(value)?;
            }
            value if value.starts_with("--format=") => {
                options.format = parse_format(value.trim_start_matches("--format="))?;
            }
            "--no-wait" => options.no_wait = true,
            "-q" | "--quiet" => options.verbosity = Verbosity::Quiet,
            "--verbose" => options.verbosity = Verbosity::Verbose,
            "--verbosity" => {
                let Some(level) = iter.next() else {
                    bail!("--verbosity requires a level");
                };
                options.verbosity = Verbosity::parse(level)
                    .ok_or_else(|| anyhow::anyhow!("Unknown verbosity: {level}"))?;
            }
            value if value.starts_with("-v") && !value.starts_with("--") => {
                let count = value.chars().filter(|ch| *ch == 'v').count();
                options.verbosity = if count >= 2 {
                    Verbosity::Debug
                } else {
                    Verbosity::Verbose
                };
            }
            other => bail!("Unknown argument: {other} (see --help)"),
        }
    }
    Ok(CliAction::Run(options))
}

fn parse_language(value: &str) -> Result<LanguagePreference> {
    LanguagePreference::parse(value)
        .ok_or_else(|| anyhow::anyhow!("Unknown language: {value} (use 'auto', 'zh', or 'en')"))
}

fn parse_format(value: &str) -> Result<OutputFormat> {
    OutputFormat::parse(value)
        .ok_or_else(|| anyhow::anyhow!("Unknown format: {value} (use 'text' or 'json')"))
}

fn run_scan(options: CliOptions) -> Result<()> {
    if let Ok(data_dir) = config::base_data_dir() {
        if let Some(path) = logging::init(&data_dir, options.verbosity) {
            info!("Session log: {}", path.display());
        }
    }

    let config = match AppConfig::load_or_create() {
        Ok(config) => config,
        Err(err) => {
            warn!("Config unavailable, using defaults: {err:#}");
            AppConfig::default()
        }
    };
    let selection = select_language(
        options.language.unwrap_or(config.language),
        &EnvLocaleDetector,
    );
    info!("Language: {}", selection.language.code());
    let messages = Messages::new(selection.language);
    let mods_dir = options.mods_dir.or(config.mods_dir);

    if options.format == OutputFormat::Json {
        let root = inzoi::locate(mods_dir.as_deref())?;
        let report = manifest::scan(&root);
        println!("{}", report::to_json(&report, &messages)?);
        return Ok(());
    }

    let wait = config.wait_for_keypress && !options.no_wait;
    let stdout = io::stdout();
    let interactive = stdout.is_terminal();
    if interactive {
        let _ = execute!(
            io::stdout(),
            terminal::SetTitle(messages.text(MessageKey::ConsoleTitle))
        );
    }
    let width = terminal::size()
        .map(|(columns, _)| columns)
        .unwrap_or(DEFAULT_WIDTH);
    let mut console = Console::new(stdout.lock(), messages, interactive, width);

    if let Some(warning) = &selection.detection_warning {
        warn!("{warning}");
        console.line(warning, Tone::Warning)?;
    }

    match scan_and_report(&mut console, mods_dir.as_deref()) {
        Ok(()) => console.closing(wait)?,
        Err(err) => {
            error!("Program error: {err:#}");
            console.program_error(&err)?;
        }
    }

    if wait {
        wait_for_enter();
    }
    Ok(())
}

fn scan_and_report<W: Write>(console: &mut Console<W>, mods_dir: Option<&Path>) -> Result<()> {
    console.detecting()?;
    let root = match inzoi::locate(mods_dir) {
        Ok(root) => root,
        Err(LocateError::DirectoryNotFound { path }) => {
            warn!("Mod directory not found: {}", path.display());
            console.directory_not_found(&path)?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    let report = manifest::scan(&root);
    let summary = report.summary();
    info!(
        "Scanned {} manifest(s), modified {}, errors {}",
        summary.total_count, summary.modified_count, summary.error_count
    );
    console.report(&report)?;
    Ok(())
}

fn wait_for_enter() {
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}

fn print_help() {
    println!("inzoi-mod-enabler v{}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  inzoi-mod-enabler [options]     Enable every disabled mod under Documents/inZOI/Mods");
    println!();
    println!("Options:");
    println!("  --mods-dir <path>               Scan this directory instead of the detected one");
    println!("  --lang <auto|zh|en>             Display language (default: auto)");
    println!("  --format <text|json>            Output format (default: text)");
    println!("  --no-wait                       Exit without waiting for Enter");
    println!("  -q, --quiet                     Log errors only");
    println!("  -v, -vv                         Increase log verbosity");
    println!("  --verbosity <level>             quiet | normal | verbose | debug");
    println!("  -h, --help                      Show help");
    println!("  -V, --version                   Show version");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn parse_run(values: &[&str]) -> CliOptions {
        match parse_args(&args(values)).unwrap() {
            CliAction::Run(options) => options,
            other => panic!("unexpected action: {other:?}"),
        }
    }

    #[test]
    fn test_no_args_runs_with_defaults() {
        assert_eq!(parse_run(&[]), CliOptions::default());
    }

    #[test]
    fn test_parses_all_options() {
        let options = parse_run(&[
            "--mods-dir",
            "/tmp/Mods",
            "--lang=en",
            "--format",
            "json",
            "--no-wait",
            "-vv",
        ]);
        assert_eq!(options.mods_dir, Some(PathBuf::from("/tmp/Mods")));
        assert_eq!(options.language, Some(LanguagePreference::English));
        assert_eq!(options.format, OutputFormat::Json);
        assert!(options.no_wait);
        assert_eq!(options.verbosity, Verbosity::Debug);
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(&args(&["--help"])).unwrap(), CliAction::Help);
        assert_eq!(parse_args(&args(&["-V"])).unwrap(), CliAction::Version);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse_args(&args(&["--lang", "fr"])).is_err());
        assert!(parse_args(&args(&["--format=xml"])).is_err());
        assert!(parse_args(&args(&["--mods-dir"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_scan_and_report_handles_missing_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let missing = temp.path().join("Mods");
        let mut console = Console::new(
            Vec::new(),
            Messages::new(crate::locale::Language::English),
            false,
            80,
        );

        scan_and_report(&mut console, Some(&missing)).unwrap();
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert!(text.contains("Error: Mod directory not found"));
        assert!(!missing.exists());
    }

    #[test]
    fn test_scan_and_report_renders_table() {
        let temp = tempfile::TempDir::new().unwrap();
        let mod_dir = temp.path().join("A");
        std::fs::create_dir_all(&mod_dir).unwrap();
        std::fs::write(
            mod_dir.join("mod_manifest.json"),
            r#"{"friendlyName":"Foo","bEnable":false}"#,
        )
        .unwrap();
        let mut console = Console::new(
            Vec::new(),
            Messages::new(crate::locale::Language::English),
            false,
            80,
        );

        scan_and_report(&mut console, Some(temp.path())).unwrap();
        let text = String::from_utf8(console.into_inner()).unwrap();
        assert!(text.contains("Detecting Mod activation status..."));
        assert!(text.contains("Foo"));
        assert!(text.contains("Modified 1 Mods this time"));
    }
}
