//! Title catalog of one scanned source.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::parser::parse_scan_output;
use super::types::{Dialect, ParsedScan, ScanError, ScanResult};
use crate::config::Settings;
use crate::models::Title;
use crate::runner::{ToolCommand, ToolError, ToolRunner};

/// Titles of a source, addressable by probe number and by user number.
///
/// Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct ScanCatalog {
    source: PathBuf,
    dialect: Dialect,
    num_titles: u32,
    titles_by_number: BTreeMap<u32, Title>,
    /// user number -> probe number
    #[serde(skip)]
    titles_by_user_number: BTreeMap<u32, u32>,
}

impl ScanCatalog {
    /// Scan `source`, reusing the cached probe output when allowed.
    pub fn scan(source: &Path, settings: &Settings, runner: &dyn ToolRunner) -> ScanResult<Self> {
        let cache = cache_path(source);

        if settings.scan.cache_scans && cache.is_file() {
            tracing::info!("Using cached scan {}", cache.display());
            let text = fs::read_to_string(&cache).map_err(|e| ScanError::cache(&cache, e))?;
            return Self::from_scan_output(source, &text);
        }

        let probe = &settings.tools.probe;
        let cmd = ToolCommand::new(probe)
            .args(["--scan", "-t", "0", "-i"])
            .arg(source.to_string_lossy());

        tracing::info!("Scanning {}", source.display());
        let output = runner.output(&cmd)?;
        let text = format!("{}{}", output.stderr, output.stdout);

        if settings.scan.cache_scans {
            fs::write(&cache, &text).map_err(|e| ScanError::cache(&cache, e))?;
            tracing::debug!("Saved scan output to {}", cache.display());
        }

        match Self::from_scan_output(source, &text) {
            Err(ScanError::UnrecognizedDialect) if !output.success() => {
                Err(ScanError::Tool(ToolError::command_failed(
                    probe,
                    output.exit_code.unwrap_or(-1),
                    last_line(&text),
                )))
            }
            result => result,
        }
    }

    /// Build a catalog from probe output text.
    pub fn from_scan_output(source: &Path, text: &str) -> ScanResult<Self> {
        let mut parsed = parse_scan_output(text)?;
        parsed.relativize_paths(source);

        for warning in &parsed.warnings {
            tracing::warn!("{}: {}", source.display(), warning);
        }

        Ok(Self::from_parsed(source, parsed))
    }

    fn from_parsed(source: &Path, parsed: ParsedScan) -> Self {
        let mut titles_by_user_number = BTreeMap::new();
        for title in parsed.titles.values() {
            if let Some(previous) = titles_by_user_number.insert(title.user_number, title.number) {
                tracing::warn!(
                    "Titles {} and {} share user number {}; using title {}",
                    previous,
                    title.number,
                    title.user_number,
                    title.number
                );
            }
        }

        tracing::info!(
            "Found {} title(s) in {} ({} source)",
            parsed.titles.len(),
            source.display(),
            parsed.dialect
        );

        Self {
            source: source.to_path_buf(),
            dialect: parsed.dialect,
            num_titles: parsed.num_titles,
            titles_by_number: parsed.titles,
            titles_by_user_number,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Title count as announced by the probe.
    pub fn num_titles(&self) -> u32 {
        self.num_titles
    }

    /// Look up a title by its user-facing number.
    pub fn get_by_user_number(&self, user_number: u32) -> ScanResult<&Title> {
        self.titles_by_user_number
            .get(&user_number)
            .and_then(|number| self.titles_by_number.get(number))
            .ok_or_else(|| ScanError::unknown_title(user_number))
    }

    /// Look up a title by probe numbering.
    pub fn get_by_number(&self, number: u32) -> Option<&Title> {
        self.titles_by_number.get(&number)
    }

    /// All titles in probe order.
    pub fn titles(&self) -> impl Iterator<Item = &Title> {
        self.titles_by_number.values()
    }

    pub fn main_feature(&self) -> Option<&Title> {
        self.titles().find(|t| t.is_main_feature)
    }

    /// Titles at least `min_minutes` long, in probe order.
    pub fn titles_at_least(&self, min_minutes: u32) -> Vec<&Title> {
        self.titles()
            .filter(|t| t.duration_minutes >= min_minutes)
            .collect()
    }

    /// File the encoder and extractor should open for `title`.
    pub fn input_path(&self, title: &Title) -> PathBuf {
        title.input_path(&self.source)
    }

    pub fn input_title_number(&self, title: &Title) -> u32 {
        title.input_title_number()
    }
}

/// Cache file for a source: `<dir>.scan` for directories, the source with
/// its extension replaced otherwise.
pub fn cache_path(source: &Path) -> PathBuf {
    if source.is_dir() {
        let mut path = OsString::from(source.as_os_str());
        path.push(".scan");
        PathBuf::from(path)
    } else {
        source.with_extension("scan")
    }
}

fn last_line(text: &str) -> String {
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or_default()
        .trim()
        .to_string()
}
