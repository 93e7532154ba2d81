//! Field mapping from CSV columns to CRM field names.
//!
//! A mapping is built by asking an [`AnswerSource`], once per field, whether
//! to upload the field and under which name. Fields that are skipped are
//! dropped from every record when the mapping is applied.

use anyhow::{Context, Result};
use crm_bulk::Record;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

/// Answers the two questions asked per field.
pub trait AnswerSource {
    /// Whether `field` is uploaded at all.
    fn include_field(&mut self, field: &str) -> Result<bool>;

    /// Target name for `field`; `None` keeps the source name.
    fn target_name(&mut self, field: &str) -> Result<Option<String>>;
}

/// Ordered `source -> target` field pairs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldMapping {
    entries: Vec<(String, String)>,
}

impl FieldMapping {
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(s, _)| s == source)
            .map(|(_, t)| t.as_str())
    }

    /// Rename and filter every record.
    ///
    /// Output records hold only mapped fields present in the source record,
    /// in mapping order.
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        records
            .iter()
            .map(|record| {
                let mut mapped = Record::with_capacity(self.entries.len());
                for (source, target) in &self.entries {
                    if let Some(value) = record.get(source) {
                        mapped.insert(target.as_str(), value.clone());
                    }
                }
                mapped
            })
            .collect()
    }
}

/// Ask `answers` about each field, in order.
pub fn build_field_mapping<S, A>(fields: &[S], answers: &mut A) -> Result<FieldMapping>
where
    S: AsRef<str>,
    A: AnswerSource + ?Sized,
{
    let mut entries = Vec::with_capacity(fields.len());

    for field in fields {
        let field = field.as_ref();
        if !answers.include_field(field)? {
            info!("Skipping field '{field}'. It will not be uploaded.");
            continue;
        }

        let target = answers
            .target_name(field)?
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| field.to_string());

        info!("Mapping CSV field '{field}' -> CRM field '{target}'");
        entries.push((field.to_string(), target));
    }

    Ok(FieldMapping { entries })
}

/// Build a mapping for the columns of `records`.
///
/// Columns are taken from the first record. No records yields an empty
/// mapping.
pub fn mapping_for_records<A>(records: &[Record], answers: &mut A) -> Result<FieldMapping>
where
    A: AnswerSource + ?Sized,
{
    let Some(first) = records.first() else {
        warn!("No records found in CSV; skipping field mapping.");
        return Ok(FieldMapping::default());
    };

    let fields: Vec<&str> = first.keys().collect();
    build_field_mapping(&fields, answers)
}

/// Prompts on a terminal (or any reader/writer pair).
///
/// Anything other than `n` at the first prompt maps the field; an empty
/// answer at the second prompt keeps the name.
pub struct TerminalAnswers<R, W> {
    input: R,
    output: W,
}

impl TerminalAnswers<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalAnswers<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read answer")?;
        if read == 0 {
            anyhow::bail!("Input closed while waiting for an answer");
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> AnswerSource for TerminalAnswers<R, W> {
    fn include_field(&mut self, field: &str) -> Result<bool> {
        writeln!(self.output, "\nField detected: '{field}'")?;
        let answer = self.ask("Map this field? (y to map, n to skip): ")?;
        Ok(!answer.eq_ignore_ascii_case("n"))
    }

    fn target_name(&mut self, field: &str) -> Result<Option<String>> {
        let answer = self.ask(&format!(
            "Enter the CRM field name to map '{field}' to.\n(Press Enter to keep '{field}'): "
        ))?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }
}

/// Answers from a YAML file of `source: target` pairs.
///
/// Fields not listed are skipped; a null target keeps the source name.
#[derive(Debug, Clone, Default)]
pub struct PresetAnswers {
    targets: HashMap<String, Option<String>>,
}

impl PresetAnswers {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse mapping file {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            targets: serde_yaml::from_str(yaml)?,
        })
    }
}

impl AnswerSource for PresetAnswers {
    fn include_field(&mut self, field: &str) -> Result<bool> {
        Ok(self.targets.contains_key(field))
    }

    fn target_name(&mut self, field: &str) -> Result<Option<String>> {
        Ok(self.targets.get(field).cloned().flatten())
    }
}

/// Maps every field under its own name.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AnswerSource for AcceptAll {
    fn include_field(&mut self, _field: &str) -> Result<bool> {
        Ok(true)
    }

    fn target_name(&mut self, _field: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
