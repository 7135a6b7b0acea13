//! Export service domain logic for the event roster.
//!
//! Renders the roster as a spreadsheet-friendly CSV (UTF-8 with a byte-order
//! mark so Excel picks the right encoding) and writes it into a chosen or
//! default directory. Exporting never mutates the roster.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use shared::{ExportDataResponse, ExportToPathResponse};

use crate::backend::domain::models::Participant;
use crate::backend::domain::roster_service::RosterService;

const UTF8_BOM: &str = "\u{feff}";

/// Language used for the header row and the literal cell values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportLocale {
    #[default]
    En,
    ZhCn,
}

struct ExportLiterals {
    headers: [&'static str; 7],
    none: &'static str,
    yes: &'static str,
    no: &'static str,
}

impl ExportLocale {
    fn literals(self) -> ExportLiterals {
        match self {
            ExportLocale::En => ExportLiterals {
                headers: [
                    "number",
                    "name",
                    "tag",
                    "checked_in",
                    "winner",
                    "note",
                    "checkin_time",
                ],
                none: "none",
                yes: "yes",
                no: "no",
            },
            ExportLocale::ZhCn => ExportLiterals {
                headers: ["编号", "姓名", "标签", "是否签到", "是否中奖", "备注", "签到时间"],
                none: "无",
                yes: "是",
                no: "否",
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// File name is `<file_prefix>_<YYYY-MM-DD>.csv`
    pub file_prefix: String,
    pub locale: ExportLocale,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "event_data".to_string(),
            locale: ExportLocale::En,
        }
    }
}

/// Export service that handles all export-related business logic
#[derive(Debug, Clone, Default)]
pub struct ExportService {
    config: ExportConfig,
}

impl ExportService {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Render the whole roster, in roster order, as CSV text dated today
    pub fn export_csv(&self, roster: &RosterService) -> Result<ExportDataResponse> {
        self.export_csv_dated(roster.participants(), Local::now().date_naive())
    }

    fn export_csv_dated(
        &self,
        participants: &[Participant],
        date: NaiveDate,
    ) -> Result<ExportDataResponse> {
        info!("Exporting {} participants as CSV", participants.len());

        let literals = self.config.locale.literals();
        let yes_no = |flag: bool| if flag { literals.yes } else { literals.no };

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(literals.headers)
            .context("Failed to write CSV header")?;

        for participant in participants {
            let tag = participant
                .tag
                .map(|tag| tag.label())
                .unwrap_or(literals.none);
            writer
                .write_record([
                    participant.number.to_string().as_str(),
                    participant.name.as_str(),
                    tag,
                    yes_no(participant.is_checked_in),
                    yes_no(participant.is_winner),
                    participant.note.as_str(),
                    participant.checkin_time.as_deref().unwrap_or(""),
                ])
                .with_context(|| format!("Failed to write CSV row for {}", participant.id))?;
        }

        let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
        let body = String::from_utf8(bytes).context("CSV output was not valid UTF-8")?;

        let filename = format!("{}_{}.csv", self.config.file_prefix, date.format("%Y-%m-%d"));
        let response = ExportDataResponse {
            csv_content: format!("{}{}", UTF8_BOM, body),
            filename,
            participant_count: participants.len(),
        };

        info!(
            "Generated CSV export ({} bytes) with filename: {}",
            response.csv_content.len(),
            response.filename
        );
        Ok(response)
    }

    /// Write the export into `custom_dir`, or the Documents folder (falling
    /// back to home) when none is given.
    ///
    /// File system failures are reported in the response rather than as an
    /// error so the console can show the message as-is.
    pub fn export_to_path(
        &self,
        roster: &RosterService,
        custom_dir: Option<&str>,
    ) -> Result<ExportToPathResponse> {
        info!("Exporting to path - custom_dir: {:?}", custom_dir);

        let export = self.export_csv(roster)?;

        let export_dir = match custom_dir {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(sanitize_path(dir)),
            _ => match dirs::document_dir().or_else(dirs::home_dir) {
                Some(dir) => dir,
                None => {
                    error!("Could not determine default export directory");
                    return Ok(ExportToPathResponse {
                        success: false,
                        message: "Failed to determine export directory".to_string(),
                        file_path: String::new(),
                        participant_count: 0,
                    });
                }
            },
        };

        if let Err(e) = fs::create_dir_all(&export_dir) {
            error!("Failed to create export directory {:?}: {}", export_dir, e);
            return Ok(ExportToPathResponse {
                success: false,
                message: format!("Failed to create export directory: {}", e),
                file_path: export_dir.to_string_lossy().to_string(),
                participant_count: 0,
            });
        }

        let file_path = export_dir.join(&export.filename);
        let file_path_str = file_path.to_string_lossy().to_string();
        match fs::write(&file_path, &export.csv_content) {
            Ok(()) => {
                info!(
                    "Exported {} participants to: {}",
                    export.participant_count, file_path_str
                );
                Ok(ExportToPathResponse {
                    success: true,
                    message: format!("File exported successfully to: {}", file_path_str),
                    file_path: file_path_str,
                    participant_count: export.participant_count,
                })
            }
            Err(e) => {
                error!("Failed to write export file to {:?}: {}", file_path, e);
                Ok(ExportToPathResponse {
                    success: false,
                    message: format!("Failed to write export file: {}", e),
                    file_path: file_path_str,
                    participant_count: 0,
                })
            }
        }
    }
}

/// Clean up a typed directory: surrounding quotes, escaped spaces, trailing
/// separators and a leading `~`.
fn sanitize_path(path: &str) -> String {
    let mut cleaned = path.trim();
    let quoted = cleaned.len() >= 2
        && ((cleaned.starts_with('"') && cleaned.ends_with('"'))
            || (cleaned.starts_with('\'') && cleaned.ends_with('\'')));
    if quoted {
        cleaned = cleaned[1..cleaned.len() - 1].trim();
    }

    let mut cleaned = cleaned.replace("\\ ", " ");
    while cleaned.len() > 1 && (cleaned.ends_with('/') || cleaned.ends_with('\\')) {
        cleaned.pop();
    }

    if let Some(home) = dirs::home_dir() {
        if cleaned == "~" {
            return home.to_string_lossy().to_string();
        }
        if let Some(rest) = cleaned
            .strip_prefix("~/")
            .or_else(|| cleaned.strip_prefix("~\\"))
        {
            return home.join(rest).to_string_lossy().to_string();
        }
    }

    cleaned
}
