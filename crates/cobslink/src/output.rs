use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One block of bytes produced by a command.
#[derive(Debug, Serialize)]
pub struct BytesReport<'a> {
    pub kind: &'static str,
    pub size: usize,
    pub hex: String,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip)]
    pub bytes: &'a [u8],
}

impl<'a> BytesReport<'a> {
    pub fn new(kind: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            kind,
            size: bytes.len(),
            hex: hex::encode(bytes),
            preview: payload_preview(bytes),
            attempts: None,
            bytes,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

pub fn print_reports(reports: &[BytesReport<'_>], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for report in reports {
                println!(
                    "{}",
                    serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "SIZE", "ATTEMPTS", "HEX", "PREVIEW"]);
            for report in reports {
                table.add_row(vec![
                    report.kind.to_string(),
                    report.size.to_string(),
                    report
                        .attempts
                        .map_or_else(|| "-".to_string(), |n| n.to_string()),
                    report.hex.clone(),
                    report.preview.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for report in reports {
                let attempts = report
                    .attempts
                    .map(|n| format!(" attempts={n}"))
                    .unwrap_or_default();
                println!(
                    "{} size={}{} hex={} payload={}",
                    report.kind, report.size, attempts, report.hex, report.preview
                );
            }
        }
        OutputFormat::Raw => {
            for report in reports {
                print_raw(report.bytes);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes>", payload.len()),
    }
}
