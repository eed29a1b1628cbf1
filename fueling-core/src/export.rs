use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::models::{FuelingRequest, RequestStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown export format '{0}', expected 'json' or 'markdown'")]
    UnknownFormat(String),
    #[error("failed to serialize requests: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders the requests in the given format
pub fn render(requests: &[FuelingRequest], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string_pretty(requests)?),
        ExportFormat::Markdown => Ok(render_markdown(requests)),
    }
}

/// Writes the rendered requests to `output_path`
pub fn export_to_file(
    requests: &[FuelingRequest],
    format: ExportFormat,
    output_path: &Path,
) -> Result<(), ExportError> {
    let content = render(requests, format)?;
    fs::write(output_path, content).map_err(|source| ExportError::Write {
        path: output_path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Exported {} requests as {} to {:?}",
        requests.len(),
        format,
        output_path
    );
    Ok(())
}

/// Markdown report grouped by status, in lifecycle order
pub fn render_markdown(requests: &[FuelingRequest]) -> String {
    let mut output = String::from("# Fueling Requests\n\n");

    if requests.is_empty() {
        output.push_str("No requests.\n");
        return output;
    }

    for status in RequestStatus::ALL {
        let group: Vec<_> = requests.iter().filter(|r| r.status == status).collect();
        if group.is_empty() {
            continue;
        }

        output.push_str(&format!("## {} ({})\n\n", status, group.len()));
        for req in group {
            output.push_str(&format!("### {} - {}\n\n", req.short_id(), req.summary()));
            output.push_str(&format!(
                "**Representative:** {} | **Created:** {}\n\n",
                req.representative_name,
                req.created_at.format("%Y-%m-%d %H:%M")
            ));

            for message in &req.messages {
                output.push_str(&format!(
                    "- {} [{}]: {}\n",
                    message.sender,
                    message.timestamp.format("%Y-%m-%d %H:%M"),
                    message.text
                ));
            }
            if !req.messages.is_empty() {
                output.push('\n');
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestDraft, Sender};
    use tempfile::tempdir;

    fn request(stand: &str, status: RequestStatus) -> FuelingRequest {
        let mut req = FuelingRequest::new(
            RequestDraft {
                stand_number: stand.into(),
                airline: "Test Air".into(),
                flight_number: "T1".into(),
                representative_name: "X".into(),
            },
            "device-1",
        );
        if status != RequestStatus::Pending {
            req.transition_to(status).unwrap();
        }
        req
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_markdown_groups_by_status() {
        let mut confirmed = request("C1", RequestStatus::Confirmed);
        confirmed.append_message(Sender::Company, "Fuel truck dispatched").unwrap();
        let requests = vec![request("P1", RequestStatus::Pending), confirmed];

        let md = render_markdown(&requests);

        let pending_at = md.find("## Pending (1)").unwrap();
        let confirmed_at = md.find("## Confirmed (1)").unwrap();
        assert!(pending_at < confirmed_at);
        assert!(!md.contains("## Completed"));
        assert!(md.contains("Stand C1 - Test Air T1"));
        assert!(md.contains("Company ["));
        assert!(md.contains("Fuel truck dispatched"));
    }

    #[test]
    fn test_markdown_empty() {
        assert!(render_markdown(&[]).contains("No requests."));
    }

    #[test]
    fn test_export_json_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("requests.json");
        let requests = vec![request("A1", RequestStatus::Completed)];

        export_to_file(&requests, ExportFormat::Json, &path).unwrap();

        let loaded: Vec<FuelingRequest> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, requests);
    }
}
