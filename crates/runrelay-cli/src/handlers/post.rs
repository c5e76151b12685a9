//! Post-run reporting: replay a recorded producer-event stream through the
//! publisher and capture the resulting backend call stream.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use runrelay_client::{Backend, ItemId, JsonlBackend, RunConfig};
use runrelay_engine::Publisher;
use runrelay_types::{Attachment, LaunchStart, LogLevel, LogRecord, RunEvent};

pub fn handle(
    config: &RunConfig,
    events_path: &Path,
    output: Option<PathBuf>,
    log_html: Option<PathBuf>,
    report_html: Option<PathBuf>,
    xunit: Option<PathBuf>,
) -> Result<()> {
    let file = File::open(events_path)
        .with_context(|| format!("cannot open recording {}", events_path.display()))?;
    let reader = BufReader::new(file);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };

    let mut publisher = Publisher::from_directives(
        JsonlBackend::new(writer),
        &config.remove_keywords,
        &config.flatten_keywords,
    );
    if let Some(launch_id) = &config.launch_id {
        publisher = publisher.attach_launch(ItemId::from(launch_id.clone()));
    }

    let mut count = 0usize;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut event: RunEvent = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed event", events_path.display(), number + 1))?;
        if let RunEvent::StartLaunch { attributes } = &mut event {
            apply_launch_overrides(attributes, config);
        }
        publisher
            .apply(event)
            .with_context(|| format!("{}:{}: event rejected", events_path.display(), number + 1))?;
        count += 1;
    }

    if publisher.open_items() > 0 {
        anyhow::bail!(
            "recording ended with {} items still open",
            publisher.open_items()
        );
    }

    let artifacts = [
        (log_html, config.attach_log, "log.html", "Execution log"),
        (
            report_html,
            config.attach_report,
            "report.html",
            "Execution report",
        ),
        (xunit, config.attach_xunit, "xunit.xml", "XUnit result file"),
    ];
    for (explicit, enabled, default_name, label) in artifacts {
        if let Some(path) = resolve_artifact(explicit, enabled, events_path, default_name) {
            attach_artifact(&mut publisher, &path, label)?;
        }
    }

    eprintln!("Posted {} events from {}", count, events_path.display());
    Ok(())
}

fn apply_launch_overrides(attributes: &mut LaunchStart, config: &RunConfig) {
    if let Some(name) = &config.launch {
        attributes.name = name.clone();
    }
    if let Some(doc) = &config.launch_doc {
        attributes.doc = doc.clone();
    }
    attributes
        .attributes
        .extend(config.launch_attribute_records());
    if let Some(mode) = &config.mode {
        attributes.mode = Some(mode.clone());
    }
    if config.rerun {
        attributes.rerun = true;
    }
    if let Some(rerun_of) = &config.rerun_of {
        attributes.rerun_of = Some(rerun_of.clone());
    }
}

/// An explicit path wins; otherwise a default-named file beside the
/// recording is picked up when the corresponding attach flag is set.
fn resolve_artifact(
    explicit: Option<PathBuf>,
    enabled: bool,
    events_path: &Path,
    default_name: &str,
) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    if !enabled {
        return None;
    }
    let candidate = events_path.parent()?.join(default_name);
    candidate.exists().then_some(candidate)
}

fn attach_artifact<B: Backend>(
    publisher: &mut Publisher<B>,
    path: &Path,
    label: &str,
) -> Result<()> {
    let data =
        std::fs::read(path).with_context(|| format!("cannot read artifact {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| label.to_string());

    let record = LogRecord {
        level: LogLevel::Info,
        message: label.to_string(),
        attachment: Some(Attachment {
            name,
            mime: guess_mime(path).to_string(),
            data,
        }),
        timestamp: None,
        launch_log: true,
    };
    publisher.log_message(record)?;
    Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" | "log" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("log.html")), "text/html");
        assert_eq!(guess_mime(Path::new("xunit.XML")), "application/xml");
        assert_eq!(guess_mime(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_resolve_artifact_prefers_explicit_path() {
        let explicit = Some(PathBuf::from("/tmp/custom.html"));
        let resolved = resolve_artifact(explicit.clone(), false, Path::new("run.jsonl"), "log.html");
        assert_eq!(resolved, explicit);
    }

    #[test]
    fn test_resolve_artifact_requires_flag() {
        let resolved = resolve_artifact(None, false, Path::new("/tmp/run.jsonl"), "log.html");
        assert_eq!(resolved, None);
    }
}
