//! PDF rendering through an external HTML-to-PDF engine.
//!
//! The engine (wkhtmltopdf by default) writes to a temporary file next to
//! the output. The result is checked for the `%PDF` magic and only then
//! renamed into place, so an interrupted or failed run never leaves a file
//! that looks complete.

use crate::config::ExportConfig;
use crate::error::RenderError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Render `html` to a PDF at `output`.
pub async fn render_pdf(html: &str, output: &Path, config: &ExportConfig) -> Result<(), RenderError> {
    let engine = config.pdf_engine.as_str();
    check_output_writable(output)?;

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent)
        .await
        .map_err(|e| RenderError::Io {
            path: parent.clone(),
            source: e,
        })?;

    let mut input = tempfile::Builder::new()
        .prefix("docs2pdf-")
        .suffix(".html")
        .tempfile()
        .map_err(|e| RenderError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
    let input_path = input.path().to_path_buf();
    input
        .write_all(html.as_bytes())
        .and_then(|_| input.flush())
        .map_err(|e| RenderError::Io {
            path: input_path,
            source: e,
        })?;

    let staging = tempfile::Builder::new()
        .prefix(".docs2pdf-")
        .suffix(".pdf")
        .tempfile_in(&parent)
        .map_err(|e| RenderError::Io {
            path: parent.clone(),
            source: e,
        })?
        .into_temp_path();

    let args = engine_args(config, input.path(), &staging);
    info!("Rendering PDF with {}", engine);
    debug!("{} {}", engine, args.join(" "));

    let mut cmd = Command::new(engine);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let result = tokio::time::timeout(Duration::from_secs(config.pdf_timeout_secs), cmd.output())
        .await
        .map_err(|_| RenderError::Timeout {
            engine: engine.to_string(),
            secs: config.pdf_timeout_secs,
        })?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RenderError::EngineMissing {
                    engine: engine.to_string(),
                }
            } else {
                RenderError::Io {
                    path: PathBuf::from(engine),
                    source: e,
                }
            }
        })?;

    if !result.status.success() {
        return Err(RenderError::EngineFailed {
            engine: engine.to_string(),
            status: result.status.to_string(),
            stderr: stderr_tail(&result.stderr),
        });
    }

    if !has_pdf_magic(&staging).await {
        return Err(RenderError::InvalidOutput {
            path: output.to_path_buf(),
        });
    }

    staging.persist(output).map_err(|e| RenderError::Io {
        path: output.to_path_buf(),
        source: e.error,
    })?;
    info!("PDF written to {}", output.display());
    Ok(())
}

/// Fail early when the target exists but cannot be opened for writing,
/// e.g. because a viewer holds it open.
pub fn check_output_writable(output: &Path) -> Result<(), RenderError> {
    if !output.exists() {
        return Ok(());
    }
    std::fs::OpenOptions::new()
        .append(true)
        .open(output)
        .map(|_| ())
        .map_err(|_| RenderError::OutputLocked {
            path: output.to_path_buf(),
        })
}

fn is_wkhtmltopdf(engine: &str) -> bool {
    Path::new(engine)
        .file_stem()
        .is_some_and(|s| s.to_string_lossy().eq_ignore_ascii_case("wkhtmltopdf"))
}

fn engine_args(config: &ExportConfig, input: &Path, output: &Path) -> Vec<String> {
    let mut args = Vec::new();
    if is_wkhtmltopdf(&config.pdf_engine) {
        args.extend([
            "--encoding".to_string(),
            "UTF-8".to_string(),
            "--page-size".to_string(),
            config.page_size.clone(),
            "--quiet".to_string(),
            "--image-dpi".to_string(),
            config.image_dpi.to_string(),
            "--image-quality".to_string(),
            config.image_quality.to_string(),
            "--enable-local-file-access".to_string(),
        ]);
    }
    args.extend(config.pdf_engine_args.iter().cloned());
    args.push(input.to_string_lossy().into_owned());
    args.push(output.to_string_lossy().into_owned());
    args
}

async fn has_pdf_magic(path: &Path) -> bool {
    match tokio::fs::read(path).await {
        Ok(bytes) => bytes.starts_with(b"%PDF"),
        Err(_) => false,
    }
}

/// Last few lines of the engine's stderr; wkhtmltopdf is chatty.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wkhtmltopdf_gets_its_options() {
        let config = ExportConfig::builder()
            .image_dpi(300)
            .pdf_engine_args(vec!["--no-outline".into()])
            .build()
            .unwrap();
        let args = engine_args(&config, Path::new("in.html"), Path::new("out.pdf"));
        assert_eq!(&args[..2], &["--encoding", "UTF-8"]);
        assert!(args.windows(2).any(|w| w == ["--image-dpi", "300"]));
        assert!(args.contains(&"--enable-local-file-access".to_string()));
        assert_eq!(&args[args.len() - 3..], &["--no-outline", "in.html", "out.pdf"]);
    }

    #[test]
    fn other_engines_get_only_extra_args() {
        let config = ExportConfig::builder()
            .pdf_engine("weasyprint")
            .build()
            .unwrap();
        let args = engine_args(&config, Path::new("in.html"), Path::new("out.pdf"));
        assert_eq!(args, vec!["in.html", "out.pdf"]);
        assert!(is_wkhtmltopdf("/usr/local/bin/wkhtmltopdf"));
        assert!(is_wkhtmltopdf("C:/tools/wkhtmltopdf.exe"));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let s = b"a\nb\n\nc\nd\ne\nf\ng\n";
        assert_eq!(stderr_tail(s), "c\nd\ne\nf\ng");
    }

    #[test]
    fn directory_target_counts_as_locked() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_output_writable(dir.path()).unwrap_err();
        assert!(matches!(err, RenderError::OutputLocked { .. }));
        assert!(check_output_writable(&dir.path().join("new.pdf")).is_ok());
    }

    #[tokio::test]
    async fn missing_engine_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::builder()
            .pdf_engine("docs2pdf-no-such-engine")
            .build()
            .unwrap();
        let err = render_pdf("<html></html>", &dir.path().join("out.pdf"), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::EngineMissing { .. }));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "temporary PDF left behind");
    }
}
