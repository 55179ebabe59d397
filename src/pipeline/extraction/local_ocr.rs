//! Local OCR through the Tesseract CLI. PDFs are rasterised page by page with
//! Poppler's `pdftoppm` first.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::types::{DocumentKind, OcrOutput, OcrProvider, LOCAL_OCR_ENGINE};
use super::ExtractionError;
use crate::config::LocalOcrConfig;

pub struct TesseractCli {
    config: LocalOcrConfig,
}

impl TesseractCli {
    pub fn new(config: LocalOcrConfig) -> Self {
        Self { config }
    }

    fn ocr_image_file(&self, image: &Path) -> Result<OcrOutput, ExtractionError> {
        let output = run_tool(
            Command::new(&self.config.tesseract_bin)
                .arg(image)
                .arg("stdout")
                .args(["-l", self.config.lang.as_str()])
                .arg("tsv"),
            &self.config.tesseract_bin,
        )?;
        let tsv = String::from_utf8_lossy(&output.stdout);
        Ok(parse_tsv_page(&tsv))
    }

    /// Render every page to PNG inside `dir`, returned in page order.
    fn rasterize_pdf(&self, pdf_bytes: &[u8], dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let input = dir.join("input.pdf");
        std::fs::write(&input, pdf_bytes)?;

        run_tool(
            Command::new(&self.config.pdftoppm_bin)
                .arg("-r")
                .arg(self.config.dpi.to_string())
                .arg("-png")
                .arg(&input)
                .arg(dir.join("page")),
            &self.config.pdftoppm_bin,
        )?;

        let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
            .collect();
        // pdftoppm zero-pads page numbers consistently, so lexical order is page order.
        pages.sort();
        Ok(pages)
    }
}

impl OcrProvider for TesseractCli {
    fn name(&self) -> &str {
        LOCAL_OCR_ENGINE
    }

    fn recognize(&self, bytes: &[u8], kind: DocumentKind) -> Result<OcrOutput, ExtractionError> {
        let _span = tracing::info_span!("local_ocr", kind = ?kind, bytes = bytes.len()).entered();

        match kind {
            DocumentKind::Pdf => {
                let dir = tempfile::tempdir()?;
                let pages = self.rasterize_pdf(bytes, dir.path())?;
                if pages.is_empty() {
                    return Err(ExtractionError::OcrProcessing("PDF rendered no pages".into()));
                }
                let results = pages
                    .iter()
                    .map(|page| self.ocr_image_file(page))
                    .collect::<Result<Vec<_>, _>>()?;
                tracing::debug!(pages = results.len(), "OCR'd rasterised PDF");
                Ok(combine_pages(&results))
            }
            DocumentKind::Image | DocumentKind::Other => {
                let mut file = tempfile::NamedTempFile::new()?;
                file.write_all(bytes)?;
                file.flush()?;
                self.ocr_image_file(file.path())
            }
        }
    }
}

fn run_tool(command: &mut Command, tool: &str) -> Result<Output, ExtractionError> {
    let output = command.output().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractionError::ToolMissing(tool.to_string()),
        _ => ExtractionError::Io(e),
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::OcrProcessing(format!(
            "{tool} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(output)
}

/// Rebuild page text and mean word confidence from Tesseract TSV output.
/// TSV columns: level page_num block_num par_num line_num word_num left top width height conf text.
/// Level 5 rows are words; confidence is 0-100 (or -1 when unknown).
pub fn parse_tsv_page(tsv: &str) -> OcrOutput {
    let mut text = String::new();
    let mut conf_sum = 0.0f32;
    let mut words = 0usize;
    let mut last_line: Option<(&str, &str, &str, &str)> = None;

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let Ok(conf) = fields[10].trim().parse::<f32>() else {
            continue;
        };
        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }

        let key = (fields[1], fields[2], fields[3], fields[4]);
        match last_line {
            Some(prev) if prev == key => text.push(' '),
            Some(prev) if prev.1 != key.1 || prev.2 != key.2 => text.push_str("\n\n"),
            Some(_) => text.push('\n'),
            None => {}
        }
        last_line = Some(key);
        text.push_str(word);

        conf_sum += if conf < 0.0 { 0.0 } else { conf / 100.0 };
        words += 1;
    }

    let confidence = if words == 0 { 0.0 } else { (conf_sum / words as f32).clamp(0.0, 1.0) };
    OcrOutput { text, confidence }
}

/// Join page results; document confidence is the text-length-weighted mean of pages.
pub fn combine_pages(pages: &[OcrOutput]) -> OcrOutput {
    let text = pages
        .iter()
        .map(|p| p.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let total_chars: usize = pages.iter().map(|p| p.text.chars().count()).sum();
    let confidence = if total_chars == 0 {
        0.0
    } else {
        let weighted: f32 = pages
            .iter()
            .map(|p| p.confidence * p.text.chars().count() as f32)
            .sum();
        weighted / total_chars as f32
    };

    OcrOutput { text, confidence }
}
