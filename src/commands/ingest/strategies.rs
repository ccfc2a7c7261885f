use super::*;

/// Text and grids recovered by one successful strategy.
#[derive(Debug, Clone, Default)]
pub struct RawExtraction {
    pub pages: Vec<String>,
    pub tables: Vec<RawGrid>,
    pub page_count: usize,
}

impl RawExtraction {
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.trim())
            .filter(|page| !page.is_empty())
            .collect::<Vec<&str>>()
            .join("\n\n")
    }

    fn has_text(&self) -> bool {
        self.pages.iter().any(|page| !page.trim().is_empty())
    }
}

#[derive(Debug)]
pub enum StrategyOutcome {
    Extracted(RawExtraction),
    Empty,
    Failed(anyhow::Error),
}

impl StrategyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            StrategyOutcome::Extracted(_) => "extracted",
            StrategyOutcome::Empty => "empty",
            StrategyOutcome::Failed(_) => "failed",
        }
    }
}

pub fn attempt_strategy(
    kind: StrategyKind,
    pdf_path: &Path,
    config: &PipelineConfig,
    detector: &LayoutTableDetector,
) -> StrategyOutcome {
    let attempt = match kind {
        StrategyKind::Layout => extract_pages_with_pdftotext(pdf_path, "-layout").map(|pages| {
            let tables = pages
                .iter()
                .flat_map(|page| detector.detect(page))
                .collect::<Vec<RawGrid>>();
            RawExtraction {
                page_count: pages.len(),
                pages,
                tables,
            }
        }),
        StrategyKind::Ocr => extract_pages_with_ocr(pdf_path, config),
        StrategyKind::Raw => {
            extract_pages_with_pdftotext(pdf_path, "-raw").map(|pages| RawExtraction {
                page_count: pages.len(),
                pages,
                tables: Vec::new(),
            })
        }
    };

    match attempt {
        Ok(extraction) if extraction.has_text() => StrategyOutcome::Extracted(extraction),
        Ok(_) => StrategyOutcome::Empty,
        Err(err) => StrategyOutcome::Failed(err),
    }
}

fn extract_pages_with_pdftotext(pdf_path: &Path, mode_flag: &str) -> Result<Vec<String>> {
    let output = Command::new("pdftotext")
        .arg(mode_flag)
        .arg("-enc")
        .arg("UTF-8")
        .arg(pdf_path)
        .arg("-")
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext {} returned non-zero exit status for {}: {}",
            mode_flag,
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }

    Ok(pages)
}

fn extract_pages_with_ocr(pdf_path: &Path, config: &PipelineConfig) -> Result<RawExtraction> {
    let page_count = pdf_page_count(pdf_path)?;
    let last_page = page_count.min(config.ocr_max_pages);
    if last_page < page_count {
        debug!(
            path = %pdf_path.display(),
            page_count,
            ocr_max_pages = config.ocr_max_pages,
            "ocr limited to leading pages"
        );
    }

    let mut pages = Vec::with_capacity(last_page);
    for page_number in 1..=last_page {
        pages.push(ocr_page(pdf_path, page_number, &config.ocr_lang)?);
    }

    Ok(RawExtraction {
        pages,
        tables: Vec::new(),
        page_count,
    })
}

fn pdf_page_count(pdf_path: &Path) -> Result<usize> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute pdfinfo for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdfinfo returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .with_context(|| format!("pdfinfo reported no page count for {}", pdf_path.display()))
}

fn ocr_page(pdf_path: &Path, page_number: usize, ocr_lang: &str) -> Result<String> {
    let pdf_stem = pdf_path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("report");
    let safe_stem = pdf_stem
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect::<String>();

    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let output_root = std::env::temp_dir().join(format!(
        "finrep_ocr_{}_{}_{}_{}",
        safe_stem,
        std::process::id(),
        page_number,
        stamp
    ));
    let png_path = PathBuf::from(format!("{}.png", output_root.display()));

    let pdftoppm_output = Command::new("pdftoppm")
        .arg("-f")
        .arg(page_number.to_string())
        .arg("-l")
        .arg(page_number.to_string())
        .arg("-singlefile")
        .arg("-png")
        .arg(pdf_path)
        .arg(&output_root)
        .output()
        .with_context(|| format!("failed to execute pdftoppm for {}", pdf_path.display()))?;

    if !pdftoppm_output.status.success() {
        let stderr = String::from_utf8_lossy(&pdftoppm_output.stderr);
        bail!(
            "pdftoppm returned non-zero exit status for {} page {}: {}",
            pdf_path.display(),
            page_number,
            stderr.trim()
        );
    }

    if !png_path.exists() {
        bail!(
            "pdftoppm did not produce expected image for {} page {}",
            pdf_path.display(),
            page_number
        );
    }

    let tesseract_output = Command::new("tesseract")
        .arg(&png_path)
        .arg("stdout")
        .arg("-l")
        .arg(ocr_lang)
        .output();

    let _ = fs::remove_file(&png_path);

    let tesseract_output = tesseract_output
        .with_context(|| format!("failed to execute tesseract for {}", png_path.display()))?;

    if !tesseract_output.status.success() {
        let stderr = String::from_utf8_lossy(&tesseract_output.stderr);
        bail!(
            "tesseract returned non-zero exit status for {} page {}: {}",
            pdf_path.display(),
            page_number,
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&tesseract_output.stdout).replace('\u{0000}', ""))
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]),
        pdfinfo: command_version_optional("pdfinfo", &["-v"]),
        pdftoppm: command_version_optional("pdftoppm", &["-v"]),
        tesseract: command_version_optional("tesseract", &["--version"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

/// Recovers cell grids from `pdftotext -layout` pages, where statement
/// columns survive as runs of spaces.
#[derive(Debug)]
pub struct LayoutTableDetector {
    cell_split: Regex,
}

impl LayoutTableDetector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cell_split: Regex::new(r"\t+|\s{2,}").context("failed to compile cell split regex")?,
        })
    }

    pub fn split_cells(&self, line: &str) -> Vec<String> {
        self.cell_split
            .split(line.trim())
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn detect(&self, page: &str) -> Vec<RawGrid> {
        let mut grids = Vec::new();
        let mut current: RawGrid = Vec::new();
        let mut header: Option<Vec<String>> = None;
        let mut last_text_line: Option<Vec<String>> = None;
        let mut blank_run = 0usize;

        for line in page.lines() {
            if line.trim().is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    self.flush(&mut grids, &mut current, &mut header);
                }
                continue;
            }
            blank_run = 0;

            let cells = self.split_cells(line);
            if is_data_row(&cells) {
                if current.is_empty() {
                    header = last_text_line.take();
                }
                current.push(cells);
                continue;
            }

            self.flush(&mut grids, &mut current, &mut header);
            last_text_line = Some(cells);
        }

        self.flush(&mut grids, &mut current, &mut header);
        grids
    }

    fn flush(
        &self,
        grids: &mut Vec<RawGrid>,
        current: &mut RawGrid,
        header: &mut Option<Vec<String>>,
    ) {
        let rows = std::mem::take(current);
        let header = header.take();
        if rows.len() < 2 {
            return;
        }

        let mut grid = Vec::with_capacity(rows.len() + 1);
        if let Some(header) = header {
            grid.push(header);
        }
        grid.extend(rows);
        grids.push(grid);
    }
}

fn is_data_row(cells: &[String]) -> bool {
    cells.len() >= 2 && cells.iter().skip(1).any(|cell| looks_numeric(cell))
}
