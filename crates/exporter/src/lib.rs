use catalog::Violation;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize violations: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub const CSV_HEADERS: [&str; 7] = [
    "브랜드",
    "제품명",
    "쿠팡_MAP",
    "위반_업체명",
    "위반_가격",
    "위반_URL",
    "발견_시간",
];

pub struct Exporter;

impl Exporter {
    pub fn new() -> Self {
        Self
    }

    /// Pretty-printed JSON array; `[]` when there is nothing to report.
    pub fn render_json(&self, violations: &[Violation]) -> Result<String, ExportError> {
        if violations.is_empty() {
            return Ok("[]".to_string());
        }
        Ok(serde_json::to_string_pretty(violations)?)
    }

    pub fn write_to<W: Write>(&self, violations: &[Violation], mut out: W) -> Result<(), ExportError> {
        let json = self.render_json(violations)?;
        writeln!(out, "{}", json)?;
        out.flush()?;
        Ok(())
    }

    pub fn print(&self, violations: &[Violation]) -> Result<(), ExportError> {
        let stdout = std::io::stdout();
        self.write_to(violations, stdout.lock())
    }

    /// Overwrites `path` with the violation list.
    pub fn export_to_json<P: AsRef<Path>>(
        &self,
        violations: &[Violation],
        path: P,
    ) -> Result<(), ExportError> {
        let json = self.render_json(violations)?;
        std::fs::write(path.as_ref(), json)?;
        info!("Violations saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn export_to_csv<P: AsRef<Path>>(
        &self,
        violations: &[Violation],
        path: P,
    ) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_path(path.as_ref())?;

        wtr.write_record(CSV_HEADERS)?;

        for violation in violations {
            wtr.write_record(&[
                violation.brand.clone(),
                violation.product_name.clone(),
                violation.map_price.to_string(),
                violation.seller.clone(),
                violation.price.to_string(),
                violation.url.clone(),
                violation.detected_at_display(),
            ])?;
        }

        wtr.flush()?;
        info!("CSV report saved to {}", path.as_ref().display());
        Ok(())
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}
