use super::extraction_error;
use super::FileCategory;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Seam for optical character recognition. Only the output shape is
/// contractual; fidelity belongs to the underlying engine.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// OCR via the `tesseract` binary, writing to stdout.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
        }
    }
}

impl TesseractOcr {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .output()
            .await
            .map_err(|e| extraction_error(FileCategory::Image, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(extraction_error(
                FileCategory::Image,
                format!("tesseract failed: {}", stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
