use super::ocr::OcrEngine;
use super::{extraction_error, AnalysisDetails, AnalysisRecord, AnalysisType, FileCategory, ImageDetails};
use crate::error::Result;
use image::{ColorType, GenericImageView};
use std::path::Path;

/// Decode the image for pixel dimensions and color mode, then run OCR to
/// obtain the text content.
pub async fn analyze(path: &Path, ocr: &dyn OcrEngine) -> Result<AnalysisRecord> {
    let img = image::open(path).map_err(|e| extraction_error(FileCategory::Image, e))?;
    let (width, height) = img.dimensions();
    let image_mode = color_mode(img.color()).to_string();

    let text = ocr.extract_text(path).await?;
    let word_count = text.split_whitespace().count();
    let char_count = text.chars().count();

    Ok(AnalysisRecord {
        analysis_type: AnalysisType::OcrExtraction,
        summary: format!(
            "Image ({}x{}) with {} words extracted via OCR",
            width, height, word_count
        ),
        text_content: text,
        details: AnalysisDetails::Image(ImageDetails {
            image_size: (width, height),
            image_mode,
            word_count,
            char_count,
        }),
    })
}

/// PIL-style mode label for the decoded color type.
fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;32F",
        ColorType::Rgba32F => "RGBA;32F",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubOcr(&'static str);

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn extract_text(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_image_dimensions_and_ocr_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        image::RgbaImage::new(4, 2).save(&path).unwrap();

        let record = analyze(&path, &StubOcr("total balance due 42.00")).await.unwrap();
        let details = match &record.details {
            AnalysisDetails::Image(d) => d,
            other => panic!("expected image details, got {:?}", other),
        };
        assert_eq!(details.image_size, (4, 2));
        assert_eq!(details.image_mode, "RGBA");
        assert_eq!(details.word_count, 4);
        assert_eq!(record.analysis_type, AnalysisType::OcrExtraction);
        assert_eq!(record.summary, "Image (4x2) with 4 words extracted via OCR");
    }

    #[tokio::test]
    async fn test_undecodable_image_is_an_analysis_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();
        let err = analyze(&path, &StubOcr("")).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Analysis {
                category: FileCategory::Image,
                ..
            }
        ));
    }
}
