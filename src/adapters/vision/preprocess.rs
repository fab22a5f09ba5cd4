//! Image decoding and ViT pixel preprocessing.
//!
//! Follows the checkpoint's HuggingFace `preprocessor_config.json`:
//! resize, rescale to [0, 1], normalize per channel, CHW layout.

use crate::adapters::checkpoint::PREPROCESSOR_FILE;
use crate::domain::DomainError;
use candle_core::{Device, Tensor};
use image::RgbImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_SIZE: u32 = 224;
const DEFAULT_RESCALE: f64 = 1.0 / 255.0;
const DEFAULT_MEAN: [f64; 3] = [0.5, 0.5, 0.5];
const DEFAULT_STD: [f64; 3] = [0.5, 0.5, 0.5];

/// Subset of `preprocessor_config.json` used by ViT image processors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PreprocessorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_resize: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_rescale: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_normalize: Option<bool>,

    /// Per-channel normalization mean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_mean: Option<Vec<f64>>,

    /// Per-channel normalization std
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_std: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescale_factor: Option<f64>,

    /// PIL resampling filter enum (0=Nearest, 1=Lanczos, 2=Bilinear, 3=Bicubic)
    #[serde(default, alias = "resampling", skip_serializing_if = "Option::is_none")]
    pub resample: Option<usize>,

    /// `{"height": H, "width": W}` or `{"shortest_edge": S}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<HashMap<String, u32>>,
}

impl PreprocessorConfig {
    /// Load from a model directory. A missing file yields ViT defaults.
    pub fn load(model_dir: &Path) -> Result<Self, DomainError> {
        let path = model_dir.join(PREPROCESSOR_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!("read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!("parse {}: {}", path.display(), e))
        })
    }

    /// Target (height, width).
    pub fn target_size(&self) -> (u32, u32) {
        let Some(size) = &self.size else {
            return (DEFAULT_SIZE, DEFAULT_SIZE);
        };
        match (size.get("height"), size.get("width"), size.get("shortest_edge")) {
            (Some(h), Some(w), _) => (*h, *w),
            (_, _, Some(edge)) => (*edge, *edge),
            _ => (DEFAULT_SIZE, DEFAULT_SIZE),
        }
    }

    pub fn filter(&self) -> FilterType {
        match self.resample {
            Some(0) => FilterType::Nearest,
            Some(1) => FilterType::Lanczos3,
            Some(3) => FilterType::CatmullRom,
            _ => FilterType::Triangle,
        }
    }

    fn channel_stats(values: &Option<Vec<f64>>, default: [f64; 3]) -> [f64; 3] {
        match values.as_deref() {
            Some([a, b, c]) => [*a, *b, *c],
            Some([v]) => [*v; 3],
            _ => default,
        }
    }

    pub fn mean(&self) -> [f64; 3] {
        Self::channel_stats(&self.image_mean, DEFAULT_MEAN)
    }

    pub fn std(&self) -> [f64; 3] {
        Self::channel_stats(&self.image_std, DEFAULT_STD)
    }

    /// Decode raw bytes, resize, and return normalized CHW pixel values.
    pub fn pixel_values(&self, bytes: &[u8]) -> Result<PixelValues, DomainError> {
        let rgb = decode_rgb(bytes)?;
        Ok(self.normalize(&rgb))
    }

    /// Resize and normalize an RGB image into CHW `f32` values.
    pub fn normalize(&self, rgb: &RgbImage) -> PixelValues {
        let (height, width) = self.target_size();
        let resized;
        let img = if self.do_resize.unwrap_or(true)
            && (rgb.height() != height || rgb.width() != width)
        {
            resized = image::imageops::resize(rgb, width, height, self.filter());
            &resized
        } else {
            rgb
        };

        let rescale = if self.do_rescale.unwrap_or(true) {
            self.rescale_factor.unwrap_or(DEFAULT_RESCALE)
        } else {
            1.0
        };
        let normalize = self.do_normalize.unwrap_or(true);
        let (mean, std) = (self.mean(), self.std());

        let (w, h) = img.dimensions();
        let plane = (w * h) as usize;
        let mut data = vec![0f32; 3 * plane];
        for (x, y, pixel) in img.enumerate_pixels() {
            let idx = (y * w + x) as usize;
            for c in 0..3 {
                let mut v = f64::from(pixel.0[c]) * rescale;
                if normalize {
                    v = (v - mean[c]) / std[c];
                }
                data[c * plane + idx] = v as f32;
            }
        }
        PixelValues {
            data,
            height: h as usize,
            width: w as usize,
        }
    }

    /// Preprocess one image into a `(3, H, W)` tensor.
    pub fn to_tensor(&self, bytes: &[u8], device: &Device) -> Result<Tensor, DomainError> {
        self.pixel_values(bytes)?
            .into_tensor(device)
            .map_err(|e| DomainError::Classification(format!("build pixel tensor: {}", e)))
    }
}

/// Normalized pixels in CHW order.
#[derive(Debug, Clone)]
pub struct PixelValues {
    pub data: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

impl PixelValues {
    pub fn into_tensor(self, device: &Device) -> candle_core::Result<Tensor> {
        Tensor::from_vec(self.data, (3, self.height, self.width), device)
    }
}

/// Decode any supported raster format and force 3-channel RGB.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, DomainError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(|e| DomainError::InvalidImage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_rgb(b"definitely not a png").unwrap_err();
        assert!(matches!(err, DomainError::InvalidImage(_)));
    }

    #[test]
    fn test_defaults_match_vit_base() {
        let cfg = PreprocessorConfig::default();
        assert_eq!(cfg.target_size(), (224, 224));
        assert_eq!(cfg.mean(), [0.5; 3]);
        assert_eq!(cfg.filter(), FilterType::Triangle);
    }

    #[test]
    fn test_parse_hf_config() {
        let cfg: PreprocessorConfig = serde_json::from_str(
            r#"{
                "do_normalize": true,
                "do_resize": true,
                "image_processor_type": "ViTImageProcessor",
                "image_mean": [0.485, 0.456, 0.406],
                "image_std": [0.229, 0.224, 0.225],
                "resample": 2,
                "rescale_factor": 0.00392156862745098,
                "size": {"height": 32, "width": 48}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.target_size(), (32, 48));
        assert_eq!(cfg.mean(), [0.485, 0.456, 0.406]);
    }

    #[test]
    fn test_pixel_values_layout_and_normalization() {
        let cfg: PreprocessorConfig =
            serde_json::from_str(r#"{"size": {"height": 4, "width": 4}}"#).unwrap();
        let pixels = cfg.pixel_values(&png_bytes(8, 6, [255, 0, 128])).unwrap();
        assert_eq!((pixels.height, pixels.width), (4, 4));
        let values = pixels.data;

        assert_eq!(values.len(), 3 * 4 * 4);
        // Red plane: 255/255 -> (1 - 0.5) / 0.5 = 1
        assert!(values[..16].iter().all(|v| (v - 1.0).abs() < 1e-5));
        // Green plane: 0 -> -1
        assert!(values[16..32].iter().all(|v| (v + 1.0).abs() < 1e-5));
        // Blue plane: 128/255 -> ~0.0039
        assert!(values[32..].iter().all(|v| v.abs() < 0.01));
    }

    #[test]
    fn test_to_tensor_shape() {
        let cfg: PreprocessorConfig =
            serde_json::from_str(r#"{"size": {"height": 8, "width": 8}}"#).unwrap();
        let tensor = cfg
            .to_tensor(&png_bytes(20, 10, [10, 20, 30]), &Device::Cpu)
            .unwrap();
        assert_eq!(tensor.dims(), &[3, 8, 8]);
    }
}
