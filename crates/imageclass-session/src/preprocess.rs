// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Image → input tensor conversion

use half::f16;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::error::{ClassifyError, ClassifyResult};
use crate::registry::{ChannelScheme, InputOptions};
use crate::tensor::InputTensor;
use crate::types::{DataType, Layout};

/// Maximum preview width in pixels
pub const PREVIEW_MAX_WIDTH: u32 = 380;
/// Maximum preview height in pixels
pub const PREVIEW_MAX_HEIGHT: u32 = 380;

/// Size at which an input image is previewed: scaled down to fit the
/// preview box, aspect ratio preserved, never upscaled
pub fn preview_size(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }
    let scale = f64::min(
        1.0,
        f64::min(
            f64::from(PREVIEW_MAX_WIDTH) / f64::from(width),
            f64::from(PREVIEW_MAX_HEIGHT) / f64::from(height),
        ),
    );
    (
        ((f64::from(width) * scale).floor() as u32).max(1),
        ((f64::from(height) * scale).floor() as u32).max(1),
    )
}

/// Build the model input tensor for `image`
///
/// The image is stretched to the input size; each channel is optionally
/// scaled to 0..1, then normalized as `(v - mean[c]) / std[c]`.
pub fn input_tensor(image: &DynamicImage, options: &InputOptions) -> ClassifyResult<InputTensor> {
    let (height, width) = options.image_size();
    if height == 0 || width == 0 {
        return Err(ClassifyError::Preprocess(format!(
            "unsupported input dimensions {:?}",
            options.input_dimensions
        )));
    }
    let channels = 3;

    let resized = image
        .resize_exact(width as u32, height as u32, FilterType::Triangle)
        .to_rgb8();

    let mut values = vec![0.0f32; channels * height * width];
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..channels {
            let source = match options.channel_scheme {
                ChannelScheme::Rgb => c,
                ChannelScheme::Bgr => channels - c - 1,
            };
            let mut value = f32::from(pixel.0[source]);
            if options.norm {
                value /= 255.0;
            }
            value = (value - options.mean[c]) / options.std[c];

            let index = match options.input_layout {
                Layout::Nchw => c * height * width + y * width + x,
                Layout::Nhwc => y * width * channels + x * channels + c,
            };
            values[index] = value;
        }
    }

    let dims = options.input_dimensions.clone();
    Ok(match options.data_type {
        DataType::Float32 => InputTensor::Float32 { data: values, dims },
        DataType::Float16 => InputTensor::Float16 {
            data: values.into_iter().map(|v| f16::from_f32(v).to_bits()).collect(),
            dims,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelKind;
    use image::{Rgb, RgbImage};

    fn solid(r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 16, Rgb([r, g, b])))
    }

    #[test]
    fn test_preview_never_upscales() {
        assert_eq!(preview_size(200, 100), (200, 100));
        assert_eq!(preview_size(760, 380), (380, 190));
        assert_eq!(preview_size(1000, 2000), (190, 380));
        assert_eq!(preview_size(0, 10), (0, 0));
    }

    #[test]
    fn test_nchw_normalization() {
        let options = ModelKind::MobilenetV2Nchw.input_options();
        let tensor = input_tensor(&solid(255, 0, 0), &options).unwrap();
        assert_eq!(tensor.dims(), &[1, 3, 224, 224]);
        assert_eq!(tensor.len(), 3 * 224 * 224);

        let plane = 224 * 224;
        let red = tensor.value_at(0).unwrap();
        let green = tensor.value_at(plane).unwrap();
        assert!((red - (1.0 - 0.485) / 0.229).abs() < 1e-4);
        assert!((green - (0.0 - 0.456) / 0.224).abs() < 1e-4);
    }

    #[test]
    fn test_nhwc_interleaves_channels() {
        let options = ModelKind::SqueezenetNhwc.input_options();
        let tensor = input_tensor(&solid(255, 127, 0), &options).unwrap();
        assert_eq!(tensor.dims(), &[1, 224, 224, 3]);
        assert!((tensor.value_at(0).unwrap() - 1.0).abs() < 1e-4);
        assert!((tensor.value_at(1).unwrap() - (-0.5 / 127.5)).abs() < 1e-4);
        assert!((tensor.value_at(2).unwrap() + 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bgr_swaps_channels() {
        let mut options = ModelKind::SqueezenetNhwc.input_options();
        options.channel_scheme = ChannelScheme::Bgr;
        let tensor = input_tensor(&solid(255, 127, 0), &options).unwrap();
        assert!((tensor.value_at(0).unwrap() + 1.0).abs() < 1e-4);
        assert!((tensor.value_at(2).unwrap() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_float16_encoding() {
        let options = ModelKind::EfficientnetFp16Nchw.input_options();
        let tensor = input_tensor(&solid(10, 20, 30), &options).unwrap();
        assert_eq!(tensor.data_type(), DataType::Float16);
        let expected = (10.0 / 255.0 - 0.485) / 0.229;
        assert!((tensor.value_at(0).unwrap() - expected).abs() < 1e-2);
    }
}
