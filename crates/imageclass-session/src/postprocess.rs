// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Top-K extraction from raw model output

use crate::error::{ClassifyError, ClassifyResult};
use crate::labels::LabelSet;
use crate::tensor::{size_of_shape, OutputBuffer};
use crate::types::{Classification, DataType};

/// Number of ranked results reported
pub const TOP_K: usize = 3;

/// Numerically stable softmax (max subtracted before exponentiation)
///
/// Positive infinities share the whole mass; all negative infinities give a
/// uniform result. A NaN input yields NaN everywhere.
pub fn softmax(values: &[f32]) -> Vec<f32> {
    if values.is_empty() {
        return Vec::new();
    }
    if values.iter().any(|v| v.is_nan()) {
        return vec![f32::NAN; values.len()];
    }

    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::INFINITY {
        let winners = values.iter().filter(|&&v| v == f32::INFINITY).count() as f32;
        return values
            .iter()
            .map(|&v| if v == f32::INFINITY { 1.0 / winners } else { 0.0 })
            .collect();
    }
    if max == f32::NEG_INFINITY {
        return vec![1.0 / values.len() as f32; values.len()];
    }

    let exps: Vec<f32> = values.iter().map(|&v| (v - max).exp()).collect();
    // The max term contributes 1, so the sum is at least 1
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Percentage rounded half-up to two decimals
pub fn to_percent(probability: f32) -> f64 {
    let scaled = f64::from(probability) * 100.0;
    (scaled * 100.0).round() / 100.0
}

/// The three most probable classes, highest first
///
/// Float16 outputs are widened and soft-maxed; float32 outputs are taken as
/// probabilities. Equal scores keep their original index order.
///
/// # Errors
/// * `BufferSizeMismatch` - Buffer shorter than `output_dims` requires
/// * `InsufficientClasses` - Fewer than three classes or labels
/// * `NonFiniteScore` - The network produced NaN
pub fn top_classes(
    buffer: &OutputBuffer,
    labels: &LabelSet,
    data_type: DataType,
    output_dims: &[usize],
) -> ClassifyResult<[Classification; TOP_K]> {
    let count = size_of_shape(output_dims);
    if buffer.len() < count {
        return Err(ClassifyError::BufferSizeMismatch {
            expected: count,
            actual: buffer.len(),
        });
    }
    if count < TOP_K || labels.len() < TOP_K {
        return Err(ClassifyError::InsufficientClasses {
            required: TOP_K,
            available: count.min(labels.len()),
        });
    }

    let mut scores = buffer.to_f32();
    scores.truncate(count);
    if let Some(index) = scores.iter().position(|v| v.is_nan()) {
        return Err(ClassifyError::NonFiniteScore { index });
    }
    if data_type == DataType::Float16 {
        scores = softmax(&scores);
    }

    let mut indexed: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    // sort_by is stable
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut ranked = Vec::with_capacity(TOP_K);
    for (rank, (index, probability)) in indexed.into_iter().take(TOP_K).enumerate() {
        let label = labels.get(index).ok_or(ClassifyError::InsufficientClasses {
            required: index + 1,
            available: labels.len(),
        })?;
        ranked.push(Classification {
            label: label.to_string(),
            probability: to_percent(probability),
            rank,
        });
    }

    ranked.try_into().map_err(|v: Vec<Classification>| ClassifyError::InsufficientClasses {
        required: TOP_K,
        available: v.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    fn labels(n: usize) -> LabelSet {
        (0..n).map(|i| format!("class{}", i)).collect()
    }

    #[test]
    fn test_orders_by_probability() {
        let buffer = OutputBuffer::Float32(vec![0.1, 0.6, 0.05, 0.25]);
        let top = top_classes(&buffer, &labels(4), DataType::Float32, &[1, 4]).unwrap();
        assert_eq!(top[0].label, "class1");
        assert_eq!(top[0].probability, 60.0);
        assert_eq!(top[1].label, "class3");
        assert_eq!(top[2].label, "class0");
        assert_eq!([top[0].rank, top[1].rank, top[2].rank], [0, 1, 2]);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let buffer = OutputBuffer::Float32(vec![0.2, 0.5, 0.5, 0.5, 0.1]);
        let top = top_classes(&buffer, &labels(5), DataType::Float32, &[1, 5]).unwrap();
        let names: Vec<_> = top.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(names, ["class1", "class2", "class3"]);
    }

    #[test]
    fn test_all_equal_float16_gives_thirds() {
        let bits = f16::from_f32(1.5).to_bits();
        let buffer = OutputBuffer::Float16(vec![bits; 3]);
        let top = top_classes(&buffer, &labels(3), DataType::Float16, &[1, 3]).unwrap();
        for (i, c) in top.iter().enumerate() {
            assert_eq!(c.probability, 33.33);
            assert_eq!(c.label, format!("class{}", i));
        }
    }

    #[test]
    fn test_float16_softmax_sums_to_hundred() {
        let raw: Vec<u16> = (0..1000)
            .map(|i| f16::from_f32((i % 17) as f32 * 0.25 - 2.0).to_bits())
            .collect();
        let widened: Vec<f32> = raw.iter().map(|&b| f16::from_bits(b).to_f32()).collect();
        let total: f32 = softmax(&widened).iter().sum();
        assert!((total - 1.0).abs() < 1e-3);

        let top = top_classes(&OutputBuffer::Float16(raw), &labels(1000), DataType::Float16, &[1, 1000]).unwrap();
        assert!(top[0].probability >= top[1].probability);
        assert!(top[1].probability >= top[2].probability);
    }

    #[test]
    fn test_nan_float16_score_is_rejected() {
        let mut raw: Vec<u16> = (0..1000).map(|i| f16::from_f32((i % 7) as f32).to_bits()).collect();
        raw[321] = f16::NAN.to_bits();
        let err = top_classes(&OutputBuffer::Float16(raw), &labels(1000), DataType::Float16, &[1, 1000]).unwrap_err();
        assert!(matches!(err, ClassifyError::NonFiniteScore { index: 321 }));
    }

    #[test]
    fn test_nan_float32_score_is_rejected() {
        let buffer = OutputBuffer::Float32(vec![0.2, f32::NAN, 0.3, 0.5]);
        let err = top_classes(&buffer, &labels(4), DataType::Float32, &[1, 4]).unwrap_err();
        assert!(matches!(err, ClassifyError::NonFiniteScore { index: 1 }));
    }

    #[test]
    fn test_infinite_float16_logit_wins_outright() {
        let mut raw: Vec<u16> = (0..1000).map(|i| f16::from_f32((i % 5) as f32).to_bits()).collect();
        raw[500] = f16::INFINITY.to_bits();
        let top = top_classes(&OutputBuffer::Float16(raw), &labels(1000), DataType::Float16, &[1, 1000]).unwrap();
        assert_eq!(top[0].label, "class500");
        assert_eq!(top[0].probability, 100.0);
        assert_eq!(top[1].probability, 0.0);
        assert_eq!(top[2].probability, 0.0);
    }

    #[test]
    fn test_softmax_is_normalized_for_extreme_inputs() {
        let total: f32 = softmax(&[f32::INFINITY, 1.0, f32::INFINITY]).iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert_eq!(softmax(&[f32::NEG_INFINITY; 4]), vec![0.25; 4]);
        assert!(softmax(&[1.0, f32::NAN]).iter().all(|v| v.is_nan()));
        assert!(softmax(&[]).is_empty());
    }

    #[test]
    fn test_half_up_rounding() {
        assert_eq!(to_percent(0.123456), 12.35);
        assert_eq!(to_percent(1.0), 100.0);
        assert_eq!(to_percent(0.0), 0.0);
    }

    #[test]
    fn test_too_few_labels() {
        let buffer = OutputBuffer::Float32(vec![0.5, 0.3, 0.2]);
        let err = top_classes(&buffer, &labels(2), DataType::Float32, &[1, 3]).unwrap_err();
        assert!(matches!(err, ClassifyError::InsufficientClasses { required: 3, available: 2 }));
    }

    #[test]
    fn test_top_index_without_label() {
        let buffer = OutputBuffer::Float32(vec![0.0, 0.0, 0.1, 0.2, 0.7]);
        let err = top_classes(&buffer, &labels(4), DataType::Float32, &[1, 5]).unwrap_err();
        assert!(matches!(err, ClassifyError::InsufficientClasses { .. }));
    }

    #[test]
    fn test_short_buffer() {
        let buffer = OutputBuffer::Float32(vec![0.5; 10]);
        let err = top_classes(&buffer, &labels(1000), DataType::Float32, &[1, 1000]).unwrap_err();
        assert!(matches!(err, ClassifyError::BufferSizeMismatch { expected: 1000, actual: 10 }));
    }
}
