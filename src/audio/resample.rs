//! Box-filter sample rate conversion
//!
//! Every output sample is the mean of the input samples in its window.
//! Windows partition the input left to right, so this is a decimator: no
//! anti-aliasing is applied and content above the output Nyquist folds back.

/// Resample `samples` from `input_rate` to `output_rate`.
///
/// Equal rates return the input unchanged. The output holds
/// `round(len * output_rate / input_rate)` samples; output sample `j` averages
/// the inputs in `[round(j * ratio), round((j + 1) * ratio))`, and an empty
/// window (only possible at the tail) yields `0.0`.
pub fn resample(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input_rate == output_rate || input_rate == 0 || output_rate == 0 {
        return samples.to_vec();
    }

    let ratio = input_rate as f64 / output_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(output_len);

    let mut offset = 0usize;
    for j in 0..output_len {
        let next_offset = ((j + 1) as f64 * ratio).round() as usize;
        let end = next_offset.min(samples.len());
        let start = offset.min(end);

        let window = &samples[start..end];
        let value = if window.is_empty() {
            0.0
        } else {
            window.iter().map(|&s| s as f64).sum::<f64>() / window.len() as f64
        };
        output.push(value as f32);

        offset = next_offset;
    }

    output
}

/// Linear interpolation to `output_rate`, for bringing wire audio up to an
/// output device rate (the box filter leaves gaps when upsampling)
pub fn interpolate_linear(samples: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input_rate == output_rate || input_rate == 0 || output_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = input_rate as f64 / output_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos as usize).min(last);
            let next = (idx + 1).min(last);
            let fraction = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * fraction
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_48k_block_to_16k() {
        let input = vec![0.25f32; 4800];
        let output = resample(&input, 48000, 16000);
        assert_eq!(output.len(), 1600);
        assert!(output.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_window_means() {
        let input = [0.0, 0.3, 0.6, 0.9, 0.3, 0.0];
        let output = resample(&input, 48000, 16000);
        assert_eq!(output.len(), 2);
        assert!((output[0] - 0.3).abs() < 1e-6);
        assert!((output[1] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_non_integer_ratio() {
        // 44.1k -> 16k, ratio 2.75625
        let input: Vec<f32> = (0..4096).map(|i| (i % 7) as f32 / 7.0).collect();
        let output = resample(&input, 44100, 16000);
        assert_eq!(output.len(), (4096.0f64 / 2.75625).round() as usize);
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_empty_tail_window_is_zero() {
        // 5 samples at ratio 3: round(5/3) = 2 outputs, the second window
        // is [3, 6) clipped to [3, 5)
        let output = resample(&[1.0; 5], 48000, 16000);
        assert_eq!(output, vec![1.0, 1.0]);

        // 1 sample at ratio 3 rounds to 0 outputs
        assert!(resample(&[1.0], 48000, 16000).is_empty());

        // 2 samples at ratio 3 yield one output averaging both
        assert_eq!(resample(&[0.5, 1.0], 48000, 16000), vec![0.75]);
    }

    #[test]
    fn test_upsampling_leaves_gaps_as_zero() {
        let output = resample(&[1.0, 1.0], 16000, 48000);
        assert_eq!(output.len(), 6);
        assert!(output.iter().all(|&s| s == 0.0 || s == 1.0));
    }

    #[test]
    fn test_interpolate_16k_to_48k() {
        let output = interpolate_linear(&[0.0, 0.3, 0.6], 16000, 48000);
        assert_eq!(output.len(), 9);
        assert!((output[1] - 0.1).abs() < 1e-6);
        assert!((output[3] - 0.3).abs() < 1e-6);
        assert!((output[8] - 0.6).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_identity(samples in prop::collection::vec(-1.0f32..=1.0, 0..2048), rate in 8000u32..96000) {
            prop_assert_eq!(resample(&samples, rate, rate), samples);
        }

        #[test]
        fn prop_output_length(
            samples in prop::collection::vec(-1.0f32..=1.0, 0..4096),
            input_rate in prop::sample::select(vec![16000u32, 22050, 44100, 48000, 96000]),
        ) {
            let output = resample(&samples, input_rate, 16000);
            let expected = samples.len() as f64 * 16000.0 / input_rate as f64;
            prop_assert!((output.len() as f64 - expected).abs() <= 1.0);
        }

        #[test]
        fn prop_output_stays_in_range(samples in prop::collection::vec(-1.0f32..=1.0, 0..4096)) {
            let output = resample(&samples, 48000, 16000);
            prop_assert!(output.iter().all(|&s| (-1.0..=1.0).contains(&s)));
        }
    }
}
