use crate::models::TextAnnotation;

/// Returned when the backend supplies no usable per-token scores.
pub const DEFAULT_CONFIDENCE: f32 = 0.85;

/// Average the token confidences of a recognition response.
///
/// Annotation 0 is the whole-document summary and never contributes.
/// Tokens without a score are skipped.
pub fn estimate(annotations: &[TextAnnotation]) -> f32 {
    if annotations.len() < 2 {
        return DEFAULT_CONFIDENCE;
    }

    let (sum, count) = annotations[1..]
        .iter()
        .filter_map(|a| a.confidence)
        .fold((0.0f64, 0usize), |(sum, count), c| {
            (sum + f64::from(c), count + 1)
        });

    if count == 0 {
        return DEFAULT_CONFIDENCE;
    }

    (sum / count as f64) as f32
}
