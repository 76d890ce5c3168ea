use super::ClassifierError;
use crate::models::{ClassScore, LabelSet, Prediction};

/// A single sigmoid output at or above this value selects the second class
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Map raw model output to a prediction.
///
/// A single value is the sigmoid probability of label 1 (binary head); a
/// vector is one probability per label (softmax head). Values outside [0, 1]
/// are treated as logits and squashed first.
pub fn interpret(raw: &[f32], labels: &LabelSet) -> Result<Prediction, ClassifierError> {
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(ClassifierError::Inference(format!(
            "model output contains non-finite values: {:?}",
            raw
        )));
    }

    let (index, probabilities) = match raw {
        [] => {
            return Err(ClassifierError::Inference(
                "model produced an empty output".to_string(),
            ));
        }
        [p] => {
            if labels.len() != 2 {
                return Err(ClassifierError::Inference(format!(
                    "binary output requires 2 labels, label set has {}",
                    labels.len()
                )));
            }
            let p = if (0.0..=1.0).contains(p) { *p } else { sigmoid(*p) };
            let index = if p >= BINARY_THRESHOLD { 1 } else { 0 };
            (index, vec![1.0 - p, p])
        }
        _ => {
            if raw.len() != labels.len() {
                return Err(ClassifierError::Inference(format!(
                    "model produced {} scores, label set has {}",
                    raw.len(),
                    labels.len()
                )));
            }
            let probabilities = if raw.iter().all(|v| (0.0..=1.0).contains(v)) {
                raw.to_vec()
            } else {
                softmax(raw)
            };
            (argmax(&probabilities), probabilities)
        }
    };

    let label = labels.get(index).ok_or_else(|| {
        ClassifierError::Inference(format!("class index {} out of range", index))
    })?;

    let scores = labels
        .iter()
        .zip(&probabilities)
        .map(|(label, &p)| ClassScore {
            class: label.id.clone(),
            confidence: to_percent(p),
        })
        .collect();

    Ok(Prediction {
        index,
        class: label.id.clone(),
        class_name: label.name.clone(),
        confidence: to_percent(probabilities[index]),
        scores,
    })
}

/// Index of the largest value; the first one wins on ties
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Probability to percentage, clamped to [0, 100] and rounded to two decimals
pub fn to_percent(p: f32) -> f64 {
    let percent = (p as f64 * 10_000.0).round() / 100.0;
    percent.clamp(0.0, 100.0)
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn softmax(values: &[f32]) -> Vec<f32> {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
