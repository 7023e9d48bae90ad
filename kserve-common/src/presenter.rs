//! Turns decoded output tensors into per-sample predictions.

use serde::Serialize;

use crate::catalog::ClassCatalog;
use crate::error::{Error, Result};
use crate::response::InferenceResponse;
use crate::tensor::decode_slice;
use crate::{PREDICTIONS_OUTPUT, PROBABILITIES_OUTPUT};

/// Probability the model assigned to one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub class_name: String,
    pub probability: f64,
}

/// Prediction for one input sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub sample_index: usize,
    pub sample_label: String,
    pub predicted_class_index: usize,
    pub predicted_class_name: String,
    /// In catalog order. Empty when the server returned no probabilities.
    pub class_probabilities: Vec<ClassProbability>,
}

/// Pair every sample label with its predicted class and, when the response
/// carries a `probabilities` tensor, its per-class probabilities.
pub fn present<S: AsRef<str>>(
    response: &InferenceResponse,
    catalog: &ClassCatalog,
    sample_labels: &[S],
) -> Result<Vec<PredictionResult>> {
    let predictions = response
        .output(PREDICTIONS_OUTPUT)
        .ok_or_else(|| Error::MissingOutput {
            name: PREDICTIONS_OUTPUT.to_string(),
        })?;
    let probabilities = response.output(PROBABILITIES_OUTPUT);
    let class_count = catalog.len();

    if let Some(tensor) = probabilities {
        if let [_, width] = tensor.shape() {
            if *width != class_count as u64 {
                return Err(Error::IndexOutOfRange(format!(
                    "{} has {} columns but the class catalog has {} classes",
                    PROBABILITIES_OUTPUT, width, class_count
                )));
            }
        }
    }

    sample_labels
        .iter()
        .enumerate()
        .map(|(i, label)| -> Result<PredictionResult> {
            let value = *predictions.data().get(i).ok_or_else(|| {
                Error::IndexOutOfRange(format!(
                    "no prediction for sample {} ({} returned)",
                    i,
                    predictions.data().len()
                ))
            })?;
            let index = class_index(value, class_count).ok_or(Error::InvalidClassIndex {
                sample: i,
                value,
                class_count,
            })?;

            let class_probabilities = match probabilities {
                Some(tensor) => decode_slice(tensor, i, class_count)?
                    .iter()
                    .zip(catalog.names())
                    .map(|(&probability, class_name)| {
                        if !(0.0..=1.0).contains(&probability) {
                            return Err(Error::InvalidProbability {
                                sample: i,
                                class_name: class_name.clone(),
                                value: probability,
                            });
                        }
                        Ok(ClassProbability {
                            class_name: class_name.clone(),
                            probability,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };

            Ok(PredictionResult {
                sample_index: i,
                sample_label: label.as_ref().to_string(),
                predicted_class_index: index,
                predicted_class_name: catalog.names()[index].clone(),
                class_probabilities,
            })
        })
        .collect()
}

fn class_index(value: f64, class_count: usize) -> Option<usize> {
    if value.fract() != 0.0 || value < 0.0 || value >= class_count as f64 {
        return None;
    }
    Some(value as usize)
}
