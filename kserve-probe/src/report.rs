//! Plain-text rendering of probe results for the terminal.

use std::fmt::Write;

use kserve_common::{ModelMetadata, PredictionResult};

use crate::pipeline::{RunReport, StageError};

const RULE: &str = "==================================================";

/// Summary of the model metadata probe.
pub fn render_metadata(model_name: &str, model_version: &str, metadata: &ModelMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model {} v{} available", model_name, model_version);
    let _ = writeln!(out, "   Platform: {}", metadata.platform);
    let _ = writeln!(out, "   Inputs: {}", metadata.inputs.len());
    let _ = writeln!(out, "   Outputs: {}", metadata.outputs.len());
    out
}

/// One block per sample: predicted class and, when present, probabilities.
pub fn render_results(results: &[PredictionResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "INFERENCE RESULTS");
    let _ = writeln!(out, "{}", RULE);

    for result in results {
        let _ = writeln!(out);
        let _ = writeln!(out, "Sample: {}", result.sample_label);
        let _ = writeln!(
            out,
            "   Prediction: {} (class {})",
            result.predicted_class_name, result.predicted_class_index
        );

        if !result.class_probabilities.is_empty() {
            let _ = writeln!(out, "   Probabilities:");
            for class in &result.class_probabilities {
                let _ = writeln!(
                    out,
                    "     - {}: {:.4} ({:.2}%)",
                    class.class_name,
                    class.probability,
                    class.probability * 100.0
                );
            }
        }
    }
    out
}

/// Full report of a successful run.
pub fn render_report(model_name: &str, model_version: &str, report: &RunReport) -> String {
    let mut out = render_metadata(model_name, model_version, &report.metadata);
    let _ = writeln!(out);
    out.push_str(&render_results(&report.results));
    let _ = writeln!(out);
    let _ = writeln!(out, "Inference test completed successfully");
    let _ = writeln!(out, "Response time: {:.3}s", report.inference_time.as_secs_f64());
    out
}

/// Diagnostic for a failed run, naming the stage. The metadata summary
/// leads when the run got that far.
pub fn render_failure(model_name: &str, model_version: &str, err: &StageError) -> String {
    let mut out = match &err.metadata {
        Some(metadata) => {
            let mut out = render_metadata(model_name, model_version, metadata);
            let _ = writeln!(out);
            out
        }
        None => String::new(),
    };
    let _ = write!(out, "Probe failed at the {} stage: {}", err.stage, err.error);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pipeline::Stage;
    use kserve_common::ClassProbability;

    fn setosa(probabilities: Vec<ClassProbability>) -> PredictionResult {
        PredictionResult {
            sample_index: 0,
            sample_label: "setosa".to_string(),
            predicted_class_index: 0,
            predicted_class_name: "setosa".to_string(),
            class_probabilities: probabilities,
        }
    }

    #[test]
    fn test_render_results_with_probabilities() {
        let result = setosa(vec![
            ClassProbability {
                class_name: "setosa".to_string(),
                probability: 0.9,
            },
            ClassProbability {
                class_name: "versicolor".to_string(),
                probability: 0.1,
            },
        ]);
        let text = render_results(&[result]);

        assert!(text.contains("Sample: setosa"));
        assert!(text.contains("Prediction: setosa (class 0)"));
        assert!(text.contains("- setosa: 0.9000 (90.00%)"));
        assert!(text.contains("- versicolor: 0.1000 (10.00%)"));
    }

    #[test]
    fn test_render_failure_keeps_metadata_summary() {
        let metadata = ModelMetadata::from_slice(
            br#"{"platform": "onnxruntime_onnx",
                 "inputs": [{"name": "input_features", "datatype": "FP32", "shape": [-1, 4]}],
                 "outputs": []}"#,
        )
        .unwrap();
        let mut err = StageError {
            stage: Stage::Infer,
            error: Error::InvalidInput("boom".to_string()),
            metadata: Some(metadata),
        };

        let text = render_failure("iris_classifier", "1", &err);
        assert!(text.starts_with("Model iris_classifier v1 available"));
        assert!(text.contains("Platform: onnxruntime_onnx"));
        assert!(text.ends_with("Probe failed at the infer stage: Invalid input: boom"));

        err.metadata = None;
        let text = render_failure("iris_classifier", "1", &err);
        assert!(!text.contains("Platform"));
    }

    #[test]
    fn test_render_results_without_probabilities() {
        let text = render_results(&[setosa(vec![])]);
        assert!(text.contains("Prediction: setosa (class 0)"));
        assert!(!text.contains("Probabilities"));
    }
}
