//! Parallel evaluation of (model × test case) combinations.
//!
//! Every job is an independent extraction session with its own client and
//! conversation, so jobs run freely on a bounded pool of worker threads
//! pulling from a shared queue; no state is shared between them beyond the
//! results vector. A failing job becomes an error entry in the results,
//! never a panic.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use chrono::Local;
use serde::Serialize;

use super::metrics::{calculate, CaseMetrics};
use super::EvalError;
use crate::extraction::{ContainerExtractor, ContainerRecord, SessionState};
use crate::llm::OpenRouterClient;

/// Image extensions probed for each test case, in order.
const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png"];

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub models: Vec<String>,
    /// Explicit case names; empty means discover from the answers
    /// directory.
    pub test_cases: Vec<String>,
    /// Directory holding `images/<case>.<ext>` and `answers/<case>.json`.
    pub data_dir: PathBuf,
    pub api_key: String,
    pub max_iterations: u32,
    pub max_workers: usize,
}

/// Outcome of one (model, test case) job.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub model: String,
    pub test_case: String,
    pub success: bool,
    pub seconds: f64,
    pub state: Option<SessionState>,
    pub correction_attempts: Option<u32>,
    pub metrics: Option<CaseMetrics>,
    pub error: Option<String>,
}

/// Per-model aggregate across all of its jobs.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub model: String,
    pub tests: usize,
    pub successes: usize,
    /// Jobs with F1 == 1.0.
    pub perfect: usize,
    pub avg_f1: f64,
    pub avg_precision: f64,
    pub avg_recall: f64,
    pub avg_seconds: f64,
}

/// Full evaluation report, as persisted to disk.
#[derive(Debug, Serialize)]
pub struct EvalReport {
    pub timestamp: String,
    pub total_tests: usize,
    pub successful_tests: usize,
    pub model_summaries: Vec<ModelSummary>,
    pub results: Vec<JobResult>,
}

/// List test cases from the answers directory (`answers/*.json` stems).
pub fn discover_test_cases(data_dir: &Path) -> Result<Vec<String>, EvalError> {
    let answers_dir = data_dir.join("answers");
    let mut cases = Vec::new();
    for entry in std::fs::read_dir(&answers_dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "json") {
            if let Some(stem) = path.file_stem() {
                cases.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    if cases.is_empty() {
        return Err(EvalError::NoTestCases(data_dir.to_path_buf()));
    }
    cases.sort();
    Ok(cases)
}

/// Resolve a test case's image path, probing known extensions.
pub fn image_path(data_dir: &Path, case: &str) -> Result<PathBuf, EvalError> {
    for ext in IMAGE_EXTENSIONS {
        let candidate = data_dir.join("images").join(format!("{case}.{ext}"));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(EvalError::MissingImage(case.to_string()))
}

/// Load the expected answer records for a test case.
pub fn load_expected(data_dir: &Path, case: &str) -> Result<Vec<ContainerRecord>, EvalError> {
    let path = data_dir.join("answers").join(format!("{case}.json"));
    if !path.exists() {
        return Err(EvalError::MissingAnswers(path));
    }
    let text = std::fs::read_to_string(&path)?;
    serde_json::from_str(&text).map_err(|e| EvalError::AnswerShape {
        path,
        message: e.to_string(),
    })
}

/// Run the full evaluation grid with OpenRouter-backed extractors.
pub fn run(config: &EvalConfig) -> Result<Vec<JobResult>, EvalError> {
    run_with(config, |model| {
        let client = OpenRouterClient::openrouter(&config.api_key);
        ContainerExtractor::new(Box::new(client), model, config.max_iterations)
    })
}

/// Run the grid with a caller-supplied extractor factory (mockable).
pub fn run_with<F>(config: &EvalConfig, make_extractor: F) -> Result<Vec<JobResult>, EvalError>
where
    F: Fn(&str) -> ContainerExtractor + Send + Sync,
{
    let cases = if config.test_cases.is_empty() {
        discover_test_cases(&config.data_dir)?
    } else {
        config.test_cases.clone()
    };

    // Fail fast on missing fixtures before paying for any model calls.
    for case in &cases {
        image_path(&config.data_dir, case)?;
        load_expected(&config.data_dir, case)?;
    }

    let mut jobs = VecDeque::new();
    for model in &config.models {
        for case in &cases {
            jobs.push_back((model.clone(), case.clone()));
        }
    }

    let total = jobs.len();
    let workers = config.max_workers.clamp(1, total.max(1));
    tracing::info!(jobs = total, workers, "starting evaluation run");

    let queue = Mutex::new(jobs);
    let results = Mutex::new(Vec::with_capacity(total));

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let job = queue.lock().unwrap().pop_front();
                let Some((model, case)) = job else { break };
                let result = run_job(config, &make_extractor, &model, &case);
                match &result.metrics {
                    Some(m) => tracing::info!(
                        model = %model,
                        case = %case,
                        f1 = m.f1_score,
                        seconds = result.seconds,
                        "job finished"
                    ),
                    None => tracing::warn!(
                        model = %model,
                        case = %case,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "job failed"
                    ),
                }
                results.lock().unwrap().push(result);
            });
        }
    });

    let mut results = results.into_inner().unwrap();
    results.sort_by(|a, b| (&a.model, &a.test_case).cmp(&(&b.model, &b.test_case)));
    Ok(results)
}

fn run_job<F>(config: &EvalConfig, make_extractor: &F, model: &str, case: &str) -> JobResult
where
    F: Fn(&str) -> ContainerExtractor,
{
    let start = Instant::now();
    let outcome = image_path(&config.data_dir, case)
        .map_err(|e| e.to_string())
        .and_then(|image| {
            make_extractor(model)
                .extract_from_path(&image)
                .map_err(|e| e.to_string())
        })
        .and_then(|outcome| {
            let expected =
                load_expected(&config.data_dir, case).map_err(|e| e.to_string())?;
            Ok((calculate(&outcome.records, &expected), outcome))
        });
    let seconds = start.elapsed().as_secs_f64();

    match outcome {
        Ok((metrics, outcome)) => JobResult {
            model: model.to_string(),
            test_case: case.to_string(),
            success: true,
            seconds,
            state: Some(outcome.state),
            correction_attempts: Some(outcome.correction_attempts),
            metrics: Some(metrics),
            error: None,
        },
        Err(error) => JobResult {
            model: model.to_string(),
            test_case: case.to_string(),
            success: false,
            seconds,
            state: None,
            correction_attempts: None,
            metrics: None,
            error: Some(error),
        },
    }
}

/// Aggregate results per model, in the given model order.
pub fn summarize_models(results: &[JobResult], models: &[String]) -> Vec<ModelSummary> {
    models
        .iter()
        .map(|model| {
            let all: Vec<&JobResult> = results.iter().filter(|r| &r.model == model).collect();
            let ok: Vec<&JobResult> = all.iter().copied().filter(|r| r.success).collect();
            let n = ok.len() as f64;
            let avg = |f: &dyn Fn(&JobResult) -> f64| {
                if ok.is_empty() {
                    0.0
                } else {
                    ok.iter().map(|r| f(r)).sum::<f64>() / n
                }
            };
            ModelSummary {
                model: model.clone(),
                tests: all.len(),
                successes: ok.len(),
                perfect: ok
                    .iter()
                    .filter(|r| r.metrics.as_ref().is_some_and(|m| m.is_perfect()))
                    .count(),
                avg_f1: avg(&|r| r.metrics.as_ref().map_or(0.0, |m| m.f1_score)),
                avg_precision: avg(&|r| r.metrics.as_ref().map_or(0.0, |m| m.precision)),
                avg_recall: avg(&|r| r.metrics.as_ref().map_or(0.0, |m| m.recall)),
                avg_seconds: avg(&|r| r.seconds),
            }
        })
        .collect()
}

/// Assemble the persisted report.
pub fn build_report(results: Vec<JobResult>, models: &[String]) -> EvalReport {
    EvalReport {
        timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
        total_tests: results.len(),
        successful_tests: results.iter().filter(|r| r.success).count(),
        model_summaries: summarize_models(&results, models),
        results,
    }
}

/// Print a human-readable run summary.
pub fn print_summary(report: &EvalReport) {
    println!();
    println!("{:=<80}", "");
    println!("EVALUATION SUMMARY");
    println!("{:=<80}", "");
    println!(
        "Total tests: {}   Successful: {}   Failed: {}",
        report.total_tests,
        report.successful_tests,
        report.total_tests - report.successful_tests
    );

    println!();
    println!(
        "{:<32} {:>5} {:>8} {:>6} {:>6} {:>6} {:>8}",
        "Model", "OK", "Perfect", "F1", "Prec", "Rec", "Time"
    );
    println!("{:-<80}", "");
    for summary in &report.model_summaries {
        println!(
            "{:<32} {:>2}/{:<2} {:>8} {:>6.3} {:>6.3} {:>6.3} {:>7.1}s",
            summary.model,
            summary.successes,
            summary.tests,
            summary.perfect,
            summary.avg_f1,
            summary.avg_precision,
            summary.avg_recall,
            summary.avg_seconds,
        );
    }

    let failed: Vec<&JobResult> = report.results.iter().filter(|r| !r.success).collect();
    if !failed.is_empty() {
        println!();
        println!("Failed jobs:");
        for result in failed {
            println!(
                "  {} on {}: {}",
                result.model,
                result.test_case,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;

    const VALID_ID: &str = "CSQU3054383";

    /// Lay out a test-data directory with one tiny PNG and its answer.
    fn fixture(dir: &Path, case: &str, answer_ids: &[&str]) {
        let images = dir.join("images");
        let answers = dir.join("answers");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::create_dir_all(&answers).unwrap();

        let mut buf = std::io::Cursor::new(Vec::new());
        let img = image::GrayImage::from_pixel(1, 1, image::Luma([0u8]));
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        std::fs::write(images.join(format!("{case}.png")), buf.into_inner()).unwrap();

        let answer: Vec<serde_json::Value> = answer_ids
            .iter()
            .map(|id| serde_json::json!({ "container_id": id }))
            .collect();
        std::fs::write(
            answers.join(format!("{case}.json")),
            serde_json::to_string(&answer).unwrap(),
        )
        .unwrap();
    }

    fn config(dir: &Path, models: &[&str]) -> EvalConfig {
        EvalConfig {
            models: models.iter().map(|m| m.to_string()).collect(),
            test_cases: vec![],
            data_dir: dir.to_path_buf(),
            api_key: "test-key".into(),
            max_iterations: 3,
            max_workers: 4,
        }
    }

    fn mock_extractor(response: &str) -> ContainerExtractor {
        ContainerExtractor::new(Box::new(MockChatClient::new(response)), "mock", 3)
    }

    #[test]
    fn discovers_cases_from_answer_files() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path(), "container_1", &[VALID_ID]);
        fixture(dir.path(), "container_0", &[VALID_ID]);

        let cases = discover_test_cases(dir.path()).unwrap();
        assert_eq!(cases, vec!["container_0", "container_1"]);
    }

    #[test]
    fn empty_answers_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("answers")).unwrap();
        assert!(matches!(
            discover_test_cases(dir.path()),
            Err(EvalError::NoTestCases(_))
        ));
    }

    #[test]
    fn missing_image_detected_before_running() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path(), "case_a", &[VALID_ID]);
        std::fs::remove_file(dir.path().join("images/case_a.png")).unwrap();

        let cfg = config(dir.path(), &["m1"]);
        let result = run_with(&cfg, |_| mock_extractor("[]"));
        assert!(matches!(result, Err(EvalError::MissingImage(_))));
    }

    #[test]
    fn grid_runs_every_model_case_combination() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path(), "case_a", &[VALID_ID]);
        fixture(dir.path(), "case_b", &[VALID_ID]);

        let cfg = config(dir.path(), &["m1", "m2"]);
        let response = format!(r#"[{{"container_id": "{VALID_ID}"}}]"#);
        let results = run_with(&cfg, |_| mock_extractor(&response)).unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.success));
        assert!(results
            .iter()
            .all(|r| r.metrics.as_ref().unwrap().is_perfect()));
        // Sorted by (model, case) for a stable report.
        assert_eq!(results[0].model, "m1");
        assert_eq!(results[0].test_case, "case_a");
        assert_eq!(results[3].model, "m2");
        assert_eq!(results[3].test_case, "case_b");
    }

    #[test]
    fn failing_job_becomes_error_entry_without_poisoning_others() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path(), "case_a", &[VALID_ID]);

        let cfg = config(dir.path(), &["good", "bad"]);
        let response = format!(r#"[{{"container_id": "{VALID_ID}"}}]"#);
        let results = run_with(&cfg, |model| {
            if model == "bad" {
                // Never returns a parseable array: extraction fails.
                mock_extractor("not json")
            } else {
                mock_extractor(&response)
            }
        })
        .unwrap();

        let good = results.iter().find(|r| r.model == "good").unwrap();
        let bad = results.iter().find(|r| r.model == "bad").unwrap();
        assert!(good.success);
        assert!(!bad.success);
        assert!(bad.error.as_deref().unwrap().contains("extraction"));
        assert!(bad.metrics.is_none());
    }

    #[test]
    fn summaries_average_only_successful_jobs() {
        let results = vec![
            JobResult {
                model: "m".into(),
                test_case: "a".into(),
                success: true,
                seconds: 2.0,
                state: Some(SessionState::Converged),
                correction_attempts: Some(0),
                metrics: Some(calculate(&[], &[])),
                error: None,
            },
            JobResult {
                model: "m".into(),
                test_case: "b".into(),
                success: false,
                seconds: 1.0,
                state: None,
                correction_attempts: None,
                metrics: None,
                error: Some("boom".into()),
            },
        ];
        let summaries = summarize_models(&results, &["m".to_string()]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].tests, 2);
        assert_eq!(summaries[0].successes, 1);
        assert!((summaries[0].avg_seconds - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_counts_and_serializes() {
        let results = vec![JobResult {
            model: "m".into(),
            test_case: "a".into(),
            success: true,
            seconds: 0.5,
            state: Some(SessionState::Converged),
            correction_attempts: Some(1),
            metrics: Some(calculate(&[], &[])),
            error: None,
        }];
        let report = build_report(results, &["m".to_string()]);
        assert_eq!(report.total_tests, 1);
        assert_eq!(report.successful_tests, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["state"], "converged");
        assert_eq!(json["model_summaries"][0]["model"], "m");
    }
}
