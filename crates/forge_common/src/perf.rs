//! Performance report analysis.
//!
//! Classifies editor telemetry against fixed thresholds and produces
//! optimization recommendations. Pure; no state is kept between reports.

use serde::{Deserialize, Serialize};

/// Classification thresholds.
#[derive(Debug, Clone)]
pub struct Thresholds {
    pub fps_min: f64,
    pub fps_warning: f64,
    pub draw_calls_max: u64,
    pub draw_calls_warning: u64,
    pub node_count_max: u64,
    pub node_count_warning: u64,
    /// Collected with every report but not classified yet.
    pub memory_max_mb: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fps_min: 30.0,
            fps_warning: 45.0,
            draw_calls_max: 5000,
            draw_calls_warning: 3000,
            node_count_max: 2000,
            node_count_warning: 1500,
            memory_max_mb: 512.0,
        }
    }
}

/// Telemetry payload reported by the editor. Missing fields take the
/// editor's nominal values.
#[derive(Debug, Clone, Deserialize)]
pub struct PerfReport {
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default)]
    pub draw_calls: u64,
    #[serde(default)]
    pub node_count: u64,
    #[serde(default)]
    pub memory_usage_mb: f64,
}

fn default_fps() -> f64 {
    60.0
}

impl Default for PerfReport {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            draw_calls: 0,
            node_count: 0,
            memory_usage_mb: 0.0,
        }
    }
}

/// Overall verdict. Warnings alone leave the status at `Ok`; only a
/// crossed critical threshold escalates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerfStatus {
    Ok,
    Critical,
}

/// One metric that crossed a threshold.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub area: String,
    pub message: String,
}

/// Classified analysis of one report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub status: PerfStatus,
    pub issues: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
}

/// Analyzes performance reports from the editor.
#[derive(Debug, Clone, Default)]
pub struct PerformanceAnalyzer {
    thresholds: Thresholds,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, report: &PerfReport) -> AnalysisResult {
        let t = &self.thresholds;
        let mut status = PerfStatus::Ok;
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        if report.fps < t.fps_min {
            status = PerfStatus::Critical;
            issues.push(Finding {
                metric: "fps".to_string(),
                value: report.fps,
                threshold: t.fps_min,
                message: format!("Critical FPS: {:.1}", report.fps),
            });
        } else if report.fps < t.fps_warning {
            warnings.push(Finding {
                metric: "fps".to_string(),
                value: report.fps,
                threshold: t.fps_warning,
                message: format!("Low FPS: {:.1}", report.fps),
            });
        }

        if report.draw_calls > t.draw_calls_max {
            status = PerfStatus::Critical;
            issues.push(Finding {
                metric: "draw_calls".to_string(),
                value: report.draw_calls as f64,
                threshold: t.draw_calls_max as f64,
                message: format!("Critical draw calls: {}", report.draw_calls),
            });
        } else if report.draw_calls > t.draw_calls_warning {
            warnings.push(Finding {
                metric: "draw_calls".to_string(),
                value: report.draw_calls as f64,
                threshold: t.draw_calls_warning as f64,
                message: format!("High draw calls: {}", report.draw_calls),
            });
        }

        if report.node_count > t.node_count_max {
            status = PerfStatus::Critical;
            issues.push(Finding {
                metric: "node_count".to_string(),
                value: report.node_count as f64,
                threshold: t.node_count_max as f64,
                message: format!("Critical node count: {}", report.node_count),
            });
        } else if report.node_count > t.node_count_warning {
            warnings.push(Finding {
                metric: "node_count".to_string(),
                value: report.node_count as f64,
                threshold: t.node_count_warning as f64,
                message: format!("High node count: {}", report.node_count),
            });
        }

        let recommendations = Self::recommendations(&issues, &warnings);

        AnalysisResult {
            status,
            issues,
            warnings,
            recommendations,
        }
    }

    fn recommendations(issues: &[Finding], warnings: &[Finding]) -> Vec<Recommendation> {
        let mut recommendations = Vec::new();

        for issue in issues {
            let (area, message) = match issue.metric.as_str() {
                "fps" => (
                    "frame_rate",
                    "Reduce shader complexity, implement LOD, enable occlusion culling",
                ),
                "draw_calls" => (
                    "draw_calls",
                    "Use MultiMeshInstance, enable GPU instancing, combine static meshes",
                ),
                "node_count" => (
                    "node_count",
                    "Merge static geometry, implement object pooling",
                ),
                _ => continue,
            };
            recommendations.push(Recommendation {
                priority: Priority::High,
                area: area.to_string(),
                message: message.to_string(),
            });
        }

        for warning in warnings {
            recommendations.push(Recommendation {
                priority: Priority::Medium,
                area: warning.metric.clone(),
                message: format!("Monitor {} - current: {}", warning.metric, warning.value),
            });
        }

        recommendations
    }
}
