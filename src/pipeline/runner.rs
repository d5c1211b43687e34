//! Pipeline runner for composing and executing matrix transforms.

use crate::combine::MatchRowsByName;
use crate::data::{AnnotatedMatrix, Document};
use crate::error::{MatrixError, Result};
use crate::filter::{
    FilterCategoricalColumn, FilterNumericColumn, FilterRandomRows, FilterValidValues,
};
use crate::group::{AverageGroups, GroupSummary, GroupingFromTemplate};
use crate::impute::ReplaceMissingFromNormal;
use crate::io::{LoadOptions, TabularLoader};
use crate::normalize::{Axis, LogTransform, ZScore};
use crate::progress::ProcessInfo;
use crate::test::TwoSampleTest;
use crate::transform::{run_transform, Transform};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A step in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineStep {
    // === Row filtering ===
    /// Keep rows with enough valid values.
    FilterValidValues(FilterValidValues),
    /// Keep a random subset of rows.
    FilterRandomRows(FilterRandomRows),
    /// Keep or remove rows by categorical values.
    FilterCategoricalColumn(FilterCategoricalColumn),
    /// Keep rows inside a numeric range.
    FilterNumericColumn(FilterNumericColumn),

    // === Value transformation ===
    /// Logarithm of the expression values.
    Log(LogTransform),
    /// Z-score standardization.
    ZScore(ZScore),
    /// Imputation from a down-shifted normal distribution.
    ReplaceMissingFromNormal(ReplaceMissingFromNormal),

    // === Groupings ===
    /// Add a grouping from a template file.
    GroupingFromTemplate(GroupingFromTemplate),
    /// Collapse columns into group summaries.
    AverageGroups(AverageGroups),

    // === Testing ===
    /// Welch test between two groups.
    TwoSampleTest(TwoSampleTest),

    // === Combining ===
    /// Match rows against a second file, loaded with an inferred selection.
    MatchRows {
        other: PathBuf,
        params: MatchRowsByName,
    },
}

impl PipelineStep {
    /// The transform this step runs.
    pub fn transform(&self) -> &dyn Transform {
        match self {
            Self::FilterValidValues(t) => t,
            Self::FilterRandomRows(t) => t,
            Self::FilterCategoricalColumn(t) => t,
            Self::FilterNumericColumn(t) => t,
            Self::Log(t) => t,
            Self::ZScore(t) => t,
            Self::ReplaceMissingFromNormal(t) => t,
            Self::GroupingFromTemplate(t) => t,
            Self::AverageGroups(t) => t,
            Self::TwoSampleTest(t) => t,
            Self::MatchRows { params, .. } => params,
        }
    }

    /// Additional input matrices the step needs.
    fn extra_inputs(&self, loader: &TabularLoader, info: &mut ProcessInfo) -> Result<Vec<AnnotatedMatrix>> {
        match self {
            Self::MatchRows { other, .. } => Ok(vec![loader.load_inferred(other, info)?]),
            _ => Ok(Vec::new()),
        }
    }
}

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Options for loading input files.
    #[serde(default)]
    pub load: LoadOptions,
    /// Steps to execute.
    pub steps: Vec<PipelineStep>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(MatrixError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(MatrixError::from)
    }
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub matrix: AnnotatedMatrix,
    pub supplementary_tables: Vec<AnnotatedMatrix>,
    pub documents: Vec<Document>,
}

/// Builder for constructing and running pipelines.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<PipelineStep>,
    name: String,
    load: LoadOptions,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            name: "unnamed".to_string(),
            load: LoadOptions::default(),
        }
    }

    /// Create from a config.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            steps: config.steps.clone(),
            name: config.name.clone(),
            load: config.load.clone(),
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the options used to load additional inputs.
    pub fn load_options(mut self, load: LoadOptions) -> Self {
        self.load = load;
        self
    }

    /// Append any step.
    pub fn step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Keep rows with at least `min_valid` valid values in total.
    pub fn filter_valid_values(self, min_valid: usize) -> Self {
        self.step(PipelineStep::FilterValidValues(FilterValidValues::total(min_valid)))
    }

    /// Log2-transform the expression values.
    pub fn log2(self) -> Self {
        self.step(PipelineStep::Log(LogTransform { base: 2.0 }))
    }

    /// Z-score along `axis` around the mean.
    pub fn zscore(self, axis: Axis) -> Self {
        self.step(PipelineStep::ZScore(ZScore {
            axis,
            use_median: false,
        }))
    }

    /// Impute missing values with the default width and shift.
    pub fn impute_normal(self, seed: u64) -> Self {
        self.step(PipelineStep::ReplaceMissingFromNormal(ReplaceMissingFromNormal {
            seed,
            ..Default::default()
        }))
    }

    /// Average the groups of `grouping`.
    pub fn average_groups(self, grouping: &str, summary: GroupSummary) -> Self {
        self.step(PipelineStep::AverageGroups(AverageGroups {
            grouping: grouping.to_string(),
            summary,
            min_valid: 1,
        }))
    }

    /// Welch test of `first` against `second`.
    pub fn two_sample_test(self, grouping: &str, first: &str, second: &str) -> Self {
        self.step(PipelineStep::TwoSampleTest(TwoSampleTest {
            grouping: grouping.to_string(),
            first: first.to_string(),
            second: second.to_string(),
            min_valid: 2,
            alpha: 0.05,
        }))
    }

    /// Steps in order.
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description.map(String::from),
            load: self.load.clone(),
            steps: self.steps.clone(),
        }
    }

    /// Run the pipeline on a copy of `matrix`.
    pub fn run(&self, matrix: &AnnotatedMatrix, info: &mut ProcessInfo) -> Result<PipelineOutput> {
        let loader = TabularLoader::new(self.load.clone());
        let mut output = PipelineOutput {
            matrix: matrix.clone(),
            supplementary_tables: Vec::new(),
            documents: Vec::new(),
        };
        log::info!("Running pipeline '{}' with {} steps", self.name, self.steps.len());

        for (i, step) in self.steps.iter().enumerate() {
            let transform = step.transform();
            let result = step.extra_inputs(&loader, info).and_then(|extra| {
                run_transform(transform, &mut output.matrix, &extra, info)
            });
            let produced = result.map_err(|e| {
                MatrixError::Pipeline(format!(
                    "Step {} ({}) failed: {}",
                    i + 1,
                    transform.name(),
                    e
                ))
            })?;
            output.supplementary_tables.extend(produced.supplementary_tables);
            output.documents.extend(produced.documents);
        }
        Ok(output)
    }
}

/// An example pipeline covering the common steps.
pub fn example_config() -> PipelineConfig {
    Pipeline::new()
        .name("example")
        .log2()
        .filter_valid_values(2)
        .impute_normal(1)
        .two_sample_test("Group", "treated", "control")
        .to_config(Some("Log-transform, filter, impute and test two groups"))
}
