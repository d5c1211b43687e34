//! Adding a category row from an edited grouping template.

use crate::data::AnnotatedMatrix;
use crate::error::{MatrixError, Result};
use crate::io::read_grouping_template;
use crate::progress::ProcessInfo;
use crate::transform::{Transform, TransformOutput};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Read a grouping template and add it as a category row.
///
/// The row is named `name`, or the grouping name stored in the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingFromTemplate {
    pub path: PathBuf,
    #[serde(default)]
    pub name: Option<String>,
}

impl Transform for GroupingFromTemplate {
    fn name(&self) -> &'static str {
        "Grouping from template"
    }

    fn process(
        &self,
        matrix: &mut AnnotatedMatrix,
        _extra: &[AnnotatedMatrix],
        _info: &mut ProcessInfo,
    ) -> Result<TransformOutput> {
        let template = read_grouping_template(&self.path)?;
        let row = template.category_row(matrix);
        if row.iter().all(|labels| labels.is_empty()) {
            return Err(MatrixError::Transform(format!(
                "Template {} assigns no expression column of this matrix",
                self.path.display()
            )));
        }
        let name = self.name.as_deref().unwrap_or(&template.name);
        matrix.add_category_row(name, "", row)?;
        Ok(TransformOutput::default())
    }
}
