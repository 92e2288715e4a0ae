//! One schema, one set of options: the entry point most callers want.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::containers::{ContainerMatch, ContainerRegistry};
use crate::domain::Schema;
use crate::edit::{ArrayEditor, EditBatch, EditError, EditFlags, EditReport, RedrawRegistry};
use crate::options::EngineOptions;
use crate::path::{AttrPath, DeletePolicy, PathError, PathRules};
use crate::resolve::resolve_figure;
use crate::template::{TemplateIssue, make_template, validate_template};

/// Outcome of [`AttrEngine::apply_updates`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    /// Report per edited container array, in first-seen order.
    pub arrays: IndexMap<String, EditReport>,
    /// Attribute strings written outside container arrays.
    pub attributes: Vec<String>,
}

/// Schema, options and the registrations derived from them.
#[derive(Debug, Clone)]
pub struct AttrEngine {
    schema: Schema,
    options: EngineOptions,
    rules: PathRules,
    containers: ContainerRegistry,
}

impl AttrEngine {
    pub fn new(schema: Schema) -> Self {
        let containers = ContainerRegistry::from_schema(&schema.layout);
        Self {
            schema,
            options: EngineOptions::default(),
            rules: PathRules::default(),
            containers,
        }
    }

    /// Replace the options, recompiling the path rules they carry.
    pub fn with_options(mut self, options: EngineOptions) -> Result<Self, regex::Error> {
        self.rules = options.path_rules()?;
        self.options = options;
        Ok(self)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    /// Deletion policy for writes into a layout tree.
    pub fn policy(&self) -> DeletePolicy<'_> {
        DeletePolicy::new(&self.rules)
            .with_containers(&self.containers)
            .with_schema(&self.schema.layout)
    }

    pub fn resolve_figure(&self, figure: &Value) -> Value {
        resolve_figure(figure, &self.schema, &self.options)
    }

    pub fn locate(&self, attr: &str) -> Option<ContainerMatch> {
        self.containers.locate(attr)
    }

    /// Read `attr` from a layout tree.
    pub fn get(&self, layout: &Value, attr: &str) -> Result<Option<Value>, PathError> {
        Ok(AttrPath::parse(attr)?.get(layout))
    }

    /// Write `attr` into a layout tree; `None` and deletable values delete.
    pub fn set(
        &self,
        layout: &mut Value,
        attr: &str,
        value: Option<Value>,
    ) -> Result<(), PathError> {
        AttrPath::parse(attr)?.set_with(layout, value, &self.policy())
    }

    /// Apply flat attribute updates to a layout tree.
    ///
    /// Updates addressing container arrays are grouped into one batch per
    /// array and run through the array editor; everything else is a plain
    /// [`AttrEngine::set`].
    pub fn apply_updates(
        &self,
        layout: &mut Value,
        updates: &Map<String, Value>,
        hooks: &mut RedrawRegistry,
        flags: EditFlags,
    ) -> Result<UpdateOutcome, EditError> {
        let (batches, rest) = EditBatch::group(updates, &self.containers);
        let mut outcome = UpdateOutcome::default();

        let mut editor = ArrayEditor::new(&self.options, self.policy(), hooks);
        for (array, batch) in &batches {
            let report = editor.apply(layout, array, batch, flags)?;
            outcome.arrays.insert(array.clone(), report);
        }

        for (attr, value) in rest {
            self.set(layout, &attr, Some(value))?;
            outcome.attributes.push(attr);
        }
        Ok(outcome)
    }

    pub fn make_template(&self, figure: &Value) -> Result<Value, PathError> {
        make_template(figure, &self.schema)
    }

    pub fn validate_template(
        &self,
        figure: &Value,
        template: Option<&Value>,
    ) -> Vec<TemplateIssue> {
        validate_template(figure, template, &self.schema, &self.options)
    }
}
