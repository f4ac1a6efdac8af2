//! Everything known about one configuration file, and the pipeline that turns
//! it into artifacts.
//!
//! A context is built once per file and never shared: scan, graph build,
//! value population and the undefined-type sweep all happen in
//! [`ResolutionContext::from_source`]. Artifacts are produced together by
//! [`ResolutionContext::generate`], which fails as a whole if any stage fails.
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::defaults;
use crate::error::{Error, Result};
use crate::graph::TypeGraph;
use crate::path_de;
use crate::render::go;
use crate::render::readme::{self, Table};
use crate::render::schema::{self, CompileUnit, NativeCompiler, SchemaCompiler};
use crate::resolve::Resolver;
use crate::scan::{self, Diagnostic, Scan};
use crate::validate;

#[derive(Debug)]
pub struct ResolutionContext {
    source: PathBuf,
    scan: Scan,
    graph: TypeGraph,
    values: Value,
}

/// Which artifacts to produce.
#[derive(Debug, Clone, Default)]
pub struct Request<'a> {
    /// Go package name of the declarations.
    pub package: &'a str,
    pub go: bool,
    pub crd: bool,
    pub schema: bool,
    /// Current README text, when its parameters section should be regenerated.
    pub readme: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub go: Option<String>,
    pub crd: Option<String>,
    pub schema: Option<String>,
    pub readme: Option<String>,
}

impl ResolutionContext {
    pub fn from_path(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(path, &src)
    }

    /// Builds and populates the graph. Fails if any referenced type is never defined.
    pub fn from_source(source: impl Into<PathBuf>, src: &str) -> Result<Self> {
        let mut scan = scan::scan(src);
        let mut graph = TypeGraph::build(&scan.annotations)?;
        scan.diagnostics.extend(graph.diagnostics().iter().cloned());
        scan.diagnostics.sort_by_key(|d| d.line);
        let values = path_de::values_document(src)?;
        defaults::populate(&mut graph, &values);
        let undefined = Resolver::new(&graph).collect_undefined();
        if !undefined.is_empty() {
            return Err(Error::UndefinedTypes(undefined));
        }
        Ok(Self {
            source: source.into(),
            scan,
            graph,
            values,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.scan.diagnostics
    }

    pub fn graph(&self) -> &TypeGraph {
        &self.graph
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.graph)
    }

    pub fn validate(&self) -> Result<()> {
        validate::validate(&self.resolver(), &self.values)
    }

    pub fn declarations(&self, package: &str) -> Result<String> {
        go::emit_go(&self.resolver(), package)
    }

    pub fn doc_tables(&self) -> Result<Vec<Table>> {
        readme::doc_tables(&self.resolver(), &self.scan.sections, &self.values)
    }

    pub fn generate(&self, request: &Request<'_>) -> Result<Artifacts> {
        self.generate_with(request, &NativeCompiler)
    }

    /// Validates, then renders every requested artifact in memory.
    pub fn generate_with(&self, request: &Request<'_>, compiler: &dyn SchemaCompiler) -> Result<Artifacts> {
        self.validate()?;
        let resolver = self.resolver();
        let declarations = go::emit_go(&resolver, request.package)?;
        let mut artifacts = Artifacts::default();
        if request.crd || request.schema {
            let crd = compiler.compile(&CompileUnit {
                source: &self.source,
                declarations: &declarations,
                resolver: &resolver,
            })?;
            if request.crd {
                artifacts.crd = Some(schema::crd_yaml(&crd)?);
            }
            if request.schema {
                artifacts.schema = Some(schema::values_schema_json(&schema::values_schema(&crd)?)?);
            }
        }
        if let Some(text) = request.readme {
            let tables = readme::doc_tables(&resolver, &self.scan.sections, &self.values)?;
            artifacts.readme = Some(readme::update_parameters_section(text, &tables)?);
        }
        if request.go {
            artifacts.go = Some(declarations);
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationIssue;
    use crate::render::schema::CustomResourceDefinition;

    const VALUES: &str = r#"
## @section Backup
## @typedef {struct} Backup - Backup settings
## @field {bool} enabled - Enable backups
## @field {string} schedule - Cron schedule
## @param {Backup} backup
backup:
  enabled: false
  schedule: "0 2 * * *"
"#;

    fn everything(readme: &str) -> Request<'_> {
        Request {
            package: "values",
            go: true,
            crd: true,
            schema: true,
            readme: Some(readme),
        }
    }

    #[test]
    fn generates_every_artifact() {
        let context = ResolutionContext::from_source("values.yaml", VALUES).unwrap();
        let artifacts = context.generate(&everything("## Parameters\n")).unwrap();
        assert!(artifacts.go.unwrap().contains("type Backup struct {"));
        assert!(artifacts.crd.unwrap().contains("kind: CustomResourceDefinition"));
        let schema: Value = serde_json::from_str(&artifacts.schema.unwrap()).unwrap();
        assert_eq!(schema["properties"]["backup"]["properties"]["enabled"]["type"], "boolean");
        let readme = artifacts.readme.unwrap();
        assert!(readme.starts_with("## Parameters\n\n### Backup\n"), "{readme}");
        assert!(readme.contains("| `backup.schedule` | Cron schedule  | `string` | `0 2 * * *` |"), "{readme}");
    }

    #[test]
    fn only_requested_artifacts_are_built() {
        let context = ResolutionContext::from_source("values.yaml", VALUES).unwrap();
        let request = Request {
            package: "values",
            go: true,
            ..Request::default()
        };
        let artifacts = context.generate(&request).unwrap();
        assert!(artifacts.go.is_some());
        assert_eq!((artifacts.crd, artifacts.schema, artifacts.readme), (None, None, None));
    }

    #[test]
    fn undefined_types_fail_before_rendering() {
        let err = ResolutionContext::from_source("values.yaml", "## @param {Foo} a\n## @param {[]Foo} b\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "undefined types: Foo");
    }

    #[test]
    fn invalid_values_produce_nothing() {
        let src = format!("{VALUES}extra: 1\n");
        let context = ResolutionContext::from_source("values.yaml", &src).unwrap();
        match context.generate(&everything("## Parameters\n")) {
            Err(Error::Validation(issues)) => {
                assert_eq!(issues, vec![ValidationIssue::UnknownParameter("extra".into())]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_readme_section_fails_the_run() {
        let context = ResolutionContext::from_source("values.yaml", VALUES).unwrap();
        assert!(matches!(
            context.generate(&everything("# Chart\n")),
            Err(Error::SectionNotFound { .. })
        ));
    }

    struct FailingCompiler;

    impl SchemaCompiler for FailingCompiler {
        fn compile(&self, unit: &CompileUnit<'_>) -> Result<CustomResourceDefinition> {
            assert!(unit.declarations.contains("package values"));
            Err(Error::Compiler {
                path: unit.source.to_path_buf(),
                message: "go build failed".into(),
            })
        }
    }

    #[test]
    fn compiler_errors_carry_the_source_path() {
        let context = ResolutionContext::from_source("charts/app/values.yaml", VALUES).unwrap();
        let err = context
            .generate_with(&everything("## Parameters\n"), &FailingCompiler)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "schema compiler failed for charts/app/values.yaml: go build failed"
        );
    }

    #[test]
    fn orphan_fields_surface_as_diagnostics() {
        let context = ResolutionContext::from_source("values.yaml", "## @field {int} stray\n").unwrap();
        assert_eq!(context.diagnostics().len(), 1);
        assert_eq!(context.diagnostics()[0].line, 1);
    }

    #[test]
    fn misspelled_field_parents_surface_as_diagnostics() {
        let src = format!("{VALUES}## @field {{int}} bakup.retention\n");
        let context = ResolutionContext::from_source("values.yaml", &src).unwrap();
        assert_eq!(context.diagnostics().len(), 1);
        assert!(context.diagnostics()[0].message.contains("bakup.retention"));
        let go = context.declarations("values").unwrap();
        assert!(!go.contains("Bakup"), "{go}");
    }

    #[test]
    fn missing_files_are_io_errors() {
        let err = ResolutionContext::from_path(Path::new("does/not/exist.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
