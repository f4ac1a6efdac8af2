//! Command line: generate artifacts from one values file, or check many.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::context::{Request, ResolutionContext};
use crate::scan::Diagnostic;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate Go types, a CRD, a JSON schema and README tables from an annotated values.yaml
#[derive(Parser, Debug)]
#[command(name = "values-gen", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve one values file and write the requested artifacts
    Generate(GenerateArgs),
    /// scan, resolve and validate values files without writing anything
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// annotated values file
    #[arg(short, long, default_value = "values.yaml")]
    values: PathBuf,

    /// Go package name of the generated declarations
    #[arg(short, long, default_value = "values")]
    module: String,

    /// write the Go declarations to this file
    #[arg(short = 'g', long = "debug-go")]
    go_out: Option<PathBuf>,

    /// write the CustomResourceDefinition to this file
    #[arg(short = 'c', long = "debug-crd")]
    crd_out: Option<PathBuf>,

    /// write the values JSON schema to this file
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// regenerate the Parameters section of this README
    #[arg(short, long)]
    readme: Option<PathBuf>,

    /// suppress status lines
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(num_args = 1.., required = true)]
    input: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Generate(args) => args.run(),
            Command::Check(args) => args.run(),
        }
    }
}

impl GenerateArgs {
    fn run(&self) -> Result<ExitCode> {
        if self.go_out.is_none()
            && self.crd_out.is_none()
            && self.schema.is_none()
            && self.readme.is_none()
        {
            bail!("no output specified (use --debug-go, --debug-crd, --schema or --readme)");
        }
        let context = ResolutionContext::from_path(&self.values)
            .with_context(|| format!("failed to process {}", self.values.display()))?;
        report_diagnostics(context.source(), context.diagnostics());

        let readme = self
            .readme
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))
            })
            .transpose()?;
        let request = Request {
            package: &self.module,
            go: self.go_out.is_some(),
            crd: self.crd_out.is_some(),
            schema: self.schema.is_some(),
            readme: readme.as_deref(),
        };
        let artifacts = context
            .generate(&request)
            .with_context(|| format!("failed to process {}", self.values.display()))?;

        let outputs = [
            (&self.go_out, artifacts.go, "write Go structs"),
            (&self.crd_out, artifacts.crd, "write CRD resource"),
            (&self.schema, artifacts.schema, "write JSON schema"),
            (&self.readme, artifacts.readme, "update README parameters"),
        ];
        for (path, content, label) in outputs {
            if let (Some(path), Some(content)) = (path, content) {
                write_output(path, &content)?;
                if !self.quiet {
                    eprintln!("{}: {}", label.green(), path.display());
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

impl CheckArgs {
    fn run(&self) -> Result<ExitCode> {
        let paths = resolve_file_path_patterns(&self.input)?;
        let results: Vec<(PathBuf, crate::Result<Vec<Diagnostic>>)> = paths
            .into_par_iter()
            .map(|path| {
                let result = check_file(&path);
                (path, result)
            })
            .collect();
        let mut failed = 0usize;
        for (path, result) in results {
            match result {
                Ok(diagnostics) => {
                    report_diagnostics(&path, &diagnostics);
                    println!("{} {}", "ok".green(), path.display());
                }
                Err(error) => {
                    failed += 1;
                    println!("{} {}: {error}", "error".red(), path.display());
                }
            }
        }
        Ok(if failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn check_file(path: &Path) -> crate::Result<Vec<Diagnostic>> {
    let context = ResolutionContext::from_path(path)?;
    context.validate()?;
    Ok(context.diagnostics().to_vec())
}

fn report_diagnostics(path: &Path, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!(
            "{} {}:{}: {}",
            "warning:".yellow(),
            path.display(),
            diagnostic.line,
            diagnostic.message
        );
    }
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
