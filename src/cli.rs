//! Minimal CLI: catalog → (schema | aliases | check)
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;

use crate::catalog::Catalog;
use crate::compiler::{CompilerOptions, CyclePolicy, DEFAULT_MAX_DEPTH, SchemaCompiler};
use crate::identifier::{DEFAULT_BASE_URL, UrlIdentifiers};
use crate::types::TypeRegistry;
use crate::validate::validate_document;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile entity catalogs into JSON schemas (draft-03), breaking reference cycles
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile one alias and print its JSON schema
    Schema(SchemaOut),
    /// list the aliases a catalog defines
    Aliases(AliasesOut),
    /// compile and validate every alias of a catalog
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct CatalogSettings {
    /// One or more catalog files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    catalog: Vec<String>,

    /// base URL the schema identifiers are built from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// fail when nested references go deeper than this
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// replace cyclic `$ref`s with a one-level copy of the target (legacy)
    #[arg(long, default_value_t = false)]
    flatten_cycles: bool,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    catalog_settings: CatalogSettings,

    /// alias of the root entity
    #[arg(long, short)]
    alias: String,

    /// check the result against the draft-03 essentials before writing it
    #[arg(long)]
    validate: bool,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct AliasesOut {
    #[command(flatten)]
    catalog_settings: CatalogSettings,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    catalog_settings: CatalogSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CatalogSettings {
    fn load_catalog(&self) -> Result<Arc<Catalog>> {
        let paths = resolve_file_path_patterns(&self.catalog)
            .context("failed to resolve catalog file paths")?;
        let catalog = Catalog::load_all(&paths).context("failed to load catalog")?;
        log::info!("catalog has {} type(s)", catalog.len());
        Ok(Arc::new(catalog))
    }

    fn options(&self) -> CompilerOptions {
        CompilerOptions {
            max_depth: self.max_depth,
            cycle_policy: if self.flatten_cycles { CyclePolicy::Flatten } else { CyclePolicy::Reference },
            ..CompilerOptions::default()
        }
    }

    fn compiler(&self, catalog: Arc<Catalog>) -> SchemaCompiler {
        let identifiers = Arc::new(UrlIdentifiers::new(self.base_url.clone()));
        SchemaCompiler::for_catalog(catalog, identifiers).with_options(self.options())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Schema(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }

                let catalog = target.catalog_settings.load_catalog()?;
                let compiler = target.catalog_settings.compiler(catalog);
                let schema = compiler
                    .compile(&target.alias)
                    .with_context(|| format!("failed to compile `{}`", target.alias))?;
                let doc = schema.to_json();
                if target.validate {
                    validate_document(&doc)
                        .with_context(|| format!("schema for `{}` is malformed", target.alias))?;
                }
                let schema_src = serde_json::to_string_pretty(&doc)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &schema_src)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{schema_src}");
                }
                Ok(())
            }
            Command::Aliases(target) => {
                let catalog = target.catalog_settings.load_catalog()?;
                for alias in catalog.aliases() {
                    println!("{alias}");
                }
                Ok(())
            }
            Command::Check(target) => {
                let catalog = target.catalog_settings.load_catalog()?;
                let aliases = catalog.aliases();
                let compiler = target.catalog_settings.compiler(catalog);

                // one independent session per alias
                let results: Vec<(String, Result<bool>)> = aliases
                    .into_par_iter()
                    .map(|alias| {
                        let outcome = compiler
                            .compile(&alias)
                            .map_err(anyhow::Error::from)
                            .and_then(|schema| {
                                validate_document(&schema.to_json())?;
                                Ok(schema.has_lazy_fields())
                            });
                        (alias, outcome)
                    })
                    .collect();

                let mut failed = 0usize;
                for (alias, outcome) in &results {
                    match outcome {
                        Ok(false) => eprintln!("{} {alias}", "✅".green()),
                        Ok(true) => eprintln!("{} {alias} {}", "✅".green(), "(cyclic $ref)".dimmed()),
                        Err(error) => {
                            failed += 1;
                            eprintln!("{} {alias}: {}", "❌".red(), format!("{error:#}").red());
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} alias(es) failed", results.len());
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // Pattern was explicitly a glob but matched nothing -> surface as an error
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
