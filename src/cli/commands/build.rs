//! Build Command
//!
//! Runs the code and/or dependency pipelines. With neither `--code` nor
//! `--deps`, both run concurrently, each on its own queue.

use std::path::Path;

use tokio::runtime::Runtime;
use tracing::info;

use crate::ai::SharedProvider;
use crate::cli::{CommandContext, Output};
use crate::index::{IndexGateway, RetrieverDescriptor, SqliteIndex};
use crate::pipeline::{CodeBuild, CodePipeline, DependencyBuild, DependencyPipeline};
use crate::types::Result;

/// Which pipelines to run
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub code: bool,
    pub deps: bool,
}

impl BuildOptions {
    fn selected(self) -> (bool, bool) {
        if !self.code && !self.deps {
            (true, true)
        } else {
            (self.code, self.deps)
        }
    }
}

pub fn run(workspace: &Path, options: BuildOptions) -> Result<()> {
    let ctx = CommandContext::load(workspace)?;
    let provider = ctx.provider()?;
    info!("Using LLM provider: {}", provider.name());

    let rt = Runtime::new()?;
    rt.block_on(run_pipelines(&ctx, provider, options))
}

async fn run_pipelines(
    ctx: &CommandContext,
    provider: SharedProvider,
    options: BuildOptions,
) -> Result<()> {
    let output = Output::new();

    match provider.health_check().await {
        Ok(true) => output.success(&format!("Provider '{}' is reachable", provider.name())),
        Ok(false) | Err(_) => output.warning(&format!(
            "Provider '{}' health check inconclusive",
            provider.name()
        )),
    }

    let (code, deps) = options.selected();
    match (code, deps) {
        (true, true) => {
            let code = CodePipeline::new(ctx.workspace.clone(), &ctx.config, provider.clone())?;
            let deps = DependencyPipeline::new(ctx.workspace.clone(), &ctx.config, provider);
            let (code_build, deps_build) = tokio::try_join!(
                code.build::<SqliteIndex>(),
                deps.build::<SqliteIndex>()
            )?;
            print_code(&output, &code_build);
            print_dependencies(&output, &deps_build);
        }
        (true, false) => {
            let code = CodePipeline::new(ctx.workspace.clone(), &ctx.config, provider)?;
            print_code(&output, &code.build::<SqliteIndex>().await?);
        }
        _ => {
            let deps = DependencyPipeline::new(ctx.workspace.clone(), &ctx.config, provider);
            print_dependencies(&output, &deps.build::<SqliteIndex>().await?);
        }
    }

    Ok(())
}

fn print_code<I: IndexGateway>(output: &Output, build: &CodeBuild<I>) {
    output.section("Codebase");
    output.field("Files", build.files);
    if build.rebuilt {
        output.field("Documents", build.documents);
    } else {
        output.field("Documents", "existing index reused");
    }
    print_descriptor(output, &build.descriptor);
}

fn print_dependencies<I: IndexGateway>(output: &Output, build: &DependencyBuild<I>) {
    output.section("Dependencies");
    if build.missing.is_empty() {
        output.field("New", "none");
    } else {
        output.field("New", build.missing.join(", "));
    }
    for (name, usage) in &build.guides {
        output.field(name, usage);
    }
    print_descriptor(output, &build.descriptor);
}

fn print_descriptor(output: &Output, descriptor: &RetrieverDescriptor) {
    output.field("Tool", &descriptor.name);
    output.field("Top K", descriptor.similarity_top_k);
    output.field("Index", &descriptor.persist_dir);
}
