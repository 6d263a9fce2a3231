//! Status Command
//!
//! Reports initialization, document counts per index and the persisted
//! dependency snapshot.

use std::path::Path;

use serde::Serialize;
use tokio::runtime::Runtime;

use crate::cli::{Output, is_initialized};
use crate::index::{IndexGateway, SqliteIndex};
use crate::pipeline::Workspace;
use crate::resolver::DependencySnapshot;
use crate::types::Result;

#[derive(Debug, Serialize)]
struct WorkspaceStatus {
    initialized: bool,
    /// `None` when the index was never built
    code_documents: Option<usize>,
    dependency_documents: Option<usize>,
    dependencies: DependencySnapshot,
}

pub fn run(workspace: &Path, format: &str) -> Result<()> {
    let json_output = format == "json";

    if !is_initialized(workspace) {
        if json_output {
            println!("{{\"initialized\": false}}");
        } else {
            Output::new().info("Not initialized. Run 'ragweave init' first.");
        }
        return Ok(());
    }

    let rt = Runtime::new()?;
    let status = rt.block_on(collect(&Workspace::new(workspace)))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let output = Output::new();
    output.section("ragweave status");
    output.field("Workspace", workspace.display());
    output.field("Code index", describe(status.code_documents));
    output.field("Deps index", describe(status.dependency_documents));
    output.field("Snapshot", format!("{} dependencies", status.dependencies.len()));
    for (name, version) in status.dependencies.dependencies() {
        println!("    {} {}", name, version);
    }

    Ok(())
}

async fn collect(workspace: &Workspace) -> Result<WorkspaceStatus> {
    let code_dir = workspace.code_index_dir();
    let dependency_dir = workspace.dependency_index_dir();
    let state_path = workspace.dependency_state_path();

    let (code_documents, dependency_documents, dependencies) = tokio::join!(
        document_count(&code_dir),
        document_count(&dependency_dir),
        DependencySnapshot::load(&state_path)
    );

    Ok(WorkspaceStatus {
        initialized: true,
        code_documents: code_documents?,
        dependency_documents: dependency_documents?,
        dependencies,
    })
}

async fn document_count(persist_dir: &Path) -> Result<Option<usize>> {
    match SqliteIndex::open(persist_dir).await {
        Ok(index) => Ok(Some(index.len().await?)),
        Err(e) => {
            tracing::debug!("No index at {}: {}", persist_dir.display(), e);
            Ok(None)
        }
    }
}

fn describe(count: Option<usize>) -> String {
    match count {
        Some(count) => format!("{} documents", count),
        None => "not built".to_string(),
    }
}
