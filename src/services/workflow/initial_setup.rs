use async_trait::async_trait;
use std::collections::BTreeSet;
use tokio::fs;
use tracing::{info, instrument};

use super::context::ExecutionContext;
use super::script::{shell_quote, timestamp_line, GENIE_DIR, GENIE_JOB_DIR_ENV_VAR};
use super::resource_setup::ResourceKind;
use super::WorkflowTask;
use crate::domain::errors::GenieResult;

/// Lays out the working directory and writes the script header.
pub struct InitialSetupTask;

#[async_trait]
impl WorkflowTask for InitialSetupTask {
    fn name(&self) -> &'static str {
        "initial_setup"
    }

    #[instrument(skip_all, fields(job_id = %context.job_id()))]
    async fn execute(&self, context: &mut ExecutionContext) -> GenieResult<()> {
        let root = context.job_working_dir().join(GENIE_DIR);
        for kind in [
            ResourceKind::Application,
            ResourceKind::Cluster,
            ResourceKind::Command,
        ] {
            fs::create_dir_all(root.join(kind.dir_name())).await?;
        }

        let env = context.environment().clone();
        let working_dir = env.job_working_dir.display().to_string();
        let exports = [
            (GENIE_JOB_DIR_ENV_VAR, working_dir),
            ("GENIE_JOB_ID", env.job_id.clone()),
            ("GENIE_JOB_NAME", env.job_request.name().to_string()),
            ("GENIE_JOB_MEMORY", env.memory.to_string()),
            ("GENIE_JOB_TAGS", join_tags(env.job_request.tags())),
            ("GENIE_CLUSTER_ID", env.cluster.id.clone()),
            ("GENIE_CLUSTER_NAME", env.cluster.name.clone()),
            ("GENIE_CLUSTER_TAGS", join_tags(&env.cluster.tags)),
            ("GENIE_COMMAND_ID", env.command.id.clone()),
            ("GENIE_COMMAND_NAME", env.command.name.clone()),
            ("GENIE_COMMAND_TAGS", join_tags(&env.command.tags)),
        ];

        context.write_line("#!/usr/bin/env bash").await?;
        context.blank_line().await?;
        context.write_line("set -o nounset -o pipefail").await?;
        context.blank_line().await?;
        context.write_line("# Job environment").await?;
        for (name, value) in exports {
            context
                .write_line(&format!("export {name}={}", shell_quote(&value)))
                .await?;
        }
        context.blank_line().await?;
        context.write_line(&timestamp_line("Start")).await?;
        context.blank_line().await?;

        info!("Initial setup complete");
        Ok(())
    }
}

fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}
