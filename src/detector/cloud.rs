use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::warn;

use super::config_files::apply_file_rules;
use super::Extractor;
use crate::models::TechProfile;
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

/// Container, orchestration, IaC and hosting configuration.
///
/// Compose files are also read for their `image:` lines, which reveal the
/// backing services (databases, queues, caches) a project runs against.
pub struct CloudExtractor {
    tables: Arc<DetectionTables>,
    glob_limit: usize,
}

impl CloudExtractor {
    pub fn new(tables: Arc<DetectionTables>, glob_limit: usize) -> Self {
        Self { tables, glob_limit }
    }
}

impl Extractor for CloudExtractor {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        apply_file_rules(self.name(), &self.tables.cloud.files, workspace, self.glob_limit, profile);

        let mut compose_files = BTreeSet::new();
        for pattern in &self.tables.cloud.compose_files {
            compose_files.extend(workspace.find_files(pattern, self.glob_limit)?);
        }

        let image_re = Regex::new(r#"(?m)^\s*image:\s*["']?([^\s"'#]+)"#)?;
        for path in compose_files {
            let content = match workspace.read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "Skipping unreadable compose file");
                    continue;
                }
            };
            for caps in image_re.captures_iter(&content) {
                if let Some(rule) = self.tables.cloud.image(&caps[1]) {
                    profile.add(rule.category, rule.technology.as_str());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::workspace::MemoryWorkspace;

    fn run(ws: &MemoryWorkspace) -> TechProfile {
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        let mut p = TechProfile::new();
        CloudExtractor::new(tables, 10).extract(ws, &mut p).unwrap();
        p
    }

    #[test]
    fn test_container_files() {
        let ws = MemoryWorkspace::new()
            .with_file("Dockerfile", "FROM rust:1.77\n")
            .with_file(
                "docker-compose.yml",
                "services:\n  db:\n    image: \"postgres:16\"\n  cache:\n    image: redis:7-alpine\n  app:\n    build: .\n",
            );
        let p = run(&ws);
        assert!(p.contains(Category::Tools, "Docker"));
        assert!(p.contains(Category::Tools, "Docker Compose"));
        assert!(p.contains(Category::Tools, "PostgreSQL"));
        assert!(p.contains(Category::Tools, "Redis"));
    }

    #[test]
    fn test_kubernetes_manifest_needs_api_version_and_kind() {
        let ws = MemoryWorkspace::new().with_file("deploy/values.yaml", "replicas: 3\n");
        assert!(!run(&ws).contains(Category::Tools, "Kubernetes"));

        let ws = MemoryWorkspace::new().with_file(
            "k8s/web/deployment.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
        );
        assert!(run(&ws).contains(Category::Tools, "Kubernetes"));
    }

    #[test]
    fn test_cloudformation_validation() {
        let ws = MemoryWorkspace::new().with_file("template.yaml", "Resources: {}\n");
        assert!(!run(&ws).contains(Category::Tools, "AWS CloudFormation"));

        let ws = MemoryWorkspace::new().with_file(
            "template.yaml",
            "AWSTemplateFormatVersion: '2010-09-09'\nTransform: AWS::Serverless-2016-10-31\n",
        );
        let p = run(&ws);
        assert!(p.contains(Category::Tools, "AWS CloudFormation"));
        assert!(p.contains(Category::Tools, "AWS SAM"));
    }

    #[test]
    fn test_terraform_and_hosting() {
        let ws = MemoryWorkspace::new()
            .with_file("infra/main.tf", "provider \"aws\" {}\n")
            .with_file("vercel.json", "{}")
            .with_file("fly.toml", "app = \"x\"\n");
        let p = run(&ws);
        assert!(p.contains(Category::Tools, "Terraform"));
        assert!(p.contains(Category::Tools, "Vercel"));
        assert!(p.contains(Category::Tools, "Fly.io"));
    }
}
