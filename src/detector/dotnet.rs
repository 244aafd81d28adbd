use std::sync::Arc;

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{add_dependencies, each_file, Extractor};
use crate::models::{Ecosystem, TechProfile};
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

/// Extractor for .NET projects using NuGet.
///
/// Supports two manifest formats:
/// - SDK-style `*.csproj` / `*.fsproj` (`<PackageReference>` elements, plus
///   the `Sdk` attribute of `<Project>`)
/// - Legacy `packages.config` (`<package>` elements)
pub struct DotNetExtractor {
    tables: Arc<DetectionTables>,
    max_manifests: usize,
}

impl DotNetExtractor {
    pub fn new(tables: Arc<DetectionTables>, max_manifests: usize) -> Self {
        Self {
            tables,
            max_manifests,
        }
    }

    fn add(&self, packages: &[String], profile: &mut TechProfile) {
        add_dependencies(
            &self.tables,
            Ecosystem::Nuget,
            packages.iter().map(String::as_str),
            profile,
        );
    }
}

impl Extractor for DotNetExtractor {
    fn name(&self) -> &'static str {
        "dotnet"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        for pattern in ["*.csproj", "*.fsproj"] {
            each_file(workspace, self.name(), pattern, self.max_manifests, |path, content| {
                let packages = parse_project_file(content)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                self.add(&packages, profile);
                Ok(())
            })?;
        }

        each_file(workspace, self.name(), "packages.config", self.max_manifests, |path, content| {
            let packages = parse_packages_config(content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            self.add(&packages, profile);
            Ok(())
        })?;
        Ok(())
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.local_name().as_ref() == key.as_bytes() {
            attr.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// Names of all `<PackageReference Include="..."/>` elements.
///
/// `<Project Sdk="Microsoft.NET.Sdk.Web">` is reported as the package
/// `Microsoft.AspNetCore.App`, which is what the web SDK references
/// implicitly.
fn parse_project_file(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                match e.name().local_name().as_ref() {
                    b"PackageReference" => {
                        if let Some(name) = attribute(e, "Include").or_else(|| attribute(e, "Update")) {
                            packages.push(name);
                        }
                    }
                    b"Project" => {
                        if let Some(sdk) = attribute(e, "Sdk") {
                            if sdk.eq_ignore_ascii_case("Microsoft.NET.Sdk.Web") {
                                packages.push("Microsoft.AspNetCore.App".to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(packages)
}

/// Parse `<package id="..." version="..." />` from `packages.config`.
fn parse_packages_config(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.name().local_name().as_ref() == b"package" {
                    if let Some(id) = attribute(e, "id") {
                        packages.push(id);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(packages)
}
