use std::sync::Arc;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use super::{add_dependencies, each_file, Extractor};
use crate::models::{Ecosystem, TechProfile};
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

const GRADLE_CONFIGURATIONS: &str = "implementation|api|compile|compileOnly|runtimeOnly|\
    testImplementation|testRuntimeOnly|annotationProcessor|kapt|ksp|developmentOnly";

/// Extractor for Java/Kotlin projects managed by Maven or Gradle.
///
/// Dependencies become `group:artifact` coordinates and go through the
/// Maven table, where prefix rules map whole groups at once.
pub struct JvmExtractor {
    tables: Arc<DetectionTables>,
    max_manifests: usize,
}

impl JvmExtractor {
    pub fn new(tables: Arc<DetectionTables>, max_manifests: usize) -> Self {
        Self {
            tables,
            max_manifests,
        }
    }

    fn add(&self, coordinates: &[String], profile: &mut TechProfile) {
        add_dependencies(
            &self.tables,
            Ecosystem::Maven,
            coordinates.iter().map(String::as_str),
            profile,
        );
    }
}

impl Extractor for JvmExtractor {
    fn name(&self) -> &'static str {
        "jvm"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        each_file(workspace, self.name(), "pom.xml", self.max_manifests, |path, content| {
            let coords =
                parse_pom_xml(content).with_context(|| format!("Failed to parse {}", path.display()))?;
            self.add(&coords, profile);
            Ok(())
        })?;

        for pattern in ["build.gradle", "build.gradle.kts"] {
            each_file(workspace, self.name(), pattern, self.max_manifests, |_, content| {
                self.add(&parse_build_gradle(content)?, profile);
                Ok(())
            })?;
        }
        Ok(())
    }
}

fn coordinate(group_id: &str, artifact_id: &str) -> String {
    if group_id.is_empty() {
        artifact_id.to_string()
    } else {
        format!("{}:{}", group_id, artifact_id)
    }
}

/// Parse `pom.xml` with the quick-xml event API: every `<dependency>`
/// plus the `<parent>` (Spring Boot projects usually only show up there).
fn parse_pom_xml(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut coords = Vec::new();
    let mut buf = Vec::new();

    let mut in_block = false;
    let mut current_tag = String::new();
    let mut group_id = String::new();
    let mut artifact_id = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if name == "dependency" || name == "parent" || name == "plugin" {
                    in_block = true;
                    group_id.clear();
                    artifact_id.clear();
                }
                current_tag = name;
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                if in_block && (name == "dependency" || name == "parent" || name == "plugin") {
                    if !artifact_id.is_empty() {
                        coords.push(coordinate(&group_id, &artifact_id));
                    }
                    in_block = false;
                }
                current_tag.clear();
            }
            Ok(Event::Text(ref e)) => {
                if in_block {
                    let text = e.unescape().unwrap_or_default();
                    match current_tag.as_str() {
                        "groupId" => group_id = text.to_string(),
                        "artifactId" => artifact_id = text.to_string(),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(coords)
}

/// Parse `build.gradle` or `build.gradle.kts` with regex.
///
/// Version-less coordinates are common when a BOM manages versions, so the
/// version part is optional. Plugin ids are turned into their marker
/// artifact `<id>:<id>.gradle.plugin`.
fn parse_build_gradle(content: &str) -> Result<Vec<String>> {
    let mut coords = Vec::new();

    // implementation 'g:a:v', implementation("g:a"), api "g:a:v"
    let re_shorthand = Regex::new(&format!(
        r#"(?:{})\s*\(?\s*['"]([^'":\s]+):([^'":\s]+)(?::[^'"]*)?['"]"#,
        GRADLE_CONFIGURATIONS
    ))?;
    for caps in re_shorthand.captures_iter(content) {
        coords.push(coordinate(&caps[1], &caps[2]));
    }

    // implementation group: 'g', name: 'a', version: 'v'
    let re_map = Regex::new(&format!(
        r#"(?:{})\s*\(?\s*group:\s*['"]([^'"]+)['"]\s*,\s*name:\s*['"]([^'"]+)['"]"#,
        GRADLE_CONFIGURATIONS
    ))?;
    for caps in re_map.captures_iter(content) {
        coords.push(coordinate(&caps[1], &caps[2]));
    }

    // id 'org.springframework.boot' / id("org.springframework.boot")
    let re_plugin = Regex::new(r#"\bid\s*\(?\s*['"]([A-Za-z0-9_.\-]+)['"]"#)?;
    for caps in re_plugin.captures_iter(content) {
        let id = &caps[1];
        coords.push(format!("{id}:{id}.gradle.plugin"));
    }

    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::workspace::MemoryWorkspace;

    #[test]
    fn test_parse_pom_xml() {
        let xml = r#"<?xml version="1.0"?>
<project>
  <parent>
    <groupId>org.springframework.boot</groupId>
    <artifactId>spring-boot-starter-parent</artifactId>
    <version>3.2.0</version>
  </parent>
  <dependencies>
    <dependency>
      <groupId>org.apache.commons</groupId>
      <artifactId>commons-lang3</artifactId>
      <version>3.12.0</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
    </dependency>
  </dependencies>
</project>"#;

        let coords = parse_pom_xml(xml).unwrap();
        assert_eq!(
            coords,
            vec![
                "org.springframework.boot:spring-boot-starter-parent",
                "org.apache.commons:commons-lang3",
                "junit:junit",
            ]
        );
    }

    #[test]
    fn test_parse_build_gradle() {
        let content = r#"
plugins {
    id 'org.springframework.boot' version '3.2.0'
}
dependencies {
    implementation 'org.springframework:spring-core:5.3.23'
    implementation "com.google.guava:guava:31.1-jre"
    testImplementation 'junit:junit:4.13.2'
    implementation group: 'org.hibernate', name: 'hibernate-core', version: '6.4.0'
}
"#;
        let coords = parse_build_gradle(content).unwrap();
        assert_eq!(coords.len(), 5);
        assert!(coords.contains(&"org.hibernate:hibernate-core".to_string()));
        assert!(coords
            .contains(&"org.springframework.boot:org.springframework.boot.gradle.plugin".to_string()));
    }

    #[test]
    fn test_parse_gradle_kts_without_versions() {
        let content = r#"
dependencies {
    implementation("org.springframework.boot:spring-boot-starter-web")
    runtimeOnly("org.postgresql:postgresql")
}
"#;
        let coords = parse_build_gradle(content).unwrap();
        assert_eq!(
            coords,
            vec![
                "org.springframework.boot:spring-boot-starter-web",
                "org.postgresql:postgresql"
            ]
        );
    }

    #[test]
    fn test_extract_maps_groups() {
        let ws = MemoryWorkspace::new().with_file(
            "pom.xml",
            "<project><parent><groupId>org.springframework.boot</groupId>\
             <artifactId>spring-boot-starter-parent</artifactId></parent></project>",
        );
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        let mut p = TechProfile::new();
        JvmExtractor::new(tables, 25).extract(&ws, &mut p).unwrap();
        assert!(p.contains(Category::Frameworks, "Spring Boot"));
        assert!(!p.contains(Category::Frameworks, "Spring"));
    }
}
