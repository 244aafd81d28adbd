use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use super::{DetectionOptions, Extractor};
use crate::models::{Category, TechProfile};
use crate::normalize::Normalizer;
use crate::tables::DetectionTables;
use crate::workspace::Workspace;

/// Counts files per language over a bounded sample of the workspace.
///
/// The sample is spread evenly over the whole file list, so a large
/// directory that sorts early (`assets/`, `docs/`) cannot crowd out the
/// source tree.
///
/// Counting happens on normalized labels, so `.ts` and `.tsx` files both
/// count toward TypeScript. A language is kept only if its count reaches
/// `max(min_count, sampled * min_fraction)`.
pub struct LanguageExtractor {
    tables: Arc<DetectionTables>,
    normalizer: Normalizer,
    options: DetectionOptions,
}

impl LanguageExtractor {
    pub fn new(tables: Arc<DetectionTables>, normalizer: Normalizer, options: DetectionOptions) -> Self {
        Self {
            tables,
            normalizer,
            options,
        }
    }

    fn language_of(&self, workspace: &dyn Workspace, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_string_lossy();
        match path.extension() {
            Some(ext) => self
                .tables
                .languages
                .language_for_extension(&ext.to_string_lossy())
                .map(str::to_string),
            // dotfiles like `.bashrc` have no extension either; leave them
            None if name.starts_with('.') => None,
            None if self.tables.languages.is_ignored_file_name(&name) => None,
            None => workspace.content_language(path),
        }
    }
}

impl Extractor for LanguageExtractor {
    fn name(&self) -> &'static str {
        "languages"
    }

    fn extract(&self, workspace: &dyn Workspace, profile: &mut TechProfile) -> Result<()> {
        let files = spread_sample(workspace.list_files(usize::MAX)?, self.options.max_files);
        let total = files.len();
        if total == 0 {
            return Ok(());
        }

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for path in &files {
            if let Some(id) = self.language_of(workspace, path) {
                let label = self.normalizer.normalize(&id);
                if !label.is_empty() {
                    *counts.entry(label).or_insert(0) += 1;
                }
            }
        }

        let threshold = accept_threshold(total, self.options.min_count, self.options.min_fraction);
        for (label, count) in &counts {
            if *count >= threshold {
                profile.add(Category::Languages, label.as_str());
            } else {
                debug!(language = %label, count, threshold, "Below language threshold");
            }
        }
        Ok(())
    }
}

/// Keep `limit` entries at evenly spaced indices, in their original order.
fn spread_sample<T>(items: Vec<T>, limit: usize) -> Vec<T> {
    let total = items.len();
    if total <= limit {
        return items;
    }
    if limit == 0 {
        return Vec::new();
    }
    let mut next = 0;
    let mut taken = 0;
    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            if taken < limit && i == next {
                taken += 1;
                next = taken * total / limit;
                Some(item)
            } else {
                None
            }
        })
        .collect()
}

/// Smallest whole file count reaching `max(min_count, total * min_fraction)`.
///
/// The fraction is rounded to parts per million before the ceiling so that
/// values like `0.07` do not overshoot through float error.
fn accept_threshold(total: usize, min_count: usize, min_fraction: f64) -> usize {
    let ppm = (min_fraction.clamp(0.0, 1.0) * 1_000_000.0).round() as u128;
    let by_fraction = (total as u128 * ppm).div_ceil(1_000_000) as usize;
    min_count.max(by_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MemoryWorkspace;

    fn extractor(options: DetectionOptions) -> LanguageExtractor {
        let tables = Arc::new(DetectionTables::builtin().unwrap());
        let normalizer = Normalizer::new(&tables.aliases);
        LanguageExtractor::new(tables, normalizer, options)
    }

    fn run(ws: &MemoryWorkspace, options: DetectionOptions) -> TechProfile {
        let mut p = TechProfile::new();
        extractor(options).extract(ws, &mut p).unwrap();
        p
    }

    fn python_files(n: usize) -> MemoryWorkspace {
        let mut ws = MemoryWorkspace::new();
        for i in 0..n {
            ws.add_file(format!("pkg/mod{i}.py"), "x = 1\n");
        }
        ws
    }

    #[test]
    fn test_threshold_boundary() {
        let options = DetectionOptions::default();
        let below = run(&python_files(options.min_count - 1), options.clone());
        assert!(!below.contains(Category::Languages, "Python"));
        let at = run(&python_files(options.min_count), options);
        assert!(at.contains(Category::Languages, "Python"));
    }

    #[test]
    fn test_fraction_floor_on_large_projects() {
        let mut ws = python_files(100);
        for i in 0..4 {
            ws.add_file(format!("scripts/s{i}.sh"), "echo\n");
        }
        // 104 files * 0.05 = 5.2 > 4
        let p = run(&ws, DetectionOptions::default());
        assert!(p.contains(Category::Languages, "Python"));
        assert!(!p.contains(Category::Languages, "Shell"));
    }

    #[test]
    fn test_ts_and_tsx_count_together() {
        let ws = MemoryWorkspace::new()
            .with_file("a.ts", "")
            .with_file("b.tsx", "")
            .with_file("c.tsx", "");
        let p = run(&ws, DetectionOptions::default());
        assert_eq!(p.languages.iter().collect::<Vec<_>>(), vec!["TypeScript"]);
    }

    #[test]
    fn test_extensionless_files_are_sniffed() {
        let ws = MemoryWorkspace::new()
            .with_file("scripts/deploy", "#!/usr/bin/env python3\n")
            .with_file("scripts/migrate", "#!/usr/bin/python\n")
            .with_file("scripts/seed", "#!/usr/bin/env python\n")
            .with_file("Dockerfile", "#!/usr/bin/env python\n")
            .with_file("Makefile", "all:\n");
        let p = run(&ws, DetectionOptions::default());
        assert!(p.contains(Category::Languages, "Python"));
    }

    #[test]
    fn test_sample_is_bounded() {
        let mut ws = python_files(30);
        for i in 0..30 {
            ws.add_file(format!("zz/f{i}.go"), "package main\n");
        }
        let options = DetectionOptions {
            max_files: 10,
            ..DetectionOptions::default()
        };
        // 5 of each kind end up in the sample
        let p = run(&ws, options);
        assert!(p.contains(Category::Languages, "Python"));
        assert!(p.contains(Category::Languages, "Go"));
    }

    #[test]
    fn test_large_early_directory_does_not_hide_sources() {
        let mut ws = MemoryWorkspace::new();
        for i in 0..250 {
            ws.add_file(format!("docs/page{i:03}.md"), "# page\n");
        }
        for i in 0..60 {
            ws.add_file(format!("src/mod{i:03}.ts"), "export {};\n");
        }
        let p = run(&ws, DetectionOptions::default());
        assert!(p.contains(Category::Languages, "TypeScript"));
    }

    #[test]
    fn test_spread_sample_keeps_order_and_size() {
        let sample = spread_sample((0..10).collect(), 4);
        assert_eq!(sample, vec![0, 2, 5, 7]);
        assert_eq!(spread_sample(vec![1, 2], 5), vec![1, 2]);
        assert!(spread_sample(vec![1, 2], 0).is_empty());
    }

    #[test]
    fn test_threshold_is_exact_for_decimal_fractions() {
        assert_eq!(accept_threshold(100, 3, 0.07), 7);
        assert_eq!(accept_threshold(104, 3, 0.05), 6);
        assert_eq!(accept_threshold(20, 3, 0.05), 3);

        let mut ws = python_files(7);
        for i in 0..93 {
            ws.add_file(format!("assets/img{i:03}.png"), "");
        }
        let options = DetectionOptions {
            max_files: 100,
            min_fraction: 0.07,
            ..DetectionOptions::default()
        };
        assert!(run(&ws, options).contains(Category::Languages, "Python"));
    }

    #[test]
    fn test_empty_workspace() {
        let p = run(&MemoryWorkspace::new(), DetectionOptions::default());
        assert!(p.is_empty());
    }
}
