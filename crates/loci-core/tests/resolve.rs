//! End-to-end resolution across directories, archives and the class path.

use loci_core::{PathMatchingResourceLoader, Resource, ResourceSet};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("loci_core=debug")
        .with_test_writer()
        .try_init();
}

fn write_archive(path: &Path, entries: &[(&str, &str)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

fn fixture() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data/sub")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();
    fs::write(root.join("data/sub/b.txt"), "beta").unwrap();
    fs::write(root.join("data/sub/c.json"), "{}").unwrap();
    fs::create_dir_all(root.join("classes/META-INF")).unwrap();
    fs::write(root.join("classes/META-INF/notes.md"), "# notes").unwrap();
    write_archive(
        &root.join("lib.jar"),
        &[
            ("META-INF/readme.md", "# readme"),
            ("META-INF/changes.md", "# changes"),
            ("org/example/App.class", "cafebabe"),
        ],
    );
    temp_dir
}

fn slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn read_all(resource: &dyn Resource) -> String {
    let mut contents = String::new();
    resource
        .open_stream()
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    contents
}

fn file_names(set: &ResourceSet) -> Vec<String> {
    let mut names: Vec<String> = set
        .iter()
        .filter_map(|resource| resource.filename())
        .collect();
    names.sort();
    names
}

#[test]
fn absolute_directory_pattern() {
    init_logging();
    let temp_dir = fixture();
    let loader = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .build();

    let pattern = format!("{}/data/**/*.txt", slash(temp_dir.path()));
    let found = loader.resolve(&pattern).unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(file_names(&found), vec!["a.txt", "b.txt"]);
    for resource in &found {
        assert!(resource.is_file());
        assert!(resource.exists());
    }
}

#[test]
fn class_path_archive_entries() {
    init_logging();
    let temp_dir = fixture();
    let loader = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .class_path_entries([temp_dir.path().join("lib.jar")])
        .build();

    let found = loader.resolve("classpath:/META-INF/*.md").unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(file_names(&found), vec!["changes.md", "readme.md"]);

    let contents: Vec<String> = found.iter().map(|resource| read_all(resource.as_ref())).collect();
    assert!(contents.contains(&"# readme".to_string()));
    assert!(contents.contains(&"# changes".to_string()));
}

#[test]
fn resolution_is_repeatable() {
    init_logging();
    let temp_dir = fixture();
    let loader = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .class_path_entries([temp_dir.path().join("classes"), temp_dir.path().join("lib.jar")])
        .build();

    for pattern in ["data/**/*", "classpath*:META-INF/*.md", "classpath:**/*.class"] {
        let first = loader.resolve(pattern).unwrap();
        let second = loader.resolve(pattern).unwrap();
        assert_eq!(first.descriptions(), second.descriptions(), "{}", pattern);
    }
}

#[test]
fn adding_a_layer_only_adds_results() {
    init_logging();
    let temp_dir = fixture();
    let narrow = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .class_path_entries([temp_dir.path().join("classes")])
        .build();
    let wide = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .class_path_entries([temp_dir.path().join("classes"), temp_dir.path().join("lib.jar")])
        .build();

    let before = narrow.resolve("classpath*:META-INF/*.md").unwrap();
    let after = wide.resolve("classpath*:META-INF/*.md").unwrap();

    assert_eq!(before.len(), 1);
    assert_eq!(after.len(), 3);
    for resource in &before {
        assert!(after.contains(resource.as_ref()));
    }
}

#[test]
fn literal_location_yields_at_most_one() {
    init_logging();
    let temp_dir = fixture();
    let loader = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .build();

    let found = loader.resolve("data/a.txt").unwrap();
    assert_eq!(found.len(), 1);
    let resource = found.iter().next().unwrap();
    assert_eq!(read_all(resource.as_ref()), "alpha");

    assert!(loader.resolve("data/missing.txt").unwrap().is_empty());
}

#[test]
fn archive_url_pattern() {
    init_logging();
    let temp_dir = fixture();
    let loader = PathMatchingResourceLoader::builder()
        .base_dir(temp_dir.path())
        .build();

    let jar = temp_dir.path().join("lib.jar");
    let pattern = format!(
        "jar:{}!/org/**/*.class",
        url::Url::from_file_path(&jar).unwrap()
    );
    let found = loader.resolve(&pattern).unwrap();
    assert_eq!(file_names(&found), vec!["App.class"]);
}
