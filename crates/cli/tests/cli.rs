use assert_cmd::Command;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

/// A config using the offline hashing provider so no network or key is needed.
fn write_config(dir: &Path, docs: &Path) -> std::path::PathBuf {
    let config = format!(
        r#"
[context]
folder = '{docs}'
store_path = '{store}'

[indexer]
cache_dir = '{cache}'

[indexer.chunking]
method = "fixed"
chunk_size = 20
chunk_overlap = 5
min_chunk_size = 0

[embedding.provider]
kind = "hashing"
dimension = 4096

[retrieval]
top_k = 1
similarity_threshold = 0.0
"#,
        docs = docs.display(),
        store = dir.join("vectors.redb").display(),
        cache = dir.join("cache").display(),
    );
    let path = dir.join("recall.toml");
    std::fs::write(&path, config).expect("write config");
    path
}

fn recall(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("recall").expect("binary");
    cmd.current_dir(dir)
        .env_remove("RECALL_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn index_then_search_then_stats() {
    let dir = TempDir::new().expect("tempdir");
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).expect("docs dir");
    std::fs::write(docs.join("colors.txt"), "The sky is blue. Grass is green.").expect("write");
    std::fs::write(docs.join("image.png"), [0u8, 1, 2]).expect("write");
    let config = write_config(dir.path(), &docs);

    let index = recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("index")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&index.get_output().stdout).to_string();
    assert!(stdout.contains("Indexed 1 files"), "{stdout}");

    let search = recall(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["search", "green grass", "--json"])
        .assert()
        .success();
    let hits: serde_json::Value =
        serde_json::from_slice(&search.get_output().stdout).expect("json output");
    let hits = hits.as_array().expect("array");
    assert_eq!(hits.len(), 1);
    assert!(hits[0]["content"]
        .as_str()
        .is_some_and(|c| c.contains("Grass is green.")));
    assert!(hits[0]["source"]
        .as_str()
        .is_some_and(|s| s.ends_with("colors.txt")));

    let stats = recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&stats.get_output().stdout).to_string();
    assert!(stdout.contains("Documents: 1"), "{stdout}");
}

#[test]
fn removed_files_are_pruned_on_the_next_index() {
    let dir = TempDir::new().expect("tempdir");
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).expect("docs dir");
    std::fs::write(docs.join("a.txt"), "Tide pools hold anemones.").expect("write");
    std::fs::write(docs.join("b.md"), "Alpine meadows bloom in summer.").expect("write");
    let config = write_config(dir.path(), &docs);

    recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("index")
        .assert()
        .success();
    std::fs::remove_file(docs.join("a.txt")).expect("remove");

    let index = recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("index")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&index.get_output().stdout).to_string();
    assert!(stdout.contains("Removed 1 documents"), "{stdout}");

    let stats = recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&stats.get_output().stdout).to_string();
    assert!(stdout.contains("Documents: 1"), "{stdout}");
}

#[test]
fn openai_provider_without_key_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs).expect("docs dir");
    let config = dir.path().join("recall.toml");
    std::fs::write(
        &config,
        format!("[context]\nfolder = '{}'\n", docs.display()),
    )
    .expect("write config");

    let output = recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("stats")
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&output.get_output().stderr).to_string();
    assert!(stderr.contains("API key"), "{stderr}");
}

#[test]
fn missing_folder_fails_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), &dir.path().join("nowhere"));

    recall(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("index")
        .assert()
        .failure();
}
