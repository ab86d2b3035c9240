//! E2E tests for the `git-clone` command against local upstream repositories.
//!
//! These tests need a real `git` binary (2.25 or newer) and are only run with
//! the `integration-tests` feature:
//!
//! ```text
//! cargo test --features integration-tests
//! ```

mod common;

use common::prelude::*;

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_into_subdirectory() {
    let upstream = Upstream::new().with_commit(&[("README.md", "# upstream")], "Initial commit");
    let workspace = TestFixture::new();

    let output = workspace
        .clone_command(&upstream.url())
        .args(["--subdirectory", "source", "--depth", "1"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result = parse_result(&output.stdout);
    let head = upstream.head("HEAD");
    assert_eq!(result["commit"], head.as_str());
    assert_eq!(result["shortCommit"], &head[..7]);
    assert_eq!(result["url"], upstream.url().as_str());
    assert_eq!(result["CHAINS-GIT_URL"], upstream.url().as_str());
    assert_eq!(result["CHAINS-GIT_COMMIT"], head.as_str());
    assert!(result.get("mergedSha").is_none());
    assert!(result["commitTimestamp"]
        .as_str()
        .unwrap()
        .chars()
        .all(|c| c.is_ascii_digit()));

    workspace
        .child("source/README.md")
        .assert(predicate::str::contains("# upstream"));
    assert_eq!(git(&workspace.path().join("source"), &["rev-list", "--count", "HEAD"]), "1");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_clone_revision_and_short_length() {
    let upstream = Upstream::new()
        .with_commit(&[("a.txt", "one")], "first")
        .with_branch("feature")
        .with_commit(&[("b.txt", "two")], "second")
        .switch("main");
    let workspace = TestFixture::new();

    let output = workspace
        .clone_command(&upstream.url())
        .args(["--revision", "feature", "--short-commit-length", "10"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result = parse_result(&output.stdout);
    let feature = upstream.head("feature");
    assert_eq!(result["commit"], feature.as_str());
    assert_eq!(result["shortCommit"], &feature[..10]);
    workspace.child("b.txt").assert(predicate::path::exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_sparse_checkout_limits_tree() {
    let upstream = Upstream::new().with_commit(
        &[("A/a.txt", "a"), ("B/b.txt", "b"), ("C/c.txt", "c")],
        "three directories",
    );
    let workspace = TestFixture::new();

    workspace
        .clone_command(&upstream.url())
        .args(["--sparse-checkout-directories", "A,B"])
        .assert()
        .success();

    workspace.child("A/a.txt").assert(predicate::path::exists());
    workspace.child("B/b.txt").assert(predicate::path::exists());
    workspace.child("C").assert(predicate::path::missing());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_merge_target_branch_from_origin() {
    let upstream = Upstream::new()
        .with_commit(&[("base.txt", "base")], "base")
        .with_branch("feature")
        .with_commit(&[("feature.txt", "feature")], "feature work")
        .switch("main")
        .with_commit(&[("main.txt", "main")], "main work");
    let workspace = TestFixture::new();

    let output = workspace
        .clone_command(&upstream.url())
        .args([
            "--revision",
            "feature",
            "--depth",
            "0",
            "--merge-target-branch",
            "--merge-source-repo-url",
        ])
        .arg(format!("{}.git/", upstream.url()))
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let result = parse_result(&output.stdout);
    let merged = result["mergedSha"].as_str().unwrap().to_string();
    assert_eq!(result["commit"], merged.as_str());
    assert_ne!(merged, upstream.head("feature"));

    workspace.child("feature.txt").assert(predicate::path::exists());
    workspace.child("main.txt").assert(predicate::path::exists());

    assert_eq!(git(workspace.path(), &["remote"]), "origin");
    let message = git(workspace.path(), &["log", "-1", "--format=%s"]);
    assert_eq!(
        message,
        format!("Merge branch 'main' from origin into {}", upstream.head("feature"))
    );
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_merge_target_branch_from_other_repository() {
    let upstream = Upstream::new().with_commit(&[("base.txt", "base")], "base");
    let fork = Upstream::new().with_commit(&[("fork.txt", "fork")], "fork base");
    let workspace = TestFixture::new();

    let output = workspace
        .clone_command(&upstream.url())
        .args(["--depth", "0", "--merge-target-branch", "--merge-source-repo-url"])
        .arg(fork.url())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let remotes = git(workspace.path(), &["remote"]);
    let mut remotes: Vec<&str> = remotes.lines().collect();
    remotes.sort();
    assert_eq!(remotes, vec!["merge-source", "origin"]);

    workspace.child("base.txt").assert(predicate::path::exists());
    workspace.child("fork.txt").assert(predicate::path::exists());
    assert!(parse_result(&output.stdout).get("mergedSha").is_some());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_symlink_escape_fails() {
    let upstream = Upstream::new()
        .with_commit(&[("README.md", "# upstream")], "Initial commit")
        .with_symlink("passwd", "/etc/passwd", "add escaping link");
    let workspace = TestFixture::new();

    workspace
        .clone_command(&upstream.url())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("1 symlink(s) pointing outside"));

    // The partial checkout is left for inspection.
    workspace.child("README.md").assert(predicate::path::exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_symlink_escape_allowed_when_check_disabled() {
    let upstream = Upstream::new()
        .with_commit(&[("README.md", "# upstream")], "Initial commit")
        .with_symlink("passwd", "/etc/passwd", "add escaping link");
    let workspace = TestFixture::new();

    workspace
        .clone_command(&upstream.url())
        .arg("--enable-symlink-check=false")
        .assert()
        .success();
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_delete_existing_and_result_file() {
    let upstream = Upstream::new().with_commit(&[("README.md", "# upstream")], "Initial commit");
    let workspace = TestFixture::new().with_file("source/stale.txt", "stale");
    let results = assert_fs::TempDir::new().unwrap();
    let result_file = results.path().join("result.json");

    let output = workspace
        .clone_command(&upstream.url())
        .args(["--subdirectory", "source", "--delete-existing=true", "--result-file"])
        .arg(&result_file)
        .output()
        .unwrap();
    assert!(output.status.success());

    workspace.child("source/stale.txt").assert(predicate::path::missing());
    workspace.child("source/README.md").assert(predicate::path::exists());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&result_file).unwrap()).unwrap();
    assert_eq!(written, parse_result(&output.stdout));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_fetch_tags() {
    let upstream = Upstream::new().with_commit(&[("README.md", "v1")], "Initial commit");
    git(upstream.path(), &["tag", "v1.0.0"]);
    let workspace = TestFixture::new();

    workspace
        .clone_command(&upstream.url())
        .arg("--fetch-tags")
        .assert()
        .success();

    assert_eq!(git(workspace.path(), &["tag", "-l"]), "v1.0.0");
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_unreachable_repository_fails_after_retries() {
    let workspace = TestFixture::new();
    let missing = workspace.path().join("no-such-repo");

    workspace
        .clone_command(&format!("file://{}", missing.display()))
        .args(["--retry-max-attempts", "1", "--subdirectory", "source"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("git fetch failed after 1 attempt(s)"));
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_basic_auth_credentials_not_written_to_home() {
    let upstream = Upstream::new().with_commit(&[("README.md", "# upstream")], "Initial commit");
    let workspace = TestFixture::new();
    let home = assert_fs::TempDir::new().unwrap();
    let auth = assert_fs::TempDir::new().unwrap();
    auth.child("username").write_str("builder").unwrap();
    auth.child("password").write_str("token").unwrap();

    workspace
        .clone_command(&upstream.url())
        .env("HOME", home.path())
        .arg("--basic-auth-directory")
        .arg(auth.path())
        .assert()
        .success();

    assert_eq!(std::fs::read_dir(home.path()).unwrap().count(), 0);
}
