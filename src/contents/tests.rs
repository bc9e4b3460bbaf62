use super::*;
use crate::hooks::GitCommitHook;
use anyhow::bail;
use std::cell::RefCell;
use std::rc::Rc;
use tempfile::TempDir;

/// hook that records every operation it sees
struct RecordingHook(Rc<RefCell<Vec<FileOperation>>>);

impl PostFileOpHook for RecordingHook {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn run(&self, operation: &FileOperation) -> anyhow::Result<()> {
        self.0.borrow_mut().push(operation.clone());
        Ok(())
    }
}

struct FailingHook;

impl PostFileOpHook for FailingHook {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn run(&self, _operation: &FileOperation) -> anyhow::Result<()> {
        bail!("index.lock exists")
    }
}

fn recording_manager() -> (TempDir, FileContentsManager, Rc<RefCell<Vec<FileOperation>>>) {
    let temp_dir = TempDir::new().unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let manager = FileContentsManager::new(
        temp_dir.path().to_path_buf(),
        Some(Box::new(RecordingHook(Rc::clone(&seen)))),
    );
    (temp_dir, manager, seen)
}

#[test]
fn test_save_writes_file_and_runs_hook() {
    let (temp_dir, manager, seen) = recording_manager();

    let saved = manager.save("/intro.ipynb", b"{}").unwrap();

    assert_eq!(
        saved,
        SavedFile {
            path: "intro.ipynb".to_string(),
            size: 2
        }
    );
    assert_eq!(fs::read(temp_dir.path().join("intro.ipynb")).unwrap(), b"{}");
    assert_eq!(
        *seen.borrow(),
        vec![FileOperation::Save {
            path: temp_dir.path().join("intro.ipynb")
        }]
    );
}

#[test]
fn test_save_into_missing_directory_is_not_found() {
    let (_temp_dir, manager, seen) = recording_manager();

    let err = manager.save("missing/intro.ipynb", b"{}").unwrap_err();
    assert!(matches!(err, ContentsError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_paths_cannot_escape_root() {
    let (_temp_dir, manager, _seen) = recording_manager();

    let err = manager.save("../escape.txt", b"x").unwrap_err();
    assert!(matches!(err, ContentsError::Forbidden(_)));
    assert_eq!(err.status_code(), 403);

    let err = manager.delete_file("/").unwrap_err();
    assert!(matches!(err, ContentsError::Forbidden(_)));
}

#[test]
fn test_rename_runs_hook_with_both_paths() {
    let (temp_dir, manager, seen) = recording_manager();
    fs::write(temp_dir.path().join("a.txt"), "a").unwrap();

    manager.rename_file("/a.txt", "/b.txt").unwrap();

    assert!(!temp_dir.path().join("a.txt").exists());
    assert!(temp_dir.path().join("b.txt").exists());
    assert_eq!(
        *seen.borrow(),
        vec![FileOperation::Rename {
            old_path: temp_dir.path().join("a.txt"),
            path: temp_dir.path().join("b.txt"),
        }]
    );
}

#[test]
fn test_rename_errors() {
    let (temp_dir, manager, seen) = recording_manager();
    fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
    fs::write(temp_dir.path().join("b.txt"), "b").unwrap();

    let err = manager.rename_file("missing.txt", "c.txt").unwrap_err();
    assert_eq!(err.status_code(), 404);

    let err = manager.rename_file("a.txt", "b.txt").unwrap_err();
    assert!(matches!(err, ContentsError::AlreadyExists(_)));
    assert_eq!(err.status_code(), 409);
    assert_eq!(fs::read_to_string(temp_dir.path().join("b.txt")).unwrap(), "b");

    assert!(seen.borrow().is_empty());
}

#[test]
fn test_delete_file_and_directory() {
    let (temp_dir, manager, seen) = recording_manager();
    fs::create_dir_all(temp_dir.path().join("dir/sub")).unwrap();
    fs::write(temp_dir.path().join("dir/sub/a.txt"), "a").unwrap();
    fs::write(temp_dir.path().join("b.txt"), "b").unwrap();

    manager.delete_file("b.txt").unwrap();
    manager.delete_file("/dir").unwrap();

    assert!(!temp_dir.path().join("b.txt").exists());
    assert!(!temp_dir.path().join("dir").exists());
    assert_eq!(seen.borrow().len(), 2);

    let err = manager.delete_file("b.txt").unwrap_err();
    assert!(matches!(err, ContentsError::NotFound(_)));
}

#[test]
fn test_hook_failure_becomes_server_error() {
    let temp_dir = TempDir::new().unwrap();
    let manager = FileContentsManager::new(temp_dir.path().to_path_buf(), Some(Box::new(FailingHook)));

    let err = manager.save("a.txt", b"a").unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert_eq!(
        err.to_string(),
        "Unexpected error while running post file op hook: index.lock exists"
    );
    // the file operation itself already happened
    assert!(temp_dir.path().join("a.txt").exists());
}

#[test]
fn test_without_hook() {
    let temp_dir = TempDir::new().unwrap();
    let manager = FileContentsManager::new(temp_dir.path().to_path_buf(), None);

    manager.save("a.txt", b"a").unwrap();
    manager.rename_file("a.txt", "b.txt").unwrap();
    manager.delete_file("b.txt").unwrap();
    assert!(!temp_dir.path().join("b.txt").exists());
}

#[test]
fn test_git_commit_hook_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let repo = git2::Repository::init(temp_dir.path()).unwrap();
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    let manager = FileContentsManager::new(
        temp_dir.path().to_path_buf(),
        Some(Box::new(GitCommitHook::new(true))),
    );

    manager.save("intro.ipynb", b"{}").unwrap();
    manager.save("intro.ipynb", b"{\"cells\": []}").unwrap();
    manager.rename_file("intro.ipynb", "week1.ipynb").unwrap();
    manager.delete_file("week1.ipynb").unwrap();

    let mut walk = repo.revwalk().unwrap();
    walk.push_head().unwrap();
    let messages: Vec<String> = walk
        .map(|oid| {
            let commit = repo.find_commit(oid.unwrap()).unwrap();
            commit.message().unwrap().trim().to_string()
        })
        .collect();

    assert_eq!(
        messages,
        vec![
            "Delete week1.ipynb",
            "Add week1.ipynb",
            "Delete intro.ipynb",
            "Update intro.ipynb",
            "Add intro.ipynb",
        ]
    );
}
