// In-memory bug corpus with three built-in Python defects
//
// Used by the CLI demo and by the HTTP service, which registers each request
// as an ad-hoc bug in a private work directory.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::{BugInfo, ProjectCheckout, TestRun};
use crate::config::DatasetConfig;

pub const DEMO_PROJECT: &str = "dummy_project";

const ADD_CODE: &str = "def add(a, b):\n    return a - b  # Bug here\n";
const ADD_TEST: &str = "from calculator import add\n\ndef test_add():\n    assert add(2, 3) == 5\n";

const SEARCH_CODE: &str = r#"def binary_search(arr, target):
    low = 0
    high = len(arr) - 1

    while low <= high:
        mid = (low + high) // 2
        if arr[mid] == target:
            return mid
        elif arr[mid] < target:
            high = mid - 1  # Bug: Should be low = mid + 1
        else:
            low = mid + 1   # Bug: Should be high = mid - 1
    return -1
"#;

const SEARCH_TEST: &str = r#"from search import binary_search

def test_binary_search():
    arr = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
    assert binary_search(arr, 5) == 4
    assert binary_search(arr, 1) == 0
    assert binary_search(arr, 10) == 9
    assert binary_search(arr, 11) == -1
"#;

const SUDOKU_CODE: &str = r#"def solve_sudoku(board):
    empty = find_empty(board)
    if not empty:
        return True
    row, col = empty

    for num in range(1, 10):
        if is_valid(board, num, (row, col)):
            board[row][col] = num

            if solve_sudoku(board):
                return True

            # Bug: Missing backtrack step!
            # board[row][col] = 0

    return False

def find_empty(board):
    for i in range(len(board)):
        for j in range(len(board[0])):
            if board[i][j] == 0:
                return (i, j)
    return None

def is_valid(board, num, pos):
    for i in range(len(board[0])):
        if board[pos[0]][i] == num and pos[1] != i:
            return False

    for i in range(len(board)):
        if board[i][pos[1]] == num and pos[0] != i:
            return False

    box_x = pos[1] // 3
    box_y = pos[0] // 3

    for i in range(box_y*3, box_y*3 + 3):
        for j in range(box_x*3, box_x*3 + 3):
            if board[i][j] == num and (i, j) != pos:
                return False

    return True
"#;

const SUDOKU_TEST: &str = r#"from sudoku import solve_sudoku

def test_solve_sudoku():
    board = [
        [7, 8, 0, 4, 0, 0, 1, 2, 0],
        [6, 0, 0, 0, 7, 5, 0, 0, 9],
        [0, 0, 0, 6, 0, 1, 0, 7, 8],
        [0, 0, 7, 0, 4, 0, 2, 6, 0],
        [0, 0, 1, 0, 5, 0, 9, 3, 0],
        [9, 0, 4, 0, 6, 0, 0, 0, 5],
        [0, 7, 0, 3, 0, 0, 0, 1, 2],
        [1, 2, 0, 0, 0, 7, 4, 0, 0],
        [0, 4, 9, 2, 0, 6, 0, 0, 7]
    ]

    assert solve_sudoku(board) == True

    for i in range(9):
        for j in range(9):
            assert board[i][j] != 0
"#;

fn builtin(
    id: &str,
    description: &str,
    file_path: &str,
    code: &str,
    test_file: &str,
    test_code: &str,
) -> BugInfo {
    BugInfo {
        project: DEMO_PROJECT.to_string(),
        id: id.to_string(),
        description: description.to_string(),
        file_path: file_path.to_string(),
        code: code.to_string(),
        test_file: test_file.to_string(),
        test_code: test_code.to_string(),
    }
}

/// Mock project corpus backed by a scratch directory
#[derive(Debug, Clone)]
pub struct MockDataset {
    work_dir: PathBuf,
    test_command: Vec<String>,
    timeout: Duration,
    bugs: HashMap<String, BugInfo>,
}

impl MockDataset {
    pub fn new(config: &DatasetConfig) -> Self {
        Self::with_work_dir(config, config.work_dir.clone())
    }

    /// Same settings, different scratch directory
    pub fn with_work_dir(config: &DatasetConfig, work_dir: impl Into<PathBuf>) -> Self {
        let bugs = [
            builtin(
                "1",
                "The function 'add' incorrectly subtracts numbers.",
                "calculator.py",
                ADD_CODE,
                "test_calculator.py",
                ADD_TEST,
            ),
            builtin(
                "2",
                "Binary search implementation has a logic error. It fails to find elements in sorted arrays.",
                "search.py",
                SEARCH_CODE,
                "test_search.py",
                SEARCH_TEST,
            ),
            builtin(
                "3",
                "Sudoku solver fails to solve valid puzzles. It seems to get stuck or return incorrect results.",
                "sudoku.py",
                SUDOKU_CODE,
                "test_sudoku.py",
                SUDOKU_TEST,
            ),
        ]
        .into_iter()
        .map(|bug| (bug.id.clone(), bug))
        .collect();

        Self {
            work_dir: work_dir.into(),
            test_command: config.test_command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            bugs,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Register (or replace) a bug, e.g. an ad-hoc task submitted over HTTP
    pub fn insert_bug(&mut self, bug: BugInfo) {
        self.bugs.insert(bug.id.clone(), bug);
    }

    pub fn bug_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bugs.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    fn bug(&self, bug_id: &str) -> Result<&BugInfo> {
        self.bugs
            .get(bug_id)
            .with_context(|| format!("Bug ID {} not found", bug_id))
    }

    async fn write_file(&self, relative: &str, contents: &str) -> Result<()> {
        let path = self.work_dir.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn run_test_command(&self, test_file: &str) -> TestRun {
        let Some((program, args)) = self.test_command.split_first() else {
            return TestRun::not_run("No test command configured");
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .arg(test_file)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Running {:?} in {}", self.test_command, self.work_dir.display());

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => return TestRun::not_run(format!("Failed to start {}: {}", program, e)),
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Err(_) => TestRun::not_run(format!(
                "Test run timed out after {}s",
                self.timeout.as_secs()
            )),
            Ok(Err(e)) => TestRun::not_run(format!("Failed to collect test output: {}", e)),
            Ok(Ok(output)) => TestRun {
                passed: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            },
        }
    }
}

#[async_trait]
impl ProjectCheckout for MockDataset {
    async fn get_bug_info(&self, _project: &str, bug_id: &str) -> Result<BugInfo> {
        self.bug(bug_id).cloned()
    }

    async fn checkout(&self, _project: &str, bug_id: &str) -> Result<PathBuf> {
        let bug = self.bug(bug_id)?;
        self.write_file(&bug.file_path, &bug.code).await?;
        self.write_file(&bug.test_file, &bug.test_code).await?;
        tracing::info!("Checked out bug {} into {}", bug_id, self.work_dir.display());
        Ok(self.work_dir.clone())
    }

    async fn run_test(&self, _project: &str, bug_id: &str, patch: Option<&str>) -> Result<TestRun> {
        let bug = self.bug(bug_id)?;
        if let Some(patch) = patch.filter(|p| !p.is_empty()) {
            self.write_file(&bug.file_path, patch).await?;
        }
        Ok(self.run_test_command(&bug.test_file).await)
    }
}
