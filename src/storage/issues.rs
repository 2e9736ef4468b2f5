//! Issue manifest: the single source of truth for issue status.

use std::{fs, io};

use crate::model::{Issue, IssueStatus, Tier};

use super::{Result, Snapshot, Storage, StorageError, commit_store, read_store, write_store};

impl Storage {
    /// Loads every issue, in manifest order.
    pub fn load_issues(&self) -> Result<Vec<Issue>> {
        Ok(self.load_issues_for_update()?.data)
    }

    /// Replaces the manifest unconditionally.
    pub fn save_issues(&self, issues: &[Issue]) -> Result<()> {
        write_store(&self.paths.manifest, &issues)?;
        Ok(())
    }

    /// Loads the manifest for a load → mutate → commit cycle.
    ///
    /// Unlike the other stores, a missing manifest is an error: the
    /// detector creates it, and nothing here can stand in for it.
    pub fn load_issues_for_update(&self) -> Result<Snapshot<Vec<Issue>>> {
        match fs::metadata(&self.paths.manifest) {
            Ok(_) => {
                let snapshot: Snapshot<Vec<Issue>> = read_store(&self.paths.manifest)?;
                for issue in snapshot.data.iter().filter(|i| !i.is_consistent()) {
                    tracing::warn!(
                        issue = %issue.id,
                        status = %issue.status,
                        "escalation target set on an issue that isn't escalated"
                    );
                }
                Ok(snapshot)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::ManifestNotFound(
                self.paths.manifest.clone(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes the snapshot back, failing if the manifest changed since load.
    pub fn commit_issues(&self, snapshot: &mut Snapshot<Vec<Issue>>) -> Result<()> {
        snapshot.revision = commit_store(&self.paths.manifest, &snapshot.revision, &snapshot.data)?;
        Ok(())
    }
}

/// Issues with the given status, in manifest order.
pub fn find_by_status<'a>(issues: &'a [Issue], status: &IssueStatus) -> Vec<&'a Issue> {
    issues.iter().filter(|i| &i.status == status).collect()
}

/// Issues at the given tier with the given status, in manifest order.
pub fn find_by_tier_and_status<'a>(
    issues: &'a [Issue],
    tier: Tier,
    status: &IssueStatus,
) -> Vec<&'a Issue> {
    issues
        .iter()
        .filter(|i| i.tier == tier && &i.status == status)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Map;

    use crate::storage::tests::test_storage;

    fn sample_issue(id: &str, tier: Tier, status: IssueStatus) -> Issue {
        Issue {
            id: id.into(),
            file: "/repo/src/app/widget/widget.ts".into(),
            line: 3,
            column: Some(1),
            rule_id: "no-console".into(),
            message: "Unexpected console statement.".into(),
            fix_hint: None,
            tier: tier.into(),
            project: None,
            status,
            escalate_to: None,
            outcome_reason: None,
            last_task_id: None,
            escalations: 0,
            extra: Map::new(),
        }
    }

    #[test]
    fn missing_manifest_fails() {
        let (_dir, storage) = test_storage();
        let err = storage.load_issues().unwrap_err();
        assert!(matches!(err, StorageError::ManifestNotFound(_)));
    }

    #[test]
    fn save_and_load_preserves_order() {
        let (_dir, storage) = test_storage();
        let issues = vec![
            sample_issue("lint-0002", Tier::Mechanical, IssueStatus::Pending),
            sample_issue("lint-0001", Tier::Judgment, IssueStatus::Fixed),
        ];

        storage.save_issues(&issues).unwrap();
        let loaded = storage.load_issues().unwrap();

        assert_eq!(loaded, issues);
    }

    #[test]
    fn commit_detects_concurrent_writer() {
        let (_dir, storage) = test_storage();
        storage
            .save_issues(&[sample_issue("lint-0001", Tier::Mechanical, IssueStatus::Pending)])
            .unwrap();

        let mut ours = storage.load_issues_for_update().unwrap();
        let mut theirs = storage.load_issues_for_update().unwrap();

        theirs.data[0].status = IssueStatus::Fixed;
        storage.commit_issues(&mut theirs).unwrap();

        ours.data[0].status = IssueStatus::Skipped;
        let err = storage.commit_issues(&mut ours).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(storage.load_issues().unwrap()[0].status, IssueStatus::Fixed);
    }

    #[test]
    fn repeated_commits_from_one_snapshot_succeed() {
        let (_dir, storage) = test_storage();
        storage
            .save_issues(&[sample_issue("lint-0001", Tier::Mechanical, IssueStatus::Pending)])
            .unwrap();

        let mut snapshot = storage.load_issues_for_update().unwrap();
        snapshot.data[0].status = IssueStatus::InProgress;
        storage.commit_issues(&mut snapshot).unwrap();
        snapshot.data[0].status = IssueStatus::Fixed;
        storage.commit_issues(&mut snapshot).unwrap();

        assert_eq!(storage.load_issues().unwrap()[0].status, IssueStatus::Fixed);
    }

    #[test]
    fn unknown_tier_loads_without_failing_the_manifest() {
        let (_dir, storage) = test_storage();
        storage
            .save_issues(&[sample_issue("lint-0001", Tier::Mechanical, IssueStatus::Pending)])
            .unwrap();
        fs::write(
            &storage.paths.manifest,
            r#"[
                {"id":"lint-0001","file":"/r/a.ts","line":1,"ruleId":"no-console","tier":"mechanical"},
                {"id":"lint-0002","file":"/r/b.ts","line":2,"ruleId":"no-console","tier":"cosmic"}
            ]"#,
        )
        .unwrap();

        let issues = storage.load_issues().unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[1].tier.as_str(), "cosmic");
        let pending: Vec<&str> = Tier::ALL
            .iter()
            .flat_map(|&t| find_by_tier_and_status(&issues, t, &IssueStatus::Pending))
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(pending, ["lint-0001"]);
    }

    #[test]
    fn filters_by_status_and_tier() {
        let issues = vec![
            sample_issue("a", Tier::Mechanical, IssueStatus::Pending),
            sample_issue("b", Tier::Contextual, IssueStatus::Pending),
            sample_issue("c", Tier::Mechanical, IssueStatus::InProgress),
            sample_issue("d", Tier::Mechanical, IssueStatus::Pending),
        ];

        let pending: Vec<&str> = find_by_status(&issues, &IssueStatus::Pending)
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(pending, ["a", "b", "d"]);

        let mechanical: Vec<&str> =
            find_by_tier_and_status(&issues, Tier::Mechanical, &IssueStatus::Pending)
                .iter()
                .map(|i| i.id.as_str())
                .collect();
        assert_eq!(mechanical, ["a", "d"]);
    }
}
