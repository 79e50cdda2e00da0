// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use searchrs::domain::models::job::{Job, JobKind, JobResult, JobState, JobTransition};
use searchrs::domain::repositories::job_repository::{JobRepository, UpdateOutcome};
use searchrs::infrastructure::repositories::job_repo_impl::JobRepositoryImpl;
use std::sync::Arc;
use uuid::Uuid;

async fn setup_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    let db = Arc::new(db);
    Migrator::up(db.as_ref(), None).await.unwrap();
    db
}

#[tokio::test]
async fn test_create_and_find_round_trip() {
    let repo = JobRepositoryImpl::new(setup_db().await);
    let job = Job::new(JobKind::Recrawl, "https://example.com/page", 10, Utc::now());

    repo.create(&job).await.unwrap();
    let found = repo.find_by_id(job.id).await.unwrap().unwrap();

    assert_eq!(found.id, job.id);
    assert_eq!(found.kind, JobKind::Recrawl);
    assert_eq!(found.state, JobState::Pending);
    assert_eq!(found.priority, 10);
    assert_eq!(
        found.sla_deadline.unwrap() - found.created_at,
        chrono::Duration::hours(1)
    );
    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_transitions_only_apply_from_allowed_states() {
    let repo = JobRepositoryImpl::new(setup_db().await);
    let job = Job::new(JobKind::Crawl, "https://example.com", 0, Utc::now());
    repo.create(&job).await.unwrap();

    let start = JobTransition::Start {
        started_at: Utc::now(),
    };
    let UpdateOutcome::Applied(started) = repo.update(job.id, &start).await.unwrap() else {
        panic!("start should apply to a pending job");
    };
    assert_eq!(started.state, JobState::Processing);
    assert!(started.started_at.is_some());

    // 重复的开始转换不生效
    assert_eq!(
        repo.update(job.id, &start).await.unwrap(),
        UpdateOutcome::Conflict(JobState::Processing)
    );

    let complete = JobTransition::Complete {
        completed_at: Utc::now(),
        result: JobResult {
            pages_crawled: 3,
            documents_indexed: Some(3),
            ..Default::default()
        },
    };
    let UpdateOutcome::Applied(completed) = repo.update(job.id, &complete).await.unwrap() else {
        panic!("complete should apply to a processing job");
    };
    assert_eq!(completed.state, JobState::Completed);
    assert_eq!(completed.result().unwrap().pages_crawled, 3);
    assert_eq!(completed.started_at, started.started_at);

    // 终态不可覆盖
    let fail = JobTransition::Fail {
        completed_at: Utc::now(),
        error: "late failure".to_string(),
    };
    assert_eq!(
        repo.update(job.id, &fail).await.unwrap(),
        UpdateOutcome::Conflict(JobState::Completed)
    );
    let unchanged = repo.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(unchanged.state, JobState::Completed);
    assert!(unchanged.error().is_none());
}

#[tokio::test]
async fn test_update_unknown_job() {
    let repo = JobRepositoryImpl::new(setup_db().await);
    let outcome = repo
        .update(
            Uuid::new_v4(),
            &JobTransition::Start {
                started_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_finishers_have_exactly_one_winner() {
    let repo = Arc::new(JobRepositoryImpl::new(setup_db().await));
    let job = Job::new(JobKind::Crawl, "https://example.com/race", 0, Utc::now());
    repo.create(&job).await.unwrap();
    repo.update(
        job.id,
        &JobTransition::Start {
            started_at: Utc::now(),
        },
    )
    .await
    .unwrap();

    let mut handles = Vec::new();
    for i in 0..8u32 {
        let repo = repo.clone();
        let id = job.id;
        handles.push(tokio::spawn(async move {
            let transition = if i % 2 == 0 {
                JobTransition::Complete {
                    completed_at: Utc::now(),
                    result: JobResult {
                        pages_crawled: i,
                        ..Default::default()
                    },
                }
            } else {
                JobTransition::Fail {
                    completed_at: Utc::now(),
                    error: format!("worker {}", i),
                }
            };
            (i, repo.update(id, &transition).await.unwrap())
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let (i, outcome) = handle.await.unwrap();
        match outcome {
            UpdateOutcome::Applied(job) => winners.push((i, job)),
            UpdateOutcome::Conflict(state) => assert!(state.is_terminal()),
            UpdateOutcome::NotFound => panic!("job vanished during the race"),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one finisher must win");
    let (winner, applied) = winners.remove(0);
    let stored = repo.find_by_id(job.id).await.unwrap().unwrap();

    assert_eq!(stored.state, applied.state);
    assert_eq!(stored.completed_at, applied.completed_at);
    assert_eq!(stored.result(), applied.result());
    assert_eq!(stored.error(), applied.error());
    if winner % 2 == 0 {
        assert_eq!(stored.state, JobState::Completed);
        assert_eq!(stored.result().unwrap().pages_crawled, winner);
        assert!(stored.error().is_none());
    } else {
        assert_eq!(stored.state, JobState::Failed);
        assert_eq!(stored.error(), Some(format!("worker {}", winner).as_str()));
        assert!(stored.result().is_none());
    }
}
