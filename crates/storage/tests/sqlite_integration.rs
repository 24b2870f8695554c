use chrono::Duration;
use learn_core::model::{ChapterStatus, LearningProgress, MAX_READ_DURATION, UserId};
use learn_core::time::fixed_now;
use storage::repository::ProgressRepository;
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_roundtrip_persists_all_fields() {
    let repo = connect("memdb_progress_roundtrip").await;

    let mut p = LearningProgress::new(UserId::new(1), "variables", "storage", fixed_now());
    p.status = ChapterStatus::Completed;
    p.read_duration = 600;
    p.scroll_progress = 95;
    p.last_position = "anchor-3".into();
    p.quiz_score = 80;
    p.quiz_passed = true;
    p.completed_at = Some(fixed_now());
    repo.upsert(&p).await.unwrap();

    let fetched = repo
        .get(UserId::new(1), "variables", "storage")
        .await
        .unwrap()
        .expect("record present");
    assert_eq!(fetched, p);

    let missing = repo
        .get(UserId::new(1), "variables", "static")
        .await
        .unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn sqlite_upsert_merges_on_unique_key() {
    let repo = connect("memdb_progress_upsert").await;
    let user = UserId::new(3);

    let first = LearningProgress::new(user, "types", "map", fixed_now());
    repo.upsert(&first).await.unwrap();

    let mut second = first.clone();
    second.read_duration = 120;
    second.status = ChapterStatus::InProgress;
    second.first_visit_at = fixed_now() + Duration::days(5);
    second.last_visit_at = fixed_now() + Duration::hours(1);
    repo.upsert(&second).await.unwrap();

    let all = repo.list_by_user(user).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].read_duration, 120);
    assert_eq!(all[0].status, ChapterStatus::InProgress);
    assert_eq!(all[0].first_visit_at, fixed_now());
    assert_eq!(all[0].last_visit_at, fixed_now() + Duration::hours(1));
}

#[tokio::test]
async fn sqlite_lists_by_user_and_topic() {
    let repo = connect("memdb_progress_lists").await;
    let user = UserId::new(7);

    let mut older = LearningProgress::new(user, "variables", "storage", fixed_now());
    older.last_visit_at = fixed_now() - Duration::hours(2);
    let newer = LearningProgress::new(user, "variables", "static", fixed_now());
    let elsewhere = LearningProgress::new(user, "types", "slice", fixed_now());
    let stranger = LearningProgress::new(UserId::new(8), "variables", "storage", fixed_now());
    for p in [&older, &newer, &elsewhere, &stranger] {
        repo.upsert(p).await.unwrap();
    }

    let by_user = repo.list_by_user(user).await.unwrap();
    assert_eq!(by_user.len(), 3);
    assert_eq!(by_user.last().unwrap().chapter, "storage");

    let by_topic = repo.list_by_topic(user, "variables").await.unwrap();
    let chapters: Vec<&str> = by_topic.iter().map(|p| p.chapter.as_str()).collect();
    assert_eq!(chapters, ["static", "storage"]);

    assert!(repo.list_by_user(UserId::new(99)).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_stores_the_largest_read_duration() {
    let repo = connect("memdb_progress_max_read").await;
    let user = UserId::new(11);

    let mut p = LearningProgress::new(user, "types", "map", fixed_now());
    p.read_duration = MAX_READ_DURATION;
    repo.upsert(&p).await.unwrap();

    let fetched = repo.get(user, "types", "map").await.unwrap().unwrap();
    assert_eq!(fetched.read_duration, MAX_READ_DURATION);
}
