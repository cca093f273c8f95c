use post_media::storage::models::NewMedia;
use post_media::storage::Database;

fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("data")).unwrap();
    (dir, db)
}

fn new_media(post_id: &str) -> NewMedia {
    NewMedia {
        post_id: post_id.to_string(),
        url: Some(format!("https://cdn.test/{post_id}.png")),
        media_type: Some("image".to_string()),
    }
}

#[test]
fn test_create_assigns_id_and_timestamp() {
    let (_dir, db) = test_db();
    let before = chrono::Utc::now();

    let media = db.create_media(new_media("post-1")).unwrap();

    assert!(!media.id.is_empty());
    assert_eq!(media.post_id, "post-1");
    assert!(media.created_at >= before);
    assert_eq!(media.url.as_deref(), Some("https://cdn.test/post-1.png"));
}

#[test]
fn test_create_twice_yields_distinct_records() {
    let (_dir, db) = test_db();

    let a = db.create_media(new_media("post-1")).unwrap();
    let b = db.create_media(new_media("post-1")).unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(db.find_by_post_id("post-1").unwrap().len(), 2);
}

#[test]
fn test_get_media() {
    let (_dir, db) = test_db();
    let created = db.create_media(new_media("post-2")).unwrap();

    let retrieved = db.get_media(&created.id).unwrap().expect("media should exist");
    assert_eq!(retrieved, created);
}

#[test]
fn test_get_media_not_found() {
    let (_dir, db) = test_db();
    assert!(db.get_media("nonexistent").unwrap().is_none());
}

#[test]
fn test_find_by_post_id_unknown_post_is_empty() {
    let (_dir, db) = test_db();
    assert!(db.find_by_post_id("nobody").unwrap().is_empty());
}

#[test]
fn test_find_by_post_id_filters_and_keeps_creation_order() {
    let (_dir, db) = test_db();
    let first = db.create_media(new_media("run")).unwrap();
    db.create_media(new_media("swim")).unwrap();
    let second = db.create_media(new_media("run")).unwrap();
    let third = db.create_media(new_media("run")).unwrap();

    let ids: Vec<String> = db
        .find_by_post_id("run")
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);

    let swim = db.find_by_post_id("swim").unwrap();
    assert_eq!(swim.len(), 1);
}

#[test]
fn test_delete_media() {
    let (_dir, db) = test_db();
    let media = db.create_media(new_media("post-3")).unwrap();

    assert!(db.delete_media(&media.id).unwrap());
    assert!(db.get_media(&media.id).unwrap().is_none());
    assert!(db.find_by_post_id("post-3").unwrap().is_empty());
}

#[test]
fn test_delete_media_twice() {
    let (_dir, db) = test_db();
    let media = db.create_media(new_media("post-4")).unwrap();

    assert!(db.delete_media(&media.id).unwrap());
    assert!(!db.delete_media(&media.id).unwrap());
}

#[test]
fn test_delete_media_not_found() {
    let (_dir, db) = test_db();
    assert!(!db.delete_media("nonexistent").unwrap());
}

#[test]
fn test_delete_keeps_other_media_of_post() {
    let (_dir, db) = test_db();
    let gone = db.create_media(new_media("post-5")).unwrap();
    let kept = db.create_media(new_media("post-5")).unwrap();

    db.delete_media(&gone.id).unwrap();

    let remaining = db.find_by_post_id("post-5").unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let db = Database::open(dir.path().join("data")).unwrap();
        db.create_media(new_media("post-6")).unwrap()
    };

    let db = Database::open(dir.path().join("data")).unwrap();
    let media = db.find_by_post_id("post-6").unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].id, created.id);
}

#[test]
fn test_optional_fields_may_be_absent() {
    let (_dir, db) = test_db();
    let media = db
        .create_media(NewMedia {
            post_id: "bare".to_string(),
            ..Default::default()
        })
        .unwrap();

    let retrieved = db.get_media(&media.id).unwrap().unwrap();
    assert_eq!(retrieved.url, None);
    assert_eq!(retrieved.media_type, None);
}
