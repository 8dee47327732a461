use super::*;
use crate::error::ErrorKind;
use crate::store::{MemoryStore, StoreError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn center(store: &Arc<MemoryStore>) -> NotificationCenter {
    NotificationCenter::new(store.clone(), Arc::new(QueryCache::new(60_000)))
}

async fn assert_consistent(c: &NotificationCenter, p: &Principal) {
    let listed = c.list(Some(p)).await.unwrap();
    let unread_in_list = listed.iter().filter(|n| !n.is_read).count();
    assert_eq!(c.unread_count(Some(p)).await.unwrap(), unread_in_list);
    assert!(listed.iter().all(|n| n.user_id == p.user_id));
}

#[tokio::test]
async fn unread_count_tracks_list_across_random_mutations() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let p = Principal::new("p");
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut ids: Vec<String> = Vec::new();

    for step in 0..200 {
        match rng.gen_range(0..5) {
            0 | 1 => {
                let n = c.deliver("p", NotificationKind::Info, &format!("alert {}", step), "body").await.unwrap();
                ids.push(n.id);
            }
            2 if !ids.is_empty() => {
                let id = ids[rng.gen_range(0..ids.len())].clone();
                // May already be deleted; both outcomes are well-defined.
                match c.mark_read(Some(&p), &id).await {
                    Ok(n) => assert!(n.is_read),
                    Err(e) => assert_eq!(e.kind(), ErrorKind::NotFound),
                }
            }
            3 if !ids.is_empty() => {
                let id = ids[rng.gen_range(0..ids.len())].clone();
                c.delete(Some(&p), &id).await.unwrap();
            }
            4 => {
                c.mark_all_read(Some(&p)).await.unwrap();
            }
            _ => {}
        }
        assert_consistent(&c, &p).await;
    }
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let p = Principal::new("p");
    let n = c.deliver("p", NotificationKind::Warning, "disk", "disk at 91%").await.unwrap();
    assert!(!n.is_read);
    assert_eq!(c.unread_count(Some(&p)).await.unwrap(), 1);

    let once = c.mark_read(Some(&p), &n.id).await.unwrap();
    let after_once = c.list(Some(&p)).await.unwrap();
    let twice = c.mark_read(Some(&p), &n.id).await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(c.list(Some(&p)).await.unwrap(), after_once);
    assert_eq!(c.unread_count(Some(&p)).await.unwrap(), 0);
}

#[tokio::test]
async fn mark_all_read_leaves_nothing_unread() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let p = Principal::new("p");
    for i in 0..4 {
        c.deliver("p", NotificationKind::Error, &format!("job {} failed", i), "").await.unwrap();
    }
    c.deliver("q", NotificationKind::Info, "other", "").await.unwrap();

    assert_eq!(c.mark_all_read(Some(&p)).await.unwrap(), 4);
    assert!(c.list(Some(&p)).await.unwrap().iter().all(|n| n.is_read));
    assert_eq!(c.unread_count(Some(&p)).await.unwrap(), 0);
    assert_eq!(c.unread_count(Some(&Principal::new("q"))).await.unwrap(), 1);
    assert_eq!(c.mark_all_read(Some(&p)).await.unwrap(), 0);
}

#[tokio::test]
async fn partial_mark_all_read_is_an_error_and_refreshes_reads() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let p = Principal::new("p");
    for i in 0..3 {
        c.deliver("p", NotificationKind::Info, &format!("n{}", i), "").await.unwrap();
    }
    assert_eq!(c.unread_count(Some(&p)).await.unwrap(), 3);

    store.fail_next_mark_all_read_partially();
    let err = c.mark_all_read(Some(&p)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Write);
    assert_eq!(err.code_str(), "partial_update");
    // The cached count must not hide the rows the store did change.
    assert_eq!(c.unread_count(Some(&p)).await.unwrap(), 2);
    assert_consistent(&c, &p).await;
}

#[tokio::test]
async fn delete_missing_is_noop_and_keeps_others() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let p = Principal::new("p");
    let keep = c.deliver("p", NotificationKind::Success, "done", "").await.unwrap();

    c.delete(Some(&p), "no-such-id").await.unwrap();
    let listed = c.list(Some(&p)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep.id);

    c.delete(Some(&p), &keep.id).await.unwrap();
    c.delete(Some(&p), &keep.id).await.unwrap();
    assert!(c.list(Some(&p)).await.unwrap().is_empty());

    let err = c.mark_read(Some(&p), &keep.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn other_principals_notifications_are_off_limits() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let theirs = c.deliver("q", NotificationKind::Info, "secret", "").await.unwrap();
    let p = Principal::new("p");

    let err = c.mark_read(Some(&p), &theirs.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    let err = c.delete(Some(&p), &theirs.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(c.list(Some(&p)).await.unwrap().is_empty());

    let q = Principal::new("q");
    let still = c.list(Some(&q)).await.unwrap();
    assert_eq!(still.len(), 1);
    assert!(!still[0].is_read);
}

#[tokio::test]
async fn anonymous_reads_are_empty_and_mutations_rejected() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    assert!(c.list(None).await.unwrap().is_empty());
    assert_eq!(c.unread_count(None).await.unwrap(), 0);
    assert_eq!(c.mark_all_read(None).await.unwrap_err().kind(), ErrorKind::Authorization);
    assert_eq!(c.delete(None, "x").await.unwrap_err().kind(), ErrorKind::Authorization);
    assert_eq!(store.read_counts().notifications, 0);
}

#[tokio::test]
async fn reads_are_cached_and_invalidated_per_principal() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    let p = Principal::new("p");
    let q = Principal::new("q");
    let n = c.deliver("p", NotificationKind::Info, "a", "").await.unwrap();
    c.deliver("q", NotificationKind::Info, "b", "").await.unwrap();

    c.list(Some(&p)).await.unwrap();
    c.unread_count(Some(&p)).await.unwrap();
    c.list(Some(&q)).await.unwrap();
    assert_eq!(store.read_counts().notifications, 2);

    c.mark_read(Some(&p), &n.id).await.unwrap();
    c.list(Some(&q)).await.unwrap();
    assert_eq!(store.read_counts().notifications, 2, "q's cache must survive p's mutation");
    assert_eq!(c.unread_count(Some(&p)).await.unwrap(), 0);
    assert_eq!(store.read_counts().notifications, 3);
}

#[tokio::test]
async fn deliver_validates_and_surfaces_write_errors() {
    let store = Arc::new(MemoryStore::new());
    let c = center(&store);
    assert_eq!(c.deliver("p", NotificationKind::Info, "  ", "x").await.unwrap_err().kind(), ErrorKind::Validation);
    assert_eq!(c.deliver("", NotificationKind::Info, "t", "x").await.unwrap_err().kind(), ErrorKind::Validation);
    store.fail_next_write(StoreError::Unavailable("down".into()));
    assert_eq!(c.deliver("p", NotificationKind::Info, "t", "x").await.unwrap_err().kind(), ErrorKind::Write);
}
