//! Integration tests for pin add/rm/ls through the repo

mod common;

use ::common::gc::GcConfig;
use ::common::prelude::*;

use crate::common::{put_node, put_raw, setup_fs_repo, setup_memory_repo};

#[tokio::test]
async fn test_indirect_listing_and_precedence() {
    let repo = setup_memory_repo().await;
    let child = put_raw(&repo, b"child").await;
    let root = put_node(&repo, "root", &[child]).await;
    repo.pin_add(&root.to_string(), true).await.unwrap();

    let indirect = repo.pin_ls(None, PinType::Indirect).await.unwrap();
    assert_eq!(indirect.len(), 1);
    assert_eq!(indirect[0].cid, child);
    assert_eq!(indirect[0].reason, PinReason::Indirect { via: root });

    repo.pin_add(&child.to_string(), false).await.unwrap();
    let all = repo.pin_ls(None, PinType::All).await.unwrap();
    let entries: Vec<_> = all.iter().filter(|p| p.cid == child).collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason, PinReason::Direct);

    // directly pinned blocks never show up as indirect, even alone
    assert!(repo
        .pin_ls(None, PinType::Indirect)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_ls_explicit_paths() {
    let repo = setup_memory_repo().await;
    let leaf = put_raw(&repo, b"leaf").await;
    let root = put_node(&repo, "root", &[leaf]).await;
    let other = put_raw(&repo, b"other").await;
    repo.pin_add(&root.to_string(), true).await.unwrap();

    let root_path = format!("/ipfs/{}", root);
    let leaf_path = format!("/ipfs/{}/links/0", root);
    let pins = repo
        .pin_ls(Some(&[root_path.as_str(), leaf_path.as_str()]), PinType::All)
        .await
        .unwrap();
    assert_eq!(pins[0].reason, PinReason::Recursive);
    assert_eq!(pins[1].cid, leaf);
    assert_eq!(pins[1].reason, PinReason::Indirect { via: root });

    let other_path = other.to_string();
    match repo.pin_ls(Some(&[other_path.as_str()]), PinType::All).await {
        Err(RepoError::NotPinned(path)) => assert_eq!(path, other_path),
        result => panic!("unexpected: {:?}", result),
    }

    // pinned, but not with the requested type
    match repo
        .pin_ls(Some(&[leaf_path.as_str()]), PinType::Recursive)
        .await
    {
        Err(RepoError::NotPinned(path)) => assert_eq!(path, leaf_path),
        result => panic!("unexpected: {:?}", result),
    }
}

#[tokio::test]
async fn test_ls_rejects_bad_path_before_resolving() {
    let repo = setup_memory_repo().await;
    let result = repo.pin_ls(Some(&["definitely not a cid"]), PinType::All).await;
    assert!(matches!(result, Err(RepoError::InvalidCid(_))));
}

#[tokio::test]
async fn test_recursive_pin_requires_whole_dag() {
    let repo = setup_memory_repo().await;
    let child = put_raw(&repo, b"child").await;
    let root = put_node(&repo, "root", &[child]).await;
    repo.blocks().delete(&child).await.unwrap();

    assert!(matches!(
        repo.pin_add(&root.to_string(), true).await,
        Err(RepoError::NotFound(missing)) if missing == child
    ));
    // a direct pin only needs the root itself
    repo.pin_add(&root.to_string(), false).await.unwrap();
}

#[tokio::test]
async fn test_direct_after_recursive_is_refused() {
    let repo = setup_memory_repo().await;
    let cid = put_raw(&repo, b"block").await;
    repo.pin_add(&cid.to_string(), true).await.unwrap();

    assert!(matches!(
        repo.pin_add(&cid.to_string(), false).await,
        Err(RepoError::AlreadyPinnedRecursively(_))
    ));
}

#[tokio::test]
async fn test_pins_survive_reopen() {
    let (repo, temp_dir) = setup_fs_repo().await;
    let child = put_raw(&repo, b"child").await;
    let root = put_node(&repo, "root", &[child]).await;
    let single = put_raw(&repo, b"single").await;
    repo.pin_add(&root.to_string(), true).await.unwrap();
    repo.pin_add(&single.to_string(), false).await.unwrap();
    drop(repo);

    let repo = Repo::open_fs(temp_dir.path(), GcConfig::default())
        .await
        .unwrap();
    let pins = repo.pin_ls(None, PinType::All).await.unwrap();
    assert_eq!(
        pins,
        vec![
            Pin {
                cid: single,
                reason: PinReason::Direct
            },
            Pin {
                cid: root,
                reason: PinReason::Recursive
            },
            Pin {
                cid: child,
                reason: PinReason::Indirect { via: root }
            },
        ]
    );

    assert!(repo.gc().await.unwrap().iter().all(|r| r.cid != Some(child)));
}
