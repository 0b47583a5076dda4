mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use pretty_assertions::assert_eq;

use soopup::fetcher::{fetch_all_comments, FetchOptions, SoopCommentSource};
use soopup::poller::{PollOptions, PollUpdate, Poller};
use soopup::soop::{ApiError, Client, ClientConfig};
use soopup::target::{resolve_target, Target};
use support::{page_body, FakeApi};

fn source_for(api: &FakeApi) -> SoopCommentSource {
    let client = Client::new(ClientConfig {
        user_agent: "soopup-tests".into(),
        base_url: Some(api.base_url().to_string()),
        timeout: Some(Duration::from_secs(5)),
        http_client: None,
    })
    .unwrap();
    SoopCommentSource::new(Arc::new(client))
}

fn target() -> Target {
    Target::from_query("lilpa0309", "185132049").unwrap()
}

fn api_error(err: &anyhow::Error) -> Option<&ApiError> {
    err.chain().find_map(|cause| cause.downcast_ref::<ApiError>())
}

#[test]
fn requests_the_comment_endpoint() {
    let api = FakeApi::start(|hit| (200, page_body(hit.page, 1, |_| 1)));
    fetch_all_comments(&source_for(&api), &target(), FetchOptions::default()).unwrap();

    let hits = api.hits();
    assert_eq!(hits.len(), 2);
    for hit in hits {
        assert_eq!(hit.path, "/v1.1/channel/lilpa0309/post/185132049/comment");
        assert_eq!(hit.page, 1);
        assert_eq!(hit.per_page, 30);
    }
}

#[test]
fn escaped_owner_is_encoded_once_on_the_wire() {
    let api = FakeApi::start(|hit| (200, page_body(hit.page, 1, |_| 1)));
    let target = resolve_target("https://www.sooplive.co.kr/station/%EB%B9%99/post/1").unwrap();
    assert_eq!(target.owner_id, "빙");

    fetch_all_comments(&source_for(&api), &target, FetchOptions::default()).unwrap();

    let hits = api.hits();
    assert!(!hits.is_empty());
    for hit in hits {
        assert_eq!(hit.path, "/v1.1/channel/%EB%B9%99/post/1/comment");
    }
}

#[test]
fn growth_during_sweep_fetches_the_new_page_once() {
    let api = FakeApi::start(|hit| {
        let last_page = if hit.first_page_reads <= 1 { 3 } else { 4 };
        (200, page_body(hit.page, last_page, |id| id % 7))
    });

    let ranking =
        fetch_all_comments(&source_for(&api), &target(), FetchOptions::default()).unwrap();

    let pages = api.pages();
    assert_eq!(pages.iter().filter(|p| **p == 4).count(), 1);
    assert_eq!(pages.iter().filter(|p| **p == 1).count(), 2);
    assert_eq!(pages.len(), 5);
    assert_eq!(ranking.total_count, 8);
    assert_eq!(ranking.last_observed_page_count, 4);
    assert!(ranking
        .comments
        .windows(2)
        .all(|w| w[0].like_count >= w[1].like_count));
    assert_eq!(
        ranking.comments[0].avatar_url,
        "https://profile.img.sooplive.co.kr/LOGO/x.jpg"
    );
}

#[test]
fn failed_page_rejects_the_cycle() {
    let api = FakeApi::start(|hit| {
        if hit.page == 2 {
            (500, "{\"error\":\"boom\"}".to_string())
        } else {
            (200, page_body(hit.page, 3, |_| 1))
        }
    });

    let err =
        fetch_all_comments(&source_for(&api), &target(), FetchOptions::default()).unwrap_err();
    match api_error(&err) {
        Some(ApiError::Status { status, .. }) => assert_eq!(*status, 500),
        other => panic!("unexpected error: {other:?} ({err:#})"),
    }
}

#[test]
fn undecodable_body_rejects_the_cycle() {
    let api = FakeApi::start(|_| (200, "<html>maintenance</html>".to_string()));

    let err =
        fetch_all_comments(&source_for(&api), &target(), FetchOptions::default()).unwrap_err();
    assert!(matches!(
        api_error(&err),
        Some(ApiError::Decode { page: 1, .. })
    ));
    assert_eq!(api.pages(), vec![1]);
}

fn wait_for<F>(rx: &crossbeam_channel::Receiver<PollUpdate>, mut done: F) -> PollUpdate
where
    F: FnMut(&PollUpdate) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .expect("timed out waiting for poll update");
        let update = rx.recv_timeout(remaining).expect("poll update");
        if done(&update) {
            return update;
        }
    }
}

#[test]
fn poller_publishes_rankings_and_keeps_them_on_failure() {
    let api = FakeApi::start(|hit| {
        if hit.first_page_reads > 2 {
            (503, String::new())
        } else {
            (200, page_body(hit.page, 1, |id| id))
        }
    });

    let (tx, rx) = unbounded();
    let options = PollOptions {
        interval: Duration::from_millis(100),
        retries: 0,
        ..PollOptions::default()
    };
    let mut poller = Poller::spawn(Arc::new(source_for(&api)), options, move |update| {
        let _ = tx.send(update);
    });
    poller.set_target(Some(target())).unwrap();

    let first = wait_for(&rx, |u| u.ranking.is_some());
    let ranking = first.ranking.clone().unwrap();
    assert_eq!(ranking.total_count, 2);
    assert_eq!(ranking.comments[0].comment_id, 1001);
    assert!(first.error.is_none());
    assert!(first.last_success.is_some());

    let failed = wait_for(&rx, |u| u.error.is_some());
    assert_eq!(failed.ranking.as_deref(), Some(&*ranking));
    assert_eq!(failed.target, Some(target()));

    poller.set_target(None).unwrap();
    let cleared = wait_for(&rx, |u| u.target.is_none());
    assert!(cleared.ranking.is_none());
    poller.stop();
}
