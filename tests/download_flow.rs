//! Downloads against a mock conversion service, saved into a temp dir

mod common;

use common::{
    THREE_RESULTS, assert_file_contents, mount_download, mount_search, setup, wait_for_event,
    wait_until_in_flight,
};
use std::time::Duration;
use v2a_dl::{
    AudioFormat, Bitrate, DownloadError, DownloadKey, DownloadProgress, DownloadState, Error,
    Event, Method,
};
use wiremock::ResponseTemplate;
use wiremock::matchers::{method, path, query_param};

const V1: &str = "https://www.youtube.com/watch?v=v1";
const V2: &str = "https://www.youtube.com/watch?v=v2";

#[tokio::test]
async fn lossless_download_is_confirmed_then_saved_under_title() {
    let (server, client, dir) = setup().await;
    wiremock::Mock::given(method("GET"))
        .and(path("/download"))
        .and(query_param("url", V1))
        .and(query_param("format", "flac"))
        .and(query_param("bitrate", "320"))
        .and(query_param("method", "auto"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fLaC-data".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let key = DownloadKey::from(V1);

    client.select_format(AudioFormat::Flac);
    let progress = client
        .request_download(key.clone(), "Track")
        .await
        .expect("request accepted");

    assert_eq!(progress, DownloadProgress::AwaitingConfirmation);
    assert_eq!(client.download_state(&key), DownloadState::Confirming);

    let saved = client
        .confirm_download()
        .await
        .expect("download succeeds")
        .expect("a download was pending");

    assert_eq!(saved.path, dir.path().join("Track.flac"));
    assert_eq!(saved.size_bytes, 9);
    assert_file_contents(&saved.path, b"fLaC-data");
    assert_eq!(client.download_state(&key), DownloadState::Idle);
    assert!(!client.in_flight().contains(&key));
    assert_eq!(client.error(), None);
}

#[tokio::test]
async fn server_filename_wins_over_title() {
    let (server, client, dir) = setup().await;
    mount_download(
        &server,
        V1,
        ResponseTemplate::new(200)
            .insert_header(
                "Content-Disposition",
                r#"attachment; filename="Lofi Beats.mp3""#,
            )
            .set_body_bytes(b"ID3".to_vec()),
    )
    .await;

    let progress = client
        .request_download(V1, "ignored")
        .await
        .expect("download succeeds");

    let DownloadProgress::Saved(saved) = progress else {
        panic!("mp3 downloads start immediately, got {progress:?}");
    };
    assert_eq!(saved.path, dir.path().join("Lofi Beats.mp3"));
}

#[tokio::test]
async fn selection_is_sent_as_query_parameters() {
    let (server, client, _dir) = setup().await;
    wiremock::Mock::given(method("GET"))
        .and(path("/download"))
        .and(query_param("format", "ogg"))
        .and(query_param("bitrate", "128"))
        .and(query_param("method", "stream"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"OggS".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    client.select_format(AudioFormat::Ogg);
    assert!(client.select_bitrate(Bitrate::Kbps128));
    client.select_method(Method::Stream);
    client
        .request_download(V1, "Song")
        .await
        .expect("download succeeds");
}

#[tokio::test]
async fn failed_download_does_not_disturb_concurrent_one() {
    let (server, client, dir) = setup().await;
    mount_download(&server, V1, ResponseTemplate::new(500)).await;
    mount_download(
        &server,
        V2,
        ResponseTemplate::new(200)
            .set_body_bytes(b"second".to_vec())
            .set_delay(Duration::from_millis(750)),
    )
    .await;
    let v1 = DownloadKey::from(V1);
    let v2 = DownloadKey::from(V2);
    let mut events = client.subscribe();

    let second = client.spawn_download(v2.clone(), "Second");
    assert!(wait_until_in_flight(&client, &v2, Duration::from_secs(5)).await);

    let err = client
        .request_download(v1.clone(), "First")
        .await
        .expect_err("server error");

    assert!(matches!(
        err,
        Error::Download(DownloadError::Status { status: 500 })
    ));
    assert!(!client.in_flight().contains(&v1));
    assert!(client.in_flight().contains(&v2), "v2 is still downloading");
    assert_eq!(
        client.error().map(|e| e.message),
        Some("Download failed with status: 500".to_string())
    );

    let saved = second.await.expect("task joins").expect("v2 succeeds");
    assert_eq!(saved.path, dir.path().join("Second.mp3"));
    assert!(client.in_flight().is_empty());

    let failed = wait_for_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, Event::DownloadFailed { .. })
    })
    .await;
    assert!(matches!(failed, Some(Event::DownloadFailed { ref key, .. }) if *key == v1));
}

#[tokio::test]
async fn search_then_download_first_result() {
    let (server, client, dir) = setup().await;
    mount_search(&server, "lofi", 200, THREE_RESULTS).await;
    mount_download(
        &server,
        V1,
        ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]),
    )
    .await;

    client.search("lofi").await.expect("search succeeds");
    let first = client.results().remove(0);
    client.select_format(AudioFormat::Aac);
    let progress = client
        .download_result(&first)
        .await
        .expect("download succeeds");

    assert!(matches!(progress, DownloadProgress::Saved(_)));
    assert!(dir.path().join("Lofi Beats.aac").exists());
}

#[tokio::test]
async fn repeated_downloads_are_renamed() {
    let (server, client, dir) = setup().await;
    mount_download(
        &server,
        V1,
        ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()),
    )
    .await;

    let first = client.spawn_download(V1, "Song").await.expect("join").expect("first");
    let second = client.spawn_download(V1, "Song").await.expect("join").expect("second");

    assert_eq!(first.path, dir.path().join("Song.mp3"));
    assert_eq!(second.path, dir.path().join("Song (1).mp3"));
}

#[tokio::test]
async fn cancelled_download_sends_nothing() {
    let (server, client, _dir) = setup().await;
    wiremock::Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client.select_format(AudioFormat::Wav);
    client
        .request_download(V1, "Track")
        .await
        .expect("request accepted");
    let cancelled = client.cancel_download().expect("a download was pending");

    assert_eq!(cancelled.key, DownloadKey::from(V1));
    assert_eq!(client.download_state(&cancelled.key), DownloadState::Idle);
    assert_eq!(client.confirm_download().await.expect("no-op"), None);
}

#[tokio::test]
async fn concurrent_downloads_of_every_result() {
    let (server, client, dir) = setup().await;
    mount_search(&server, "lofi", 200, THREE_RESULTS).await;
    wiremock::Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"audio".to_vec())
                .set_delay(Duration::from_millis(50)),
        )
        .expect(3)
        .mount(&server)
        .await;

    client.search("lofi").await.expect("search succeeds");
    let tasks = client
        .results()
        .into_iter()
        .map(|r| client.spawn_download(r.key(), r.title));

    let saved: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task joins").expect("download succeeds"))
        .collect();

    assert_eq!(saved.len(), 3);
    for name in ["Lofi Beats.mp3", "Rain Sounds.mp3", "Jazz Cafe.mp3"] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }
    assert!(client.in_flight().is_empty());
}
